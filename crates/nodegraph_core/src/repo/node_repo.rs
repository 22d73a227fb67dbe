//! Node repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide row-level CRUD over `nodes` and `node_properties`.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - Read paths exclude soft-deleted nodes unless explicitly asked.
//! - Property rows are returned in `sort_order ASC, id ASC` order.
//! - System node creation is an atomic insert-or-ignore keyed by the live
//!   `system_id` unique index.

use crate::db::migrations::latest_version;
use crate::db::{now_epoch_ms, DbError};
use crate::model::node::{derive_plain_text, NewNode, Node, NodeId, NodeProperty, NodeValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const NODE_SELECT_SQL: &str = "SELECT
    id,
    content,
    content_plain,
    system_id,
    owner_id,
    created_at,
    updated_at,
    deleted_at
FROM nodes";

const PROPERTY_SELECT_SQL: &str = "SELECT
    id,
    node_id,
    field_node_id,
    value,
    sort_order,
    created_at,
    updated_at
FROM node_properties";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for node store persistence and use-case operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(NodeValidationError),
    Db(DbError),
    /// Node does not exist or is soft-deleted.
    NotFound(NodeId),
    /// No live field node carries this `systemId`/id.
    FieldNotFound(String),
    /// No live supertag node carries this `systemId`/id.
    SupertagNotFound(String),
    /// A uniqueness constraint rejected the write (duplicate id or `systemId`).
    Conflict(String),
    /// Value shape disagrees with the field's declared `fieldType`.
    FieldTypeMismatch {
        field: String,
        expected: &'static str,
    },
    /// Value cannot be encoded.
    InvalidValue(String),
    /// Writing `extends` would make a supertag its own ancestor.
    CyclicInheritance { supertag: NodeId, parent: NodeId },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted row cannot be converted into the model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "node not found: {id}"),
            Self::FieldNotFound(field) => write!(f, "field not found: {field}"),
            Self::SupertagNotFound(tag) => write!(f, "supertag not found: {tag}"),
            Self::Conflict(message) => write!(f, "node write conflict: {message}"),
            Self::FieldTypeMismatch { field, expected } => {
                write!(f, "value for `{field}` must be of field type `{expected}`")
            }
            Self::InvalidValue(message) => write!(f, "invalid property value: {message}"),
            Self::CyclicInheritance { supertag, parent } => write!(
                f,
                "supertag {supertag} cannot extend {parent}: inheritance cycle"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "node repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "node repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "node repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted node data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NodeValidationError> for RepoError {
    fn from(value: NodeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                )
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Listing options for live nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeListQuery {
    /// Only nodes grouped under this owner.
    pub owner_id: Option<NodeId>,
    pub include_deleted: bool,
}

/// Repository interface for the two node-graph tables.
pub trait NodeRepository {
    fn insert_node(&self, node: &NewNode) -> RepoResult<Node>;
    /// Inserts a node together with its first property rows
    /// (`(field_node_id, encoded_value)`, appended in order) as one atomic
    /// step. Nothing is persisted when any row fails.
    fn insert_node_with_properties(
        &self,
        node: &NewNode,
        properties: &[(NodeId, String)],
    ) -> RepoResult<Node>;
    /// Inserts a node for `system_id` unless a live one exists.
    ///
    /// Returns the live node id and whether this call created it.
    fn insert_system_node(&self, system_id: &str, content: &str) -> RepoResult<(NodeId, bool)>;
    fn get_node(&self, id: NodeId, include_deleted: bool) -> RepoResult<Option<Node>>;
    fn get_node_by_system_id(&self, system_id: &str) -> RepoResult<Option<Node>>;
    /// Lists nodes in creation order (`created_at ASC`, then insertion).
    fn list_nodes(&self, query: &NodeListQuery) -> RepoResult<Vec<Node>>;
    fn update_content(&self, id: NodeId, content: &str) -> RepoResult<()>;
    /// Bumps `updated_at` of a live node.
    fn touch_node(&self, id: NodeId) -> RepoResult<()>;
    /// Soft-deletes a node. Deleting an already deleted node is a no-op.
    fn soft_delete_node(&self, id: NodeId) -> RepoResult<()>;
    fn list_properties(&self, node_id: NodeId) -> RepoResult<Vec<NodeProperty>>;
    fn list_field_properties(
        &self,
        node_id: NodeId,
        field_node_id: NodeId,
    ) -> RepoResult<Vec<NodeProperty>>;
    /// All rows of one field across live nodes.
    fn list_properties_by_field(&self, field_node_id: NodeId) -> RepoResult<Vec<NodeProperty>>;
    /// Appends one row. `order = None` uses the next free slot for the field.
    fn insert_property(
        &self,
        node_id: NodeId,
        field_node_id: NodeId,
        encoded_value: &str,
        order: Option<i64>,
    ) -> RepoResult<NodeProperty>;
    fn delete_field_properties(&self, node_id: NodeId, field_node_id: NodeId) -> RepoResult<usize>;
    /// Replaces every row of one field with `encoded_values`, numbered from
    /// `first_order`, as one atomic step.
    fn replace_field_properties(
        &self,
        node_id: NodeId,
        field_node_id: NodeId,
        encoded_values: &[String],
        first_order: i64,
    ) -> RepoResult<()>;

    /// Resolves a live node from a UUID string or a `systemId`.
    fn find_live(&self, identifier: &str) -> RepoResult<Option<Node>> {
        let identifier = identifier.trim();
        if let Ok(id) = Uuid::parse_str(identifier) {
            if let Some(node) = self.get_node(id, false)? {
                return Ok(Some(node));
            }
        }
        self.get_node_by_system_id(identifier)
    }
}

/// SQLite-backed node repository over a borrowed connection.
pub struct SqliteNodeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNodeRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_node_connection_ready(conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Runs `work` inside a named savepoint, rolling back on error.
    ///
    /// Savepoints nest inside an outer transaction (bootstrap) as well.
    fn in_savepoint<T>(&self, name: &str, work: impl FnOnce() -> RepoResult<T>) -> RepoResult<T> {
        self.conn.execute_batch(&format!("SAVEPOINT {name};"))?;
        match work() {
            Ok(value) => {
                self.conn
                    .execute_batch(&format!("RELEASE SAVEPOINT {name};"))?;
                Ok(value)
            }
            Err(err) => {
                self.conn.execute_batch(&format!(
                    "ROLLBACK TO SAVEPOINT {name};
                     RELEASE SAVEPOINT {name};"
                ))?;
                Err(err)
            }
        }
    }
}

impl NodeRepository for SqliteNodeRepository<'_> {
    fn insert_node(&self, node: &NewNode) -> RepoResult<Node> {
        node.validate()?;

        let now = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO nodes (
                id,
                content,
                content_plain,
                system_id,
                owner_id,
                created_at,
                updated_at,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, NULL);",
            params![
                node.id.to_string(),
                node.content.as_str(),
                derive_plain_text(&node.content),
                node.system_id.as_deref(),
                node.owner_id.map(|owner| owner.to_string()),
                now,
            ],
        )?;

        load_required_node(self.conn, node.id)
    }

    fn insert_system_node(&self, system_id: &str, content: &str) -> RepoResult<(NodeId, bool)> {
        let request = NewNode::new(content).system_id(system_id);
        request.validate()?;

        let now = now_epoch_ms();
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO nodes (
                id,
                content,
                content_plain,
                system_id,
                owner_id,
                created_at,
                updated_at,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?5, NULL);",
            params![
                request.id.to_string(),
                content,
                derive_plain_text(content),
                system_id,
                now,
            ],
        )?;

        let existing = self
            .get_node_by_system_id(system_id)?
            .ok_or_else(|| RepoError::InvalidData(format!("system node `{system_id}` vanished")))?;
        Ok((existing.id, changed == 1))
    }

    fn get_node(&self, id: NodeId, include_deleted: bool) -> RepoResult<Option<Node>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NODE_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR deleted_at IS NULL);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_node_row(row)?));
        }

        Ok(None)
    }

    fn get_node_by_system_id(&self, system_id: &str) -> RepoResult<Option<Node>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NODE_SELECT_SQL}
             WHERE system_id = ?1
               AND deleted_at IS NULL;"
        ))?;

        let mut rows = stmt.query([system_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_node_row(row)?));
        }

        Ok(None)
    }

    fn list_nodes(&self, query: &NodeListQuery) -> RepoResult<Vec<Node>> {
        let mut sql = format!("{NODE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }

        if let Some(owner_id) = query.owner_id {
            sql.push_str(" AND owner_id = ?");
            bind_values.push(Value::Text(owner_id.to_string()));
        }

        sql.push_str(" ORDER BY created_at ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next()? {
            nodes.push(parse_node_row(row)?);
        }

        Ok(nodes)
    }

    fn update_content(&self, id: NodeId, content: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE nodes
             SET
                content = ?2,
                content_plain = ?3,
                updated_at = ?4
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), content, derive_plain_text(content), now_epoch_ms()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn touch_node(&self, id: NodeId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE nodes
             SET updated_at = MAX(updated_at, ?2)
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), now_epoch_ms()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn soft_delete_node(&self, id: NodeId) -> RepoResult<()> {
        let now = now_epoch_ms();
        let changed = self.conn.execute(
            "UPDATE nodes
             SET
                deleted_at = ?2,
                updated_at = ?2
             WHERE id = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), now],
        )?;

        if changed == 0 && self.get_node(id, true)?.is_none() {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn list_properties(&self, node_id: NodeId) -> RepoResult<Vec<NodeProperty>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROPERTY_SELECT_SQL}
             WHERE node_id = ?1
             ORDER BY sort_order ASC, id ASC;"
        ))?;
        let properties = collect_properties(stmt.query([node_id.to_string()])?)?;
        Ok(properties)
    }

    fn list_field_properties(
        &self,
        node_id: NodeId,
        field_node_id: NodeId,
    ) -> RepoResult<Vec<NodeProperty>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROPERTY_SELECT_SQL}
             WHERE node_id = ?1
               AND field_node_id = ?2
             ORDER BY sort_order ASC, id ASC;"
        ))?;
        let rows = stmt.query(params![node_id.to_string(), field_node_id.to_string()])?;
        let properties = collect_properties(rows)?;
        Ok(properties)
    }

    fn list_properties_by_field(&self, field_node_id: NodeId) -> RepoResult<Vec<NodeProperty>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                p.id AS id,
                p.node_id AS node_id,
                p.field_node_id AS field_node_id,
                p.value AS value,
                p.sort_order AS sort_order,
                p.created_at AS created_at,
                p.updated_at AS updated_at
             FROM node_properties p
             INNER JOIN nodes n ON n.id = p.node_id
             WHERE p.field_node_id = ?1
               AND n.deleted_at IS NULL
             ORDER BY n.created_at ASC, n.rowid ASC, p.sort_order ASC, p.id ASC;",
        )?;
        let properties = collect_properties(stmt.query([field_node_id.to_string()])?)?;
        Ok(properties)
    }

    fn insert_property(
        &self,
        node_id: NodeId,
        field_node_id: NodeId,
        encoded_value: &str,
        order: Option<i64>,
    ) -> RepoResult<NodeProperty> {
        let order = match order {
            Some(order) => order,
            None => next_property_order(self.conn, node_id, field_node_id)?,
        };
        let now = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO node_properties (
                node_id,
                field_node_id,
                value,
                sort_order,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
            params![
                node_id.to_string(),
                field_node_id.to_string(),
                encoded_value,
                order,
                now,
            ],
        )?;

        Ok(NodeProperty {
            id: self.conn.last_insert_rowid(),
            node_id,
            field_node_id,
            value: encoded_value.to_string(),
            order,
            created_at: now,
            updated_at: now,
        })
    }

    fn delete_field_properties(&self, node_id: NodeId, field_node_id: NodeId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM node_properties
             WHERE node_id = ?1
               AND field_node_id = ?2;",
            params![node_id.to_string(), field_node_id.to_string()],
        )?;
        Ok(removed)
    }

    fn replace_field_properties(
        &self,
        node_id: NodeId,
        field_node_id: NodeId,
        encoded_values: &[String],
        first_order: i64,
    ) -> RepoResult<()> {
        self.in_savepoint("replace_field_properties", || {
            self.delete_field_properties(node_id, field_node_id)?;
            for (index, encoded) in encoded_values.iter().enumerate() {
                self.insert_property(
                    node_id,
                    field_node_id,
                    encoded,
                    Some(first_order + index as i64),
                )?;
            }
            Ok(())
        })
    }

    fn insert_node_with_properties(
        &self,
        node: &NewNode,
        properties: &[(NodeId, String)],
    ) -> RepoResult<Node> {
        self.in_savepoint("insert_node_with_properties", || {
            let inserted = self.insert_node(node)?;
            for (field_node_id, encoded) in properties {
                self.insert_property(inserted.id, *field_node_id, encoded, None)?;
            }
            Ok(inserted)
        })
    }
}

impl<R: NodeRepository + ?Sized> NodeRepository for &R {
    fn insert_node(&self, node: &NewNode) -> RepoResult<Node> {
        (**self).insert_node(node)
    }

    fn insert_node_with_properties(
        &self,
        node: &NewNode,
        properties: &[(NodeId, String)],
    ) -> RepoResult<Node> {
        (**self).insert_node_with_properties(node, properties)
    }

    fn insert_system_node(&self, system_id: &str, content: &str) -> RepoResult<(NodeId, bool)> {
        (**self).insert_system_node(system_id, content)
    }

    fn get_node(&self, id: NodeId, include_deleted: bool) -> RepoResult<Option<Node>> {
        (**self).get_node(id, include_deleted)
    }

    fn get_node_by_system_id(&self, system_id: &str) -> RepoResult<Option<Node>> {
        (**self).get_node_by_system_id(system_id)
    }

    fn list_nodes(&self, query: &NodeListQuery) -> RepoResult<Vec<Node>> {
        (**self).list_nodes(query)
    }

    fn update_content(&self, id: NodeId, content: &str) -> RepoResult<()> {
        (**self).update_content(id, content)
    }

    fn touch_node(&self, id: NodeId) -> RepoResult<()> {
        (**self).touch_node(id)
    }

    fn soft_delete_node(&self, id: NodeId) -> RepoResult<()> {
        (**self).soft_delete_node(id)
    }

    fn list_properties(&self, node_id: NodeId) -> RepoResult<Vec<NodeProperty>> {
        (**self).list_properties(node_id)
    }

    fn list_field_properties(
        &self,
        node_id: NodeId,
        field_node_id: NodeId,
    ) -> RepoResult<Vec<NodeProperty>> {
        (**self).list_field_properties(node_id, field_node_id)
    }

    fn list_properties_by_field(&self, field_node_id: NodeId) -> RepoResult<Vec<NodeProperty>> {
        (**self).list_properties_by_field(field_node_id)
    }

    fn insert_property(
        &self,
        node_id: NodeId,
        field_node_id: NodeId,
        encoded_value: &str,
        order: Option<i64>,
    ) -> RepoResult<NodeProperty> {
        (**self).insert_property(node_id, field_node_id, encoded_value, order)
    }

    fn delete_field_properties(&self, node_id: NodeId, field_node_id: NodeId) -> RepoResult<usize> {
        (**self).delete_field_properties(node_id, field_node_id)
    }

    fn replace_field_properties(
        &self,
        node_id: NodeId,
        field_node_id: NodeId,
        encoded_values: &[String],
        first_order: i64,
    ) -> RepoResult<()> {
        (**self).replace_field_properties(node_id, field_node_id, encoded_values, first_order)
    }
}

fn load_required_node(conn: &Connection, id: NodeId) -> RepoResult<Node> {
    let node = conn
        .query_row(
            &format!("{NODE_SELECT_SQL} WHERE id = ?1;"),
            [id.to_string()],
            |row| Ok(parse_node_row(row)),
        )
        .optional()?;
    match node {
        Some(parsed) => parsed,
        None => Err(RepoError::NotFound(id)),
    }
}

fn next_property_order(conn: &Connection, node_id: NodeId, field_node_id: NodeId) -> RepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM node_properties
         WHERE node_id = ?1
           AND field_node_id = ?2;",
        params![node_id.to_string(), field_node_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn collect_properties(mut rows: rusqlite::Rows<'_>) -> RepoResult<Vec<NodeProperty>> {
    let mut properties = Vec::new();
    while let Some(row) = rows.next()? {
        properties.push(parse_property_row(row)?);
    }
    Ok(properties)
}

fn parse_node_row(row: &Row<'_>) -> RepoResult<Node> {
    let id_text: String = row.get("id")?;
    let owner_id = row
        .get::<_, Option<String>>("owner_id")?
        .map(|value| parse_uuid(&value, "nodes.owner_id"))
        .transpose()?;

    Ok(Node {
        id: parse_uuid(&id_text, "nodes.id")?,
        content: row.get("content")?,
        content_plain: row.get("content_plain")?,
        system_id: row.get("system_id")?,
        owner_id,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn parse_property_row(row: &Row<'_>) -> RepoResult<NodeProperty> {
    let node_id_text: String = row.get("node_id")?;
    let field_id_text: String = row.get("field_node_id")?;

    Ok(NodeProperty {
        id: row.get("id")?,
        node_id: parse_uuid(&node_id_text, "node_properties.node_id")?,
        field_node_id: parse_uuid(&field_id_text, "node_properties.field_node_id")?,
        value: row.get("value")?,
        order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_node_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 2] = [
        (
            "nodes",
            &[
                "id",
                "content",
                "content_plain",
                "system_id",
                "owner_id",
                "created_at",
                "updated_at",
                "deleted_at",
            ],
        ),
        (
            "node_properties",
            &[
                "id",
                "node_id",
                "field_node_id",
                "value",
                "sort_order",
                "created_at",
                "updated_at",
            ],
        ),
    ];

    for (table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
