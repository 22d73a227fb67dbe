//! Node store use-case service.
//!
//! # Responsibility
//! - Provide the core API used by feature code: create/find/update/delete
//!   nodes, typed property writes and reads, supertag assignment.
//! - Expose the read side (assembly, inheritance queries, query evaluation)
//!   behind the same facade.
//!
//! # Invariants
//! - Property writes resolve the field node by `systemId` (or id) and obey
//!   its declared `fieldType`: `nodes` appends, everything else replaces.
//! - Read APIs never fail for unknown or deleted nodes; they return `None`.
//! - `field:extends` writes never introduce an inheritance cycle.

use crate::model::assembled::AssembledNode;
use crate::model::node::{FieldType, NewNode, Node, NodeId};
use crate::model::system_ids::{FIELD_EXTENDS, FIELD_FIELD_TYPE, FIELD_SUPERTAG};
use crate::model::value::{decode_value, encode_value, PropertyValue};
use crate::query::cache::{self, CachedResult};
use crate::query::definition::{QueryDefinition, QueryResult};
use crate::query::engine::{QueryEngine, QueryPage};
use crate::repo::node_repo::{NodeListQuery, NodeRepository, RepoError, RepoResult};
use crate::service::{assembler, inheritance};
use log::debug;

/// Use-case facade over a node repository.
pub struct NodeService<R: NodeRepository> {
    repo: R,
}

impl<R: NodeRepository> NodeService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Creates a node and attaches the requested supertags in order.
    ///
    /// The node row and its supertag rows are written atomically; an
    /// unknown supertag leaves no partial node behind.
    pub fn create_node(&self, new_node: &NewNode) -> RepoResult<NodeId> {
        let mut supertag_rows = Vec::with_capacity(new_node.supertags.len());
        if !new_node.supertags.is_empty() {
            let supertag_field = self.require_field(FIELD_SUPERTAG)?;
            let mut seen = Vec::with_capacity(new_node.supertags.len());
            for identifier in &new_node.supertags {
                let supertag = self
                    .find_node(identifier)?
                    .ok_or_else(|| RepoError::SupertagNotFound(identifier.clone()))?;
                if seen.contains(&supertag.id) {
                    continue;
                }
                seen.push(supertag.id);
                supertag_rows.push((
                    supertag_field.id,
                    encode(&PropertyValue::Node(supertag.id))?,
                ));
            }
        }

        let node = self
            .repo
            .insert_node_with_properties(new_node, &supertag_rows)?;

        debug!(
            "event=node_create module=node_service status=ok supertags={} system={}",
            new_node.supertags.len(),
            node.system_id.is_some()
        );
        Ok(node.id)
    }

    /// Finds a live node by UUID or by `systemId`.
    pub fn find_node(&self, identifier: &str) -> RepoResult<Option<Node>> {
        self.repo.find_live(identifier)
    }

    /// Replaces node content; `content_plain` is re-derived.
    pub fn update_content(&self, node_id: NodeId, text: &str) -> RepoResult<()> {
        self.repo.update_content(node_id, text)
    }

    /// Soft-deletes a node. Owned nodes and referencing rows are untouched.
    pub fn delete_node(&self, node_id: NodeId) -> RepoResult<()> {
        self.repo.soft_delete_node(node_id)
    }

    /// Live nodes grouped under `owner_id`, in creation order.
    pub fn list_children(&self, owner_id: NodeId) -> RepoResult<Vec<Node>> {
        self.repo.list_nodes(&NodeListQuery {
            owner_id: Some(owner_id),
            include_deleted: false,
        })
    }

    /// Declared `fieldType` of a field node, if any.
    pub fn field_type(&self, field_node_id: NodeId) -> RepoResult<Option<FieldType>> {
        let Some(field_type_field) = self.repo.get_node_by_system_id(FIELD_FIELD_TYPE)? else {
            return Ok(None);
        };
        let declared = self
            .repo
            .list_field_properties(field_node_id, field_type_field.id)?
            .first()
            .and_then(|row| decode_value(&row.value))
            .and_then(|value| value.as_str().and_then(FieldType::parse));
        Ok(declared)
    }

    /// Writes a property value.
    ///
    /// Single-valued fields keep exactly one row (an identical value is a
    /// no-op); `nodes` fields append one row per referenced node. `order`
    /// overrides the row position.
    pub fn set_property(
        &self,
        node_id: NodeId,
        field: &str,
        value: impl Into<PropertyValue>,
        order: Option<i64>,
    ) -> RepoResult<()> {
        let value = value.into();
        self.require_live(node_id)?;
        let field_node = self.require_field(field)?;
        let field_type = self.field_type(field_node.id)?;

        if let Some(field_type) = field_type {
            if !value.conforms_to(field_type) {
                return Err(RepoError::FieldTypeMismatch {
                    field: field.to_string(),
                    expected: field_type.as_str(),
                });
            }
        }

        self.reject_cyclic_extends(node_id, &field_node, std::slice::from_ref(&value))?;

        if field_type.is_some_and(FieldType::is_multi_valued) {
            let mut next_order = order;
            for referenced in value.referenced_node_ids() {
                let encoded = encode(&PropertyValue::Node(referenced))?;
                self.repo
                    .insert_property(node_id, field_node.id, &encoded, next_order)?;
                next_order = next_order.map(|order| order + 1);
            }
        } else {
            let encoded = encode(&value)?;
            let existing = self.repo.list_field_properties(node_id, field_node.id)?;
            let unchanged = existing.len() == 1
                && existing[0].value == encoded
                && order.map_or(true, |order| existing[0].order == order);
            if unchanged {
                return Ok(());
            }
            self.repo.replace_field_properties(
                node_id,
                field_node.id,
                &[encoded],
                order.unwrap_or(0),
            )?;
        }

        self.repo.touch_node(node_id)
    }

    /// Replaces all values of a field with `values`, in order.
    pub fn set_property_values(
        &self,
        node_id: NodeId,
        field: &str,
        values: &[PropertyValue],
    ) -> RepoResult<()> {
        self.require_live(node_id)?;
        let field_node = self.require_field(field)?;
        if let Some(field_type) = self.field_type(field_node.id)? {
            if let Some(bad) = values.iter().find(|value| !value.conforms_to(field_type)) {
                debug!(
                    "event=property_write module=node_service status=rejected expected={} got={}",
                    field_type.as_str(),
                    value_kind(bad)
                );
                return Err(RepoError::FieldTypeMismatch {
                    field: field.to_string(),
                    expected: field_type.as_str(),
                });
            }
        }

        self.reject_cyclic_extends(node_id, &field_node, values)?;

        let encoded = values.iter().map(encode).collect::<RepoResult<Vec<_>>>()?;
        self.repo
            .replace_field_properties(node_id, field_node.id, &encoded, 0)?;
        self.repo.touch_node(node_id)
    }

    /// First decoded value of a field; `None` for unknown node/field/value.
    pub fn get_property(&self, node_id: NodeId, field: &str) -> RepoResult<Option<PropertyValue>> {
        Ok(self.get_property_values(node_id, field)?.into_iter().next())
    }

    /// All decoded values of a field, in order. Undecodable rows are skipped.
    pub fn get_property_values(
        &self,
        node_id: NodeId,
        field: &str,
    ) -> RepoResult<Vec<PropertyValue>> {
        if self.repo.get_node(node_id, false)?.is_none() {
            return Ok(Vec::new());
        }
        let Some(field_node) = self.find_node(field)? else {
            return Ok(Vec::new());
        };
        let values = self
            .repo
            .list_field_properties(node_id, field_node.id)?
            .iter()
            .filter_map(|row| decode_value(&row.value))
            .collect();
        Ok(values)
    }

    /// First value of a field, kept only if it has the `expected` shape.
    pub fn get_typed_property(
        &self,
        node_id: NodeId,
        field: &str,
        expected: FieldType,
    ) -> RepoResult<Option<PropertyValue>> {
        Ok(self
            .get_property(node_id, field)?
            .filter(|value| value.conforms_to(expected)))
    }

    /// Deletes every row of a field on a node. Returns removed row count.
    pub fn remove_property(&self, node_id: NodeId, field: &str) -> RepoResult<usize> {
        self.require_live(node_id)?;
        let field_node = self.require_field(field)?;
        let removed = self.repo.delete_field_properties(node_id, field_node.id)?;
        if removed > 0 {
            self.repo.touch_node(node_id)?;
        }
        Ok(removed)
    }

    /// Appends a supertag (id or `systemId`) unless already assigned.
    ///
    /// Returns whether a row was written.
    pub fn add_supertag(&self, node_id: NodeId, supertag: &str) -> RepoResult<bool> {
        let supertag_node = self
            .find_node(supertag)?
            .ok_or_else(|| RepoError::SupertagNotFound(supertag.to_string()))?;
        self.attach_supertag(node_id, supertag_node.id)
    }

    /// Id-based variant of [`Self::add_supertag`].
    pub fn attach_supertag(&self, node_id: NodeId, supertag_id: NodeId) -> RepoResult<bool> {
        self.require_live(node_id)?;
        let supertag_field = self.require_field(FIELD_SUPERTAG)?;
        let already_tagged = self
            .repo
            .list_field_properties(node_id, supertag_field.id)?
            .iter()
            .filter_map(|row| decode_value(&row.value))
            .any(|value| value.referenced_node_ids().contains(&supertag_id));
        if already_tagged {
            return Ok(false);
        }

        let encoded = encode(&PropertyValue::Node(supertag_id))?;
        self.repo
            .insert_property(node_id, supertag_field.id, &encoded, None)?;
        self.repo.touch_node(node_id)?;
        Ok(true)
    }

    /// Replaces the supertag list; the first entry becomes the primary type.
    pub fn set_supertags(&self, node_id: NodeId, supertags: &[&str]) -> RepoResult<()> {
        let mut values = Vec::with_capacity(supertags.len());
        for identifier in supertags {
            let supertag = self
                .find_node(identifier)?
                .ok_or_else(|| RepoError::SupertagNotFound(identifier.to_string()))?;
            values.push(PropertyValue::Node(supertag.id));
        }
        self.set_property_values(node_id, FIELD_SUPERTAG, &values)
    }

    /// Joins one live node into its read projection.
    pub fn assemble_node(&self, node_id: NodeId) -> RepoResult<Option<AssembledNode>> {
        assembler::assemble_node(&self.repo, node_id)
    }

    /// Nodes tagged with the supertag, or (when `include_inherited`) with
    /// any supertag extending it.
    pub fn get_nodes_by_supertag_with_inheritance(
        &self,
        supertag_system_id: &str,
        include_inherited: bool,
    ) -> RepoResult<Vec<AssembledNode>> {
        inheritance::get_nodes_by_supertag_with_inheritance(
            &self.repo,
            supertag_system_id,
            include_inherited,
        )
    }

    /// Evaluates a query definition against all live nodes.
    pub fn evaluate_query(&self, definition: &QueryDefinition) -> QueryResult<QueryPage> {
        QueryEngine::new(&self.repo).evaluate(definition)
    }

    /// Stores a query definition on a node and drops its cached result.
    pub fn save_query_definition(
        &self,
        node_id: NodeId,
        definition: &QueryDefinition,
    ) -> QueryResult<()> {
        cache::save_query_definition(&self.repo, node_id, definition)
    }

    pub fn load_query_definition(&self, node_id: NodeId) -> QueryResult<Option<QueryDefinition>> {
        cache::load_query_definition(&self.repo, node_id)
    }

    /// Evaluates a saved query, optionally refreshing its result cache.
    pub fn evaluate_saved_query(&self, node_id: NodeId, refresh_cache: bool) -> QueryResult<QueryPage> {
        cache::evaluate_saved_query(&self.repo, node_id, refresh_cache)
    }

    pub fn read_result_cache(&self, node_id: NodeId) -> RepoResult<Option<CachedResult>> {
        cache::read_result_cache(&self.repo, node_id)
    }

    pub fn invalidate_result_cache(&self, node_id: NodeId) -> RepoResult<()> {
        cache::invalidate_result_cache(&self.repo, node_id)
    }

    /// Rejects `field:extends` values that would make `supertag_id` its own
    /// ancestor. Other fields pass through.
    fn reject_cyclic_extends(
        &self,
        supertag_id: NodeId,
        field_node: &Node,
        values: &[PropertyValue],
    ) -> RepoResult<()> {
        if field_node.system_id.as_deref() != Some(FIELD_EXTENDS) {
            return Ok(());
        }
        for parent in values.iter().flat_map(PropertyValue::referenced_node_ids) {
            if inheritance::would_create_cycle(&self.repo, supertag_id, parent)? {
                return Err(RepoError::CyclicInheritance {
                    supertag: supertag_id,
                    parent,
                });
            }
        }
        Ok(())
    }

    fn require_live(&self, node_id: NodeId) -> RepoResult<Node> {
        self.repo
            .get_node(node_id, false)?
            .ok_or(RepoError::NotFound(node_id))
    }

    fn require_field(&self, field: &str) -> RepoResult<Node> {
        self.find_node(field)?
            .ok_or_else(|| RepoError::FieldNotFound(field.to_string()))
    }
}

fn encode(value: &PropertyValue) -> RepoResult<String> {
    encode_value(value).map_err(RepoError::InvalidValue)
}

fn value_kind(value: &PropertyValue) -> &'static str {
    match value {
        PropertyValue::String(_) => "string",
        PropertyValue::Number(_) => "number",
        PropertyValue::Boolean(_) => "boolean",
        PropertyValue::Node(_) => "node",
        PropertyValue::Nodes(_) => "nodes",
        PropertyValue::Json(_) => "json",
    }
}
