//! Idempotent seeding of the self-describing type system.
//!
//! # Responsibility
//! - Create bootstrap fields, meta-supertags, entity supertags, the common
//!   field catalogue and the built-in saved queries, in that order.
//!
//! # Invariants
//! - Re-running never duplicates a `systemId` and never fails on existing
//!   system nodes (`INSERT OR IGNORE` on the live `system_id` index).
//! - The `systemId -> id` map lives in one [`BootstrapContext`] per run.
//! - [`bootstrap_system_nodes`] runs inside one `IMMEDIATE` transaction, so
//!   concurrent runs serialize on the write lock.
//! - Built-in query definitions are only written when missing, so local
//!   edits survive a re-run.

use crate::model::node::{FieldType, NodeId};
use crate::model::system_ids::*;
use crate::model::value::PropertyValue;
use crate::query::definition::{Filter, PropertyOp, QueryDefinition, SortDirection, TemporalField};
use crate::repo::node_repo::{NodeRepository, RepoError, RepoResult, SqliteNodeRepository};
use crate::service::node_service::NodeService;
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

struct FieldSpec {
    system_id: &'static str,
    name: &'static str,
    field_type: FieldType,
}

struct SupertagSpec {
    system_id: &'static str,
    name: &'static str,
    extends: Option<&'static str>,
}

struct QuerySpec {
    system_id: &'static str,
    name: &'static str,
    definition: fn() -> QueryDefinition,
}

const BOOTSTRAP_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        system_id: FIELD_SUPERTAG,
        name: "Supertag",
        field_type: FieldType::Nodes,
    },
    FieldSpec {
        system_id: FIELD_EXTENDS,
        name: "Extends",
        field_type: FieldType::Node,
    },
    FieldSpec {
        system_id: FIELD_FIELD_TYPE,
        name: "Field Type",
        field_type: FieldType::Text,
    },
];

const META_SUPERTAGS: &[(&str, &str)] = &[
    (SUPERTAG_SUPERTAG, "Supertag"),
    (SUPERTAG_FIELD, "Field"),
    (SUPERTAG_SYSTEM, "System"),
];

const ENTITY_SUPERTAGS: &[SupertagSpec] = &[
    SupertagSpec {
        system_id: SUPERTAG_ITEM,
        name: "Item",
        extends: None,
    },
    SupertagSpec {
        system_id: SUPERTAG_TOOL,
        name: "Tool",
        extends: Some(SUPERTAG_ITEM),
    },
    SupertagSpec {
        system_id: SUPERTAG_REPO,
        name: "Repo",
        extends: Some(SUPERTAG_ITEM),
    },
    SupertagSpec {
        system_id: SUPERTAG_TAG,
        name: "Tag",
        extends: None,
    },
    SupertagSpec {
        system_id: SUPERTAG_TASK,
        name: "Task",
        extends: Some(SUPERTAG_ITEM),
    },
    SupertagSpec {
        system_id: SUPERTAG_EVENT,
        name: "Event",
        extends: Some(SUPERTAG_ITEM),
    },
    SupertagSpec {
        system_id: SUPERTAG_COMMAND,
        name: "Command",
        extends: None,
    },
    SupertagSpec {
        system_id: SUPERTAG_QUERY,
        name: "Query",
        extends: None,
    },
];

const CATALOGUE_FIELDS: &[(&str, &str, FieldType)] = &[
    (FIELD_STATUS, "Status", FieldType::Text),
    (FIELD_DESCRIPTION, "Description", FieldType::Text),
    (FIELD_URL, "URL", FieldType::Text),
    (FIELD_COLOR, "Color", FieldType::Text),
    (FIELD_ICON, "Icon", FieldType::Text),
    (FIELD_PRIORITY, "Priority", FieldType::Number),
    (FIELD_DUE_DATE, "Due Date", FieldType::Date),
    (FIELD_START_DATE, "Start Date", FieldType::Date),
    (FIELD_END_DATE, "End Date", FieldType::Date),
    (FIELD_ALL_DAY, "All Day", FieldType::Boolean),
    (FIELD_LOCATION, "Location", FieldType::Text),
    (FIELD_RRULE, "Recurrence Rule", FieldType::Text),
    (FIELD_COMMAND, "Command", FieldType::Text),
    (FIELD_TAGS, "Tags", FieldType::Nodes),
    (FIELD_QUERY_DEFINITION, "Query Definition", FieldType::Json),
    (FIELD_RESULT_CACHE, "Result Cache", FieldType::Nodes),
    (FIELD_EVALUATED_AT, "Evaluated At", FieldType::Number),
];

const BUILTIN_QUERIES: &[QuerySpec] = &[
    QuerySpec {
        system_id: QUERY_INBOX_PENDING,
        name: "Inbox: Pending Items",
        definition: inbox_pending,
    },
    QuerySpec {
        system_id: QUERY_OPEN_TASKS,
        name: "Open Tasks",
        definition: open_tasks,
    },
    QuerySpec {
        system_id: QUERY_UPCOMING_EVENTS,
        name: "Upcoming Events",
        definition: upcoming_events,
    },
    QuerySpec {
        system_id: QUERY_RECENT_ITEMS,
        name: "Recently Updated Items",
        definition: recent_items,
    },
];

fn inbox_pending() -> QueryDefinition {
    QueryDefinition::new(vec![
        Filter::supertag(SUPERTAG_ITEM),
        Filter::property(FIELD_STATUS, PropertyOp::Eq, "pending"),
    ])
    .sorted_by("createdAt", SortDirection::Desc)
}

fn open_tasks() -> QueryDefinition {
    QueryDefinition::new(vec![
        Filter::supertag(SUPERTAG_TASK),
        Filter::property(FIELD_STATUS, PropertyOp::Neq, "done"),
    ])
    .sorted_by(FIELD_DUE_DATE, SortDirection::Asc)
}

fn upcoming_events() -> QueryDefinition {
    QueryDefinition::new(vec![
        Filter::supertag(SUPERTAG_EVENT),
        Filter::has_field(FIELD_START_DATE),
    ])
    .sorted_by(FIELD_START_DATE, SortDirection::Asc)
}

fn recent_items() -> QueryDefinition {
    QueryDefinition::new(vec![
        Filter::supertag(SUPERTAG_ITEM),
        Filter::within_days(TemporalField::UpdatedAt, 7),
    ])
    .sorted_by("updatedAt", SortDirection::Desc)
    .limit(50)
}

/// Outcome of one bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapSummary {
    /// Catalogue nodes present after the run.
    pub node_count: usize,
    /// Property rows held by those nodes after the run.
    pub property_count: usize,
    /// Nodes inserted by this run.
    pub nodes_created: usize,
    /// `true` when every catalogue node already existed.
    pub already_bootstrapped: bool,
}

/// `systemId -> id` map scoped to a single bootstrap run.
#[derive(Debug, Default)]
pub struct BootstrapContext {
    ids: HashMap<&'static str, NodeId>,
    nodes_created: usize,
}

impl BootstrapContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id resolved for a catalogue `systemId` during this run.
    pub fn id(&self, system_id: &str) -> Option<NodeId> {
        self.ids.get(system_id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn upsert<R: NodeRepository + ?Sized>(
        &mut self,
        repo: &R,
        system_id: &'static str,
        content: &str,
    ) -> RepoResult<NodeId> {
        if let Some(id) = self.id(system_id) {
            return Ok(id);
        }
        let (id, created) = repo.insert_system_node(system_id, content)?;
        if created {
            self.nodes_created += 1;
        }
        self.ids.insert(system_id, id);
        Ok(id)
    }

    fn require(&self, system_id: &str) -> RepoResult<NodeId> {
        self.id(system_id)
            .ok_or_else(|| RepoError::InvalidData(format!("bootstrap node `{system_id}` missing")))
    }
}

/// Opens an `IMMEDIATE` transaction on `conn` and seeds the catalogue.
///
/// Nothing is committed when any step fails.
pub fn bootstrap_system_nodes(conn: &Connection) -> RepoResult<BootstrapSummary> {
    let started_at = Instant::now();
    info!("event=bootstrap module=bootstrap status=start");

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let seeded = {
        let repo = SqliteNodeRepository::try_new(&tx)?;
        let mut context = BootstrapContext::new();
        seed_system_nodes(&repo, &mut context)
    };

    match seeded {
        Ok(summary) => {
            tx.commit()?;
            info!(
                "event=bootstrap module=bootstrap status=ok nodes={} properties={} created={} duration_ms={}",
                summary.node_count,
                summary.property_count,
                summary.nodes_created,
                started_at.elapsed().as_millis()
            );
            Ok(summary)
        }
        Err(err) => {
            error!(
                "event=bootstrap module=bootstrap status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Seeds the catalogue through `repo` without opening a transaction.
///
/// Callers own atomicity; [`bootstrap_system_nodes`] is the usual entry.
pub fn seed_system_nodes<R: NodeRepository + ?Sized>(
    repo: &R,
    context: &mut BootstrapContext,
) -> RepoResult<BootstrapSummary> {
    let service = NodeService::new(repo);

    // 1. Fields must exist before anything, themselves included, is tagged.
    for field in BOOTSTRAP_FIELDS {
        context.upsert(repo, field.system_id, field.name)?;
    }
    for field in BOOTSTRAP_FIELDS {
        let id = context.require(field.system_id)?;
        service.set_property(id, FIELD_FIELD_TYPE, field.field_type.as_str(), None)?;
    }

    // 2.
    for &(system_id, name) in META_SUPERTAGS {
        context.upsert(repo, system_id, name)?;
    }
    for &(system_id, _) in META_SUPERTAGS {
        tag(&service, context, system_id, &[SUPERTAG_SUPERTAG, SUPERTAG_SYSTEM])?;
    }
    for field in BOOTSTRAP_FIELDS {
        tag(&service, context, field.system_id, &[SUPERTAG_FIELD, SUPERTAG_SYSTEM])?;
    }

    // 3. Parents come first in the table.
    for supertag in ENTITY_SUPERTAGS {
        let id = context.upsert(repo, supertag.system_id, supertag.name)?;
        tag(&service, context, supertag.system_id, &[SUPERTAG_SUPERTAG, SUPERTAG_SYSTEM])?;
        if let Some(parent) = supertag.extends {
            let parent_id = context.require(parent)?;
            service.set_property(id, FIELD_EXTENDS, parent_id, None)?;
        }
    }

    // 4.
    for &(system_id, name, field_type) in CATALOGUE_FIELDS {
        let id = context.upsert(repo, system_id, name)?;
        tag(&service, context, system_id, &[SUPERTAG_FIELD, SUPERTAG_SYSTEM])?;
        service.set_property(id, FIELD_FIELD_TYPE, field_type.as_str(), None)?;
    }

    // 5.
    for query in BUILTIN_QUERIES {
        let id = context.upsert(repo, query.system_id, query.name)?;
        tag(&service, context, query.system_id, &[SUPERTAG_QUERY, SUPERTAG_SYSTEM])?;
        if service.get_property(id, FIELD_QUERY_DEFINITION)?.is_none() {
            let definition = (query.definition)()
                .to_value()
                .map_err(|err| RepoError::InvalidValue(err.to_string()))?;
            service.set_property(id, FIELD_QUERY_DEFINITION, PropertyValue::Json(definition), None)?;
        }
    }

    let mut property_count = 0;
    for &id in context.ids.values() {
        property_count += repo.list_properties(id)?.len();
    }

    Ok(BootstrapSummary {
        node_count: context.len(),
        property_count,
        nodes_created: context.nodes_created,
        already_bootstrapped: context.nodes_created == 0,
    })
}

fn tag<R: NodeRepository>(
    service: &NodeService<R>,
    context: &BootstrapContext,
    system_id: &str,
    supertags: &[&str],
) -> RepoResult<()> {
    let node_id = context.require(system_id)?;
    for supertag in supertags {
        service.attach_supertag(node_id, context.require(supertag)?)?;
    }
    Ok(())
}
