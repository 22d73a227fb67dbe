//! Core of the node-graph data model.
//!
//! Everything (items, tags, fields, supertags, saved queries) is a `Node`
//! stored in two tables. This crate owns the store, the type system seed,
//! the read-side assembly and the query engine.

pub mod adapters;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use adapters::command::{list_commands, list_commands_for_item, Command};
pub use adapters::item::{list_items, Item};
pub use adapters::tag::{list_tags, Tag};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::assembled::{AssembledNode, SupertagRef};
pub use model::node::{FieldType, NewNode, Node, NodeId, NodeProperty, NodeValidationError};
pub use model::value::{decode_value, encode_value, PropertyValue};
pub use query::cache::CachedResult;
pub use query::definition::{
    Filter, PropertyOp, QueryDefinition, QueryError, QueryResult, QuerySort, RelationType,
    SortDirection, TemporalField, TemporalOp, DEFAULT_QUERY_LIMIT,
};
pub use query::engine::{evaluate_query, QueryEngine, QueryPage};
pub use repo::node_repo::{
    NodeListQuery, NodeRepository, RepoError, RepoResult, SqliteNodeRepository,
};
pub use service::assembler::{assemble_node, Assembler};
pub use service::bootstrap::{
    bootstrap_system_nodes, seed_system_nodes, BootstrapContext, BootstrapSummary,
};
pub use service::inheritance::get_nodes_by_supertag_with_inheritance;
pub use service::node_service::NodeService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
