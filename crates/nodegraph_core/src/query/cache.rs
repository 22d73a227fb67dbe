//! Saved queries and their result cache.
//!
//! A query node stores its definition in `field:queryDefinition`. The last
//! evaluation may be denormalized into `field:resultCache` (matched ids)
//! and `field:evaluatedAt`. The cache is never refreshed implicitly;
//! callers decide when to trust it and when to re-evaluate.
//!
//! # Invariants
//! - Saving a definition always drops the cached result.
//! - A cache exists exactly when `evaluatedAt` is set.

use crate::db::now_epoch_ms;
use crate::model::node::NodeId;
use crate::model::system_ids::{FIELD_EVALUATED_AT, FIELD_QUERY_DEFINITION, FIELD_RESULT_CACHE};
use crate::model::value::PropertyValue;
use crate::query::definition::{QueryDefinition, QueryError, QueryResult};
use crate::query::engine::{QueryEngine, QueryPage};
use crate::repo::node_repo::{NodeRepository, RepoError, RepoResult};
use crate::service::node_service::NodeService;
use log::info;
use serde::Serialize;

/// Last persisted evaluation of a saved query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResult {
    pub node_ids: Vec<NodeId>,
    /// Unix epoch milliseconds.
    pub evaluated_at: i64,
}

/// Stores `definition` on `node_id` and invalidates its cached result.
pub fn save_query_definition<R: NodeRepository + ?Sized>(
    repo: &R,
    node_id: NodeId,
    definition: &QueryDefinition,
) -> QueryResult<()> {
    definition.validate()?;
    let service = NodeService::new(repo);
    service.set_property(
        node_id,
        FIELD_QUERY_DEFINITION,
        PropertyValue::Json(definition.to_value()?),
        None,
    )?;
    invalidate_result_cache(repo, node_id)?;
    Ok(())
}

/// Reads the stored definition. `Ok(None)` when the node has none.
///
/// A definition stored as a JSON string (written by other tools) is
/// accepted too.
pub fn load_query_definition<R: NodeRepository + ?Sized>(
    repo: &R,
    node_id: NodeId,
) -> QueryResult<Option<QueryDefinition>> {
    let stored = NodeService::new(repo).get_property(node_id, FIELD_QUERY_DEFINITION)?;
    match stored {
        None => Ok(None),
        Some(PropertyValue::Json(value)) => QueryDefinition::from_value(value).map(Some),
        Some(PropertyValue::String(raw)) => QueryDefinition::from_json(&raw).map(Some),
        Some(_) => Err(QueryError::InvalidDefinition(format!(
            "node {node_id} stores a non-JSON query definition"
        ))),
    }
}

/// Evaluates the definition stored on `node_id`.
///
/// With `refresh_cache`, the returned ids and the evaluation time are
/// written back as the node's cached result.
pub fn evaluate_saved_query<R: NodeRepository + ?Sized>(
    repo: &R,
    node_id: NodeId,
    refresh_cache: bool,
) -> QueryResult<QueryPage> {
    if repo.get_node(node_id, false)?.is_none() {
        return Err(QueryError::Repo(RepoError::NotFound(node_id)));
    }
    let definition = load_query_definition(repo, node_id)?.ok_or_else(|| {
        QueryError::InvalidDefinition(format!("node {node_id} has no query definition"))
    })?;

    let page = QueryEngine::new(repo).evaluate(&definition)?;
    if refresh_cache {
        write_result_cache(repo, node_id, &page.node_ids(), now_epoch_ms())?;
        info!(
            "event=query_cache_refresh module=query status=ok cached={}",
            page.nodes.len()
        );
    }
    Ok(page)
}

/// Cached result of the last refreshing evaluation, if any.
pub fn read_result_cache<R: NodeRepository + ?Sized>(
    repo: &R,
    node_id: NodeId,
) -> RepoResult<Option<CachedResult>> {
    let service = NodeService::new(repo);
    let evaluated_at = service
        .get_property(node_id, FIELD_EVALUATED_AT)?
        .and_then(|value| value.as_f64());
    let Some(evaluated_at) = evaluated_at else {
        return Ok(None);
    };

    let node_ids = service
        .get_property_values(node_id, FIELD_RESULT_CACHE)?
        .iter()
        .flat_map(PropertyValue::referenced_node_ids)
        .collect();
    Ok(Some(CachedResult {
        node_ids,
        evaluated_at: evaluated_at as i64,
    }))
}

/// Drops the cached result. Idempotent.
pub fn invalidate_result_cache<R: NodeRepository + ?Sized>(
    repo: &R,
    node_id: NodeId,
) -> RepoResult<()> {
    let service = NodeService::new(repo);
    service.remove_property(node_id, FIELD_RESULT_CACHE)?;
    service.remove_property(node_id, FIELD_EVALUATED_AT)?;
    Ok(())
}

fn write_result_cache<R: NodeRepository + ?Sized>(
    repo: &R,
    node_id: NodeId,
    node_ids: &[NodeId],
    evaluated_at: i64,
) -> RepoResult<()> {
    let service = NodeService::new(repo);
    let values = node_ids
        .iter()
        .copied()
        .map(PropertyValue::Node)
        .collect::<Vec<_>>();
    service.set_property_values(node_id, FIELD_RESULT_CACHE, &values)?;
    service.set_property(node_id, FIELD_EVALUATED_AT, evaluated_at, None)
}
