//! Supertag inheritance resolver.
//!
//! # Responsibility
//! - Follow `field:extends` references between supertag nodes.
//! - Answer "which nodes are (transitively) of type S".
//!
//! # Invariants
//! - Every traversal is guarded by a visited set and `MAX_INHERITANCE_DEPTH`,
//!   so a malformed cyclic chain ends as "no further ancestors".
//! - Soft-deleted supertags break the chain at that point.

use crate::model::assembled::AssembledNode;
use crate::model::node::NodeId;
use crate::model::system_ids::{FIELD_EXTENDS, FIELD_SUPERTAG};
use crate::model::value::decode_value;
use crate::repo::node_repo::{NodeRepository, RepoResult};
use crate::service::assembler::Assembler;
use std::collections::{HashMap, HashSet, VecDeque};

/// Upper bound on `extends` hops followed in either direction.
pub const MAX_INHERITANCE_DEPTH: usize = 64;

/// Direct parent of a supertag, if it declares a live one.
pub fn parent_supertag<R: NodeRepository + ?Sized>(
    repo: &R,
    supertag_id: NodeId,
) -> RepoResult<Option<NodeId>> {
    let Some(extends_field) = repo.get_node_by_system_id(FIELD_EXTENDS)? else {
        return Ok(None);
    };
    let parent = repo
        .list_field_properties(supertag_id, extends_field.id)?
        .iter()
        .find_map(|row| decode_value(&row.value).and_then(|value| value.as_node_id()));
    match parent {
        Some(parent_id) if repo.get_node(parent_id, false)?.is_some() => Ok(Some(parent_id)),
        _ => Ok(None),
    }
}

/// Ancestor chain from the direct parent upwards.
///
/// Stops at the first repeated supertag, so a cycle yields a finite chain
/// that never contains `supertag_id` itself.
pub fn ancestor_supertags<R: NodeRepository + ?Sized>(
    repo: &R,
    supertag_id: NodeId,
) -> RepoResult<Vec<NodeId>> {
    let mut chain = Vec::new();
    let mut visited = HashSet::from([supertag_id]);
    let mut current = supertag_id;

    while chain.len() < MAX_INHERITANCE_DEPTH {
        let Some(parent) = parent_supertag(repo, current)? else {
            break;
        };
        if !visited.insert(parent) {
            break;
        }
        chain.push(parent);
        current = parent;
    }

    Ok(chain)
}

/// The supertag itself followed by every transitive descendant, breadth first.
pub fn descendant_supertags<R: NodeRepository + ?Sized>(
    repo: &R,
    supertag_id: NodeId,
) -> RepoResult<Vec<NodeId>> {
    let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    if let Some(extends_field) = repo.get_node_by_system_id(FIELD_EXTENDS)? {
        for row in repo.list_properties_by_field(extends_field.id)? {
            if let Some(parent) = decode_value(&row.value).and_then(|value| value.as_node_id()) {
                children.entry(parent).or_default().push(row.node_id);
            }
        }
    }

    let mut ordered = vec![supertag_id];
    let mut visited = HashSet::from([supertag_id]);
    let mut queue = VecDeque::from([(supertag_id, 0usize)]);
    while let Some((current, depth)) = queue.pop_front() {
        if depth >= MAX_INHERITANCE_DEPTH {
            continue;
        }
        for &child in children.get(&current).into_iter().flatten() {
            if visited.insert(child) {
                ordered.push(child);
                queue.push_back((child, depth + 1));
            }
        }
    }

    Ok(ordered)
}

/// Whether `supertag_id extends parent_id` would close a cycle.
pub fn would_create_cycle<R: NodeRepository + ?Sized>(
    repo: &R,
    supertag_id: NodeId,
    parent_id: NodeId,
) -> RepoResult<bool> {
    if supertag_id == parent_id {
        return Ok(true);
    }
    Ok(ancestor_supertags(repo, parent_id)?.contains(&supertag_id))
}

/// Whether an assembled node carries the supertag directly or through an
/// ancestor of one of its supertags.
pub fn is_a<R: NodeRepository + ?Sized>(
    repo: &R,
    node: &AssembledNode,
    supertag_system_id: &str,
) -> RepoResult<bool> {
    let Some(target) = repo.find_live(supertag_system_id)? else {
        return Ok(false);
    };
    for supertag in &node.supertags {
        if supertag.id == target.id || ancestor_supertags(repo, supertag.id)?.contains(&target.id)
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Live nodes tagged with the supertag or, when `include_inherited`, with
/// any of its descendants. Creation order, no duplicates.
///
/// An unknown supertag yields an empty list.
pub fn get_nodes_by_supertag_with_inheritance<R: NodeRepository + ?Sized>(
    repo: &R,
    supertag_system_id: &str,
    include_inherited: bool,
) -> RepoResult<Vec<AssembledNode>> {
    let Some(supertag) = repo.find_live(supertag_system_id)? else {
        return Ok(Vec::new());
    };
    let Some(supertag_field) = repo.get_node_by_system_id(FIELD_SUPERTAG)? else {
        return Ok(Vec::new());
    };

    let accepted: HashSet<NodeId> = if include_inherited {
        descendant_supertags(repo, supertag.id)?.into_iter().collect()
    } else {
        HashSet::from([supertag.id])
    };

    let mut seen = HashSet::new();
    let mut tagged = Vec::new();
    for row in repo.list_properties_by_field(supertag_field.id)? {
        let matches = decode_value(&row.value).is_some_and(|value| {
            value
                .referenced_node_ids()
                .iter()
                .any(|id| accepted.contains(id))
        });
        if matches && seen.insert(row.node_id) {
            tagged.push(row.node_id);
        }
    }

    Assembler::new(repo).assemble_nodes(&tagged)
}
