//! Node assembler: the single read-side join point.
//!
//! # Responsibility
//! - Join a node row with its property rows into an [`AssembledNode`].
//! - Resolve field names and the supertag list.
//!
//! # Invariants
//! - Missing or soft-deleted nodes assemble to `None`.
//! - Malformed rows never fail assembly. Undecodable values, rows whose
//!   field node is gone, and supertag references to missing nodes are
//!   skipped and logged at `debug`.
//! - Field/supertag lookups are memoized per `Assembler` value only.

use crate::model::assembled::{field_key, AssembledNode, SupertagRef};
use crate::model::node::{Node, NodeId};
use crate::model::system_ids::FIELD_SUPERTAG;
use crate::model::value::decode_value;
use crate::repo::node_repo::{NodeListQuery, NodeRepository, RepoResult};
use log::debug;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone)]
struct FieldInfo {
    key: String,
    has_system_id: bool,
    is_supertag: bool,
}

/// Assembles nodes against one repository, caching field and supertag
/// lookups for the lifetime of the value.
pub struct Assembler<'r, R: NodeRepository + ?Sized> {
    repo: &'r R,
    fields: HashMap<NodeId, Option<FieldInfo>>,
    supertags: HashMap<NodeId, Option<SupertagRef>>,
}

impl<'r, R: NodeRepository + ?Sized> Assembler<'r, R> {
    pub fn new(repo: &'r R) -> Self {
        Self {
            repo,
            fields: HashMap::new(),
            supertags: HashMap::new(),
        }
    }

    /// Assembles one node by id. `None` when missing or soft-deleted.
    pub fn assemble_node(&mut self, node_id: NodeId) -> RepoResult<Option<AssembledNode>> {
        match self.repo.get_node(node_id, false)? {
            Some(node) => self.assemble(&node).map(Some),
            None => Ok(None),
        }
    }

    /// Assembles the given ids in order, dropping the ones that are gone.
    pub fn assemble_nodes(&mut self, node_ids: &[NodeId]) -> RepoResult<Vec<AssembledNode>> {
        let mut assembled = Vec::with_capacity(node_ids.len());
        for &node_id in node_ids {
            if let Some(node) = self.assemble_node(node_id)? {
                assembled.push(node);
            }
        }
        Ok(assembled)
    }

    /// Every live node, in creation order.
    pub fn assemble_all(&mut self) -> RepoResult<Vec<AssembledNode>> {
        let nodes = self.repo.list_nodes(&NodeListQuery::default())?;
        let mut assembled = Vec::with_capacity(nodes.len());
        for node in &nodes {
            assembled.push(self.assemble(node)?);
        }
        Ok(assembled)
    }

    /// Assembles an already loaded live node row.
    pub fn assemble(&mut self, node: &Node) -> RepoResult<AssembledNode> {
        let mut field_values: BTreeMap<NodeId, Vec<_>> = BTreeMap::new();
        let mut name_owners: BTreeMap<String, (NodeId, bool)> = BTreeMap::new();
        let mut supertags: Vec<SupertagRef> = Vec::new();

        for row in self.repo.list_properties(node.id)? {
            let Some(field) = self.field_info(row.field_node_id)? else {
                debug!(
                    "event=assemble_skip module=assembler reason=missing_field property_id={}",
                    row.id
                );
                continue;
            };
            let Some(value) = decode_value(&row.value) else {
                debug!(
                    "event=assemble_skip module=assembler reason=undecodable property_id={}",
                    row.id
                );
                continue;
            };

            if field.is_supertag {
                for supertag_id in value.referenced_node_ids() {
                    match self.supertag_ref(supertag_id)? {
                        Some(supertag) if !supertags.iter().any(|tag| tag.id == supertag.id) => {
                            supertags.push(supertag)
                        }
                        Some(_) => {}
                        None => debug!(
                            "event=assemble_skip module=assembler reason=missing_supertag property_id={}",
                            row.id
                        ),
                    }
                }
            }

            let current_owner = name_owners.get(&field.key).copied();
            match current_owner {
                None => {
                    name_owners.insert(field.key, (row.field_node_id, field.has_system_id));
                }
                // A system field takes the name over from a user field.
                Some((owner, owner_has_system_id))
                    if owner != row.field_node_id && field.has_system_id && !owner_has_system_id =>
                {
                    name_owners.insert(field.key, (row.field_node_id, true));
                }
                Some(_) => {}
            }
            field_values.entry(row.field_node_id).or_default().push(value);
        }

        let field_ids: BTreeMap<String, NodeId> = name_owners
            .into_iter()
            .map(|(key, (field_id, _))| (key, field_id))
            .collect();
        let properties = field_ids
            .iter()
            .filter_map(|(key, field_id)| {
                field_values
                    .get(field_id)
                    .map(|values| (key.clone(), values.clone()))
            })
            .collect();

        Ok(AssembledNode {
            id: node.id,
            content: node.content.clone(),
            system_id: node.system_id.clone(),
            owner_id: node.owner_id,
            created_at: node.created_at,
            updated_at: node.updated_at,
            properties,
            field_ids,
            field_values,
            supertags,
        })
    }

    fn field_info(&mut self, field_node_id: NodeId) -> RepoResult<Option<FieldInfo>> {
        if let Some(cached) = self.fields.get(&field_node_id) {
            return Ok(cached.clone());
        }
        let info = self.repo.get_node(field_node_id, false)?.map(|field| FieldInfo {
            key: field_key(field.system_id.as_deref(), &field.content),
            has_system_id: field.system_id.is_some(),
            is_supertag: field.system_id.as_deref() == Some(FIELD_SUPERTAG),
        });
        self.fields.insert(field_node_id, info.clone());
        Ok(info)
    }

    fn supertag_ref(&mut self, supertag_id: NodeId) -> RepoResult<Option<SupertagRef>> {
        if let Some(cached) = self.supertags.get(&supertag_id) {
            return Ok(cached.clone());
        }
        let supertag = self
            .repo
            .get_node(supertag_id, false)?
            .map(|node| SupertagRef {
                id: node.id,
                system_id: node.system_id,
                content: node.content,
            });
        self.supertags.insert(supertag_id, supertag.clone());
        Ok(supertag)
    }
}

/// Assembles a single node with a fresh, call-scoped assembler.
pub fn assemble_node<R: NodeRepository + ?Sized>(
    repo: &R,
    node_id: NodeId,
) -> RepoResult<Option<AssembledNode>> {
    Assembler::new(repo).assemble_node(node_id)
}
