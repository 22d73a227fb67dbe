//! `Tag` projection.

use crate::adapters::item::text_of;
use crate::model::assembled::AssembledNode;
use crate::model::node::NodeId;
use crate::model::system_ids::{FIELD_COLOR, SUPERTAG_TAG};
use crate::repo::node_repo::{NodeRepository, RepoResult};
use crate::service::inheritance::get_nodes_by_supertag_with_inheritance;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: NodeId,
    pub name: String,
    pub color: Option<String>,
}

impl Tag {
    pub fn from_assembled(node: &AssembledNode) -> Option<Self> {
        node.has_supertag(SUPERTAG_TAG).then(|| Self {
            id: node.id,
            name: node.content.clone(),
            color: text_of(node, FIELD_COLOR),
        })
    }
}

pub fn list_tags<R: NodeRepository + ?Sized>(repo: &R) -> RepoResult<Vec<Tag>> {
    Ok(get_nodes_by_supertag_with_inheritance(repo, SUPERTAG_TAG, false)?
        .iter()
        .filter_map(Tag::from_assembled)
        .collect())
}
