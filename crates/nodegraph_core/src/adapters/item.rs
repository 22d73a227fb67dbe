//! `Item` projection for app-gallery and inbox features.

use crate::model::assembled::AssembledNode;
use crate::model::node::NodeId;
use crate::model::system_ids::{
    FIELD_DESCRIPTION, FIELD_STATUS, FIELD_URL, SUPERTAG_EVENT, SUPERTAG_ITEM, SUPERTAG_REPO,
    SUPERTAG_TASK, SUPERTAG_TOOL,
};
use crate::repo::node_repo::{NodeRepository, RepoResult};
use crate::service::inheritance::get_nodes_by_supertag_with_inheritance;
use serde::Serialize;

/// Built-in item supertags recognised without consulting the store.
const ITEM_SUPERTAGS: &[&str] = &[
    SUPERTAG_ITEM,
    SUPERTAG_TOOL,
    SUPERTAG_REPO,
    SUPERTAG_TASK,
    SUPERTAG_EVENT,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: NodeId,
    pub title: String,
    /// Name of the primary (first) supertag, e.g. `tool`.
    pub item_type: String,
    pub supertags: Vec<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Item {
    /// Projects a node tagged `#Item` or one of the built-in subtypes.
    ///
    /// Subtypes declared at runtime are covered by [`list_items`], which
    /// resolves inheritance against the store.
    pub fn from_assembled(node: &AssembledNode) -> Option<Self> {
        let is_item = ITEM_SUPERTAGS
            .iter()
            .any(|supertag| node.has_supertag(supertag));
        is_item.then(|| Self::project(node))
    }

    fn project(node: &AssembledNode) -> Self {
        Self {
            id: node.id,
            title: node.content.clone(),
            item_type: node
                .primary_supertag()
                .map(|supertag| supertag.name().to_string())
                .unwrap_or_default(),
            supertags: node
                .supertags
                .iter()
                .map(|supertag| supertag.name().to_string())
                .collect(),
            status: text_of(node, FIELD_STATUS),
            description: text_of(node, FIELD_DESCRIPTION),
            url: text_of(node, FIELD_URL),
            created_at: node.created_at,
            updated_at: node.updated_at,
        }
    }
}

/// Every live node of type `#Item`, including runtime-declared subtypes.
pub fn list_items<R: NodeRepository + ?Sized>(repo: &R) -> RepoResult<Vec<Item>> {
    Ok(get_nodes_by_supertag_with_inheritance(repo, SUPERTAG_ITEM, true)?
        .iter()
        .map(Item::project)
        .collect())
}

pub(crate) fn text_of(node: &AssembledNode, field_system_id: &str) -> Option<String> {
    node.values_for_field(field_system_id)
        .first()
        .and_then(|value| value.text_form())
}
