//! `Command` projection. A command belongs to the item that owns it.

use crate::adapters::item::text_of;
use crate::model::assembled::AssembledNode;
use crate::model::node::NodeId;
use crate::model::system_ids::{FIELD_COMMAND, FIELD_DESCRIPTION, SUPERTAG_COMMAND};
use crate::repo::node_repo::{NodeRepository, RepoResult};
use crate::service::inheritance::get_nodes_by_supertag_with_inheritance;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: NodeId,
    pub title: String,
    /// Owning item (`ownerId`).
    pub item_id: Option<NodeId>,
    pub command: Option<String>,
    pub description: Option<String>,
}

impl Command {
    pub fn from_assembled(node: &AssembledNode) -> Option<Self> {
        node.has_supertag(SUPERTAG_COMMAND).then(|| Self {
            id: node.id,
            title: node.content.clone(),
            item_id: node.owner_id,
            command: text_of(node, FIELD_COMMAND),
            description: text_of(node, FIELD_DESCRIPTION),
        })
    }
}

pub fn list_commands<R: NodeRepository + ?Sized>(repo: &R) -> RepoResult<Vec<Command>> {
    Ok(get_nodes_by_supertag_with_inheritance(repo, SUPERTAG_COMMAND, false)?
        .iter()
        .filter_map(Command::from_assembled)
        .collect())
}

/// Commands owned by one item, in creation order.
pub fn list_commands_for_item<R: NodeRepository + ?Sized>(
    repo: &R,
    item_id: NodeId,
) -> RepoResult<Vec<Command>> {
    Ok(list_commands(repo)?
        .into_iter()
        .filter(|command| command.item_id == Some(item_id))
        .collect())
}
