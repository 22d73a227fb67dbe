//! Read-side node projection.
//!
//! `AssembledNode` is built fresh from the store on every read and never
//! persisted. Properties are keyed by field name (the field's `systemId`
//! without `field:`, falling back to the field node's content).
//!
//! Two field nodes may share a name. The name then belongs to the field
//! that has a `systemId` (else the first one seen); every field's values
//! stay reachable by field node id through `field_values`.

use crate::model::node::NodeId;
use crate::model::system_ids::{strip_namespace, FIELD_PREFIX, SUPERTAG_PREFIX};
use crate::model::value::PropertyValue;
use serde::Serialize;
use std::collections::BTreeMap;

/// Supertag reference resolved from `field:supertag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupertagRef {
    pub id: NodeId,
    pub system_id: Option<String>,
    pub content: String,
}

impl SupertagRef {
    /// Short type name, e.g. `tool` for `supertag:tool`.
    pub fn name(&self) -> &str {
        self.system_id
            .as_deref()
            .and_then(|system_id| strip_namespace(system_id, SUPERTAG_PREFIX))
            .unwrap_or(self.content.as_str())
    }
}

/// Consumer-facing projection of one live node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledNode {
    pub id: NodeId,
    pub content: String,
    pub system_id: Option<String>,
    pub owner_id: Option<NodeId>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Decoded values per field name, in property order.
    pub properties: BTreeMap<String, Vec<PropertyValue>>,
    /// Field node id owning each name in `properties`.
    #[serde(skip)]
    pub field_ids: BTreeMap<String, NodeId>,
    /// Decoded values per field node id, including fields whose name is
    /// shadowed in `properties`.
    #[serde(skip)]
    pub field_values: BTreeMap<NodeId, Vec<PropertyValue>>,
    /// Supertags in assignment order; the first one is the primary type.
    pub supertags: Vec<SupertagRef>,
}

impl AssembledNode {
    /// All values stored under `name`; empty when absent.
    pub fn values(&self, name: &str) -> &[PropertyValue] {
        self.properties
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All values stored for the field node `field_id`.
    pub fn values_by_field_id(&self, field_id: NodeId) -> &[PropertyValue] {
        self.field_values
            .get(&field_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first_value(&self, name: &str) -> Option<&PropertyValue> {
        self.values(name).first()
    }

    /// First value as text, for string fields such as `status`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.first_value(name).and_then(PropertyValue::as_str)
    }

    /// Values stored for a field given by its `systemId`.
    pub fn values_for_field(&self, field_system_id: &str) -> &[PropertyValue] {
        self.values(field_key(Some(field_system_id), field_system_id).as_str())
    }

    pub fn has_supertag(&self, supertag_system_id: &str) -> bool {
        self.supertags
            .iter()
            .any(|tag| tag.system_id.as_deref() == Some(supertag_system_id))
    }

    pub fn has_supertag_id(&self, supertag_id: NodeId) -> bool {
        self.supertags.iter().any(|tag| tag.id == supertag_id)
    }

    pub fn primary_supertag(&self) -> Option<&SupertagRef> {
        self.supertags.first()
    }

    /// Field name owning `field_id`, if this node has values for it.
    pub fn field_name_for_id(&self, field_id: NodeId) -> Option<&str> {
        self.field_ids
            .iter()
            .find(|(_, id)| **id == field_id)
            .map(|(name, _)| name.as_str())
    }
}

/// Computes the property-map key of a field node.
pub fn field_key(system_id: Option<&str>, content: &str) -> String {
    match system_id {
        Some(system_id) => strip_namespace(system_id, FIELD_PREFIX)
            .unwrap_or(system_id)
            .to_string(),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::field_key;

    #[test]
    fn field_key_strips_namespace_or_falls_back() {
        assert_eq!(field_key(Some("field:status"), "Status"), "status");
        assert_eq!(field_key(Some("custom_handle"), "Custom"), "custom_handle");
        assert_eq!(field_key(None, "Mood"), "Mood");
    }
}
