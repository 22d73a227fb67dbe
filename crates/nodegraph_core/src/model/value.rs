//! Property value codec.
//!
//! # Responsibility
//! - Encode typed property values into the opaque `node_properties.value`
//!   column as self-describing tagged JSON.
//! - Decode stored text back into typed values, tolerating foreign data.
//!
//! # Invariants
//! - Encoding is type-preserving: numbers stay numbers, booleans stay
//!   booleans, node references stay ids, lists keep their order.
//! - Decoding never fails loudly; unreadable data decodes to `None`.
//!
//! Wire shape:
//! ```json
//! {"type":"string","value":"pending"}
//! {"type":"number","value":2}
//! {"type":"node","value":"6f0c…"}
//! {"type":"nodes","value":["6f0c…","91ab…"]}
//! ```

use crate::model::node::{FieldType, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

const KNOWN_TAGS: &[&str] = &["string", "number", "boolean", "node", "nodes", "json"];

/// Decoded property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Node(NodeId),
    Nodes(Vec<NodeId>),
    Json(Value),
}

/// Encodes a value for the `node_properties.value` column.
///
/// Fails only for non-finite numbers, which JSON cannot carry.
pub fn encode_value(value: &PropertyValue) -> Result<String, String> {
    if let PropertyValue::Number(number) = value {
        if !number.is_finite() {
            return Err(format!("number `{number}` is not finite"));
        }
    }
    serde_json::to_string(value).map_err(|err| err.to_string())
}

/// Decodes a stored value.
///
/// Untagged JSON written by other tools is accepted: scalars map to the
/// matching variant, arrays/objects become `Json`. Anything that is not
/// JSON, JSON `null`, or a known tag with a wrong payload decodes to `None`.
pub fn decode_value(raw: &str) -> Option<PropertyValue> {
    let parsed: Value = serde_json::from_str(raw).ok()?;

    if let Value::Object(map) = &parsed {
        let tag = map.get("type").and_then(Value::as_str);
        if tag.is_some_and(|tag| KNOWN_TAGS.contains(&tag)) && map.contains_key("value") {
            return serde_json::from_value(parsed).ok();
        }
    }

    match parsed {
        Value::Null => None,
        Value::String(text) => Some(PropertyValue::String(text)),
        Value::Bool(flag) => Some(PropertyValue::Boolean(flag)),
        Value::Number(number) => number.as_f64().map(PropertyValue::Number),
        other => Some(PropertyValue::Json(other)),
    }
}

/// Decodes a stored value and keeps it only if it fits `expected`.
pub fn decode_as(raw: &str, expected: FieldType) -> Option<PropertyValue> {
    decode_value(raw).filter(|value| value.conforms_to(expected))
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Single reference. A string holding a UUID is accepted as well.
    pub fn as_node_id(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            Self::String(text) => Uuid::parse_str(text.trim()).ok(),
            _ => None,
        }
    }

    /// Reference list. A single reference is a one-element list.
    pub fn as_node_ids(&self) -> Option<Vec<NodeId>> {
        match self {
            Self::Node(id) => Some(vec![*id]),
            Self::Nodes(ids) => Some(ids.clone()),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Every node id this value references, in order.
    pub fn referenced_node_ids(&self) -> Vec<NodeId> {
        match self {
            Self::Node(id) => vec![*id],
            Self::Nodes(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }

    /// Plain (untagged) JSON view, as handed to feature code.
    pub fn to_plain_json(&self) -> Value {
        match self {
            Self::String(text) => Value::String(text.clone()),
            Self::Number(number) => serde_json::Number::from_f64(*number)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Boolean(flag) => Value::Bool(*flag),
            Self::Node(id) => Value::String(id.to_string()),
            Self::Nodes(ids) => Value::Array(
                ids.iter()
                    .map(|id| Value::String(id.to_string()))
                    .collect(),
            ),
            Self::Json(value) => value.clone(),
        }
    }

    /// String form used by string comparisons. `None` for lists and blobs.
    pub fn text_form(&self) -> Option<String> {
        match self {
            Self::String(text) => Some(text.clone()),
            Self::Number(number) => Some(format_number(*number)),
            Self::Boolean(flag) => Some(flag.to_string()),
            Self::Node(id) => Some(id.to_string()),
            Self::Json(Value::String(text)) => Some(text.clone()),
            Self::Nodes(_) | Self::Json(_) => None,
        }
    }

    /// Empty string, empty list, or empty JSON container.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::String(text) => text.trim().is_empty(),
            Self::Nodes(ids) => ids.is_empty(),
            Self::Json(Value::Null) => true,
            Self::Json(Value::Array(items)) => items.is_empty(),
            Self::Json(Value::Object(map)) => map.is_empty(),
            _ => false,
        }
    }

    /// Whether this value is acceptable for a field declared as `field_type`.
    pub fn conforms_to(&self, field_type: FieldType) -> bool {
        match field_type {
            FieldType::Text => matches!(
                self,
                Self::String(_) | Self::Number(_) | Self::Boolean(_)
            ),
            FieldType::Number => matches!(self, Self::Number(_)),
            FieldType::Boolean => matches!(self, Self::Boolean(_)),
            FieldType::Date => match self {
                Self::Number(_) => true,
                Self::String(text) => crate::query::definition::parse_date_ms(text).is_some(),
                _ => false,
            },
            FieldType::Node => matches!(self, Self::Node(_)),
            FieldType::Nodes => matches!(self, Self::Node(_) | Self::Nodes(_)),
            FieldType::Json => true,
        }
    }
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NodeId> for PropertyValue {
    fn from(value: NodeId) -> Self {
        Self::Node(value)
    }
}

impl From<Vec<NodeId>> for PropertyValue {
    fn from(value: Vec<NodeId>) -> Self {
        Self::Nodes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_as, decode_value, encode_value, PropertyValue};
    use crate::model::node::FieldType;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn encode_is_tagged_and_type_preserving() {
        let id = Uuid::new_v4();
        let encoded = encode_value(&PropertyValue::Node(id)).unwrap();
        assert_eq!(encoded, format!(r#"{{"type":"node","value":"{id}"}}"#));
        assert_eq!(decode_value(&encoded), Some(PropertyValue::Node(id)));

        let list = PropertyValue::Nodes(vec![Uuid::new_v4(), Uuid::new_v4()]);
        assert_eq!(decode_value(&encode_value(&list).unwrap()), Some(list));

        let number = encode_value(&PropertyValue::Number(2.0)).unwrap();
        assert_eq!(decode_value(&number), Some(PropertyValue::Number(2.0)));
    }

    #[test]
    fn encode_rejects_non_finite_numbers() {
        assert!(encode_value(&PropertyValue::Number(f64::NAN)).is_err());
    }

    #[test]
    fn decode_accepts_untagged_foreign_json() {
        assert_eq!(
            decode_value(r#""pending""#),
            Some(PropertyValue::String("pending".to_string()))
        );
        assert_eq!(decode_value("3"), Some(PropertyValue::Number(3.0)));
        assert_eq!(decode_value("true"), Some(PropertyValue::Boolean(true)));
        assert_eq!(
            decode_value(r#"{"a":1}"#),
            Some(PropertyValue::Json(json!({"a": 1})))
        );
    }

    #[test]
    fn decode_swallows_malformed_data() {
        assert_eq!(decode_value("not json"), None);
        assert_eq!(decode_value("null"), None);
        assert_eq!(decode_value(r#"{"type":"node","value":"not-a-uuid"}"#), None);
        assert_eq!(decode_value(""), None);
    }

    #[test]
    fn decode_as_checks_declared_shape() {
        let encoded = encode_value(&PropertyValue::from("x")).unwrap();
        assert!(decode_as(&encoded, FieldType::Text).is_some());
        assert!(decode_as(&encoded, FieldType::Number).is_none());
        assert!(decode_as(r#""2024-05-01""#, FieldType::Date).is_some());
    }

    #[test]
    fn text_form_prints_integers_without_fraction() {
        assert_eq!(PropertyValue::Number(2.0).text_form().as_deref(), Some("2"));
        assert_eq!(PropertyValue::Number(2.5).text_form().as_deref(), Some("2.5"));
    }
}
