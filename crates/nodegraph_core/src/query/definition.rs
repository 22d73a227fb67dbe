//! Query Definition wire model.
//!
//! # Responsibility
//! - Define the recursive filter tree and the sort/limit envelope.
//! - Parse and validate definitions at the JSON boundary.
//!
//! # Invariants
//! - Wire shape is `{"filters":[…],"sort":{…},"limit":n}` with a `type`
//!   discriminator and camelCase keys; it round-trips through serde.
//! - Invalid definitions are rejected before evaluation.

use crate::repo::node_repo::RepoError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result cap applied when a definition does not set `limit`.
pub const DEFAULT_QUERY_LIMIT: usize = 500;

pub type QueryResult<T> = Result<T, QueryError>;

/// Error for query parsing and evaluation.
#[derive(Debug)]
pub enum QueryError {
    /// Definition failed to parse or validate.
    InvalidDefinition(String),
    Repo(RepoError),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDefinition(message) => write!(f, "invalid query definition: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDefinition(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for QueryError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Comparison operator of a `property` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
}

impl PropertyOp {
    /// Ops that ignore the filter `value`.
    pub fn is_unary(self) -> bool {
        matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    ChildOf,
    OwnedBy,
    LinksTo,
    LinkedFrom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemporalField {
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TemporalOp {
    /// Within the last `days` days.
    Within,
    Before,
    After,
}

/// Recursive filter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Filter {
    #[serde(rename_all = "camelCase")]
    Supertag {
        supertag_system_id: String,
        #[serde(default = "default_true")]
        include_inherited: bool,
    },
    #[serde(rename_all = "camelCase")]
    Property {
        field_system_id: String,
        op: PropertyOp,
        #[serde(default, skip_serializing_if = "Value::is_null")]
        value: Value,
    },
    #[serde(rename_all = "camelCase")]
    Content {
        query: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    #[serde(rename_all = "camelCase")]
    Relation {
        relation_type: RelationType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_node_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field_system_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Temporal {
        field: TemporalField,
        op: TemporalOp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        days: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    HasField {
        field_system_id: String,
        #[serde(default)]
        negate: bool,
    },
    And {
        filters: Vec<Filter>,
    },
    Or {
        filters: Vec<Filter>,
    },
    /// None of `filters` holds.
    Not {
        filters: Vec<Filter>,
    },
}

impl Filter {
    pub fn supertag(supertag_system_id: impl Into<String>) -> Self {
        Self::Supertag {
            supertag_system_id: supertag_system_id.into(),
            include_inherited: true,
        }
    }

    pub fn property(field_system_id: impl Into<String>, op: PropertyOp, value: impl Into<Value>) -> Self {
        Self::Property {
            field_system_id: field_system_id.into(),
            op,
            value: value.into(),
        }
    }

    pub fn has_field(field_system_id: impl Into<String>) -> Self {
        Self::HasField {
            field_system_id: field_system_id.into(),
            negate: false,
        }
    }

    pub fn within_days(field: TemporalField, days: u32) -> Self {
        Self::Temporal {
            field,
            op: TemporalOp::Within,
            days: Some(days),
            date: None,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Supertag {
                supertag_system_id, ..
            } => require_non_blank("supertagSystemId", supertag_system_id),
            Self::Property {
                field_system_id,
                op,
                value,
            } => {
                require_non_blank("fieldSystemId", field_system_id)?;
                if !op.is_unary() && value.is_null() {
                    return Err(format!("property filter on `{field_system_id}` needs a value"));
                }
                Ok(())
            }
            Self::Content { .. } => Ok(()),
            Self::Relation {
                target_node_id,
                field_system_id,
                ..
            } => {
                if let Some(target) = target_node_id {
                    require_non_blank("targetNodeId", target)?;
                }
                if let Some(field) = field_system_id {
                    require_non_blank("fieldSystemId", field)?;
                }
                Ok(())
            }
            Self::Temporal { op, days, date, .. } => match op {
                TemporalOp::Within if days.is_none() => {
                    Err("temporal `within` filter needs `days`".to_string())
                }
                TemporalOp::Within => Ok(()),
                TemporalOp::Before | TemporalOp::After => match date.as_deref() {
                    Some(date) if parse_date_ms(date).is_some() => Ok(()),
                    Some(date) => Err(format!("temporal filter date `{date}` is not ISO-8601")),
                    None => Err("temporal `before`/`after` filter needs `date`".to_string()),
                },
            },
            Self::HasField {
                field_system_id, ..
            } => require_non_blank("fieldSystemId", field_system_id),
            Self::And { filters } | Self::Or { filters } | Self::Not { filters } => {
                filters.iter().try_for_each(Filter::validate)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Single-key sort: `content`, `createdAt`, `updatedAt`, or a field id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySort {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Serializable filter/sort/limit definition of a saved query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDefinition {
    /// Implicitly AND-ed. Empty matches every live node.
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<QuerySort>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for QueryDefinition {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl QueryDefinition {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            sort: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }

    pub fn sorted_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(QuerySort {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Parses and validates a JSON definition.
    pub fn from_json(raw: &str) -> QueryResult<Self> {
        let definition: Self = serde_json::from_str(raw)
            .map_err(|err| QueryError::InvalidDefinition(err.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Parses and validates an already decoded JSON value.
    pub fn from_value(value: Value) -> QueryResult<Self> {
        let definition: Self = serde_json::from_value(value)
            .map_err(|err| QueryError::InvalidDefinition(err.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn to_json(&self) -> QueryResult<String> {
        serde_json::to_string(self).map_err(|err| QueryError::InvalidDefinition(err.to_string()))
    }

    pub fn to_value(&self) -> QueryResult<Value> {
        serde_json::to_value(self).map_err(|err| QueryError::InvalidDefinition(err.to_string()))
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.limit == 0 {
            return Err(QueryError::InvalidDefinition(
                "limit must be at least 1".to_string(),
            ));
        }
        if let Some(sort) = &self.sort {
            require_non_blank("sort.field", &sort.field).map_err(QueryError::InvalidDefinition)?;
        }
        self.filters
            .iter()
            .try_for_each(Filter::validate)
            .map_err(QueryError::InvalidDefinition)
    }
}

/// Parses an ISO-8601 date (`2024-05-01`), a naive datetime, or an
/// RFC 3339 timestamp into epoch milliseconds. Naive values are UTC.
pub fn parse_date_ms(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}

fn require_non_blank(name: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("`{name}` cannot be blank"));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_limit() -> usize {
    DEFAULT_QUERY_LIMIT
}
