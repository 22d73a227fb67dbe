//! Persisted node and property rows.
//!
//! # Responsibility
//! - Define the canonical `nodes` / `node_properties` records.
//! - Define the creation request used by `create_node`.
//! - Derive `content_plain` from markup content.
//!
//! # Invariants
//! - `id` is stable and never reused for another node.
//! - `deleted_at` is the source of truth for tombstone state.
//! - `system_id`, when present, is non-blank and has no whitespace.
//! - `owner_id` is a weak grouping reference; it never cascades.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier shared by every node.
pub type NodeId = Uuid;

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid html regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\*_`#>~]+").expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Canonical `nodes` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Rich content as written by the caller (markdown or HTML fragments).
    pub content: String,
    /// Markup-free projection of `content`, derived on every write.
    pub content_plain: String,
    pub system_id: Option<String>,
    pub owner_id: Option<NodeId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
    /// Soft delete tombstone. `Some` means the node is invisible to reads.
    pub deleted_at: Option<i64>,
}

impl Node {
    /// Returns whether this node should be considered visible.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Canonical `node_properties` row with its value still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeProperty {
    /// Storage rowid; only used as a tie breaker for ordering.
    pub id: i64,
    pub node_id: NodeId,
    pub field_node_id: NodeId,
    /// Opaque tagged JSON, see [`crate::model::value`].
    pub value: String,
    pub order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Creation request for [`crate::NodeService::create_node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub id: NodeId,
    pub content: String,
    pub system_id: Option<String>,
    pub owner_id: Option<NodeId>,
    /// Supertags to attach in order, each given as a node id or `systemId`.
    pub supertags: Vec<String>,
}

impl NewNode {
    /// Creates a request with a generated stable ID.
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), content)
    }

    /// Creates a request with a caller-provided ID (imports, fixtures).
    pub fn with_id(id: NodeId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            system_id: None,
            owner_id: None,
            supertags: Vec::new(),
        }
    }

    pub fn system_id(mut self, system_id: impl Into<String>) -> Self {
        self.system_id = Some(system_id.into());
        self
    }

    pub fn owner(mut self, owner_id: NodeId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn supertag(mut self, supertag: impl Into<String>) -> Self {
        self.supertags.push(supertag.into());
        self
    }

    /// Validates request-level invariants before persistence.
    pub fn validate(&self) -> Result<(), NodeValidationError> {
        if let Some(system_id) = self.system_id.as_deref() {
            if system_id.trim().is_empty() {
                return Err(NodeValidationError::BlankSystemId);
            }
            if system_id.chars().any(char::is_whitespace) {
                return Err(NodeValidationError::SystemIdHasWhitespace(
                    system_id.to_string(),
                ));
            }
        }
        if self.owner_id == Some(self.id) {
            return Err(NodeValidationError::SelfOwned(self.id));
        }
        Ok(())
    }
}

/// Request-level validation failures for node writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValidationError {
    BlankSystemId,
    SystemIdHasWhitespace(String),
    SelfOwned(NodeId),
}

impl Display for NodeValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankSystemId => write!(f, "system_id cannot be blank"),
            Self::SystemIdHasWhitespace(value) => {
                write!(f, "system_id must not contain whitespace: `{value}`")
            }
            Self::SelfOwned(id) => write!(f, "node cannot own itself: {id}"),
        }
    }
}

impl Error for NodeValidationError {}

/// Declared value shape of a field node (`field:fieldType` property).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    /// ISO-8601 date/datetime string or epoch milliseconds.
    Date,
    /// Single node reference.
    Node,
    /// Ordered list of node references, one row per reference.
    Nodes,
    Json,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Node => "node",
            Self::Nodes => "nodes",
            Self::Json => "json",
        }
    }

    /// Parses a stored `fieldType` value. `string` is accepted as `text`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Some(Self::Text),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "node" => Some(Self::Node),
            "nodes" => Some(Self::Nodes),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Multi-valued fields append a row per write instead of replacing.
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Self::Nodes)
    }
}

/// Derives the markup-free `content_plain` projection.
///
/// Rules: HTML tags dropped, markdown links/images reduced to their label,
/// emphasis/heading symbols removed, whitespace collapsed.
pub fn derive_plain_text(content: &str) -> String {
    let without_tags = HTML_TAG_RE.replace_all(content, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_tags, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, "");
    WHITESPACE_RE
        .replace_all(&without_symbols, " ")
        .trim()
        .to_string()
}
