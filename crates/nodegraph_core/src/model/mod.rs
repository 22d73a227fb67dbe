//! Node-graph domain model.
//!
//! # Responsibility
//! - Define the two persisted shapes (`Node`, `NodeProperty`).
//! - Define the read-side projection (`AssembledNode`).
//! - Own the property value codec and the well-known `systemId` handles.
//!
//! # Invariants
//! - Every domain object is a `Node` identified by a stable `NodeId`.
//! - Deletion is represented by `deleted_at` tombstones, not hard delete.

pub mod assembled;
pub mod node;
pub mod system_ids;
pub mod value;
