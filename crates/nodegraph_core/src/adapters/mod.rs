//! Feature-facing projections of assembled nodes.
//!
//! # Responsibility
//! - Map [`crate::AssembledNode`] into the flat shapes older feature code
//!   consumes (`Item`, `Tag`, `Command`).
//!
//! # Invariants
//! - Adapters are read-only; writes go through `NodeService`.
//! - `from_assembled` returns `None` for nodes of another type.

pub mod command;
pub mod item;
pub mod tag;
