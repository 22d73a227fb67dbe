//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define row-level data access contracts for the node graph.
//! - Isolate SQLite query details from service/query orchestration.
//!
//! # Invariants
//! - Repository writes validate `NewNode` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod node_repo;
