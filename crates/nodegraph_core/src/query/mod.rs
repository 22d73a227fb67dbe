//! Declarative node queries.
//!
//! # Responsibility
//! - `definition`: the JSON filter/sort/limit contract.
//! - `engine`: evaluation against assembled nodes.
//! - `cache`: saved definitions and their explicitly invalidated results.

pub mod cache;
pub mod definition;
pub mod engine;
