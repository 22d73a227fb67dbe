//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own the read-side joins (assembly, inheritance) and system seeding.
//!
//! # See also
//! - `query` for filter evaluation over assembled nodes.

pub mod assembler;
pub mod bootstrap;
pub mod inheritance;
pub mod node_service;
