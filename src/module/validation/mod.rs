//! Module validation framework
//!
//! Provides schema-based structural validation of loaded modules.

pub mod schema;

pub use schema::{Schema, SchemaViolation};
