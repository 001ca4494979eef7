//! Module system
//!
//! Loads modules from native factories or embedded scripts, validates them
//! structurally, and keeps them in managers that filter and dispatch over
//! the collection.
//!
//! ## Architecture
//!
//! - **Backends**: resolve names or source text into module objects
//!   (native registry, rhai scripts)
//! - **Loader**: identifier, file, directory and inline loading on top of
//!   any backend, with schema validation
//! - **Search path**: process-wide import path, locked for every import
//! - **Source cache**: inline source persisted under generated keys
//! - **Manager**: ordered collection with filter and bulk execution

pub mod backend;
pub mod cache;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::ModuleBackend;
#[cfg(feature = "scripting")]
pub use backend::{ScriptBackend, ScriptModule};
pub use cache::SourceCache;
pub use loader::{search_path, BatchLoad, ModuleLoader, RejectedModule};
pub use manager::ModuleManager;
pub use registry::{ModuleIdentifier, NativeRegistry};
pub use traits::{ModuleError, ModuleHandle, ModuleObject, Value, ValueKind};
pub use validation::{Schema, SchemaViolation};
