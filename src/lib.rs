//! Modhost - module registry and dynamic loading
//!
//! This crate resolves modules from several sources into uniform handles
//! and manages collections of them:
//!
//! - native module types registered under `"<namespace>.<TypeName>"`
//!   identifiers with zero-argument factories
//! - script modules evaluated by an embedded interpreter, from inline
//!   source, files or whole directories (feature `scripting`)
//!
//! ## Design Principles
//!
//! 1. **One engine**: loading, validation and dispatch are generic over a
//!    [`module::ModuleBackend`]
//! 2. **Schemas as a floor**: modules must expose at least the declared
//!    attributes with the declared kinds
//! 3. **Reportable errors**: no load failure terminates the process
//! 4. **Serialized imports**: the global search path is only touched under
//!    its lock

pub mod config;
pub mod module;
pub mod utils;

pub use config::*;

pub use module::{
    ModuleBackend, ModuleError, ModuleHandle, ModuleLoader, ModuleManager, ModuleObject,
    NativeRegistry, Schema, SourceCache, Value, ValueKind,
};
#[cfg(feature = "scripting")]
pub use module::{ScriptBackend, ScriptModule};
