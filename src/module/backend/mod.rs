//! Module backends
//!
//! A backend turns a name (or source text) into a live module object. The
//! loader is generic over this trait, so native factories and embedded
//! interpreters share one loading, validation and dispatch engine.

#[cfg(feature = "scripting")]
pub mod script;

#[cfg(feature = "scripting")]
pub use script::{ScriptBackend, ScriptModule, SCRIPT_EXTENSION};

use std::path::PathBuf;

use crate::module::traits::{ModuleError, ModuleObject};

/// Capability a module backend provides to the loader
pub trait ModuleBackend: Send + Sync + 'static {
    /// Short backend name used in logs
    fn kind(&self) -> &'static str;

    /// Resolve `name` to a fresh module instance
    ///
    /// `search_path` is the current global search path, front entry first.
    /// Backends that do not resolve through directories ignore it.
    fn import(
        &self,
        name: &str,
        search_path: &[PathBuf],
    ) -> Result<Box<dyn ModuleObject>, ModuleError>;

    /// Evaluate source text in a fresh context and expose the result as
    /// a module called `name`; imports inside the source resolve against
    /// `search_path`
    fn evaluate(
        &self,
        name: &str,
        _source: &str,
        _search_path: &[PathBuf],
    ) -> Result<Box<dyn ModuleObject>, ModuleError> {
        Err(ModuleError::Unsupported(format!(
            "{} backend cannot evaluate source for {}",
            self.kind(),
            name
        )))
    }

    /// File extension of loadable source files, without the dot
    fn source_extension(&self) -> Option<&str> {
        None
    }
}
