//! Module loading system
//!
//! Handles identifier resolution, file and directory loading, and the
//! process-wide search path used by name-based imports.

pub mod loader;
pub mod search_path;

pub use loader::{BatchLoad, ModuleLoader, RejectedModule, INLINE_MODULE_NAME};
pub use search_path::SearchPathGuard;
