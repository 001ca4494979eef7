//! Native module registry
//!
//! Handles identifier parsing and the identifier-to-factory mapping used to
//! instantiate native modules.

pub mod identifier;
pub mod native;

pub use identifier::ModuleIdentifier;
pub use native::{ModuleFactory, NativeRegistry};
