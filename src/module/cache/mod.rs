//! Source cache for inline-source modules

pub mod source_cache;

pub use source_cache::{SourceCache, CACHE_DIR_ENV, DEFAULT_CACHE_DIR_NAME};
