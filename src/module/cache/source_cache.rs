//! Inline source cache
//!
//! Persists inline source text as files under generated keys so it loads
//! through the same name-based import path as file modules.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::module::backend::ModuleBackend;
use crate::module::loader::ModuleLoader;
use crate::module::traits::{ModuleError, ModuleHandle};
use crate::utils::{env_opt, lock, with_lock};

/// Name of the process-wide cache directory under the system temp dir
pub const DEFAULT_CACHE_DIR_NAME: &str = "modhost-source-cache";

/// Environment variable overriding the default cache directory
pub const CACHE_DIR_ENV: &str = "MODHOST_CACHE_DIR";

/// Cache of inline source files
pub struct SourceCache {
    dir: PathBuf,
    extension: String,
    allow_purge: bool,
    /// Keys whose backing file currently exists
    keys: Mutex<BTreeSet<String>>,
}

impl SourceCache {
    /// Cache writing `<key>.<extension>` files into `dir`
    pub fn new<P: AsRef<Path>>(dir: P, extension: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
            allow_purge: false,
            keys: Mutex::new(BTreeSet::new()),
        }
    }

    /// Cache in the process-wide default directory
    pub fn in_default_dir(extension: &str) -> Self {
        Self::new(Self::default_dir(), extension)
    }

    pub fn from_config(config: &CacheConfig, extension: &str) -> Self {
        let dir = config
            .dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_dir);
        let mut cache = Self::new(dir, extension);
        cache.allow_purge = config.allow_purge;
        cache
    }

    /// Process-wide default cache directory
    ///
    /// `MODHOST_CACHE_DIR` overrides the location under the system temp dir.
    pub fn default_dir() -> PathBuf {
        env_opt(CACHE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME))
    }

    /// Permit [`SourceCache::purge`]
    pub fn allow_purge(mut self, allow: bool) -> Self {
        self.allow_purge = allow;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Backing file location for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, self.extension))
    }

    pub fn contains(&self, key: &str) -> bool {
        with_lock(&self.keys, |keys| keys.contains(key))
    }

    /// Currently cached keys, sorted
    pub fn keys(&self) -> Vec<String> {
        with_lock(&self.keys, |keys| keys.iter().cloned().collect())
    }

    /// Write `source` under a fresh key and return the key without loading it
    pub fn cache(&self, source: &str) -> Result<String, ModuleError> {
        fs::create_dir_all(&self.dir).map_err(|e| ModuleError::io(&self.dir, e))?;

        // Keys double as module names, so they must start with a letter
        let key = format!("m{}", Uuid::new_v4().simple());
        let path = self.path_for(&key);
        fs::write(&path, source).map_err(|e| ModuleError::io(&path, e))?;

        with_lock(&self.keys, |keys| keys.insert(key.clone()));
        debug!("Cached inline source as {:?}", path);
        Ok(key)
    }

    /// Load the file cached under `key` through `loader`
    ///
    /// The file is evaluated directly, whatever the cache's extension, with
    /// the cache directory pushed onto the search path so cached modules
    /// can import each other.
    pub fn load<B: ModuleBackend>(
        &self,
        key: &str,
        loader: &ModuleLoader<B>,
    ) -> Result<ModuleHandle, ModuleError> {
        if !self.contains(key) {
            return Err(ModuleError::NotCached(key.to_string()));
        }
        loader.load_from_file(self.path_for(key))
    }

    /// Cache `source` and load it immediately
    pub fn load_source<B: ModuleBackend>(
        &self,
        source: &str,
        loader: &ModuleLoader<B>,
    ) -> Result<ModuleHandle, ModuleError> {
        let key = self.cache(source)?;
        self.load(&key, loader)
    }

    /// Delete the backing file for `key` and forget it
    pub fn clear(&self, key: &str) -> Result<(), ModuleError> {
        let mut keys = lock(&self.keys);
        if !keys.contains(key) {
            return Err(ModuleError::NotCached(key.to_string()));
        }

        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Cached file {:?} was already removed", path);
            }
            Err(e) => return Err(ModuleError::io(&path, e)),
        }
        keys.remove(key);
        debug!("Cleared cached source {}", key);
        Ok(())
    }

    /// Clear every cached key; keeps going past failures and returns the first
    pub fn clear_all(&self) -> Result<(), ModuleError> {
        let mut first_error = None;
        for key in self.keys() {
            if let Err(e) = self.clear(&key) {
                warn!("Failed to clear cached source {}: {}", key, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Remove the whole cache directory tree
    ///
    /// Anything else stored in the directory is lost too, including files
    /// cached by other `SourceCache` instances sharing it. Refused unless
    /// the cache was built with purging allowed.
    pub fn purge(&self) -> Result<(), ModuleError> {
        if !self.allow_purge {
            return Err(ModuleError::OperationNotPermitted(format!(
                "purging cache directory {:?} requires allow_purge",
                self.dir
            )));
        }

        let mut keys = lock(&self.keys);
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ModuleError::io(&self.dir, e)),
        }
        keys.clear();
        info!("Purged source cache directory {:?}", self.dir);
        Ok(())
    }
}
