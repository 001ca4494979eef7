//! Module loader implementation
//!
//! Resolves identifiers, source text, files and directories into module
//! handles, applying schema validation when a schema is configured.
//!
//! Batch operations (`load_multiple`, `load_from_directory`) abort with the
//! first resolution, I/O or evaluation error. Modules that load but fail
//! the schema are dropped from the batch result and logged.

use std::any::Any;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::module::backend::ModuleBackend;
use crate::module::loader::search_path;
use crate::module::traits::{ModuleError, ModuleHandle};
use crate::module::validation::{Schema, SchemaViolation};

/// Name given to modules evaluated from inline source
pub const INLINE_MODULE_NAME: &str = "inline";

/// Outcome of a batch load that drops schema mismatches
#[derive(Debug, Default)]
pub struct BatchLoad {
    /// Modules that loaded and passed the schema, in load order
    pub modules: Vec<ModuleHandle>,
    /// Modules that loaded but failed the schema
    pub rejected: Vec<RejectedModule>,
}

/// A module dropped from a batch load
#[derive(Debug, Clone)]
pub struct RejectedModule {
    /// Identifier or path the module was loaded from
    pub source: String,
    pub violation: SchemaViolation,
}

/// Module loader for one backend
pub struct ModuleLoader<B: ModuleBackend> {
    backend: Arc<B>,
    schema: Option<Schema>,
}

impl<B: ModuleBackend> Clone for ModuleLoader<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            schema: self.schema.clone(),
        }
    }
}

impl<B: ModuleBackend> ModuleLoader<B> {
    /// Create a loader without schema validation
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            schema: None,
        }
    }

    /// Validate every loaded module against `schema`
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Resolve `id` through the backend against the current search path
    pub fn load_by_identifier(&self, id: &str) -> Result<ModuleHandle, ModuleError> {
        let handle = self.import_unchecked(id)?;
        self.accept(handle)
    }

    /// Resolve `id` and verify the module is a native `T`
    pub fn load_typed<T: Any>(&self, id: &str) -> Result<ModuleHandle, ModuleError> {
        let handle = self.load_by_identifier(id)?;
        if !handle.is::<T>() {
            return Err(ModuleError::ModuleNotFound(format!(
                "{} does not resolve to a {}",
                id,
                std::any::type_name::<T>()
            )));
        }
        Ok(handle)
    }

    /// Resolve every identifier, in order
    ///
    /// The first identifier that fails to resolve aborts the whole batch.
    /// Modules failing the schema are left out of the result.
    pub fn load_multiple<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<ModuleHandle>, ModuleError> {
        let mut batch = BatchLoad::default();
        for id in ids {
            let id = id.as_ref();
            let handle = self.import_unchecked(id)?;
            self.collect(&mut batch, id.to_string(), handle);
        }
        Ok(batch.modules)
    }

    /// Evaluate inline source text in a fresh context
    pub fn load_from_source(&self, code: &str) -> Result<ModuleHandle, ModuleError> {
        debug!("Evaluating inline source with {} backend", self.backend.kind());
        let object = self.with_search_path(|entries| {
            self.backend.evaluate(INLINE_MODULE_NAME, code, entries)
        })?;
        self.accept(ModuleHandle::from_boxed(object))
    }

    /// Evaluate the file at `path` as a module named after its stem
    ///
    /// The file's directory is pushed to the front of the search path for
    /// the evaluation, so imports relative to the file resolve.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<ModuleHandle, ModuleError> {
        let handle = self.load_file_unchecked(path.as_ref())?;
        self.accept(handle)
    }

    /// Load every eligible file in `dir` (non-recursive, file-name order)
    ///
    /// An empty directory yields an empty result.
    pub fn load_from_directory<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> Result<Vec<ModuleHandle>, ModuleError> {
        Ok(self.load_from_directory_report(dir)?.modules)
    }

    /// [`ModuleLoader::load_from_directory`], also reporting schema rejects
    pub fn load_from_directory_report<P: AsRef<Path>>(
        &self,
        dir: P,
    ) -> Result<BatchLoad, ModuleError> {
        let dir = dir.as_ref();
        let files = self.eligible_files(dir)?;
        info!(
            "Loading {} module file(s) from {:?} with {} backend",
            files.len(),
            dir,
            self.backend.kind()
        );

        let mut batch = BatchLoad::default();
        for file in files {
            let handle = self.load_file_unchecked(&file)?;
            self.collect(&mut batch, file.display().to_string(), handle);
        }
        Ok(batch)
    }

    /// Import `name` with `dir` pushed to the front of the search path
    pub fn load_scoped<P: AsRef<Path>>(&self, dir: P, name: &str) -> Result<ModuleHandle, ModuleError> {
        let handle = self.import_scoped(dir.as_ref(), name)?;
        self.accept(handle)
    }

    /// Run `f` against the search path
    ///
    /// Backends that load no source files never read the path, so the
    /// global lock is not taken for them and their factories may load
    /// other modules.
    fn with_search_path<T>(
        &self,
        f: impl FnOnce(&[PathBuf]) -> Result<T, ModuleError>,
    ) -> Result<T, ModuleError> {
        if self.backend.source_extension().is_none() {
            return f(&[]);
        }
        let guard = search_path::acquire();
        f(guard.entries())
    }

    fn import_unchecked(&self, id: &str) -> Result<ModuleHandle, ModuleError> {
        let object = self.with_search_path(|entries| self.backend.import(id, entries))?;
        debug!("Imported {} with {} backend", id, self.backend.kind());
        Ok(ModuleHandle::from_boxed(object))
    }

    fn import_scoped(&self, dir: &Path, name: &str) -> Result<ModuleHandle, ModuleError> {
        let guard = search_path::scoped(dir);
        let object = self.backend.import(name, guard.entries())?;
        drop(guard);
        debug!("Imported {} from {:?}", name, dir);
        Ok(ModuleHandle::from_boxed(object))
    }

    fn load_file_unchecked(&self, path: &Path) -> Result<ModuleHandle, ModuleError> {
        let metadata = fs::metadata(path).map_err(|e| ModuleError::io(path, e))?;
        if !metadata.is_file() {
            return Err(ModuleError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ModuleError::ModuleNotFound(format!("no module name in {:?}", path)))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let source = fs::read_to_string(path).map_err(|e| ModuleError::io(path, e))?;
        let guard = search_path::scoped(&dir);
        let object = self.backend.evaluate(stem, &source, guard.entries())?;
        drop(guard);
        debug!("Evaluated {:?} as module {}", path, stem);
        Ok(ModuleHandle::from_boxed(object))
    }

    fn eligible_files(&self, dir: &Path) -> Result<Vec<PathBuf>, ModuleError> {
        let extension = self.backend.source_extension().ok_or_else(|| {
            ModuleError::Unsupported(format!(
                "{} backend does not load modules from directories",
                self.backend.kind()
            ))
        })?;

        let entries = fs::read_dir(dir).map_err(|e| ModuleError::io(dir, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ModuleError::io(dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                files.push(path);
            } else {
                debug!("Skipping {:?} (not a .{} file)", path, extension);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Single-module path: a schema mismatch is an error
    fn accept(&self, handle: ModuleHandle) -> Result<ModuleHandle, ModuleError> {
        if let Some(schema) = &self.schema {
            schema
                .check(&handle)
                .map_err(|violation| violation.into_error(handle.name()))?;
        }
        info!("Loaded module {}", handle.name());
        Ok(handle)
    }

    /// Batch path: a schema mismatch drops the module
    fn collect(&self, batch: &mut BatchLoad, source: String, handle: ModuleHandle) {
        if let Some(schema) = &self.schema {
            if let Err(violation) = schema.check(&handle) {
                warn!("Dropping module {} from batch: {}", source, violation);
                batch.rejected.push(RejectedModule { source, violation });
                return;
            }
        }
        info!("Loaded module {}", handle.name());
        batch.modules.push(handle);
    }
}
