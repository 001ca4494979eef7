//! Module manager for holding and dispatching over loaded modules
//!
//! Owns an ordered collection of module handles, offers filtering and bulk
//! execution over it, and delegates loading to a transient [`ModuleLoader`].

use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::module::backend::ModuleBackend;
use crate::module::cache::SourceCache;
use crate::module::loader::ModuleLoader;
use crate::module::traits::{ModuleError, ModuleHandle, Value};
use crate::module::validation::Schema;
use crate::utils::{with_read_lock, with_write_lock};

/// Module manager coordinates all loaded modules of one backend
///
/// Insertion order is preserved and the same module may be registered more
/// than once. Callbacks passed to [`ModuleManager::for_each`] and friends
/// run over a snapshot, without the collection lock held, so they may
/// register or unregister modules themselves.
pub struct ModuleManager<B: ModuleBackend> {
    backend: Arc<B>,
    schema: Option<Schema>,
    modules: RwLock<Vec<ModuleHandle>>,
}

impl<B: ModuleBackend> ModuleManager<B> {
    /// Create an empty manager for `backend`
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            schema: None,
            modules: RwLock::new(Vec::new()),
        }
    }

    /// Validate every module loaded through this manager against `schema`
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

    /// Loader carrying this manager's backend and schema
    pub fn loader(&self) -> ModuleLoader<B> {
        let loader = ModuleLoader::new(Arc::clone(&self.backend));
        match &self.schema {
            Some(schema) => loader.with_schema(schema.clone()),
            None => loader,
        }
    }

    pub fn register(&self, module: ModuleHandle) {
        debug!("Registering module {}", module.name());
        with_write_lock(&self.modules, |modules| modules.push(module));
    }

    pub fn register_all<I>(&self, modules: I)
    where
        I: IntoIterator<Item = ModuleHandle>,
    {
        with_write_lock(&self.modules, |existing| existing.extend(modules));
    }

    /// Remove every entry that is the same module as `module`; returns how
    /// many entries were removed
    pub fn unregister(&self, module: &ModuleHandle) -> usize {
        let removed = with_write_lock(&self.modules, |modules| {
            let before = modules.len();
            modules.retain(|m| !m.ptr_eq(module));
            before - modules.len()
        });
        if removed > 0 {
            info!("Unregistered module {} ({} entries)", module.name(), removed);
        }
        removed
    }

    /// Remove every module, returning them in order
    pub fn unregister_all(&self) -> Vec<ModuleHandle> {
        with_write_lock(&self.modules, std::mem::take)
    }

    /// Snapshot of all registered modules, in order
    pub fn modules(&self) -> Vec<ModuleHandle> {
        with_read_lock(&self.modules, |modules| modules.clone())
    }

    pub fn len(&self) -> usize {
        with_read_lock(&self.modules, |modules| modules.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Modules satisfying `predicate`, in order
    pub fn filter<P>(&self, predicate: P) -> Vec<ModuleHandle>
    where
        P: Fn(&ModuleHandle) -> bool,
    {
        self.modules().into_iter().filter(|m| predicate(m)).collect()
    }

    /// Run `operation` once per module, in order
    pub fn for_each<F>(&self, mut operation: F)
    where
        F: FnMut(&ModuleHandle),
    {
        for module in self.modules() {
            operation(&module);
        }
    }

    /// Run `operation` on each module satisfying `predicate`, in order
    pub fn for_each_matching<P, F>(&self, predicate: P, mut operation: F)
    where
        P: Fn(&ModuleHandle) -> bool,
        F: FnMut(&ModuleHandle),
    {
        for module in self.modules() {
            if predicate(&module) {
                operation(&module);
            }
        }
    }

    /// Call function `name` on every module that exposes it, in order
    pub fn invoke_all(&self, name: &str, args: &[Value]) -> Vec<(ModuleHandle, Result<Value, ModuleError>)> {
        let mut results = Vec::new();
        self.for_each_matching(
            |m| m.has_function(name),
            |m| results.push((m.clone(), m.call(name, args.to_vec()))),
        );
        debug!("Invoked {} on {} module(s)", name, results.len());
        results
    }

    /// Load `id` and register it
    pub fn load(&self, id: &str) -> Result<ModuleHandle, ModuleError> {
        let module = self.loader().load_by_identifier(id)?;
        self.register(module.clone());
        Ok(module)
    }

    /// Load every identifier and register the modules that pass the schema
    pub fn load_multiple<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<ModuleHandle>, ModuleError> {
        let modules = self.loader().load_multiple(ids)?;
        self.register_all(modules.iter().cloned());
        Ok(modules)
    }

    pub fn load_from_source(&self, code: &str) -> Result<ModuleHandle, ModuleError> {
        let module = self.loader().load_from_source(code)?;
        self.register(module.clone());
        Ok(module)
    }

    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<ModuleHandle, ModuleError> {
        let module = self.loader().load_from_file(path)?;
        self.register(module.clone());
        Ok(module)
    }

    /// Load a directory and register the modules that pass the schema
    pub fn load_from_directory<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<ModuleHandle>, ModuleError> {
        let modules = self.loader().load_from_directory(dir)?;
        self.register_all(modules.iter().cloned());
        Ok(modules)
    }

    /// Cache `code`, load it through the cache and register it
    pub fn load_cached(&self, code: &str, cache: &SourceCache) -> Result<ModuleHandle, ModuleError> {
        let module = cache.load_source(code, &self.loader())?;
        self.register(module.clone());
        Ok(module)
    }
}
