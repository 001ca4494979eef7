//! Native module registry
//!
//! Explicit registry from identifier to factory, used instead of runtime
//! type lookup by name. Every registered module type provides a
//! zero-argument constructor through its factory.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use crate::module::backend::ModuleBackend;
use crate::module::registry::identifier::ModuleIdentifier;
use crate::module::traits::{ModuleError, ModuleObject};
use crate::utils::{with_read_lock, with_write_lock};

/// Factory producing a fresh module instance
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn ModuleObject> + Send + Sync>;

/// Registry of native module types
#[derive(Default)]
pub struct NativeRegistry {
    factories: RwLock<BTreeMap<ModuleIdentifier, ModuleFactory>>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `identifier`, replacing any previous one
    pub fn register<F>(&self, identifier: &str, factory: F) -> Result<(), ModuleError>
    where
        F: Fn() -> Box<dyn ModuleObject> + Send + Sync + 'static,
    {
        let id: ModuleIdentifier = identifier.parse()?;
        debug!("Registering native module type {}", id);
        let replaced = with_write_lock(&self.factories, |factories| {
            factories.insert(id.clone(), Arc::new(factory)).is_some()
        });
        if replaced {
            info!("Replaced native module type {}", id);
        }
        Ok(())
    }

    /// Register a type constructed through `Default`
    pub fn register_type<T>(&self, identifier: &str) -> Result<(), ModuleError>
    where
        T: ModuleObject + Default + 'static,
    {
        self.register(identifier, || Box::new(T::default()) as Box<dyn ModuleObject>)
    }

    /// Builder form of [`NativeRegistry::register_type`]
    pub fn with_type<T>(self, identifier: &str) -> Result<Self, ModuleError>
    where
        T: ModuleObject + Default + 'static,
    {
        self.register_type::<T>(identifier)?;
        Ok(self)
    }

    pub fn unregister(&self, identifier: &str) -> bool {
        match identifier.parse::<ModuleIdentifier>() {
            Ok(id) => with_write_lock(&self.factories, |factories| factories.remove(&id).is_some()),
            Err(_) => false,
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        match identifier.parse::<ModuleIdentifier>() {
            Ok(id) => with_read_lock(&self.factories, |factories| factories.contains_key(&id)),
            Err(_) => false,
        }
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<String> {
        with_read_lock(&self.factories, |factories| {
            factories.keys().map(|id| id.to_string()).collect()
        })
    }

    /// Instantiate the type registered under `identifier`
    pub fn instantiate(&self, identifier: &str) -> Result<Box<dyn ModuleObject>, ModuleError> {
        let id: ModuleIdentifier = identifier.parse()?;
        // Clone the factory out so it runs without the registry lock held
        let factory = with_read_lock(&self.factories, |factories| factories.get(&id).cloned())
            .ok_or_else(|| ModuleError::ModuleNotFound(id.to_string()))?;
        Ok(factory())
    }
}

impl ModuleBackend for NativeRegistry {
    fn kind(&self) -> &'static str {
        "native"
    }

    fn import(
        &self,
        name: &str,
        _search_path: &[PathBuf],
    ) -> Result<Box<dyn ModuleObject>, ModuleError> {
        self.instantiate(name)
    }
}
