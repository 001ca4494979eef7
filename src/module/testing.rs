//! Test helpers shared by the unit tests of the module system

use std::collections::{BTreeMap, BTreeSet};

use crate::module::traits::{ModuleError, ModuleObject, Value};

/// Native module backed by a fixed attribute map
///
/// Calling a function attribute echoes its arguments back as an array.
#[derive(Debug, Clone, Default)]
pub struct AttributeModule {
    name: String,
    attributes: BTreeMap<String, Value>,
    failing: BTreeSet<String>,
}

impl AttributeModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    /// Reading `name` raises a backend error
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

impl ModuleObject for AttributeModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute(&self, name: &str) -> Result<Option<Value>, ModuleError> {
        if self.failing.contains(name) {
            return Err(ModuleError::BackendEvaluation(format!(
                "reading {} raised",
                name
            )));
        }
        Ok(self.attributes.get(name).cloned())
    }

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ModuleError> {
        match self.attributes.get(name) {
            Some(Value::Function(_)) => Ok(Value::Array(args)),
            _ => Err(ModuleError::AttributeNotFound {
                module: self.name.clone(),
                attribute: name.to_string(),
            }),
        }
    }

    fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }
}
