//! Shared fixtures for integration tests
#![allow(dead_code)]

use modhost::{ModuleError, ModuleObject, NativeRegistry, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Native module exposing a greeting string and a `greet` function
#[derive(Debug)]
pub struct Greeter {
    greeting: String,
}

impl Default for Greeter {
    fn default() -> Self {
        Self {
            greeting: "hello".to_string(),
        }
    }
}

impl ModuleObject for Greeter {
    fn name(&self) -> &str {
        "greeter"
    }

    fn attribute(&self, name: &str) -> Result<Option<Value>, ModuleError> {
        Ok(match name {
            "greeting" => Some(Value::from(self.greeting.as_str())),
            "greet" => Some(Value::Function("greet".into())),
            _ => None,
        })
    }

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ModuleError> {
        match name {
            "greet" => {
                let who = args.first().and_then(Value::as_str).unwrap_or("world");
                Ok(Value::from(format!("{}, {}", self.greeting, who)))
            }
            _ => Err(ModuleError::AttributeNotFound {
                module: self.name().to_string(),
                attribute: name.to_string(),
            }),
        }
    }

    fn attribute_names(&self) -> Vec<String> {
        vec!["greet".to_string(), "greeting".to_string()]
    }
}

/// Native module with interior state, for identity checks
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }
}

impl ModuleObject for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn attribute(&self, name: &str) -> Result<Option<Value>, ModuleError> {
        Ok(match name {
            "count" => Some(Value::Int(self.count())),
            "increment" => Some(Value::Function("increment".into())),
            _ => None,
        })
    }

    fn call(&self, name: &str, _args: Vec<Value>) -> Result<Value, ModuleError> {
        match name {
            "increment" => Ok(Value::Int(self.count.fetch_add(1, Ordering::SeqCst) + 1)),
            _ => Err(ModuleError::AttributeNotFound {
                module: self.name().to_string(),
                attribute: name.to_string(),
            }),
        }
    }
}

/// Registry with `tests.Greeter` and `tests.Counter`
pub fn native_registry() -> Arc<NativeRegistry> {
    let registry = NativeRegistry::new();
    registry
        .register_type::<Greeter>("tests.Greeter")
        .expect("register Greeter");
    registry
        .register_type::<Counter>("tests.Counter")
        .expect("register Counter");
    Arc::new(registry)
}

/// Write `<dir>/<file_name>` and return its path
pub fn write_file(dir: &Path, file_name: &str, contents: &str) -> PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, contents).expect("write fixture file");
    path
}

/// Write `<dir>/<name>.rhai` and return its path
pub fn write_script(dir: &Path, name: &str, source: &str) -> PathBuf {
    write_file(dir, &format!("{}.rhai", name), source)
}
