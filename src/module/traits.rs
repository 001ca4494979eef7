//! Module system traits and interfaces
//!
//! Defines the capability every loaded module exposes, the dynamic values
//! exchanged with modules, and the error type shared by the whole subsystem.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Dynamic value read from or passed to a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// Declared but never assigned
    Undefined,
    /// Explicit absence of a value
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    /// String-keyed map, ordered by key
    Object(BTreeMap<String, Value>),
    /// Callable member, identified by name
    Function(String),
    /// Nested type exposed by the module, identified by name
    Class(String),
}

impl Value {
    /// Runtime kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Tuple(_) => ValueKind::Tuple,
            Value::Object(_) => ValueKind::Object,
            Value::Function(_) => ValueKind::Function,
            Value::Class(_) => ValueKind::Class,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Plain JSON maps onto the value model; integral numbers become `Int`
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, item)| (key, Value::from(item)))
                    .collect(),
            ),
        }
    }
}

impl Value {
    /// Plain JSON rendering (untagged, unlike the serde form)
    ///
    /// Functions and classes render as their names; non-finite floats and
    /// `Undefined` render as null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) | Value::Function(s) | Value::Class(s) => {
                serde_json::Value::String(s.clone())
            }
            Value::Array(items) | Value::Tuple(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), item.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) | Value::Tuple(items) => {
                let (open, close) = if matches!(self, Value::Tuple(_)) {
                    ("(", ")")
                } else {
                    ("[", "]")
                };
                write!(f, "{}", open)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "{}", close)
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Function(name) => write!(f, "<function {}>", name),
            Value::Class(name) => write!(f, "<class {}>", name),
        }
    }
}

/// Kind taxonomy used by schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    /// Either `Int` or `Float`
    Number,
    Int,
    Float,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "list")]
    Array,
    #[serde(alias = "dict")]
    Object,
    Tuple,
    Function,
    Class,
    #[serde(alias = "none")]
    Null,
    Undefined,
    /// Presence only
    Any,
}

impl ValueKind {
    /// Whether `value` satisfies this kind. No coercion between kinds.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::Any => true,
            ValueKind::Number => matches!(value, Value::Int(_) | Value::Float(_)),
            kind => value.kind() == *kind,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Tuple => "tuple",
            ValueKind::Function => "function",
            ValueKind::Class => "class",
            ValueKind::Null => "null",
            ValueKind::Undefined => "undefined",
            ValueKind::Any => "any",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(ValueKind::String),
            "number" => Ok(ValueKind::Number),
            "int" | "integer" => Ok(ValueKind::Int),
            "float" => Ok(ValueKind::Float),
            "bool" | "boolean" => Ok(ValueKind::Bool),
            "array" | "list" => Ok(ValueKind::Array),
            "object" | "dict" => Ok(ValueKind::Object),
            "tuple" => Ok(ValueKind::Tuple),
            "function" => Ok(ValueKind::Function),
            "class" => Ok(ValueKind::Class),
            "null" | "none" => Ok(ValueKind::Null),
            "undefined" => Ok(ValueKind::Undefined),
            "any" => Ok(ValueKind::Any),
            other => Err(format!("unknown value kind: {}", other)),
        }
    }
}

/// Upcast helper so trait objects can be downcast to their concrete type
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Capability every loaded module exposes
///
/// Native modules implement this directly; script backends implement it
/// over interpreter values. The core only ever talks to modules through
/// this trait.
pub trait ModuleObject: AsAny + Send + Sync {
    /// Addressable module name
    fn name(&self) -> &str;

    /// Read an attribute
    ///
    /// Returns `Ok(None)` when the module has no attribute of that name.
    /// Errors are reserved for the backend failing while reading it.
    fn attribute(&self, name: &str) -> Result<Option<Value>, ModuleError>;

    /// Call a function member by name
    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ModuleError>;

    /// Names of the attributes this module exposes, if the backend can list them
    fn attribute_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Reference to a loaded module
///
/// Cloning shares the underlying module. Two handles are the same module
/// only if [`ModuleHandle::ptr_eq`] holds.
#[derive(Clone)]
pub struct ModuleHandle {
    object: Arc<dyn ModuleObject>,
}

impl ModuleHandle {
    pub fn new<M: ModuleObject + 'static>(module: M) -> Self {
        Self {
            object: Arc::new(module),
        }
    }

    pub fn from_boxed(module: Box<dyn ModuleObject>) -> Self {
        Self {
            object: Arc::from(module),
        }
    }

    /// Reference identity
    pub fn ptr_eq(&self, other: &ModuleHandle) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }

    pub fn name(&self) -> &str {
        self.object.name()
    }

    pub fn attribute(&self, name: &str) -> Result<Option<Value>, ModuleError> {
        self.object.attribute(name)
    }

    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ModuleError> {
        self.object.call(name, args)
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.object.attribute_names()
    }

    /// Whether the module exposes `name` as a function
    pub fn has_function(&self, name: &str) -> bool {
        matches!(self.attribute(name), Ok(Some(Value::Function(_))))
    }

    /// Concrete native type behind this handle, if it is a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let object: &dyn ModuleObject = &*self.object;
        object.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("name", &self.name())
            .field("ptr", &Arc::as_ptr(&self.object))
            .finish()
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Module {module} does not satisfy schema: {reason}")]
    SchemaMismatch { module: String, reason: String },

    #[error("Source not cached: {0}")]
    NotCached(String),

    #[error("Backend evaluation failed: {0}")]
    BackendEvaluation(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Module {module} has no attribute {attribute}")]
    AttributeNotFound { module: String, attribute: String },

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Operation not permitted: {0}")]
    OperationNotPermitted(String),
}

impl ModuleError {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModuleError::Io {
            path: path.into(),
            source,
        }
    }
}
