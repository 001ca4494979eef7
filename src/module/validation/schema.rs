//! Structural schema validation
//!
//! A schema is a minimal floor of named attributes and their expected kinds.
//! Attributes it does not mention impose no constraint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::module::traits::{ModuleError, ModuleHandle, ValueKind};

/// Why a module failed a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// Required attribute absent
    Missing { attribute: String, expected: ValueKind },
    /// Attribute present with the wrong kind
    WrongKind {
        attribute: String,
        expected: ValueKind,
        found: ValueKind,
    },
    /// Backend raised while the attribute was being read
    Unreadable { attribute: String, error: String },
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::Missing { attribute, expected } => {
                write!(f, "missing {} attribute '{}'", expected, attribute)
            }
            SchemaViolation::WrongKind {
                attribute,
                expected,
                found,
            } => write!(
                f,
                "attribute '{}' is {} but {} was expected",
                attribute, found, expected
            ),
            SchemaViolation::Unreadable { attribute, error } => {
                write!(f, "attribute '{}' could not be read: {}", attribute, error)
            }
        }
    }
}

impl SchemaViolation {
    pub fn attribute(&self) -> &str {
        match self {
            SchemaViolation::Missing { attribute, .. }
            | SchemaViolation::WrongKind { attribute, .. }
            | SchemaViolation::Unreadable { attribute, .. } => attribute,
        }
    }

    /// Convert into the error reported by single-module loads
    pub fn into_error(self, module: &str) -> ModuleError {
        ModuleError::SchemaMismatch {
            module: module.to_string(),
            reason: self.to_string(),
        }
    }
}

/// Set of attribute requirements
///
/// Builder methods take `self` and return a new schema, so a built schema
/// is an immutable value that can be shared across validations freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    requirements: BTreeMap<String, ValueKind>,
}

impl Schema {
    /// Empty schema; every module satisfies it
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a name-to-kind map (e.g. from configuration)
    pub fn from_kinds<I, K>(kinds: I) -> Self
    where
        I: IntoIterator<Item = (K, ValueKind)>,
        K: Into<String>,
    {
        Self {
            requirements: kinds.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Require `name` with the given kind. A later expectation on the same
    /// name replaces the earlier one.
    #[must_use]
    pub fn expect_value(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.requirements.insert(name.into(), kind);
        self
    }

    /// Require `name` to be a function
    #[must_use]
    pub fn expect_function(self, name: impl Into<String>) -> Self {
        self.expect_value(name, ValueKind::Function)
    }

    pub fn requirements(&self) -> impl Iterator<Item = (&str, ValueKind)> {
        self.requirements.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Whether `module` satisfies every requirement
    pub fn validate(&self, module: &ModuleHandle) -> bool {
        self.check(module).is_ok()
    }

    /// Check every requirement, reporting the first violation in name order
    pub fn check(&self, module: &ModuleHandle) -> Result<(), SchemaViolation> {
        for (name, expected) in &self.requirements {
            let value = match module.attribute(name) {
                Ok(Some(value)) => value,
                Ok(None) => {
                    return Err(SchemaViolation::Missing {
                        attribute: name.clone(),
                        expected: *expected,
                    })
                }
                Err(e) => {
                    return Err(SchemaViolation::Unreadable {
                        attribute: name.clone(),
                        error: e.to_string(),
                    })
                }
            };

            if !expected.matches(&value) {
                return Err(SchemaViolation::WrongKind {
                    attribute: name.clone(),
                    expected: *expected,
                    found: value.kind(),
                });
            }
        }

        debug!("Module {} satisfies schema", module.name());
        Ok(())
    }
}
