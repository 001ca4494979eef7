//! Native module identifiers
//!
//! Identifiers are two-part strings `"<namespace>.<TypeName>"`.

use std::fmt;
use std::str::FromStr;

use crate::module::traits::ModuleError;

/// Parsed `"<namespace>.<TypeName>"` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleIdentifier {
    namespace: String,
    type_name: String,
}

impl ModuleIdentifier {
    pub fn new(namespace: &str, type_name: &str) -> Result<Self, ModuleError> {
        if !is_valid_part(namespace) || !is_valid_part(type_name) {
            return Err(ModuleError::ModuleNotFound(format!(
                "invalid module identifier: {}.{} (expected <namespace>.<TypeName>)",
                namespace, type_name
            )));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            type_name: type_name.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl FromStr for ModuleIdentifier {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((namespace, type_name)) => Self::new(namespace, type_name),
            None => Err(ModuleError::ModuleNotFound(format!(
                "invalid module identifier: {} (expected <namespace>.<TypeName>)",
                s
            ))),
        }
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.type_name)
    }
}

/// Alphanumeric or underscore, not starting with a digit
#[inline]
fn is_valid_part(part: &str) -> bool {
    if part.is_empty() || part.len() > 128 {
        return false;
    }

    if !part
        .chars()
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_')
    {
        return false;
    }

    part.chars().all(|c| c.is_alphanumeric() || c == '_')
}
