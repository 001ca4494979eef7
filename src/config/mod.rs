//! Configuration management for modhost
//!
//! Handles configuration loading (TOML or JSON), validation, and applying
//! configured search paths.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::module::loader::search_path;
use crate::module::validation::Schema;
use crate::utils::log_error;

/// Source cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory (default: process-wide directory under the temp dir)
    #[serde(default)]
    pub dir: Option<String>,

    /// Allow deleting the whole cache directory
    #[serde(default)]
    pub allow_purge: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "modhost::module=debug"); RUST_LOG wins
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Module host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleHostConfig {
    /// Directories appended to the global module search path
    #[serde(default)]
    pub search_paths: Vec<String>,

    /// Directory loaded by default
    #[serde(default)]
    pub modules_dir: Option<String>,

    /// Source cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Schema every loaded module must satisfy
    #[serde(default)]
    pub schema: Option<Schema>,

    /// Logging settings
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl ModuleHostConfig {
    /// Load configuration, choosing the format by file extension
    /// (`.json` is JSON, anything else TOML)
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: ModuleHostConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: ModuleHostConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.search_paths.iter().any(|p| p.trim().is_empty()) {
            anyhow::bail!("Search path entries cannot be empty");
        }

        if let Some(ref dir) = self.cache.dir {
            if dir.trim().is_empty() {
                anyhow::bail!("Cache directory cannot be empty");
            }
        }

        if let Some(ref schema) = self.schema {
            if schema.requirements().any(|(name, _)| name.trim().is_empty()) {
                anyhow::bail!("Schema attribute names cannot be empty");
            }
        }

        Ok(())
    }

    /// Append the configured search paths to the global search path,
    /// canonicalized where they exist; returns how many were applied
    pub fn apply_search_paths(&self) -> usize {
        for entry in &self.search_paths {
            let path = PathBuf::from(entry);
            let path = log_error(
                || path.canonicalize(),
                &format!("Search path {} is not accessible, using it as given", entry),
            )
            .unwrap_or(path);
            search_path::append(path);
        }
        self.search_paths.len()
    }

    /// Configured schema, or an empty one
    pub fn schema_or_default(&self) -> Schema {
        self.schema.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::traits::ValueKind;

    const SAMPLE: &str = r#"
search_paths = ["scripts", "vendor/scripts"]
modules_dir = "plugins"

[cache]
dir = "/tmp/modhost-cache"
allow_purge = true

[schema]
run = "function"
title = "string"

[logging]
filter = "debug"
"#;

    #[test]
    fn test_parse_toml() {
        let config: ModuleHostConfig = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.search_paths, ["scripts", "vendor/scripts"]);
        assert_eq!(config.modules_dir.as_deref(), Some("plugins"));
        assert!(config.cache.allow_purge);
        assert_eq!(
            config.schema_or_default(),
            Schema::new()
                .expect_function("run")
                .expect_value("title", ValueKind::String)
        );
        let logging = config.logging.unwrap();
        assert_eq!(logging.filter.as_deref(), Some("debug"));
        assert!(!logging.json_format);
    }

    #[test]
    fn test_defaults() {
        let config: ModuleHostConfig = toml::from_str("").unwrap();
        assert!(config.search_paths.is_empty());
        assert!(!config.cache.allow_purge);
        assert!(config.schema_or_default().is_empty());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result: Result<ModuleHostConfig, _> = toml::from_str("[schema]\nrun = \"procedure\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_search_path() {
        let config = ModuleHostConfig {
            search_paths: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modhost.json");
        let config: ModuleHostConfig = toml::from_str(SAMPLE).unwrap();
        config.to_json_file(&path).unwrap();

        let loaded = ModuleHostConfig::from_file(&path).unwrap();
        assert_eq!(loaded.search_paths, config.search_paths);
        assert_eq!(loaded.schema, config.schema);
    }
}
