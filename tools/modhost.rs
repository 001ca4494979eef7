//! modhost command-line tool
//!
//! Loads script modules from a directory and inspects or drives them.
//!
//! Usage:
//!   modhost inspect [dir] [--expect name=kind]...
//!   modhost call <dir> <function> [json-args]...
//!   modhost purge-cache [--dir <dir>] --yes

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use modhost::module::backend::SCRIPT_EXTENSION;
use modhost::module::search_path;
use modhost::utils::{env_bool, init_logging_from_config, result_to_option};
use modhost::{
    LoggingConfig, ModuleHandle, ModuleHostConfig, ModuleLoader, ModuleManager, Schema,
    ScriptBackend, SourceCache, Value, ValueKind,
};

/// Skips the purge confirmation when set to a truthy value
const ASSUME_YES_ENV: &str = "MODHOST_ASSUME_YES";

#[derive(Parser, Debug)]
#[command(name = "modhost", version, about = "Load and drive script modules")]
struct Cli {
    /// Configuration file (TOML, or JSON with a .json extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overriding the configured one
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the modules in a directory and their attributes
    Inspect {
        /// Module directory (default: configured modules_dir)
        dir: Option<PathBuf>,

        /// Require an attribute of the given kind, e.g. `run=function`
        #[arg(long = "expect", value_name = "NAME=KIND")]
        expect: Vec<String>,
    },

    /// Call a function on every module in a directory that defines it
    Call {
        dir: PathBuf,

        function: String,

        /// Arguments as JSON values
        args: Vec<String>,
    },

    /// Delete the source cache directory
    PurgeCache {
        /// Cache directory (default: configured or process-wide directory)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ModuleHostConfig::from_file(path)?,
        None => ModuleHostConfig::default(),
    };

    let logging = match &cli.log {
        Some(filter) => Some(LoggingConfig {
            filter: Some(filter.clone()),
            json_format: config.logging.as_ref().map(|l| l.json_format).unwrap_or(false),
        }),
        None => config.logging.clone(),
    };
    init_logging_from_config(logging.as_ref());

    let from_env = search_path::extend_from_env();
    let from_config = config.apply_search_paths();
    debug!(
        "Module search path has {} entries ({} from environment, {} from config)",
        search_path::entries().len(),
        from_env,
        from_config
    );

    match cli.command {
        Command::Inspect { dir, expect } => {
            let dir = module_dir(dir, &config)?;
            inspect(&dir, &config, &expect)
        }
        Command::Call {
            dir,
            function,
            args,
        } => call(&dir, &config, &function, &args),
        Command::PurgeCache { dir, yes } => purge_cache(dir, &config, yes),
    }
}

fn module_dir(dir: Option<PathBuf>, config: &ModuleHostConfig) -> anyhow::Result<PathBuf> {
    match dir.or_else(|| config.modules_dir.as_ref().map(PathBuf::from)) {
        Some(dir) => Ok(dir),
        None => bail!("No module directory given and no modules_dir configured"),
    }
}

/// Parse `name=kind` expectations on top of the configured schema
fn build_schema(config: &ModuleHostConfig, expect: &[String]) -> anyhow::Result<Schema> {
    let mut schema = config.schema_or_default();
    for entry in expect {
        let (name, kind) = entry
            .split_once('=')
            .with_context(|| format!("Expected NAME=KIND, got {:?}", entry))?;
        let kind = kind.trim().parse::<ValueKind>().map_err(anyhow::Error::msg)?;
        schema = schema.expect_value(name.trim(), kind);
    }
    Ok(schema)
}

fn describe(module: &ModuleHandle) -> serde_json::Value {
    let mut attributes = serde_json::Map::new();
    for name in module.attribute_names() {
        let kind = result_to_option(
            module.attribute(&name),
            &format!("Failed to read {}.{}", module.name(), name),
        )
        .flatten()
        .map(|value| value.kind().to_string())
        .unwrap_or_else(|| "unreadable".to_string());
        attributes.insert(name, serde_json::Value::String(kind));
    }
    serde_json::json!({
        "name": module.name(),
        "attributes": attributes,
    })
}

fn inspect(dir: &Path, config: &ModuleHostConfig, expect: &[String]) -> anyhow::Result<()> {
    let schema = build_schema(config, expect)?;
    let loader = ModuleLoader::new(Arc::new(ScriptBackend::new())).with_schema(schema);
    let batch = loader.load_from_directory_report(dir)?;

    let report = serde_json::json!({
        "directory": dir.display().to_string(),
        "modules": batch.modules.iter().map(describe).collect::<Vec<_>>(),
        "rejected": batch
            .rejected
            .iter()
            .map(|r| serde_json::json!({
                "source": r.source,
                "reason": r.violation.to_string(),
            }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn call(
    dir: &Path,
    config: &ModuleHostConfig,
    function: &str,
    args: &[String],
) -> anyhow::Result<()> {
    let args = args
        .iter()
        .map(|arg| {
            serde_json::from_str::<serde_json::Value>(arg)
                .map(Value::from)
                .with_context(|| format!("Argument {:?} is not valid JSON", arg))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut manager = ModuleManager::new(Arc::new(ScriptBackend::new()));
    if let Some(schema) = &config.schema {
        manager = manager.with_schema(schema.clone());
    }
    manager.load_from_directory(dir)?;
    info!("Loaded {} module(s) from {:?}", manager.len(), dir);

    let results = manager.invoke_all(function, &args);
    if results.is_empty() {
        warn!("No module in {:?} defines {}", dir, function);
    }

    let mut failures = 0;
    let mut report = Vec::with_capacity(results.len());
    for (module, result) in results {
        report.push(match result {
            Ok(value) => serde_json::json!({
                "module": module.name(),
                "result": value.to_json(),
            }),
            Err(e) => {
                failures += 1;
                serde_json::json!({
                    "module": module.name(),
                    "error": e.to_string(),
                })
            }
        });
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    if failures > 0 {
        bail!("{} module(s) failed to run {}", failures, function);
    }
    Ok(())
}

fn purge_cache(dir: Option<PathBuf>, config: &ModuleHostConfig, yes: bool) -> anyhow::Result<()> {
    if !yes && !env_bool(ASSUME_YES_ENV) {
        bail!(
            "Refusing to delete the cache directory without --yes (or {}=1)",
            ASSUME_YES_ENV
        );
    }

    let cache = match dir {
        Some(dir) => SourceCache::new(dir, SCRIPT_EXTENSION),
        None => SourceCache::from_config(&config.cache, SCRIPT_EXTENSION),
    }
    .allow_purge(true);

    cache.purge()?;
    println!("Purged {}", cache.dir().display());
    Ok(())
}
