//! Source cache integration tests

#![cfg(feature = "scripting")]

use modhost::module::search_path;
use modhost::{
    CacheConfig, ModuleError, ModuleLoader, ModuleManager, ScriptBackend, SourceCache, Value,
};
use serial_test::serial;
use std::sync::Arc;
use tempfile::TempDir;

fn loader() -> ModuleLoader<ScriptBackend> {
    ModuleLoader::new(Arc::new(ScriptBackend::new()))
}

#[test]
#[serial]
fn test_cache_load_clear_round_trip() {
    let dir = TempDir::new().unwrap();
    let cache = SourceCache::new(dir.path(), "rhai");

    let key = cache.cache("let greeting = \"hi\"; fn shout(s) { s + \"!\" }").unwrap();
    let module = cache.load(&key, &loader()).unwrap();
    assert_eq!(module.name(), key);
    assert_eq!(module.attribute("greeting").unwrap(), Some(Value::from("hi")));
    assert_eq!(
        module.call("shout", vec![Value::from("hey")]).unwrap(),
        Value::from("hey!")
    );
    assert!(!search_path::entries().contains(&dir.path().to_path_buf()));

    cache.clear(&key).unwrap();
    assert!(matches!(cache.load(&key, &loader()), Err(ModuleError::NotCached(_))));
    assert!(matches!(cache.clear(&key), Err(ModuleError::NotCached(_))));
}

#[test]
#[serial]
fn test_loaded_module_outlives_its_cache_entry() {
    let dir = TempDir::new().unwrap();
    let cache = SourceCache::new(dir.path(), "rhai");
    let module = cache.load_source("fn id(x) { x }", &loader()).unwrap();

    cache.clear_all().unwrap();
    assert_eq!(module.call("id", vec![Value::Int(5)]).unwrap(), Value::Int(5));
}

#[test]
#[serial]
fn test_cached_modules_import_each_other() {
    let dir = TempDir::new().unwrap();
    let cache = SourceCache::new(dir.path(), "rhai");
    let helper = cache.cache("fn triple(x) { x * 3 }").unwrap();

    let source = format!("import \"{}\" as h; let value = h::triple(5);", helper);
    let module = cache.load_source(&source, &loader()).unwrap();
    assert_eq!(module.attribute("value").unwrap(), Some(Value::Int(15)));
}

#[test]
fn test_unknown_key_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let cache = SourceCache::new(dir.path(), "rhai");
    std::fs::write(dir.path().join("stray.rhai"), "let x = 1;").unwrap();

    assert!(matches!(cache.load("stray", &loader()), Err(ModuleError::NotCached(_))));
}

#[test]
#[serial]
fn test_manager_load_cached_registers_module() {
    let dir = TempDir::new().unwrap();
    let cache = SourceCache::from_config(
        &CacheConfig {
            dir: Some(dir.path().display().to_string()),
            allow_purge: true,
        },
        "rhai",
    );
    let manager = ModuleManager::new(Arc::new(ScriptBackend::new()));

    let module = manager.load_cached("fn ping() { \"pong\" }", &cache).unwrap();
    assert_eq!(manager.len(), 1);
    assert!(manager.modules()[0].ptr_eq(&module));

    cache.purge().unwrap();
    assert!(!dir.path().exists());
    assert!(cache.keys().is_empty());
}

#[test]
#[serial]
fn test_cache_with_other_extension_loads() {
    let dir = TempDir::new().unwrap();
    let cache = SourceCache::new(dir.path(), ".script");

    let key = cache.cache("let origin = \"cached\"; fn id(x) { x }").unwrap();
    assert!(cache.path_for(&key).ends_with(format!("{}.script", key)));

    let module = cache.load(&key, &loader()).unwrap();
    assert_eq!(module.name(), key);
    assert_eq!(module.attribute("origin").unwrap(), Some(Value::from("cached")));
    assert_eq!(module.call("id", vec![Value::Int(9)]).unwrap(), Value::Int(9));
}
