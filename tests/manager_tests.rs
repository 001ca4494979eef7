//! Module manager tests
//!
//! Collection semantics, filtering and bulk execution over loaded modules.

use modhost::{ModuleError, ModuleHandle, ModuleManager, Schema, Value, ValueKind};

mod common;
use common::*;

fn manager() -> ModuleManager<modhost::NativeRegistry> {
    ModuleManager::new(native_registry())
}

#[test]
fn test_for_each_matching_runs_on_subset_in_order() {
    let manager = manager();
    let a = manager.load("tests.Counter").unwrap();
    let b = manager.load("tests.Greeter").unwrap();
    let c = manager.load("tests.Counter").unwrap();

    let mut seen = Vec::new();
    manager.for_each_matching(
        |m| m.has_function("increment"),
        |m| {
            m.call("increment", vec![]).unwrap();
            seen.push(m.clone());
        },
    );

    assert_eq!(seen.len(), 2);
    assert!(seen[0].ptr_eq(&a));
    assert!(seen[1].ptr_eq(&c));
    assert_eq!(a.downcast_ref::<Counter>().unwrap().count(), 1);
    assert_eq!(c.downcast_ref::<Counter>().unwrap().count(), 1);
    assert!(b.downcast_ref::<Counter>().is_none());
}

#[test]
fn test_filter_returns_registered_handles() {
    let manager = manager();
    manager.load_multiple(&["tests.Greeter", "tests.Counter"]).unwrap();

    let greeters = manager.filter(|m| m.is::<Greeter>());
    assert_eq!(greeters.len(), 1);
    assert!(greeters[0].ptr_eq(&manager.modules()[0]));
    assert!(manager.filter(|_| false).is_empty());
}

#[test]
fn test_register_same_handle_twice_and_unregister() {
    let manager = manager();
    let counter = ModuleHandle::new(Counter::default());
    manager.register(counter.clone());
    manager.register(counter.clone());
    assert_eq!(manager.len(), 2);

    let mut calls = 0;
    manager.for_each(|m| {
        m.call("increment", vec![]).unwrap();
        calls += 1;
    });
    assert_eq!(calls, 2);
    assert_eq!(counter.downcast_ref::<Counter>().unwrap().count(), 2);

    assert_eq!(manager.unregister(&counter), 2);
    assert!(manager.is_empty());
}

#[test]
fn test_unregister_all_returns_previous_contents() {
    let manager = manager();
    manager.load("tests.Greeter").unwrap();
    manager.load("tests.Counter").unwrap();

    let removed = manager.unregister_all();
    assert_eq!(removed.len(), 2);
    assert!(manager.is_empty());
    assert!(manager.unregister_all().is_empty());
}

#[test]
fn test_invoke_all_collects_per_module_results() {
    let manager = manager();
    manager.load("tests.Greeter").unwrap();
    manager.load("tests.Counter").unwrap();
    manager.load("tests.Greeter").unwrap();

    let results = manager.invoke_all("greet", &[Value::from("team")]);
    assert_eq!(results.len(), 2);
    for (module, result) in &results {
        assert_eq!(module.name(), "greeter");
        assert_eq!(result.as_ref().unwrap(), &Value::from("hello, team"));
    }
    assert!(manager.invoke_all("launch", &[]).is_empty());
}

#[test]
fn test_failed_load_registers_nothing() {
    let manager = manager().with_schema(Schema::new().expect_value("count", ValueKind::Int));

    assert!(matches!(
        manager.load("tests.Greeter"),
        Err(ModuleError::SchemaMismatch { .. })
    ));
    assert!(matches!(
        manager.load_multiple(&["tests.Counter", "tests.Unknown"]),
        Err(ModuleError::ModuleNotFound(_))
    ));
    assert!(manager.is_empty());

    manager.load("tests.Counter").unwrap();
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_modules_are_shared_across_threads() {
    let manager = std::sync::Arc::new(manager());
    let counter = manager.load("tests.Counter").unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let manager = std::sync::Arc::clone(&manager);
            std::thread::spawn(move || {
                manager.for_each(|m| {
                    m.call("increment", vec![]).unwrap();
                });
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(counter.downcast_ref::<Counter>().unwrap().count(), 4);
}
