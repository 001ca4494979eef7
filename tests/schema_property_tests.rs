//! Property-based tests for schema validation
//!
//! Uses proptest to check that schemas act as a floor: extra attributes
//! never matter and every required attribute does.

use modhost::{ModuleError, ModuleHandle, ModuleObject, Schema, Value, ValueKind};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Module whose attributes are exactly the given map
struct MapModule(BTreeMap<String, Value>);

impl ModuleObject for MapModule {
    fn name(&self) -> &str {
        "map"
    }

    fn attribute(&self, name: &str) -> Result<Option<Value>, ModuleError> {
        Ok(self.0.get(name).cloned())
    }

    fn call(&self, name: &str, _args: Vec<Value>) -> Result<Value, ModuleError> {
        Err(ModuleError::AttributeNotFound {
            module: "map".into(),
            attribute: name.into(),
        })
    }
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e6f64..1.0e6).prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::String),
        "[a-z]{1,8}".prop_map(Value::Function),
    ]
}

fn attributes_strategy() -> impl Strategy<Value = BTreeMap<String, Value>> {
    prop::collection::btree_map("[a-z]{1,6}", value_strategy(), 1..8)
}

/// Schema requiring every attribute of `attributes` with its exact kind
fn exact_schema(attributes: &BTreeMap<String, Value>) -> Schema {
    Schema::from_kinds(attributes.iter().map(|(k, v)| (k.clone(), v.kind())))
}

proptest! {
    /// Property: a module always satisfies the schema derived from itself
    #[test]
    fn prop_module_satisfies_own_schema(attributes in attributes_strategy()) {
        let schema = exact_schema(&attributes);
        let module = ModuleHandle::new(MapModule(attributes));
        prop_assert!(schema.validate(&module));
    }

    /// Property: attributes the schema does not mention never change the result
    #[test]
    fn prop_unrelated_attribute_is_ignored(
        attributes in attributes_strategy(),
        extra in value_strategy(),
    ) {
        let schema = exact_schema(&attributes);
        let before = schema.validate(&ModuleHandle::new(MapModule(attributes.clone())));

        let mut extended = attributes;
        extended.insert("extra_attribute".to_string(), extra);
        let after = schema.validate(&ModuleHandle::new(MapModule(extended)));

        prop_assert_eq!(before, after);
    }

    /// Property: removing any required attribute turns success into failure
    #[test]
    fn prop_removing_required_attribute_fails(
        attributes in attributes_strategy(),
        index in any::<prop::sample::Index>(),
    ) {
        let schema = exact_schema(&attributes);
        let victim = index.get(&attributes.keys().cloned().collect::<Vec<_>>()).clone();

        let mut reduced = attributes;
        reduced.remove(&victim);
        let module = ModuleHandle::new(MapModule(reduced));

        prop_assert!(!schema.validate(&module));
        let violation = schema.check(&module).unwrap_err();
        prop_assert_eq!(violation.attribute(), victim.as_str());
    }

    /// Property: `any` accepts every value and `number` accepts exactly ints and floats
    #[test]
    fn prop_any_and_number_kinds(value in value_strategy()) {
        let module = ModuleHandle::new(MapModule(
            [("field".to_string(), value.clone())].into_iter().collect(),
        ));

        prop_assert!(Schema::new().expect_value("field", ValueKind::Any).validate(&module));
        let is_number = matches!(value, Value::Int(_) | Value::Float(_));
        prop_assert_eq!(
            Schema::new().expect_value("field", ValueKind::Number).validate(&module),
            is_number
        );
    }
}

#[test]
fn test_empty_schema_accepts_empty_module() {
    let module = ModuleHandle::new(MapModule(BTreeMap::new()));
    assert!(Schema::new().validate(&module));
}
