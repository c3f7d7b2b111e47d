//! Computed value tests.

use reactive_kv::{Selector, State, StateView, Store, StoreError};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_compute_returns_definition() {
    let store = Store::new(json!({"first": "Ada", "last": "Lovelace"}));

    let definition = store.compute("full_name", |s| {
        Ok(json!(format!("{} {}", s.str("first")?, s.str("last")?)))
    });

    assert_eq!(definition.key, "full_name");
    assert_eq!(store.get_computed_key("full_name"), Some(json!("Ada Lovelace")));
    assert_eq!(
        store.computed_dependencies("full_name"),
        Some(vec!["first".to_string(), "last".to_string()])
    );
}

#[test]
fn test_branch_not_taken_during_trace_is_missed() {
    let store = Store::new(json!({"use_b": false, "a": 1, "b": 100}));
    store.compute("picked", |s| {
        if s.bool("use_b")? {
            Ok(s.require("b")?.clone())
        } else {
            Ok(s.require("a")?.clone())
        }
    });

    store.set(json!({"use_b": true}));
    assert_eq!(store.get_computed_key("picked"), Some(json!(100)));

    // "b" was never read while tracing, so its changes are not followed.
    store.set(json!({"b": 200}));
    assert_eq!(store.get_computed_key("picked"), Some(json!(100)));
}

#[test]
fn test_constant_computed_recomputes_on_every_change() {
    let store = Store::new(json!({"x": 1}));
    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);
    store.compute("constant", move |_| {
        counter.set(counter.get() + 1);
        Ok(json!("fixed"))
    });
    let after_define = runs.get();

    store.set(json!({"x": 2}));
    store.set(json!({"y": 1}));

    assert_eq!(runs.get(), after_define + 2);
}

#[test]
fn test_failure_keeps_previous_value() {
    let store = Store::new(json!({"n": 4}));
    store.compute("half", |s| {
        let n = s.i64("n")?;
        if n % 2 != 0 {
            return Err(StoreError::Compute(format!("{} is odd", n)));
        }
        Ok(json!(n / 2))
    });

    store.set(json!({"n": 7}));
    assert_eq!(store.get_computed_key("half"), Some(json!(2)));
    assert_eq!(store.get_key("n"), Some(json!(7)));

    store.set(json!({"n": 10}));
    assert_eq!(store.get_computed_key("half"), Some(json!(5)));
}

#[test]
fn test_failed_definition_caches_null() {
    let store = Store::new(json!({"n": "text"}));
    store.compute("next", |s| Ok(json!(s.i64("n")? + 1)));

    assert_eq!(store.get_computed_key("next"), Some(Value::Null));

    store.set(json!({"n": 1}));
    assert_eq!(store.get_computed_key("next"), Some(json!(2)));
}

#[test]
fn test_one_failure_does_not_block_others() {
    let store = Store::new(json!({"n": 1}));
    store.compute("broken", |s| {
        s.str("n")?;
        Ok(Value::Null)
    });
    store.compute("ok", |s| Ok(json!(s.i64("n")? * 3)));

    store.set(json!({"n": 2}));
    assert_eq!(store.get_computed_key("ok"), Some(json!(6)));
}

#[test]
fn test_computed_values_cannot_read_each_other() {
    let store = Store::new(json!({"n": 2}));
    store.compute("double", |s| Ok(json!(s.i64("n")? * 2)));
    store.compute("quadruple", |s| Ok(json!(s.i64("double")? * 2)));

    store.set(json!({"n": 3}));

    assert_eq!(store.get_computed_key("double"), Some(json!(6)));
    assert_eq!(store.get_computed_key("quadruple"), Some(Value::Null));
}

#[test]
fn test_remove_computed() {
    let store = Store::new(json!({"n": 1}));
    store.compute("double", |s| Ok(json!(s.i64("n")? * 2)));

    assert!(store.remove_computed("double"));
    assert!(!store.remove_computed("double"));
    assert!(store.get_computed().is_empty());
    assert!(!store.get_all().contains_key("double"));
}

#[test]
fn test_selector_on_computed_input() {
    let store = Store::new(json!({"items": [1, 2, 3], "label": "x"}));
    let count = Selector::new(&store, |s: &State| {
        s.get("items").and_then(Value::as_array).map(Vec::len).unwrap_or(0)
    });

    store.set(json!({"label": "y"}));
    store.array().push("items", [json!(4)]);

    assert_eq!(count.get(), 4);
    assert_eq!(count.update_count(), 1);
}
