//! Undo/redo history tests.

use reactive_kv::{HistoryEntry, HistoryManager, State, Store, StoreConfig};
use serde_json::json;

fn store_with_history(limit: usize) -> Store {
    let store = Store::new(json!({"count": 0}));
    store.enable_history(Some(limit));
    store
}

#[test]
fn test_history_disabled_by_default() {
    let store = Store::new(json!({"count": 0}));
    store.set(json!({"count": 1}));

    assert!(!store.is_history_enabled());
    assert!(!store.undo());
    assert!(!store.redo());
    assert_eq!(store.history_len(), 0);
    assert_eq!(store.history_cursor(), None);
}

#[test]
fn test_enable_seeds_single_entry() {
    let store = store_with_history(10);

    assert_eq!(store.history_len(), 1);
    assert_eq!(store.history_cursor(), Some(0));
    assert!(!store.can_undo());
    assert!(!store.can_redo());
}

#[test]
fn test_enable_twice_keeps_timeline() {
    let store = store_with_history(10);
    store.set(json!({"count": 1}));

    store.enable_history(Some(2));
    store.set(json!({"count": 2}));
    store.set(json!({"count": 3}));

    assert_eq!(store.history_len(), 4);
}

#[test]
fn test_capacity_evicts_oldest() {
    let store = store_with_history(3);

    for n in 1..=5 {
        store.set(json!({ "count": n }));
    }

    assert_eq!(store.history_len(), 3);
    assert_eq!(store.history_cursor(), Some(2));

    assert!(store.undo());
    assert!(store.undo());
    assert!(!store.undo());
    assert_eq!(store.get_key("count"), Some(json!(3)));
}

#[test]
fn test_zero_limit_keeps_one_entry() {
    let store = store_with_history(0);
    store.set(json!({"count": 1}));

    assert_eq!(store.history_len(), 1);
    assert!(!store.undo());
    assert_eq!(store.get_key("count"), Some(json!(1)));
}

#[test]
fn test_configured_default_limit() {
    let store = Store::with_config(
        json!({"count": 0}),
        StoreConfig {
            history_limit: 2,
            ..Default::default()
        },
    );
    store.enable_history(None);

    store.set(json!({"count": 1}));
    store.set(json!({"count": 2}));

    assert_eq!(store.history_len(), 2);
}

#[test]
fn test_undo_removes_added_keys() {
    let store = store_with_history(10);

    store.set(json!({"added": true, "count": 1}));
    assert!(store.undo());

    assert_eq!(store.get_key("added"), None);
    assert_eq!(store.get_key("count"), Some(json!(0)));

    assert!(store.redo());
    assert_eq!(store.get_key("added"), Some(json!(true)));
}

#[test]
fn test_redo_reapplies_multi_key_change() {
    let store = Store::new(json!({"a": 1, "b": 1, "c": 1}));
    store.enable_history(None);

    store.set(json!({"a": 2, "b": 2}));
    store.set(json!({"c": 3}));
    assert!(store.undo());
    assert!(store.undo());
    assert!(store.redo());

    assert_eq!(store.get(), json!({"a": 2, "b": 2, "c": 1}).as_object().cloned().unwrap());
    assert!(store.can_redo());
}

#[test]
fn test_replace_does_not_touch_history() {
    let store = store_with_history(10);
    store.set(json!({"count": 1}));

    store.replace("count", json!(50));
    assert_eq!(store.history_len(), 2);

    assert!(store.undo());
    assert_eq!(store.get_key("count"), Some(json!(0)));
}

#[test]
fn test_manager_entries_record_before_and_after() {
    let mut state = State::new();
    state.insert("x".into(), json!(1));
    let mut history = HistoryManager::new(5, &state);

    let mut delta = reactive_kv::Delta::new();
    delta.insert("x", Some(json!(1)));
    state.insert("x".into(), json!(2));
    history.record(&delta, &state);

    let entry = history.entries().last().cloned().unwrap();
    match entry {
        HistoryEntry::Changes(changes) => {
            assert_eq!(changes["x"].before, Some(json!(1)));
            assert_eq!(changes["x"].after, Some(json!(2)));
        }
        other => panic!("expected changes, got {:?}", other),
    }
}
