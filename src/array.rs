//! Array operations on array-valued keys.
//!
//! Each operation reads the array, mutates a copy and writes it back through
//! `Store::set`, so computed values, history and listeners see one ordinary
//! change. Missing or non-array keys are ignored and yield `None`.

use crate::store::Store;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Items appended by `push` and the index of the first one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushResult {
    pub inserted: Vec<Value>,
    pub index: usize,
}

/// An item removed by `filter`, with its index before filtering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemovedItem {
    pub item: Value,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    /// Items kept, in order.
    pub filtered: Vec<Value>,
    pub removed: Vec<RemovedItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapResult {
    pub original: Vec<Value>,
    pub mapped: Vec<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortResult {
    pub original_order: Vec<Value>,
    pub sorted: Vec<Value>,
}

/// Array operations bound to one store.
pub struct ArrayOps<'a> {
    store: &'a Store,
}

impl<'a> ArrayOps<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Append items to the end of the array.
    pub fn push<I>(&self, key: &str, items: I) -> Option<PushResult>
    where
        I: IntoIterator<Item = Value>,
    {
        let inserted: Vec<Value> = items.into_iter().collect();
        self.store.update_array(key, |array| {
            let index = array.len();
            array.extend(inserted.iter().cloned());
            PushResult { inserted, index }
        })
    }

    /// Keep the items for which `predicate(item, index)` holds.
    pub fn filter<F>(&self, key: &str, mut predicate: F) -> Option<FilterResult>
    where
        F: FnMut(&Value, usize) -> bool,
    {
        self.store.update_array(key, |array| {
            let mut filtered = Vec::with_capacity(array.len());
            let mut removed = Vec::new();
            for (index, item) in array.drain(..).enumerate() {
                if predicate(&item, index) {
                    filtered.push(item);
                } else {
                    removed.push(RemovedItem { item, index });
                }
            }
            array.extend(filtered.iter().cloned());
            FilterResult { filtered, removed }
        })
    }

    /// Replace every item with `mapper(item, index)`.
    pub fn map<F>(&self, key: &str, mut mapper: F) -> Option<MapResult>
    where
        F: FnMut(&Value, usize) -> Value,
    {
        self.store.update_array(key, |array| {
            let mapped: Vec<Value> = array
                .iter()
                .enumerate()
                .map(|(index, item)| mapper(item, index))
                .collect();
            let original = std::mem::replace(array, mapped.clone());
            MapResult { original, mapped }
        })
    }

    /// Stable-sort the array with `compare`.
    pub fn sort<F>(&self, key: &str, compare: F) -> Option<SortResult>
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        self.store.update_array(key, |array| {
            let original_order = array.clone();
            array.sort_by(compare);
            SortResult {
                original_order,
                sorted: array.clone(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_push_reports_inserted_and_index() {
        let store = Store::new(json!({"items": ["a"]}));

        let result = store.array().push("items", [json!("x")]).unwrap();

        assert_eq!(store.get_key("items"), Some(json!(["a", "x"])));
        assert_eq!(
            result,
            PushResult {
                inserted: vec![json!("x")],
                index: 1
            }
        );
    }

    #[test]
    fn test_filter_reports_removed_with_indices() {
        let store = Store::new(json!({"nums": [1, 2, 3, 4]}));

        let result = store
            .array()
            .filter("nums", |item, _| item.as_i64().unwrap_or(0) % 2 == 0)
            .unwrap();

        assert_eq!(store.get_key("nums"), Some(json!([2, 4])));
        assert_eq!(result.filtered, vec![json!(2), json!(4)]);
        assert_eq!(
            result.removed,
            vec![
                RemovedItem { item: json!(1), index: 0 },
                RemovedItem { item: json!(3), index: 2 },
            ]
        );
    }

    #[test]
    fn test_map_reports_before_and_after() {
        let store = Store::new(json!({"nums": [1, 2]}));

        let result = store
            .array()
            .map("nums", |item, index| json!(item.as_i64().unwrap_or(0) * 10 + index as i64))
            .unwrap();

        assert_eq!(result.original, vec![json!(1), json!(2)]);
        assert_eq!(result.mapped, vec![json!(10), json!(21)]);
        assert_eq!(store.get_key("nums"), Some(json!([10, 21])));
    }

    #[test]
    fn test_sort_reports_original_order() {
        let store = Store::new(json!({"names": ["c", "a", "b"]}));

        let result = store
            .array()
            .sort("names", |a, b| a.as_str().cmp(&b.as_str()))
            .unwrap();

        assert_eq!(result.original_order, vec![json!("c"), json!("a"), json!("b")]);
        assert_eq!(store.get_key("names"), Some(json!(["a", "b", "c"])));
    }

    #[test]
    fn test_non_array_key_is_ignored() {
        let store = Store::new(json!({"name": "x"}));
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        store.subscribe(move |_, _| counter.set(counter.get() + 1));

        assert!(store.array().push("name", [json!(1)]).is_none());
        assert!(store.array().filter("missing", |_, _| true).is_none());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_unchanged_sort_is_noop() {
        let store = Store::new(json!({"names": ["a", "b"]}));
        store.enable_history(None);

        store.array().sort("names", |a, b| a.as_str().cmp(&b.as_str()));
        assert_eq!(store.history_len(), 1);

        store.array().push("names", [json!("c")]);
        assert_eq!(store.history_len(), 2);
        assert!(store.undo());
        assert_eq!(store.get_key("names"), Some(json!(["a", "b"])));
    }
}
