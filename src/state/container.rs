//! State container.

use crate::types::{Delta, State};
use serde_json::Value;

use super::diff::ChangeSet;

/// Owns the live key/value mapping of one store.
///
/// No validation is performed: any key and any value shape is accepted.
#[derive(Debug, Default)]
pub struct StateContainer {
    values: State,
}

impl StateContainer {
    pub fn new(initial: State) -> Self {
        Self { values: initial }
    }

    /// Current state view.
    pub fn read(&self) -> &State {
        &self.values
    }

    /// Mutable access for in-place bulk updates.
    pub(crate) fn read_mut(&mut self) -> &mut State {
        &mut self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write every changed key and return the previous values.
    pub fn apply(&mut self, changes: ChangeSet) -> Delta {
        let mut delta = Delta::new();
        for (key, value) in changes.into_changes() {
            let previous = self.values.insert(key.clone(), value);
            delta.insert(key, previous);
        }
        delta
    }

    /// Restore keys to the given values, removing keys mapped to `None`.
    ///
    /// Used by time travel, where a key may not have existed at the target
    /// point. Keys whose value already matches are left out of the delta.
    pub fn restore<'a, I>(&mut self, values: I) -> Delta
    where
        I: IntoIterator<Item = (&'a str, Option<&'a Value>)>,
    {
        let mut delta = Delta::new();
        for (key, target) in values {
            if self.values.get(key) == target {
                continue;
            }
            let previous = match target {
                Some(value) => self.values.insert(key.to_string(), value.clone()),
                None => self.values.remove(key),
            };
            delta.insert(key, previous);
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChangeDetector;
    use serde_json::json;

    fn state(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_apply_returns_previous_values() {
        let mut container = StateContainer::new(state(json!({"a": 1, "b": 1})));
        let changes = ChangeDetector::default()
            .diff(container.read(), &json!({"a": 2, "c": 3}))
            .unwrap();

        let delta = container.apply(changes);

        assert_eq!(container.read(), &state(json!({"a": 2, "b": 1, "c": 3})));
        assert_eq!(delta.previous("a"), Some(&json!(1)));
        assert!(delta.was_absent("c"));
        assert!(!delta.contains_key("b"));
    }

    #[test]
    fn test_restore_removes_absent_keys() {
        let mut container = StateContainer::new(state(json!({"a": 2, "c": 3})));
        let one = json!(1);

        let delta = container.restore(vec![("a", Some(&one)), ("c", None)]);

        assert_eq!(container.read(), &state(json!({"a": 1})));
        assert_eq!(delta.previous("a"), Some(&json!(2)));
        assert_eq!(delta.previous("c"), Some(&json!(3)));
    }

    #[test]
    fn test_restore_skips_matching_keys() {
        let mut container = StateContainer::new(state(json!({"a": 1})));
        let one = json!(1);

        let delta = container.restore(vec![("a", Some(&one)), ("missing", None)]);

        assert!(delta.is_empty());
    }
}
