//! Core types for the state store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The live key/value mapping owned by a store.
pub type State = Map<String, Value>;

/// Unique identifier for a listener registration.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Previous values of every key changed by one state-changing call.
///
/// A key that did not exist before the call maps to `None`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta(BTreeMap<String, Option<Value>>);

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the value a key held before the change.
    pub fn insert(&mut self, key: impl Into<String>, previous: Option<Value>) {
        self.0.insert(key.into(), previous);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Changed keys, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The previous value of `key`, if the key changed and existed before.
    pub fn previous(&self, key: &str) -> Option<&Value> {
        self.0.get(key).and_then(Option::as_ref)
    }

    /// True if `key` changed and did not exist before the change.
    pub fn was_absent(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(None))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Render as a JSON object. Absent previous values become `null`.
    pub fn to_json(&self) -> Value {
        let map: State = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().unwrap_or(Value::Null)))
            .collect();
        Value::Object(map)
    }
}

impl FromIterator<(String, Option<Value>)> for Delta {
    fn from_iter<I: IntoIterator<Item = (String, Option<Value>)>>(iter: I) -> Self {
        Delta(iter.into_iter().collect())
    }
}

/// Before/after values of one key across a recorded change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub before: Option<Value>,
    pub after: Option<Value>,
}

/// Store statistics.
#[derive(Clone, Debug, Default)]
pub struct StoreStats {
    pub key_count: usize,
    pub computed_count: usize,
    pub listener_count: usize,
    pub history_len: usize,
}
