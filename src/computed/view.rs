//! Read-only state views handed to computed functions.

use crate::error::{Result, StoreError};
use crate::types::State;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeSet;

/// Key-read capability over a state.
///
/// Only [`StateView::get`] is required; the typed helpers return
/// `MissingKey` / `TypeMismatch` errors so computed functions can use `?`.
pub trait StateView {
    fn get(&self, key: &str) -> Option<&Value>;

    fn require(&self, key: &str) -> Result<&Value> {
        self.get(key)
            .ok_or_else(|| StoreError::MissingKey(key.to_string()))
    }

    fn i64(&self, key: &str) -> Result<i64> {
        self.require(key)?
            .as_i64()
            .ok_or_else(|| mismatch(key, "integer"))
    }

    fn f64(&self, key: &str) -> Result<f64> {
        self.require(key)?
            .as_f64()
            .ok_or_else(|| mismatch(key, "number"))
    }

    fn str(&self, key: &str) -> Result<&str> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| mismatch(key, "string"))
    }

    fn bool(&self, key: &str) -> Result<bool> {
        self.require(key)?
            .as_bool()
            .ok_or_else(|| mismatch(key, "boolean"))
    }

    fn array(&self, key: &str) -> Result<&Vec<Value>> {
        self.require(key)?
            .as_array()
            .ok_or_else(|| mismatch(key, "array"))
    }

    fn object(&self, key: &str) -> Result<&State> {
        self.require(key)?
            .as_object()
            .ok_or_else(|| mismatch(key, "object"))
    }
}

fn mismatch(key: &str, expected: &'static str) -> StoreError {
    StoreError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

impl StateView for State {
    fn get(&self, key: &str) -> Option<&Value> {
        serde_json::Map::get(self, key)
    }
}

/// A state view that records every key read through it.
pub struct TracingView<'a> {
    state: &'a State,
    visited: RefCell<BTreeSet<String>>,
}

impl<'a> TracingView<'a> {
    pub fn new(state: &'a State) -> Self {
        Self {
            state,
            visited: RefCell::new(BTreeSet::new()),
        }
    }

    /// Keys read so far.
    pub fn into_visited(self) -> BTreeSet<String> {
        self.visited.into_inner()
    }
}

impl StateView for TracingView<'_> {
    fn get(&self, key: &str) -> Option<&Value> {
        self.visited.borrow_mut().insert(key.to_string());
        self.state.get(key)
    }
}
