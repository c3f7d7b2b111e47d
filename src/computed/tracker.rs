//! Computed-value tracker implementation.

use crate::error::Result;
use crate::types::State;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use super::view::{StateView, TracingView};

/// A computed-value function. Must be deterministic and side-effect free.
pub type ComputeFn = Rc<dyn Fn(&dyn StateView) -> Result<Value>>;

/// What `compute` hands back: the key and the function it was bound to.
#[derive(Clone)]
pub struct ComputedDefinition {
    pub key: String,
    pub func: ComputeFn,
}

impl fmt::Debug for ComputedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedDefinition")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

struct ComputedEntry {
    func: ComputeFn,
    cached: Value,
    /// State keys read by the tracing pass.
    dependencies: BTreeSet<String>,
}

/// Maintains computed values and the reverse dependency index.
#[derive(Default)]
pub struct ComputedTracker {
    entries: BTreeMap<String, ComputedEntry>,
    /// State key -> computed keys that read it.
    dependents: HashMap<String, BTreeSet<String>>,
}

impl ComputedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a computed key.
    ///
    /// Evaluates `func` once for the initial value, then once more against a
    /// tracing view to record its dependencies.
    pub fn define(&mut self, key: &str, func: ComputeFn, state: &State) -> ComputedDefinition {
        let previous = self.remove_entry(key);

        let cached = match func(state) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "computed value failed on definition");
                previous.map(|p| p.cached).unwrap_or(Value::Null)
            }
        };

        let view = TracingView::new(state);
        // Only the reads matter here; the result was taken above.
        let _ = func(&view);
        let dependencies = view.into_visited();

        for dep in &dependencies {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .insert(key.to_string());
        }

        tracing::debug!(key, dependencies = ?dependencies, "computed value defined");

        self.entries.insert(
            key.to_string(),
            ComputedEntry {
                func: Rc::clone(&func),
                cached,
                dependencies,
            },
        );

        ComputedDefinition {
            key: key.to_string(),
            func,
        }
    }

    /// Remove a computed key and its dependency edges.
    pub fn remove(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    fn remove_entry(&mut self, key: &str) -> Option<ComputedEntry> {
        let entry = self.entries.remove(key)?;
        for dep in &entry.dependencies {
            if let Some(keys) = self.dependents.get_mut(dep) {
                keys.remove(key);
                if keys.is_empty() {
                    self.dependents.remove(dep);
                }
            }
        }
        Some(entry)
    }

    /// Recompute the entries affected by a change to `changed` keys.
    ///
    /// When no entry recorded any dependency, every entry is recomputed.
    /// Returns the recomputed keys.
    pub fn on_change<'a, I>(&mut self, changed: I, state: &State) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.entries.is_empty() {
            return Vec::new();
        }

        let targets: BTreeSet<String> = if self.dependents.is_empty() {
            self.entries.keys().cloned().collect()
        } else {
            let mut targets: BTreeSet<String> = changed
                .into_iter()
                .filter_map(|key| self.dependents.get(key))
                .flat_map(|keys| keys.iter().cloned())
                .collect();
            targets.extend(
                self.entries
                    .iter()
                    .filter(|(_, entry)| entry.dependencies.is_empty())
                    .map(|(key, _)| key.clone()),
            );
            targets
        };

        for key in &targets {
            self.recompute(key, state);
        }
        targets.into_iter().collect()
    }

    fn recompute(&mut self, key: &str, state: &State) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        match (entry.func)(state) {
            Ok(value) => entry.cached = value,
            Err(e) => {
                tracing::warn!(key, error = %e, "computed value failed, keeping previous value");
            }
        }
    }

    /// Cached value of one computed key. Never recomputes.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.cached)
    }

    /// All cached values. Never recomputes.
    pub fn get_all(&self) -> State {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.cached.clone()))
            .collect()
    }

    /// State keys a computed key was traced to depend on.
    pub fn dependencies(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(key).map(|e| &e.dependencies)
    }

    /// Computed keys that read `state_key`.
    pub fn dependents_of(&self, state_key: &str) -> Vec<String> {
        self.dependents
            .get(state_key)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
