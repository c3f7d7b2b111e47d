//! Change detection between the live state and a proposed update.

use crate::types::{Delta, State};
use serde_json::Value;

/// Keys of a proposed update whose values differ from the current state,
/// paired with the values to write.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<(String, Value)>,
}

impl ChangeSet {
    /// A change set writing one key, bypassing detection.
    pub(crate) fn single(key: impl Into<String>, value: Value) -> Self {
        Self {
            changes: vec![(key.into(), value)],
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.changes.iter().map(|(k, _)| k.as_str())
    }

    pub(crate) fn into_changes(self) -> Vec<(String, Value)> {
        self.changes
    }
}

/// Computes the actual delta of a partial update.
///
/// Policy, in order:
/// 1. A proposal that is not a JSON object is rejected.
/// 2. With a `replace_threshold`, a proposal carrying more keys than
///    `threshold * current.len()` is treated as a full replacement and every
///    proposed key counts as changed.
/// 3. Otherwise each key is compared by value. With `structural_sharing`,
///    object values are merged recursively and only differing branches are
///    rebuilt.
/// 4. No changed keys means no change set at all.
#[derive(Clone, Debug, Default)]
pub struct ChangeDetector {
    structural_sharing: bool,
    replace_threshold: Option<f64>,
}

impl ChangeDetector {
    pub fn new(structural_sharing: bool, replace_threshold: Option<f64>) -> Self {
        Self {
            structural_sharing,
            replace_threshold,
        }
    }

    /// Diff a proposed update against the current state.
    ///
    /// Returns `None` when the proposal is rejected or changes nothing.
    pub fn diff(&self, current: &State, proposed: &Value) -> Option<ChangeSet> {
        let proposed = proposed.as_object()?;

        if let Some(threshold) = self.replace_threshold {
            if proposed.len() as f64 > current.len() as f64 * threshold {
                let changes: Vec<(String, Value)> = proposed
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                return (!changes.is_empty()).then_some(ChangeSet { changes });
            }
        }

        let mut changes = Vec::new();
        for (key, value) in proposed {
            match current.get(key) {
                Some(existing) if self.structural_sharing => {
                    if let Some(merged) = share_structure(existing, value) {
                        changes.push((key.clone(), merged));
                    }
                }
                Some(existing) if existing == value => {}
                _ => changes.push((key.clone(), value.clone())),
            }
        }

        if changes.is_empty() {
            None
        } else {
            Some(ChangeSet { changes })
        }
    }
}

/// Merge `source` into `target`, rebuilding only the branches that differ.
///
/// Returns `None` if the merge would leave `target` unchanged. Non-object
/// values replace the target outright.
pub fn share_structure(target: &Value, source: &Value) -> Option<Value> {
    let (Some(target_map), Some(source_map)) = (target.as_object(), source.as_object()) else {
        return (target != source).then(|| source.clone());
    };

    let mut merged: Option<State> = None;
    for (key, source_value) in source_map {
        let replacement = match target_map.get(key) {
            Some(target_value) => share_structure(target_value, source_value),
            None => Some(source_value.clone()),
        };
        if let Some(value) = replacement {
            merged
                .get_or_insert_with(|| target_map.clone())
                .insert(key.clone(), value);
        }
    }

    merged.map(Value::Object)
}

/// Compare two full states by key count and per-key value equality.
///
/// The returned delta maps every differing key to its value in `before`.
pub fn compare_states(before: &State, after: &State) -> Delta {
    let mut delta = Delta::new();

    for (key, value) in after {
        match before.get(key) {
            Some(previous) if previous == value => {}
            previous => delta.insert(key.clone(), previous.cloned()),
        }
    }

    // Equal key counts with no differing key means no key was removed.
    if before.len() != after.len() || !delta.is_empty() {
        for (key, value) in before {
            if !after.contains_key(key) {
                delta.insert(key.clone(), Some(value.clone()));
            }
        }
    }

    delta
}
