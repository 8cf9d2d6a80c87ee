//! Process-safe key/value store shared by every runtime component.
//!
//! Keys are dotted strings (`"bot.name"`, `"worker.busy"`) and values are
//! arbitrary JSON. A single lock guards the whole map, so every operation
//! is atomic with respect to all others on the same store. Composite
//! read-modify-write sequences spanning multiple calls are NOT atomic —
//! use [`State::increment`] / [`State::decrement`] for counters instead
//! of a `get` followed by a `set`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{PalaverError, Result};

/// Cloneable handle over the shared store. Clones observe each other's
/// mutations immediately.
#[derive(Clone, Default)]
pub struct State {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated from nested settings.
    pub fn with_settings(settings: &Value) -> Self {
        let state = Self::new();
        state.apply(settings);
        state
    }

    /// Applies multiple settings at once, as a single atomic batch.
    ///
    /// One level of nesting is flattened into dotted keys: `{"bot":
    /// {"name": "shelly"}}` lands under `bot.name`. A key that is
    /// already dotted passes through unchanged, and a bare scalar key
    /// is filed under the `general` group.
    pub fn apply(&self, settings: &Value) {
        let Some(entries) = settings.as_object() else {
            return;
        };
        let mut values = self.values.write();
        for (key, value) in entries {
            match value {
                Value::Object(group) => {
                    for (label, nested) in group {
                        values.insert(format!("{key}.{label}"), nested.clone());
                    }
                }
                _ if key.contains('.') => {
                    values.insert(key.clone(), value.clone());
                }
                _ => {
                    values.insert(format!("general.{key}"), value.clone());
                }
            }
        }
    }

    /// Retrieves the value of one key. Absence is never an error: the
    /// provided default is returned when the key is unset or holds an
    /// explicit null.
    pub fn get(&self, key: &str, default: Value) -> Value {
        match self.values.read().get(key) {
            None | Some(Value::Null) => default,
            Some(value) => value.clone(),
        }
    }

    /// String-typed convenience over [`State::get`]. A value that is
    /// not a string falls back to the default as well.
    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.values.read().get(key) {
            Some(Value::String(text)) => text.clone(),
            _ => default.to_string(),
        }
    }

    /// Remembers the value of one key.
    pub fn set(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }

    /// Seeds a default when the key is unset. An existing value wins.
    pub fn ensure(&self, key: &str, default: Value) {
        let mut values = self.values.write();
        match values.get(key) {
            None | Some(Value::Null) => {
                values.insert(key.to_string(), default);
            }
            Some(_) => {}
        }
    }

    /// Mandatory-key check: errors when the key is unset or null.
    pub fn require(&self, key: &str) -> Result<Value> {
        match self.values.read().get(key) {
            None | Some(Value::Null) => Err(PalaverError::MissingKey(key.to_string())),
            Some(value) => Ok(value.clone()),
        }
    }

    /// Increments a counter and returns the post-operation value.
    ///
    /// A non-numeric or absent prior value is coerced to zero first.
    /// The whole read-modify-write runs under one critical section, so
    /// concurrent callers never lose an update.
    pub fn increment(&self, key: &str, delta: i64) -> i64 {
        self.add(key, delta)
    }

    /// Decrements a counter and returns the post-operation value.
    pub fn decrement(&self, key: &str, delta: i64) -> i64 {
        self.add(key, -delta)
    }

    fn add(&self, key: &str, delta: i64) -> i64 {
        let mut values = self.values.write();
        let prior = values.get(key).and_then(Value::as_i64).unwrap_or(0);
        let next = prior + delta;
        values.insert(key.to_string(), Value::from(next));
        next
    }

    /// Whether the cooperative on/off switch reads "on". Long-running
    /// loops poll this between channel receives.
    pub fn switch_is_on(&self) -> bool {
        self.get_str("general.switch", "on") == "on"
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("keys", &self.values.read().len())
            .finish()
    }
}
