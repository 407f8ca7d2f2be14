//! Field-level binding and validation state.
//!
//! One [`ModelStateDictionary`] accumulates every error of a binding pass.
//! It is never reset mid-pass; callers inspect [`is_valid`] once binding is
//! done.
//!
//! [`is_valid`]: ModelStateDictionary::is_valid

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::naming::is_prefix_match;
use crate::result::ValueProviderResult;

/// One error recorded against a field.
#[derive(Clone)]
pub struct ModelError {
    pub message: String,
    pub exception: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exception: None,
        }
    }

    /// An error caused by `exception`, with a user-facing message.
    pub fn with_exception<E>(message: impl Into<String>, exception: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            exception: Some(Arc::new(exception)),
        }
    }
}

impl fmt::Debug for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelError")
            .field("message", &self.message)
            .field(
                "exception",
                &self.exception.as_ref().map(|e| e.to_string()),
            )
            .finish()
    }
}

impl PartialEq for ModelError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
    }
}

/// Attempted value and errors for one field path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelState {
    pub value: Option<ValueProviderResult>,
    pub errors: Vec<ModelError>,
}

/// Ordered, case-insensitive map from field path to [`ModelState`].
///
/// Keys are matched lowercased; the spelling of the first insert is kept
/// for display.
#[derive(Debug, Clone, Default)]
pub struct ModelStateDictionary {
    entries: IndexMap<String, (String, ModelState)>,
}

impl ModelStateDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ModelState> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|(_, state)| state)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// The entry for `key`, created empty if missing.
    pub fn entry(&mut self, key: &str) -> &mut ModelState {
        &mut self
            .entries
            .entry(key.to_ascii_lowercase())
            .or_insert_with(|| (key.to_string(), ModelState::default()))
            .1
    }

    pub fn remove(&mut self, key: &str) -> Option<ModelState> {
        self.entries
            .shift_remove(&key.to_ascii_lowercase())
            .map(|(_, state)| state)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn add_model_error(&mut self, key: &str, message: impl Into<String>) {
        self.entry(key).errors.push(ModelError::new(message));
    }

    pub fn add_error(&mut self, key: &str, error: ModelError) {
        self.entry(key).errors.push(error);
    }

    /// Record the raw value seen for `key`.
    pub fn set_model_value(&mut self, key: &str, value: ValueProviderResult) {
        self.entry(key).value = Some(value);
    }

    /// True when no field has errors.
    pub fn is_valid(&self) -> bool {
        self.entries.values().all(|(_, s)| s.errors.is_empty())
    }

    /// True when `key` and every field below it (`key.x`, `key[i]`) are error-free.
    pub fn is_valid_field(&self, key: &str) -> bool {
        self.entries
            .values()
            .filter(|(k, _)| is_prefix_match(key, k))
            .all(|(_, s)| s.errors.is_empty())
    }

    /// Copy all entries of `other` into this dictionary.
    pub fn merge(&mut self, other: &ModelStateDictionary) {
        for (key, state) in other.entries.values() {
            let target = self.entry(key);
            if state.value.is_some() {
                target.value = state.value.clone();
            }
            target.errors.extend(state.errors.iter().cloned());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelState)> {
        self.entries.values().map(|(k, s)| (k.as_str(), s))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(k, _)| k.as_str())
    }

    /// Every error message, as `(field, message)` pairs in insertion order.
    pub fn error_messages(&self) -> Vec<(String, String)> {
        self.entries
            .values()
            .flat_map(|(k, s)| s.errors.iter().map(move |e| (k.clone(), e.message.clone())))
            .collect()
    }
}
