//! Bound action arguments.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use waypost_binding::BindingError;

/// Parameter values bound for one action invocation, in declaration order.
///
/// Values are stored as JSON trees and deserialized on access. Action filters
/// may inspect or replace them before the action runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionParameters {
    values: Map<String, Value>,
}

impl ActionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserializes the parameter `name` as `T`.
    ///
    /// A null value for a type that cannot hold null is a
    /// [`BindingError::NullEntry`]; use `Option<T>` or
    /// [`get_or_default`](Self::get_or_default) for optional parameters.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, BindingError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| BindingError::Missing(name.to_string()))?;
        serde_json::from_value(value.clone()).map_err(|source| {
            if value.is_null() {
                BindingError::NullEntry {
                    name: name.to_string(),
                    type_name: std::any::type_name::<T>().to_string(),
                }
            } else {
                BindingError::mismatch(name, std::any::type_name::<T>(), source)
            }
        })
    }

    /// Deserializes `name`, falling back to `T::default()` for null values.
    pub fn get_or_default<T: DeserializeOwned + Default>(
        &self,
        name: &str,
    ) -> Result<T, BindingError> {
        match self.values.get(name) {
            Some(Value::Null) => Ok(T::default()),
            _ => self.get(name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
