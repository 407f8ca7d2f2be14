//! Provider over a JSON request body.
//!
//! The document is flattened into binder keys once, up front:
//!
//! ```text
//! {"name": "Ann", "tags": ["a", "b"], "address": {"city": "Oslo"}}
//!
//! name          → "Ann"
//! tags[0]       → "a"
//! tags[1]       → "b"
//! address.city  → "Oslo"
//! ```

use indexmap::IndexMap;
use serde_json::Value;

use crate::culture::Culture;
use crate::naming::{create_sub_index_name, create_sub_property_name, PrefixSet};
use crate::provider::ValueProvider;
use crate::result::ValueProviderResult;

#[derive(Debug, Clone)]
pub struct JsonValueProvider {
    /// Lowercased key to (flattened key, scalar).
    entries: IndexMap<String, (String, Value)>,
    prefixes: PrefixSet,
    culture: Culture,
}

impl JsonValueProvider {
    pub fn new(document: &Value, culture: Culture) -> Self {
        let mut flat = Vec::new();
        flatten(document, "", &mut flat);
        let prefixes = PrefixSet::new(flat.iter().map(|(k, _)| k.as_str()));
        let entries = flat
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), (key, value)))
            .collect();
        Self {
            entries,
            prefixes,
            culture,
        }
    }

    /// Parse `body` as JSON. Returns `None` for an empty body.
    pub fn from_body(body: &str, culture: Culture) -> Result<Option<Self>, serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(None);
        }
        let document: Value = serde_json::from_str(body)?;
        Ok(Some(Self::new(&document, culture)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(k, _)| k.as_str())
    }
}

fn flatten(value: &Value, prefix: &str, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(child, &create_sub_property_name(prefix, key), out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten(child, &create_sub_index_name(prefix, &i.to_string()), out);
            }
        }
        Value::Null => out.push((prefix.to_string(), Value::String(String::new()))),
        scalar => out.push((prefix.to_string(), scalar.clone())),
    }
}

impl ValueProvider for JsonValueProvider {
    fn name(&self) -> &'static str {
        "json"
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        self.prefixes.contains(prefix)
    }

    fn get_value(&self, key: &str) -> Option<ValueProviderResult> {
        let (_, value) = self.entries.get(&key.to_ascii_lowercase())?;
        let attempted = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Some(ValueProviderResult::new(
            value.clone(),
            attempted,
            self.culture.clone(),
        ))
    }
}
