//! Provider over a plain key/value map (route data).

use serde_json::{Map, Value};

use crate::culture::Culture;
use crate::naming::PrefixSet;
use crate::provider::ValueProvider;
use crate::result::ValueProviderResult;

/// Route values and other already-split dictionaries.
///
/// Values may be any JSON scalar; the attempted value is its text form.
#[derive(Debug, Clone)]
pub struct DictionaryValueProvider {
    name: &'static str,
    values: Map<String, Value>,
    prefixes: PrefixSet,
    culture: Culture,
}

impl DictionaryValueProvider {
    pub fn new(name: &'static str, values: Map<String, Value>, culture: Culture) -> Self {
        let prefixes = PrefixSet::new(values.keys().map(String::as_str));
        Self {
            name,
            values,
            prefixes,
            culture,
        }
    }

    /// Route data, read with the invariant culture.
    pub fn route_data(values: Map<String, Value>) -> Self {
        Self::new("route", values, Culture::invariant())
    }
}

impl ValueProvider for DictionaryValueProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        self.prefixes.contains(prefix)
    }

    fn get_value(&self, key: &str) -> Option<ValueProviderResult> {
        let (_, value) = self
            .values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))?;
        let attempted = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Some(ValueProviderResult::new(
            value.clone(),
            attempted,
            self.culture.clone(),
        ))
    }
}
