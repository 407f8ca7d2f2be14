//! The raw value a provider found for one key.

use serde_json::Value;

use crate::culture::Culture;
use crate::error::ConversionError;
use crate::metadata::{ModelKind, ModelMetadata, SimpleType};

/// A value found by a [`ValueProvider`](crate::ValueProvider).
///
/// `raw` is either a single scalar or an array of scalars (a form field
/// posted several times). `attempted_value` is the text shown back to the
/// user when conversion fails, and `culture` decides how numbers are read.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueProviderResult {
    raw: Value,
    attempted_value: String,
    culture: Culture,
}

impl ValueProviderResult {
    pub fn new(raw: Value, attempted_value: impl Into<String>, culture: Culture) -> Self {
        Self {
            raw,
            attempted_value: attempted_value.into(),
            culture,
        }
    }

    /// A single string value.
    pub fn from_string(value: impl Into<String>, culture: Culture) -> Self {
        let value = value.into();
        Self::new(Value::String(value.clone()), value, culture)
    }

    /// A multi-valued field; the attempted value is the comma-joined list.
    pub fn from_strings(values: Vec<String>, culture: Culture) -> Self {
        let attempted = values.join(",");
        let raw = Value::Array(values.into_iter().map(Value::String).collect());
        Self::new(raw, attempted, culture)
    }

    pub fn raw_value(&self) -> &Value {
        &self.raw
    }

    pub fn attempted_value(&self) -> &str {
        &self.attempted_value
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    /// The raw value as a list of strings, e.g. explicit index tokens.
    pub fn to_strings(&self) -> Vec<String> {
        self.elements().into_iter().filter_map(scalar_text).collect()
    }

    /// Convert the raw value to the type described by `metadata`.
    ///
    /// `Ok(None)` means "no value" (blank input). Complex types and
    /// dictionaries cannot be produced from a single value.
    pub fn convert_to(&self, metadata: &ModelMetadata) -> Result<Option<Value>, ConversionError> {
        match metadata.kind() {
            ModelKind::Simple(simple) => {
                let first = match &self.raw {
                    Value::Array(items) => match items.first() {
                        Some(item) => item,
                        None => return Ok(None),
                    },
                    other => other,
                };
                self.convert_scalar(first, *simple, metadata)
            }
            ModelKind::Array(element) | ModelKind::Collection(element) => {
                let element = element();
                let simple = match element.kind() {
                    ModelKind::Simple(simple) => *simple,
                    _ => return Err(self.error(metadata)),
                };
                let mut values = Vec::new();
                for item in self.elements() {
                    let converted = self.convert_scalar(item, simple, &element)?;
                    values.push(converted.unwrap_or_else(|| element.default_value()));
                }
                Ok(Some(Value::Array(values)))
            }
            ModelKind::Dictionary { .. } | ModelKind::Complex(_) => Err(self.error(metadata)),
        }
    }

    fn elements(&self) -> Vec<&Value> {
        match &self.raw {
            Value::Array(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    fn convert_scalar(
        &self,
        value: &Value,
        simple: SimpleType,
        metadata: &ModelMetadata,
    ) -> Result<Option<Value>, ConversionError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if simple == SimpleType::String => Ok(Some(Value::String(s.clone()))),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => simple
                .parse(s, &self.culture)
                .map(Some)
                .ok_or_else(|| ConversionError::new(s.clone(), metadata.type_name())),
            other => simple
                .accept(other)
                .map(Some)
                .ok_or_else(|| ConversionError::new(other.to_string(), metadata.type_name())),
        }
    }

    fn error(&self, metadata: &ModelMetadata) -> ConversionError {
        ConversionError::new(self.attempted_value.clone(), metadata.type_name())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        other => Some(other.to_string()),
    }
}
