//! Error types for value conversion and model binding.

/// A raw request value could not be converted to the requested type.
///
/// Conversion errors never escape a binding pass: the binder records them in
/// the [`ModelStateDictionary`](crate::ModelStateDictionary) and the field
/// resolves to no value.
#[derive(Debug, Clone, thiserror::Error)]
#[error("could not convert '{value}' to {target}")]
pub struct ConversionError {
    /// The attempted (string) value.
    pub value: String,
    /// Name of the destination type.
    pub target: String,
}

impl ConversionError {
    /// Create a conversion error for `value` targeting `target`.
    pub fn new(value: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target: target.into(),
        }
    }
}

/// Errors raised when turning a bound value tree into a typed value.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// A parameter resolved to null but its type does not accept null.
    #[error("the parameters dictionary contains a null entry for parameter '{name}' of non-nullable type '{type_name}'")]
    NullEntry { name: String, type_name: String },

    /// The bound value does not deserialize into the requested type.
    #[error("bound value for '{name}' does not fit type '{type_name}': {source}")]
    Mismatch {
        name: String,
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// No value was bound for the requested name.
    #[error("no value bound for '{0}'")]
    Missing(String),
}

impl BindingError {
    /// Create a mismatch error.
    pub fn mismatch(
        name: impl Into<String>,
        type_name: impl Into<String>,
        source: serde_json::Error,
    ) -> Self {
        Self::Mismatch {
            name: name.into(),
            type_name: type_name.into(),
            source,
        }
    }
}
