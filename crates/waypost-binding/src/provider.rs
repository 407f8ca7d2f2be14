//! The value provider trait.

use crate::result::ValueProviderResult;

/// A source of named request values.
///
/// Providers are the binder's only view of the request. Keys follow the
/// field-path conventions in [`naming`](crate::naming): `person.Name`,
/// `items[0]`, `items.index`.
///
/// # Implementation Guidelines
///
/// - [`contains_prefix`](Self::contains_prefix) must answer true when any key
///   lies at or below the prefix (see [`is_prefix_match`](crate::is_prefix_match)).
///   The binder only recurses into prefixes a provider reports, which is what
///   keeps binding of self-referential models finite.
/// - [`get_value`](Self::get_value) returns `None` when the exact key is
///   absent. Lookups are case-insensitive.
///
/// # Example
///
/// ```
/// use waypost_binding::{Culture, ValueProvider, ValueProviderResult};
///
/// struct Fixed;
///
/// impl ValueProvider for Fixed {
///     fn name(&self) -> &'static str { "fixed" }
///
///     fn contains_prefix(&self, prefix: &str) -> bool {
///         waypost_binding::is_prefix_match(prefix, "id")
///     }
///
///     fn get_value(&self, key: &str) -> Option<ValueProviderResult> {
///         key.eq_ignore_ascii_case("id")
///             .then(|| ValueProviderResult::from_string("7", Culture::invariant()))
///     }
/// }
///
/// assert!(Fixed.contains_prefix("id"));
/// assert_eq!(Fixed.get_value("ID").unwrap().attempted_value(), "7");
/// ```
pub trait ValueProvider: Send + Sync {
    /// Short name used in logs, e.g. "form" or "route".
    fn name(&self) -> &'static str;

    /// Returns true if any key lies at or below `prefix`.
    fn contains_prefix(&self, prefix: &str) -> bool;

    /// The value stored under exactly `key`.
    fn get_value(&self, key: &str) -> Option<ValueProviderResult>;
}

impl<P: ValueProvider + ?Sized> ValueProvider for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        (**self).contains_prefix(prefix)
    }

    fn get_value(&self, key: &str) -> Option<ValueProviderResult> {
        (**self).get_value(key)
    }
}

impl<P: ValueProvider + ?Sized> ValueProvider for std::sync::Arc<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        (**self).contains_prefix(prefix)
    }

    fn get_value(&self, key: &str) -> Option<ValueProviderResult> {
        (**self).get_value(key)
    }
}
