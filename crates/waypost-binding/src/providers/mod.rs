//! Built-in value providers.
//!
//! | Provider | Typical source | Culture |
//! |----------|----------------|---------|
//! | [`NameValueCollectionValueProvider::form`] | posted form fields | request |
//! | [`NameValueCollectionValueProvider::query_string`] | URL query | invariant |
//! | [`DictionaryValueProvider`] | route data | invariant |
//! | [`JsonValueProvider`] | JSON request body | request |

mod dictionary;
mod json;
mod name_value;

pub use dictionary::DictionaryValueProvider;
pub use json::JsonValueProvider;
pub use name_value::NameValueCollectionValueProvider;
