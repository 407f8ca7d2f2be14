//! Model binding for the waypost MVC core.
//!
//! `waypost-binding` converts named request values (form fields, query
//! strings, route data, JSON bodies) into typed action parameters while
//! collecting field-level errors instead of failing the request.
//!
//! # Quick Start
//!
//! ```
//! use waypost_binding::{
//!     Bindable, Culture, DefaultModelBinder, ModelBinder, ModelBinderDictionary,
//!     ModelBindingContext, ModelStateDictionary, NameValueCollectionValueProvider,
//! };
//!
//! let provider = NameValueCollectionValueProvider::query_string([("id", "42")]);
//! let binders = ModelBinderDictionary::new();
//! let ctx = ModelBindingContext::new(i32::model_metadata(), "id", &provider, &binders);
//!
//! let mut model_state = ModelStateDictionary::new();
//! let value = DefaultModelBinder.bind_model(&ctx, &mut model_state);
//! assert_eq!(value, Some(serde_json::json!(42)));
//! assert!(model_state.is_valid());
//! ```
//!
//! # Architecture
//!
//! ```text
//! ValueProviderCollection          ModelBinderDictionary
//! ├── form   (request culture)     ├── per-type binders
//! ├── route  (invariant)           └── DefaultModelBinder
//! └── query  (invariant)                 │
//!            │                           ▼
//!            └────────► ModelBindingContext ──► Value tree + ModelStateDictionary
//! ```
//!
//! Types describe themselves through [`Bindable`]; structs and enums derive it
//! with `#[derive(Bindable)]` from `waypost-macros`.
//!
//! # Errors
//!
//! Conversion failures, missing values and validation failures never abort a
//! binding pass. They land in the [`ModelStateDictionary`] under the field's
//! path (`person.Address.City`, `items[2]`) and the caller decides what an
//! invalid model means.

mod binder;
mod collection;
pub mod culture;
mod default_binder;
mod error;
mod metadata;
pub mod naming;
mod provider;
pub mod providers;
mod result;
mod state;
mod validation;

pub use binder::{
    binder_fn, FnModelBinder, ModelBinder, ModelBinderDictionary, ModelBindingContext,
    PropertyFilter,
};
pub use collection::ValueProviderCollection;
pub use culture::Culture;
pub use default_binder::{value_invalid_message, DefaultModelBinder, VALUE_REQUIRED_MESSAGE};
pub use error::{BindingError, ConversionError};
pub use metadata::{
    BindFilter, Bindable, MetadataFn, ModelKind, ModelMetadata, PropertyMetadata, SetterFn,
    SimpleType,
};
pub use naming::{
    contains_prefix, create_sub_index_name, create_sub_property_name, is_prefix_match, PrefixSet,
};
pub use provider::ValueProvider;
pub use providers::{DictionaryValueProvider, JsonValueProvider, NameValueCollectionValueProvider};
pub use result::ValueProviderResult;
pub use state::{ModelError, ModelState, ModelStateDictionary};
pub use validation::{CustomRule, ModelRule, ValidationResult, Validator};

// Used by `#[derive(Bindable)]` expansions.
#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
