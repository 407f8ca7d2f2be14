//! Proc macros for waypost.
//!
//! # Available Macros
//!
//! - [`Bindable`] - Generate model metadata for the waypost model binder
//!
//! # Examples
//!
//! For working examples, see `waypost-binding/tests/derive.rs`.

mod bindable;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `waypost_binding::Bindable` for structs and unit-only enums.
///
/// Structs become complex models: every named field is a property bound from
/// `prefix.field`. Enums become simple values matched case-insensitively by
/// variant name.
///
/// Object keys follow serde (`#[serde(rename)]`, `#[serde(rename_all)]`,
/// `#[serde(skip)]`) so the bound value deserializes back into the type.
///
/// # Field Attributes
///
/// | Attribute | Effect |
/// |-----------|--------|
/// | `#[bind(skip)]` | Never bind this field |
/// | `#[bind(rename = "Name")]` | Request key differs from the serialized name |
/// | `#[bind(display = "E-mail")]` | Name used in error messages |
/// | `#[bind(read_only)]` | Only updated in place (collections, nested models) |
/// | `#[bind(keep_empty)]` | Keep `""` instead of treating it as missing |
/// | `#[bind(required)]` / `#[bind(required = "msg")]` | Required rule |
/// | `#[bind(length(max = 20, min = 2))]` | String length rule |
/// | `#[bind(range(min = 1, max = 10))]` | Numeric range rule |
/// | `#[bind(pattern = "[a-z]+")]` | Whole-value regex rule |
/// | `#[bind(validate = path)]` | Custom rule `fn(Option<&Value>) -> Option<String>` |
/// | `#[bind(setter = path)]` | Guard `fn(&Value) -> Result<(), String>` run before assignment |
///
/// `length`, `range` also accept `message = "..."`; `{0}` in a message is
/// replaced by the display name.
///
/// # Container Attributes
///
/// | Attribute | Effect |
/// |-----------|--------|
/// | `#[bindable(include = "a, b")]` | Only these properties are bound |
/// | `#[bindable(exclude = "c")]` | These properties are never bound |
/// | `#[bindable(display = "Person")]` | Display name of the model |
/// | `#[bindable(default)]` | Fresh models start from `Default` (requires `Serialize`) |
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use waypost_macros::Bindable;
///
/// #[derive(Bindable, Deserialize)]
/// #[bindable(exclude = "id")]
/// struct Signup {
///     id: u32,
///     #[bind(required, length(max = 40))]
///     name: String,
///     #[bind(range(min = 18, max = 130))]
///     age: u8,
///     tags: Vec<String>,
/// }
/// ```
#[proc_macro_derive(Bindable, attributes(bind, bindable))]
pub fn bindable_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bindable::bindable_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
