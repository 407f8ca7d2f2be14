//! Integration tests for the Bindable derive macro.
//!
//! These tests bind derived models end to end and deserialize the bound value
//! back into the Rust type.

#![allow(dead_code)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use waypost_binding::{
    Bindable, Culture, DefaultModelBinder, ModelBinder, ModelBinderDictionary,
    ModelBindingContext, ModelKind, ModelStateDictionary, NameValueCollectionValueProvider,
    SimpleType,
};
use waypost_macros::Bindable as DeriveBindable;

fn bind<T: Bindable>(name: &str, pairs: &[(&str, &str)]) -> (Option<Value>, ModelStateDictionary) {
    let provider = NameValueCollectionValueProvider::form(pairs.iter().copied(), Culture::invariant());
    let binders = ModelBinderDictionary::new();
    let ctx = ModelBindingContext::new(T::model_metadata(), name, &provider, &binders)
        .with_fallback_to_empty_prefix(true);
    let mut model_state = ModelStateDictionary::new();
    let value = DefaultModelBinder.bind_model(&ctx, &mut model_state);
    (value, model_state)
}

// =============================================================================
// Models
// =============================================================================

#[derive(DeriveBindable, Deserialize, Debug, PartialEq)]
enum Plan {
    Free,
    Pro,
}

#[derive(DeriveBindable, Deserialize, Debug, PartialEq)]
struct Address {
    city: String,
    zip: Option<String>,
}

fn no_admins(value: Option<&Value>) -> Option<String> {
    match value.and_then(Value::as_str) {
        Some(name) if name.eq_ignore_ascii_case("admin") => Some("That name is reserved".into()),
        _ => None,
    }
}

#[derive(DeriveBindable, Deserialize, Debug, PartialEq)]
#[bindable(exclude = "id")]
struct Signup {
    id: u32,
    #[bind(required, length(max = 10), validate = no_admins)]
    name: String,
    #[bind(range(min = 18, max = 130), display = "Your age")]
    age: u8,
    plan: Plan,
    tags: Vec<String>,
    address: Address,
    scores: HashMap<String, i32>,
}

#[derive(DeriveBindable, Deserialize, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
#[bindable(default)]
struct Settings {
    page_size: u32,
    #[serde(skip)]
    secret: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: 25,
            secret: String::new(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_enum_metadata() {
    match Plan::model_metadata().kind() {
        ModelKind::Simple(SimpleType::Enum(names)) => assert_eq!(*names, ["Free", "Pro"]),
        other => panic!("unexpected kind {:?}", other),
    }
}

#[test]
fn test_full_signup_binds_and_deserializes() {
    let (value, ms) = bind::<Signup>(
        "signup",
        &[
            ("signup.id", "99"),
            ("signup.name", "Ann"),
            ("signup.age", "30"),
            ("signup.plan", "pro"),
            ("signup.tags[0]", "a"),
            ("signup.tags[1]", "b"),
            ("signup.address.city", "Oslo"),
            ("signup.scores[0].key", "math"),
            ("signup.scores[0].value", "7"),
        ],
    );
    assert!(ms.is_valid(), "{:?}", ms.error_messages());

    let signup: Signup = serde_json::from_value(value.unwrap()).unwrap();
    assert_eq!(signup.id, 0);
    assert_eq!(signup.name, "Ann");
    assert_eq!(signup.age, 30);
    assert_eq!(signup.plan, Plan::Pro);
    assert_eq!(signup.tags, vec!["a", "b"]);
    assert_eq!(
        signup.address,
        Address {
            city: "Oslo".into(),
            zip: None
        }
    );
    assert_eq!(signup.scores.get("math"), Some(&7));
}

#[test]
fn test_signup_validation_messages() {
    let (_, ms) = bind::<Signup>(
        "",
        &[("name", "admin"), ("age", "12"), ("plan", "gold")],
    );
    let errors = ms.error_messages();
    assert!(errors.contains(&("plan".into(), "The value 'gold' is not valid for plan.".into())));
    assert!(errors.contains(&(
        "age".into(),
        "The field Your age must be between 18 and 130.".into()
    )));
    assert!(errors.contains(&("name".into(), "That name is reserved".into())));
}

#[test]
fn test_required_and_length() {
    let (_, ms) = bind::<Signup>("", &[("name", ""), ("age", "20")]);
    assert_eq!(
        ms.get("name").unwrap().errors[0].message,
        "The name field is required."
    );

    let (_, ms) = bind::<Signup>("", &[("name", "abcdefghijk"), ("age", "20")]);
    assert_eq!(
        ms.get("name").unwrap().errors[0].message,
        "The field name must be a string with a maximum length of 10."
    );
}

#[test]
fn test_rename_all_and_default_model() {
    let (value, ms) = bind::<Settings>("", &[("pageSize", "x")]);
    assert!(!ms.is_valid_field("pageSize"));
    let value = value.unwrap();
    assert_eq!(value, json!({"pageSize": 25}));
    let settings: Settings = serde_json::from_value(value).unwrap();
    assert_eq!(settings.page_size, 25);
}

#[derive(DeriveBindable, Deserialize, Debug, PartialEq)]
#[bindable(exclude = "city")]
struct Shipment {
    city: String,
    address: Address,
}

#[test]
fn test_container_exclude_leaves_nested_fields_alone() {
    let (value, ms) = bind::<Shipment>(
        "s",
        &[("s.city", "Paris"), ("s.address.city", "Oslo"), ("s.address.zip", "0150")],
    );
    assert!(ms.is_valid());
    let shipment: Shipment = serde_json::from_value(value.unwrap()).unwrap();
    assert_eq!(
        shipment,
        Shipment {
            city: String::new(),
            address: Address {
                city: "Oslo".into(),
                zip: Some("0150".into()),
            },
        }
    );
}
