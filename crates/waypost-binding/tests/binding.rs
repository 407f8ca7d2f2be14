//! Binding behaviour across providers, cultures and index conventions.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use waypost_binding::{
    Bindable, Culture, DefaultModelBinder, DictionaryValueProvider, JsonValueProvider,
    ModelBinder, ModelBinderDictionary, ModelBindingContext, ModelStateDictionary,
    NameValueCollectionValueProvider, ValueProvider, ValueProviderCollection,
};

fn bind_with<T: Bindable>(
    provider: &dyn ValueProvider,
    name: &str,
) -> (Option<Value>, ModelStateDictionary) {
    let binders = ModelBinderDictionary::new();
    let ctx = ModelBindingContext::new(T::model_metadata(), name, provider, &binders)
        .with_fallback_to_empty_prefix(true);
    let mut model_state = ModelStateDictionary::new();
    let value = DefaultModelBinder.bind_model(&ctx, &mut model_state);
    (value, model_state)
}

#[test]
fn test_integer_from_string() {
    let provider = NameValueCollectionValueProvider::query_string([("id", "42")]);
    let (value, ms) = bind_with::<i32>(&provider, "id");
    assert_eq!(value, Some(json!(42)));
    assert!(ms.is_valid());
}

#[test]
fn test_integer_conversion_failure_is_recorded() {
    let provider = NameValueCollectionValueProvider::query_string([("id", "abc")]);
    let (value, ms) = bind_with::<i32>(&provider, "id");
    assert_eq!(value, None);
    assert!(!ms.is_valid());
    insta::assert_snapshot!(ms.get("id").unwrap().errors[0].message, @"The value 'abc' is not valid for id.");
}

#[test]
fn test_form_uses_request_culture_query_does_not() {
    let de = Culture::from_name("de-DE").unwrap();
    let form = NameValueCollectionValueProvider::form([("price", "1.234,5")], de);
    let (value, _) = bind_with::<f64>(&form, "price");
    assert_eq!(value, Some(json!(1234.5)));

    let query = NameValueCollectionValueProvider::query_string([("price", "1234.5")]);
    let (value, _) = bind_with::<f64>(&query, "price");
    assert_eq!(value, Some(json!(1234.5)));
}

#[test]
fn test_first_provider_wins() {
    let mut route = Map::new();
    route.insert("id".into(), json!("7"));
    let providers = ValueProviderCollection::new()
        .with(NameValueCollectionValueProvider::form(
            Vec::<(String, String)>::new(),
            Culture::invariant(),
        ))
        .with(DictionaryValueProvider::route_data(route))
        .with(NameValueCollectionValueProvider::query_string([("id", "8")]));
    let (value, _) = bind_with::<u64>(&providers, "id");
    assert_eq!(value, Some(json!(7)));
}

#[test]
fn test_json_body_binds_nested_collections() {
    let provider = JsonValueProvider::new(
        &json!({"ids": [3, 4], "names": {"a": "x"}}),
        Culture::invariant(),
    );
    let (ids, _) = bind_with::<Vec<u8>>(&provider, "ids");
    assert_eq!(ids, Some(json!([3, 4])));
}

#[test]
fn test_checkbox_pair_binds_true() {
    let provider = NameValueCollectionValueProvider::form(
        [("remember", "true"), ("remember", "false")],
        Culture::invariant(),
    );
    let (value, _) = bind_with::<bool>(&provider, "remember");
    assert_eq!(value, Some(json!(true)));
}

#[test]
fn test_explicit_index_tokens_in_order() {
    let provider = NameValueCollectionValueProvider::form(
        [("p.index", "a"), ("p.index", "b"), ("p[a]", "1"), ("p[b]", "2")],
        Culture::invariant(),
    );
    let (value, _) = bind_with::<Vec<i32>>(&provider, "p");
    assert_eq!(value, Some(json!([1, 2])));
}

#[test]
fn test_zero_based_indexes_never_cross_a_gap() {
    let provider = NameValueCollectionValueProvider::form(
        [("p[0]", "1"), ("p[1]", "2"), ("p[3]", "4")],
        Culture::invariant(),
    );
    let (value, _) = bind_with::<Vec<i32>>(&provider, "p");
    assert_eq!(value, Some(json!([1, 2])));
}

proptest! {
    /// Zero-based binding yields exactly the contiguous run starting at 0.
    #[test]
    fn zero_based_binding_stops_at_first_gap(
        present in prop::collection::btree_set(0usize..12, 0..10),
        values in prop::collection::vec(any::<i32>(), 12),
    ) {
        let pairs: Vec<(String, String)> = present
            .iter()
            .map(|i| (format!("items[{}]", i), values[*i].to_string()))
            .collect();
        let provider = NameValueCollectionValueProvider::form(pairs, Culture::invariant());
        let (value, ms) = bind_with::<Vec<i32>>(&provider, "items");

        let run: Vec<Value> = (0..).take_while(|i| present.contains(i)).map(|i| json!(values[i])).collect();
        if run.is_empty() {
            prop_assert_eq!(value, None);
        } else {
            prop_assert_eq!(value, Some(Value::Array(run)));
        }
        prop_assert!(ms.is_valid());
    }

    /// Explicit index tokens bind every present row in token order.
    #[test]
    fn explicit_tokens_keep_order(
        tokens in prop::collection::vec("[a-z]{1,4}", 1..6),
        values in prop::collection::vec(any::<i16>(), 6),
    ) {
        let mut seen = std::collections::HashSet::new();
        let tokens: Vec<String> = tokens.into_iter().filter(|t| seen.insert(t.clone())).collect();

        let mut pairs: Vec<(String, String)> = tokens
            .iter()
            .map(|t| ("rows.index".to_string(), t.clone()))
            .collect();
        for (i, t) in tokens.iter().enumerate() {
            pairs.push((format!("rows[{}]", t), values[i].to_string()));
        }
        let provider = NameValueCollectionValueProvider::form(pairs, Culture::invariant());
        let (value, _) = bind_with::<Vec<i16>>(&provider, "rows");

        let expected: Vec<Value> = (0..tokens.len()).map(|i| json!(values[i])).collect();
        prop_assert_eq!(value, Some(Value::Array(expected)));
    }
}
