//! The default recursive model binder.
//!
//! # Algorithm
//!
//! ```text
//! bind_model(ctx)
//! ├── prefix absent?  → top level: retry once with "" │ otherwise: None
//! ├── exact key hit?  → bind_simple_model  (convert, record failures)
//! ├── simple type?    → None
//! └── bind_complex_model
//!     ├── Array       → update_collection, then freeze
//!     ├── Collection  → update_collection (contents replaced)
//!     ├── Dictionary  → update_dictionary (prefix[i].key / prefix[i].value)
//!     └── Complex     → bind each allowed property, then run validators
//! ```
//!
//! # Indexes
//!
//! Sequences are discovered through `prefix.index`, which lists explicit index
//! tokens (any strings; missing rows are skipped). Without it, indexes run
//! `0, 1, 2, …` and stop at the first index with no fields at all, so
//! `items[0]`, `items[1]`, `items[3]` binds two elements.
//!
//! The binder only descends into prefixes the value provider reports, which
//! keeps binding of self-referential models finite.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::binder::{ModelBinder, ModelBindingContext, PropertyFilter};
use crate::metadata::{ModelKind, ModelMetadata, PropertyMetadata};
use crate::naming::{create_sub_index_name, create_sub_property_name, last_segment};
use crate::result::ValueProviderResult;
use crate::state::{ModelError, ModelStateDictionary};

/// Message recorded when a non-nullable value is missing.
pub const VALUE_REQUIRED_MESSAGE: &str = "A value is required.";

/// Message recorded when a value cannot be converted.
pub fn value_invalid_message(attempted: &str, display_name: &str) -> String {
    format!("The value '{}' is not valid for {}.", attempted, display_name)
}

/// Binds simple values, arrays, collections, dictionaries and complex models.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModelBinder;

impl ModelBinder for DefaultModelBinder {
    fn bind_model(
        &self,
        context: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
    ) -> Option<Value> {
        let fallback;
        let mut ctx = context;
        let mut performed_fallback = false;

        if !ctx.model_name.is_empty() && !ctx.value_provider.contains_prefix(&ctx.model_name) {
            if !ctx.fallback_to_empty_prefix {
                return None;
            }
            trace!(model = %ctx.model_name, "no matching prefix, falling back to empty prefix");
            let mut empty = ctx.child(ctx.model_metadata.clone(), "");
            empty.model = ctx.model.clone();
            fallback = empty;
            ctx = &fallback;
            performed_fallback = true;
        }

        if !performed_fallback {
            if let Some(result) = ctx.value_provider.get_value(&ctx.model_name) {
                return self.bind_simple_model(ctx, model_state, result);
            }
        }

        if !ctx.model_metadata.is_complex_type() {
            return None;
        }
        self.bind_complex_model(ctx, model_state)
    }
}

impl DefaultModelBinder {
    fn bind_simple_model(
        &self,
        ctx: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
        result: ValueProviderResult,
    ) -> Option<Value> {
        model_state.set_model_value(&ctx.model_name, result.clone());
        match result.convert_to(&ctx.model_metadata) {
            Ok(value) => value,
            Err(err) => {
                debug!(model = %ctx.model_name, error = %err, "value conversion failed");
                let message = value_invalid_message(result.attempted_value(), &display_name(ctx));
                model_state.add_error(&ctx.model_name, ModelError::with_exception(message, err));
                None
            }
        }
    }

    fn bind_complex_model(
        &self,
        ctx: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
    ) -> Option<Value> {
        match ctx.model_metadata.kind() {
            ModelKind::Simple(_) => None,
            ModelKind::Array(element) | ModelKind::Collection(element) => self
                .update_collection(ctx, model_state, &element())
                .map(Value::Array),
            ModelKind::Dictionary { key, value } => self
                .update_dictionary(ctx, model_state, &key(), &value())
                .map(Value::Object),
            ModelKind::Complex(_) => {
                let model = match ctx.model.clone() {
                    Some(Value::Object(map)) => map,
                    _ => match ctx.model_metadata.create_model() {
                        Value::Object(map) => map,
                        _ => Map::new(),
                    },
                };
                Some(Value::Object(
                    self.bind_complex_elemental_model(ctx, model_state, model),
                ))
            }
        }
    }

    fn bind_complex_elemental_model(
        &self,
        ctx: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
        mut model: Map<String, Value>,
    ) -> Map<String, Value> {
        let type_filter = ctx.model_metadata.bind_filter().clone();
        let outer = ctx.property_filter.clone();
        let filter: PropertyFilter = Arc::new(move |name: &str| {
            type_filter.is_property_allowed(name) && outer.as_ref().map_or(true, |f| f(name))
        });
        let inner = ctx.clone().with_property_filter(filter);

        for property in ctx.model_metadata.properties() {
            if should_update_property(property, &inner) {
                self.bind_property(&inner, model_state, property, &mut model);
            }
        }

        self.on_model_updated(&inner, model_state, &model);
        model
    }

    fn bind_property(
        &self,
        ctx: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
        property: &PropertyMetadata,
        model: &mut Map<String, Value>,
    ) {
        let key = create_sub_property_name(&ctx.model_name, property.name());
        if !ctx.value_provider.contains_prefix(&key) {
            return;
        }

        let metadata = property.metadata();
        let original = model
            .get(property.field_name())
            .filter(|v| !v.is_null())
            .cloned();
        // A nested model applies its own bind filter, never the parent's.
        let mut child = ctx.child(metadata.clone(), key.clone()).with_model(original);
        child.property_filter = None;
        let mut value = ctx.binders.get_binder(&metadata).bind_model(&child, model_state);

        if property.converts_empty_string_to_null() && value.as_ref().and_then(Value::as_str) == Some("") {
            value = None;
        }

        self.set_property(model_state, property, &metadata, &key, value, model);
    }

    fn set_property(
        &self,
        model_state: &mut ModelStateDictionary,
        property: &PropertyMetadata,
        metadata: &ModelMetadata,
        key: &str,
        value: Option<Value>,
        model: &mut Map<String, Value>,
    ) {
        // Required runs first so its message beats setter and fallback errors.
        if value.is_none() && model_state.is_valid_field(key) {
            if let Some(required) = property.validators().iter().find(|v| v.is_required()) {
                if let Some(message) = required.validate(None, property.label()) {
                    model_state.add_model_error(key, message);
                }
            }
        }

        let null_on_non_nullable = value.is_none() && !metadata.allows_null();

        if !null_on_non_nullable {
            match value {
                Some(value) if property.is_read_only() => {
                    model.insert(property.field_name().to_string(), value);
                }
                Some(value) => {
                    let guarded = property.setter_guard().map_or(Ok(()), |guard| guard(&value));
                    match guarded {
                        Ok(()) => {
                            model.insert(property.field_name().to_string(), value);
                        }
                        Err(message) => {
                            if model_state.is_valid_field(key) {
                                model_state.add_model_error(key, message);
                            }
                        }
                    }
                }
                None if metadata.is_optional() && !property.is_read_only() => {
                    model.insert(property.field_name().to_string(), Value::Null);
                }
                None => {}
            }
        }

        if null_on_non_nullable && model_state.is_valid_field(key) {
            model_state.add_model_error(key, VALUE_REQUIRED_MESSAGE);
        }
    }

    /// Run property and model validators, adding errors only to fields that
    /// were valid before validation started.
    fn on_model_updated(
        &self,
        ctx: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
        model: &Map<String, Value>,
    ) {
        let mut results: Vec<(String, String)> = Vec::new();

        for property in ctx.model_metadata.properties() {
            let key = create_sub_property_name(&ctx.model_name, property.name());
            let value = model.get(property.field_name());
            for validator in property.validators() {
                if let Some(message) = validator.validate(value, property.label()) {
                    results.push((key.clone(), message));
                }
            }
        }

        let whole = Value::Object(model.clone());
        for validator in ctx.model_metadata.validators() {
            if let Some(message) = validator.validate(Some(&whole), &display_name(ctx)) {
                results.push((ctx.model_name.clone(), message));
            }
        }
        for rule in ctx.model_metadata.model_validators() {
            for result in rule(&whole) {
                let key = create_sub_property_name(&ctx.model_name, &result.member_name);
                results.push((key, result.message));
            }
        }

        let mut started_valid: HashMap<String, bool> = HashMap::new();
        for (key, message) in results {
            let valid = *started_valid
                .entry(key.to_ascii_lowercase())
                .or_insert_with(|| model_state.is_valid_field(&key));
            if valid {
                model_state.add_model_error(&key, message);
            }
        }
    }

    fn update_collection(
        &self,
        ctx: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
        element: &ModelMetadata,
    ) -> Option<Vec<Value>> {
        let indexes = Indexes::discover(ctx);
        let stop_on_missing = indexes.stops_on_missing();
        let binder = ctx.binders.get_binder(element);

        let mut list = Vec::new();
        for index in indexes {
            let key = create_sub_index_name(&ctx.model_name, &index);
            if !ctx.value_provider.contains_prefix(&key) {
                if stop_on_missing {
                    break;
                }
                continue;
            }
            let child = ctx.child(element.clone(), key.clone());
            let value = binder.bind_model(&child, model_state);
            add_value_required(model_state, &key, element, value.as_ref());
            list.push(value.unwrap_or_else(|| element.default_value()));
        }

        trace!(model = %ctx.model_name, count = list.len(), "bound collection");
        if list.is_empty() {
            None
        } else {
            Some(list)
        }
    }

    fn update_dictionary(
        &self,
        ctx: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
        key_metadata: &ModelMetadata,
        value_metadata: &ModelMetadata,
    ) -> Option<Map<String, Value>> {
        let indexes = Indexes::discover(ctx);
        let stop_on_missing = indexes.stops_on_missing();
        let key_binder = ctx.binders.get_binder(key_metadata);
        let value_binder = ctx.binders.get_binder(value_metadata);

        let mut entries: Vec<(String, Value)> = Vec::new();
        for index in indexes {
            let entry = create_sub_index_name(&ctx.model_name, &index);
            let key_field = create_sub_property_name(&entry, "key");
            let value_field = create_sub_property_name(&entry, "value");
            if !(ctx.value_provider.contains_prefix(&key_field)
                && ctx.value_provider.contains_prefix(&value_field))
            {
                if stop_on_missing {
                    break;
                }
                continue;
            }

            let mut key_ctx = ctx.child(key_metadata.clone(), key_field.clone());
            key_ctx.property_filter = None;
            let key = key_binder.bind_model(&key_ctx, model_state);
            add_value_required(model_state, &key_field, key_metadata, key.as_ref());
            let Some(key) = key.as_ref().and_then(dictionary_key) else {
                continue;
            };

            let value_ctx = ctx.child(value_metadata.clone(), value_field.clone());
            let value = value_binder.bind_model(&value_ctx, model_state);
            add_value_required(model_state, &value_field, value_metadata, value.as_ref());
            entries.push((key, value.unwrap_or_else(|| value_metadata.default_value())));
        }

        if entries.is_empty() {
            return None;
        }
        let mut map = Map::new();
        for (key, value) in entries {
            map.insert(key, value);
        }
        Some(map)
    }
}

/// Read-only properties are bound only when their value can be updated in place.
fn should_update_property(property: &PropertyMetadata, ctx: &ModelBindingContext<'_>) -> bool {
    if property.is_read_only() && !property.metadata().can_update_in_place() {
        return false;
    }
    ctx.is_property_allowed(property.name())
}

fn add_value_required(
    model_state: &mut ModelStateDictionary,
    key: &str,
    metadata: &ModelMetadata,
    value: Option<&Value>,
) {
    if value.is_none() && !metadata.allows_null() && model_state.is_valid_field(key) {
        model_state.add_model_error(key, VALUE_REQUIRED_MESSAGE);
    }
}

fn dictionary_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn display_name(ctx: &ModelBindingContext<'_>) -> String {
    if let Some(name) = ctx.model_metadata.display_name() {
        return name.to_string();
    }
    match last_segment(&ctx.model_name) {
        "" => ctx.model_metadata.type_name().to_string(),
        segment => segment.to_string(),
    }
}

/// Index tokens of a sequence: explicit (`prefix.index`) or zero-based.
enum Indexes {
    Explicit(std::vec::IntoIter<String>),
    ZeroBased(std::ops::RangeFrom<usize>),
}

impl Indexes {
    fn discover(ctx: &ModelBindingContext<'_>) -> Self {
        let index_key = create_sub_property_name(&ctx.model_name, "index");
        match ctx.value_provider.get_value(&index_key) {
            Some(result) => Indexes::Explicit(result.to_strings().into_iter()),
            None => Indexes::ZeroBased(0..),
        }
    }

    fn stops_on_missing(&self) -> bool {
        matches!(self, Indexes::ZeroBased(_))
    }
}

impl Iterator for Indexes {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self {
            Indexes::Explicit(tokens) => tokens.next(),
            Indexes::ZeroBased(range) => range.next().map(|i| i.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::ModelBinderDictionary;
    use crate::metadata::{Bindable, PropertyMetadata};
    use crate::providers::NameValueCollectionValueProvider;
    use crate::validation::Validator;
    use crate::Culture;
    use serde_json::json;

    fn provider(pairs: &[(&str, &str)]) -> NameValueCollectionValueProvider {
        NameValueCollectionValueProvider::form(pairs.iter().copied(), Culture::invariant())
    }

    fn bind(
        metadata: ModelMetadata,
        name: &str,
        pairs: &[(&str, &str)],
    ) -> (Option<Value>, ModelStateDictionary) {
        let provider = provider(pairs);
        let binders = ModelBinderDictionary::new();
        let ctx = ModelBindingContext::new(metadata, name, &provider, &binders)
            .with_fallback_to_empty_prefix(true);
        let mut ms = ModelStateDictionary::new();
        let value = DefaultModelBinder.bind_model(&ctx, &mut ms);
        (value, ms)
    }

    fn person() -> ModelMetadata {
        ModelMetadata::complex::<()>(vec![
            PropertyMetadata::new("Name", String::model_metadata).validator(Validator::required()),
            PropertyMetadata::new("Age", i32::model_metadata),
            PropertyMetadata::new("Nick", Option::<String>::model_metadata),
        ])
    }

    #[test]
    fn test_simple_int() {
        let (value, ms) = bind(i32::model_metadata(), "id", &[("id", "42")]);
        assert_eq!(value, Some(json!(42)));
        assert!(ms.is_valid());
        assert_eq!(ms.get("id").unwrap().value.as_ref().unwrap().attempted_value(), "42");
    }

    #[test]
    fn test_simple_int_invalid() {
        let (value, ms) = bind(i32::model_metadata(), "id", &[("id", "abc")]);
        assert_eq!(value, None);
        let errors = &ms.get("id").unwrap().errors;
        assert_eq!(errors[0].message, "The value 'abc' is not valid for id.");
        assert!(errors[0].exception.is_some());
    }

    #[test]
    fn test_absent_simple_value() {
        let (value, ms) = bind(i32::model_metadata(), "id", &[("other", "1")]);
        assert_eq!(value, None);
        assert!(ms.is_empty());
    }

    #[test]
    fn test_complex_with_prefix() {
        let (value, ms) = bind(
            person(),
            "p",
            &[("p.Name", "Ann"), ("p.Age", "31"), ("p.Nick", "")],
        );
        assert_eq!(value, Some(json!({"Name": "Ann", "Age": 31, "Nick": null})));
        assert!(ms.is_valid());
    }

    #[test]
    fn test_complex_falls_back_to_empty_prefix() {
        let (value, _) = bind(person(), "p", &[("Name", "Ann"), ("Age", "5")]);
        assert_eq!(value, Some(json!({"Name": "Ann", "Age": 5, "Nick": null})));
    }

    #[test]
    fn test_required_message_wins() {
        let (_, ms) = bind(person(), "p", &[("p.Name", ""), ("p.Age", "1")]);
        let errors = &ms.get("p.Name").unwrap().errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "The Name field is required.");
    }

    #[test]
    fn test_missing_value_on_value_type() {
        let (value, ms) = bind(person(), "p", &[("p.Name", "Ann"), ("p.Age", " ")]);
        assert_eq!(value.unwrap()["Age"], json!(0));
        assert_eq!(
            ms.get("p.Age").unwrap().errors[0].message,
            VALUE_REQUIRED_MESSAGE
        );
    }

    #[test]
    fn test_conversion_error_uses_display_name() {
        let meta = ModelMetadata::complex::<()>(vec![
            PropertyMetadata::new("Age", i32::model_metadata).display_name("Your age"),
        ]);
        let (_, ms) = bind(meta, "", &[("Age", "old")]);
        let errors = &ms.get("Age").unwrap().errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "The value 'old' is not valid for Your age.");
    }

    #[test]
    fn test_setter_guard_error() {
        let meta = ModelMetadata::complex::<()>(vec![PropertyMetadata::new(
            "Code",
            String::model_metadata,
        )
        .setter(|v| match v.as_str() {
            Some(s) if s.len() == 3 => Ok(()),
            _ => Err("Code must have three letters".into()),
        })]);
        let (value, ms) = bind(meta, "", &[("Code", "ABCD")]);
        assert_eq!(value.unwrap()["Code"], json!(""));
        assert_eq!(
            ms.get("Code").unwrap().errors[0].message,
            "Code must have three letters"
        );
    }

    #[test]
    fn test_explicit_index_tokens() {
        let (value, ms) = bind(
            Vec::<i32>::model_metadata(),
            "items",
            &[
                ("items.index", "b"),
                ("items.index", "a"),
                ("items[a]", "1"),
                ("items[b]", "2"),
            ],
        );
        assert_eq!(value, Some(json!([2, 1])));
        assert!(ms.is_valid());
    }

    #[test]
    fn test_explicit_index_skips_missing() {
        let (value, _) = bind(
            Vec::<i32>::model_metadata(),
            "items",
            &[
                ("items.index", "x"),
                ("items.index", "y"),
                ("items.index", "z"),
                ("items[x]", "1"),
                ("items[z]", "3"),
            ],
        );
        assert_eq!(value, Some(json!([1, 3])));
    }

    #[test]
    fn test_zero_based_stops_at_gap() {
        let (value, _) = bind(
            Vec::<i32>::model_metadata(),
            "items",
            &[("items[0]", "1"), ("items[1]", "2"), ("items[3]", "4")],
        );
        assert_eq!(value, Some(json!([1, 2])));
    }

    #[test]
    fn test_invalid_element_becomes_default() {
        let (value, ms) = bind(
            Vec::<i32>::model_metadata(),
            "items",
            &[("items[0]", "1"), ("items[1]", "x")],
        );
        assert_eq!(value, Some(json!([1, 0])));
        assert!(!ms.is_valid_field("items[1]"));
        assert_eq!(ms.get("items[1]").unwrap().errors.len(), 1);
    }

    #[test]
    fn test_array_of_complex() {
        let (value, _) = bind(
            Box::<[i32]>::model_metadata(),
            "ids",
            &[("ids[0]", "5"), ("ids[1]", "6")],
        );
        assert_eq!(value, Some(json!([5, 6])));
    }

    #[test]
    fn test_empty_collection_is_none() {
        let (value, ms) = bind(Vec::<i32>::model_metadata(), "items", &[("other", "1")]);
        assert_eq!(value, None);
        assert!(ms.is_valid());
    }

    #[test]
    fn test_dictionary() {
        let (value, ms) = bind(
            HashMap::<String, i32>::model_metadata(),
            "scores",
            &[
                ("scores[0].key", "ann"),
                ("scores[0].value", "3"),
                ("scores[1].key", "bob"),
                ("scores[1].value", "4"),
                ("scores[2].key", "eve"),
            ],
        );
        assert_eq!(value, Some(json!({"ann": 3, "bob": 4})));
        assert!(ms.is_valid());
    }

    #[test]
    fn test_dictionary_skips_bad_keys() {
        let (value, ms) = bind(
            HashMap::<i32, String>::model_metadata(),
            "m",
            &[
                ("m[0].key", "x"),
                ("m[0].value", "a"),
                ("m[1].key", "2"),
                ("m[1].value", "b"),
            ],
        );
        assert_eq!(value, Some(json!({"2": "b"})));
        assert!(!ms.is_valid_field("m[0].key"));
    }

    #[test]
    fn test_property_filter_and_bind_filter() {
        let meta = person().with_bind_filter(crate::BindFilter::new().exclude(["Age"]));
        let provider = provider(&[("Name", "Ann"), ("Age", "9"), ("Nick", "n")]);
        let binders = ModelBinderDictionary::new();
        let ctx = ModelBindingContext::new(meta, "", &provider, &binders)
            .with_property_filter(Arc::new(|name: &str| name != "Nick"));
        let mut ms = ModelStateDictionary::new();
        let value = DefaultModelBinder.bind_model(&ctx, &mut ms).unwrap();
        assert_eq!(value, json!({"Name": "Ann", "Age": 0, "Nick": null}));
    }

    struct Address;

    impl Bindable for Address {
        fn model_metadata() -> ModelMetadata {
            ModelMetadata::complex::<Address>(vec![
                PropertyMetadata::new("Id", i32::model_metadata),
                PropertyMetadata::new("City", String::model_metadata),
            ])
        }
    }

    fn order() -> ModelMetadata {
        ModelMetadata::complex::<()>(vec![
            PropertyMetadata::new("Id", i32::model_metadata),
            PropertyMetadata::new("Address", Address::model_metadata),
        ])
    }

    fn bind_filtered(
        metadata: ModelMetadata,
        pairs: &[(&str, &str)],
        filter: PropertyFilter,
    ) -> Value {
        let provider = provider(pairs);
        let binders = ModelBinderDictionary::new();
        let ctx = ModelBindingContext::new(metadata, "o", &provider, &binders)
            .with_property_filter(filter);
        let mut ms = ModelStateDictionary::new();
        DefaultModelBinder.bind_model(&ctx, &mut ms).unwrap()
    }

    #[test]
    fn test_parameter_filter_stops_at_nested_model() {
        let value = bind_filtered(
            order(),
            &[("o.Id", "5"), ("o.Address.Id", "9"), ("o.Address.City", "Oslo")],
            Arc::new(|name: &str| name == "Address"),
        );
        assert_eq!(value, json!({"Id": 0, "Address": {"Id": 9, "City": "Oslo"}}));
    }

    #[test]
    fn test_type_bind_filter_stops_at_nested_model() {
        let meta = order().with_bind_filter(crate::BindFilter::new().exclude(["Id"]));
        let (value, ms) = bind(
            meta,
            "o",
            &[("o.Id", "5"), ("o.Address.Id", "9"), ("o.Address.City", "Oslo")],
        );
        assert_eq!(value, Some(json!({"Id": 0, "Address": {"Id": 9, "City": "Oslo"}})));
        assert!(ms.is_valid());
    }

    #[test]
    fn test_collection_elements_keep_parameter_filter() {
        let value = bind_filtered(
            Vec::<Address>::model_metadata(),
            &[("o[0].Id", "1"), ("o[0].City", "Oslo"), ("o[1].Id", "2"), ("o[1].City", "Rome")],
            Arc::new(|name: &str| name != "Id"),
        );
        assert_eq!(
            value,
            json!([{"Id": 0, "City": "Oslo"}, {"Id": 0, "City": "Rome"}])
        );
    }

    #[test]
    fn test_read_only_simple_property_is_skipped() {
        let meta = ModelMetadata::complex::<()>(vec![
            PropertyMetadata::new("Id", i32::model_metadata).read_only(),
            PropertyMetadata::new("Tags", Vec::<String>::model_metadata).read_only(),
        ]);
        let (value, _) = bind(meta, "", &[("Id", "5"), ("Tags[0]", "x")]);
        assert_eq!(value, Some(json!({"Id": 0, "Tags": ["x"]})));
    }

    #[test]
    fn test_existing_model_is_updated_in_place() {
        let provider = provider(&[("Age", "40")]);
        let binders = ModelBinderDictionary::new();
        let ctx = ModelBindingContext::new(person(), "", &provider, &binders)
            .with_model(Some(json!({"Name": "Kept", "Age": 1, "Nick": "k"})));
        let mut ms = ModelStateDictionary::new();
        let value = DefaultModelBinder.bind_model(&ctx, &mut ms).unwrap();
        assert_eq!(value, json!({"Name": "Kept", "Age": 40, "Nick": "k"}));
        assert!(ms.is_valid());
    }

    #[test]
    fn test_validators_skip_invalid_fields() {
        let meta = ModelMetadata::complex::<()>(vec![PropertyMetadata::new(
            "Age",
            i32::model_metadata,
        )
        .validator(Validator::range(1.0, 10.0))])
        .with_model_validator(|model| {
            if model["Age"] == json!(0) {
                vec![crate::ValidationResult::new("Age", "Age must be set")]
            } else {
                Vec::new()
            }
        });
        let (_, ms) = bind(meta, "", &[("Age", "zz")]);
        let errors = &ms.get("Age").unwrap().errors;
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("The value 'zz'"));
    }

    #[test]
    fn test_recursive_model_terminates() {
        fn node() -> ModelMetadata {
            ModelMetadata::complex::<u8>(vec![
                PropertyMetadata::new("Name", String::model_metadata),
                PropertyMetadata::new("Children", children),
            ])
        }
        fn children() -> ModelMetadata {
            ModelMetadata::new(
                "Vec<Node>",
                std::any::TypeId::of::<Vec<u8>>(),
                ModelKind::Collection(node),
            )
        }
        let (value, _) = bind(
            node(),
            "root",
            &[("root.Name", "a"), ("root.Children[0].Name", "b")],
        );
        assert_eq!(
            value,
            Some(json!({"Name": "a", "Children": [{"Name": "b", "Children": []}]}))
        );
    }
}
