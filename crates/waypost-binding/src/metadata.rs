//! Model metadata: what the binder knows about a type.
//!
//! Binding never inspects Rust types at runtime. Every bindable type instead
//! describes itself once through [`Bindable::model_metadata`], and the binder
//! walks that description:
//!
//! ```text
//! ModelKind
//! ├── Simple(SimpleType)        → converted from a single request value
//! ├── Array(elem)               → bound as a list, then frozen
//! ├── Collection(elem)          → indexed elements, contents replaced
//! ├── Dictionary { key, value } → prefix[i].key / prefix[i].value pairs
//! └── Complex(properties)       → one sub-binding per property
//! ```
//!
//! Element and property types are referenced through [`MetadataFn`] pointers
//! so that self-referential models (a `Category` with `children:
//! Vec<Category>`) describe themselves without unbounded recursion.
//!
//! Bound values are `serde_json::Value` trees. Complex models become JSON
//! objects keyed by each property's serialized field name, so the final typed
//! value is produced by `serde` (see `ActionParameters::get` in the dispatch
//! crate).

use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value};

use crate::culture::Culture;
use crate::validation::{ModelRule, Validator};

/// Lazily produces the metadata of an element or property type.
pub type MetadataFn = fn() -> ModelMetadata;

/// Guard run before a property is assigned; an `Err` becomes a model error.
pub type SetterFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Types convertible from a single request string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleType {
    Bool,
    Char,
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    String,
    Guid,
    /// Unit-only enum; variants are matched case-insensitively.
    Enum(&'static [&'static str]),
}

impl SimpleType {
    /// Value types cannot hold null (everything except strings).
    pub fn is_value_type(&self) -> bool {
        !matches!(self, SimpleType::String)
    }

    /// The zero value used when a collection element or dictionary value is null.
    pub fn default_value(&self) -> Value {
        match self {
            SimpleType::Bool => Value::Bool(false),
            SimpleType::Char => Value::String('\0'.to_string()),
            SimpleType::Int { .. } => Value::from(0),
            SimpleType::Float { .. } => Value::from(0.0),
            SimpleType::String => Value::String(String::new()),
            SimpleType::Guid => Value::String(uuid::Uuid::nil().to_string()),
            SimpleType::Enum(variants) => variants
                .first()
                .map(|v| Value::String((*v).to_string()))
                .unwrap_or(Value::Null),
        }
    }

    /// Parse a request string. Returns `None` when the text is not a valid
    /// value of this type.
    pub fn parse(&self, input: &str, culture: &Culture) -> Option<Value> {
        match self {
            SimpleType::Bool => {
                let trimmed = input.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Some(Value::Bool(true))
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Some(Value::Bool(false))
                } else {
                    None
                }
            }
            SimpleType::Char => {
                let mut chars = input.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::String(c.to_string())),
                    _ => None,
                }
            }
            SimpleType::Int { bits, signed } => {
                let n = culture.parse_integer(input)?;
                int_in_range(n, *bits, *signed).then(|| {
                    if *signed {
                        Value::from(n as i64)
                    } else {
                        Value::from(n as u64)
                    }
                })
            }
            SimpleType::Float { bits } => {
                let f = culture.parse_float(input)?;
                if *bits == 32 && f.abs() > f32::MAX as f64 {
                    return None;
                }
                Number::from_f64(f).map(Value::Number)
            }
            SimpleType::String => Some(Value::String(input.to_string())),
            SimpleType::Guid => uuid::Uuid::parse_str(input.trim())
                .ok()
                .map(|g| Value::String(g.to_string())),
            SimpleType::Enum(variants) => {
                let trimmed = input.trim();
                if let Some(v) = variants.iter().find(|v| v.eq_ignore_ascii_case(trimmed)) {
                    return Some(Value::String((*v).to_string()));
                }
                trimmed
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| variants.get(i))
                    .map(|v| Value::String((*v).to_string()))
            }
        }
    }

    /// Accept an already-typed JSON scalar when it fits this type.
    ///
    /// Non-string scalars are re-read with the invariant culture.
    pub fn accept(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (SimpleType::Bool, Value::Bool(_)) => Some(value.clone()),
            (SimpleType::String, Value::String(_)) => Some(value.clone()),
            (SimpleType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (SimpleType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (_, Value::Number(n)) => self.parse(&n.to_string(), &Culture::invariant()),
            (_, Value::Bool(b)) => self.parse(&b.to_string(), &Culture::invariant()),
            _ => None,
        }
    }
}

fn int_in_range(n: i128, bits: u8, signed: bool) -> bool {
    let bits = u32::from(bits.min(64));
    if signed {
        let max = (1i128 << (bits - 1)) - 1;
        n >= -max - 1 && n <= max
    } else {
        n >= 0 && n <= (1i128 << bits) - 1
    }
}

/// The shape of a bindable type.
#[derive(Clone)]
pub enum ModelKind {
    Simple(SimpleType),
    Array(MetadataFn),
    Collection(MetadataFn),
    Dictionary { key: MetadataFn, value: MetadataFn },
    Complex(Vec<PropertyMetadata>),
}

impl fmt::Debug for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Simple(t) => write!(f, "Simple({:?})", t),
            ModelKind::Array(elem) => write!(f, "Array({})", elem().type_name()),
            ModelKind::Collection(elem) => write!(f, "Collection({})", elem().type_name()),
            ModelKind::Dictionary { key, value } => write!(
                f,
                "Dictionary({}, {})",
                key().type_name(),
                value().type_name()
            ),
            ModelKind::Complex(props) => f
                .debug_list()
                .entries(props.iter().map(|p| p.name()))
                .finish(),
        }
    }
}

/// Type-level include/exclude lists for complex models.
///
/// Names are compared case-insensitively. An empty include list allows every
/// property that is not excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl BindFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from comma-separated lists, e.g. `("Name, Email", "")`.
    pub fn from_lists(include: &str, exclude: &str) -> Self {
        Self {
            include: split_list(include),
            exclude: split_list(exclude),
        }
    }

    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn is_property_allowed(&self, name: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|i| i.eq_ignore_ascii_case(name));
        included && !self.exclude.iter().any(|e| e.eq_ignore_ascii_case(name))
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Everything the binder needs to know about one type.
#[derive(Clone)]
pub struct ModelMetadata {
    type_name: &'static str,
    type_id: TypeId,
    kind: ModelKind,
    optional: bool,
    display_name: Option<String>,
    bind_filter: BindFilter,
    validators: Vec<Validator>,
    model_validators: Vec<ModelRule>,
    create_model: Option<fn() -> Value>,
}

impl ModelMetadata {
    pub fn new(type_name: &'static str, type_id: TypeId, kind: ModelKind) -> Self {
        Self {
            type_name,
            type_id,
            kind,
            optional: false,
            display_name: None,
            bind_filter: BindFilter::default(),
            validators: Vec::new(),
            model_validators: Vec::new(),
            create_model: None,
        }
    }

    /// Metadata for a simple type `T`.
    pub fn simple<T: 'static>(simple: SimpleType) -> Self {
        Self::new(
            std::any::type_name::<T>(),
            TypeId::of::<T>(),
            ModelKind::Simple(simple),
        )
    }

    /// Metadata for a complex type `T` with the given properties.
    pub fn complex<T: 'static>(properties: Vec<PropertyMetadata>) -> Self {
        Self::new(
            std::any::type_name::<T>(),
            TypeId::of::<T>(),
            ModelKind::Complex(properties),
        )
    }

    /// Metadata of a registered bindable type.
    pub fn of<T: Bindable>() -> Self {
        T::model_metadata()
    }

    /// Mark the type as accepting null (`Option<T>`).
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_bind_filter(mut self, filter: BindFilter) -> Self {
        self.bind_filter = filter;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Add a rule evaluated against the whole bound model.
    pub fn with_model_validator<F>(mut self, rule: F) -> Self
    where
        F: Fn(&Value) -> Vec<crate::validation::ValidationResult> + Send + Sync + 'static,
    {
        self.model_validators.push(Arc::new(rule));
        self
    }

    /// Override how a fresh model instance is created.
    pub fn with_create_model(mut self, create: fn() -> Value) -> Self {
        self.create_model = Some(create);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn bind_filter(&self) -> &BindFilter {
        &self.bind_filter
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn model_validators(&self) -> &[ModelRule] {
        &self.model_validators
    }

    /// Complex types are everything not convertible from a single string.
    pub fn is_complex_type(&self) -> bool {
        !matches!(self.kind, ModelKind::Simple(_))
    }

    /// Whether a null value may be assigned.
    pub fn allows_null(&self) -> bool {
        match self.kind {
            ModelKind::Simple(t) => self.optional || !t.is_value_type(),
            _ => true,
        }
    }

    /// Read-only properties of this type can still be bound by updating the
    /// existing value in place.
    pub fn can_update_in_place(&self) -> bool {
        matches!(
            self.kind,
            ModelKind::Complex(_) | ModelKind::Collection(_) | ModelKind::Dictionary { .. }
        )
    }

    /// Property descriptions; empty for non-complex types.
    pub fn properties(&self) -> &[PropertyMetadata] {
        match &self.kind {
            ModelKind::Complex(props) => props,
            _ => &[],
        }
    }

    /// A fresh model instance.
    pub fn create_model(&self) -> Value {
        if let Some(create) = self.create_model {
            return create();
        }
        match &self.kind {
            ModelKind::Simple(t) => t.default_value(),
            ModelKind::Array(_) | ModelKind::Collection(_) => Value::Array(Vec::new()),
            ModelKind::Dictionary { .. } => Value::Object(Map::new()),
            ModelKind::Complex(props) => {
                let mut map = Map::new();
                for prop in props {
                    map.insert(prop.field_name().to_string(), prop.metadata().default_value());
                }
                Value::Object(map)
            }
        }
    }

    /// The value substituted for null elements: null for optional types,
    /// otherwise a fresh model.
    pub fn default_value(&self) -> Value {
        if self.optional {
            Value::Null
        } else {
            self.create_model()
        }
    }
}

impl fmt::Debug for ModelMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelMetadata")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

/// One bindable property of a complex model.
#[derive(Clone)]
pub struct PropertyMetadata {
    name: String,
    field: String,
    metadata: MetadataFn,
    read_only: bool,
    display_name: Option<String>,
    validators: Vec<Validator>,
    setter: Option<SetterFn>,
    convert_empty_string_to_null: bool,
}

impl PropertyMetadata {
    /// A property bound under `name`, stored under the same object key.
    pub fn new(name: impl Into<String>, metadata: MetadataFn) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            metadata,
            read_only: false,
            display_name: None,
            validators: Vec::new(),
            setter: None,
            convert_empty_string_to_null: true,
        }
    }

    /// Store the value under a different object key than the request name.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn setter<F>(mut self, guard: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(guard));
        self
    }

    /// Keep `""` as an empty string instead of turning it into null.
    pub fn keep_empty_strings(mut self) -> Self {
        self.convert_empty_string_to_null = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_name(&self) -> &str {
        &self.field
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Label used in error messages: the display name, or the property name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn setter_guard(&self) -> Option<&SetterFn> {
        self.setter.as_ref()
    }

    pub fn converts_empty_string_to_null(&self) -> bool {
        self.convert_empty_string_to_null
    }

    /// Metadata of the property type, labelled with this property's name.
    pub fn metadata(&self) -> ModelMetadata {
        (self.metadata)().with_display_name(self.label())
    }
}

impl fmt::Debug for PropertyMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("name", &self.name)
            .field("field", &self.field)
            .field("read_only", &self.read_only)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

/// A type the model binder can populate.
///
/// Implemented here for primitives, strings, `Uuid`, `Option`, `Box`, and the
/// standard collections. Structs and unit enums use `#[derive(Bindable)]`.
pub trait Bindable: 'static {
    fn model_metadata() -> ModelMetadata;
}

macro_rules! bindable_simple {
    ($($t:ty => $simple:expr),* $(,)?) => {
        $(
            impl Bindable for $t {
                fn model_metadata() -> ModelMetadata {
                    ModelMetadata::simple::<$t>($simple)
                }
            }
        )*
    };
}

bindable_simple! {
    bool => SimpleType::Bool,
    char => SimpleType::Char,
    i8 => SimpleType::Int { bits: 8, signed: true },
    i16 => SimpleType::Int { bits: 16, signed: true },
    i32 => SimpleType::Int { bits: 32, signed: true },
    i64 => SimpleType::Int { bits: 64, signed: true },
    isize => SimpleType::Int { bits: 64, signed: true },
    u8 => SimpleType::Int { bits: 8, signed: false },
    u16 => SimpleType::Int { bits: 16, signed: false },
    u32 => SimpleType::Int { bits: 32, signed: false },
    u64 => SimpleType::Int { bits: 64, signed: false },
    usize => SimpleType::Int { bits: 64, signed: false },
    f32 => SimpleType::Float { bits: 32 },
    f64 => SimpleType::Float { bits: 64 },
    String => SimpleType::String,
    uuid::Uuid => SimpleType::Guid,
}

impl<T: Bindable> Bindable for Option<T> {
    fn model_metadata() -> ModelMetadata {
        T::model_metadata().optional()
    }
}

impl<T: Bindable> Bindable for Box<T> {
    fn model_metadata() -> ModelMetadata {
        T::model_metadata()
    }
}

macro_rules! bindable_collection {
    ($($coll:ident $(: $bound:path)?),* $(,)?) => {
        $(
            impl<T: Bindable $(+ $bound)?> Bindable for $coll<T> {
                fn model_metadata() -> ModelMetadata {
                    ModelMetadata::new(
                        std::any::type_name::<$coll<T>>(),
                        TypeId::of::<$coll<T>>(),
                        ModelKind::Collection(T::model_metadata),
                    )
                }
            }
        )*
    };
}

bindable_collection! {
    Vec,
    VecDeque,
    HashSet: std::hash::Hash,
    BTreeSet: Ord,
}

impl<T: Bindable> Bindable for Box<[T]> {
    fn model_metadata() -> ModelMetadata {
        ModelMetadata::new(
            std::any::type_name::<Box<[T]>>(),
            TypeId::of::<Box<[T]>>(),
            ModelKind::Array(T::model_metadata),
        )
    }
}

impl<K: Bindable, V: Bindable, S: 'static> Bindable for HashMap<K, V, S> {
    fn model_metadata() -> ModelMetadata {
        ModelMetadata::new(
            std::any::type_name::<HashMap<K, V, S>>(),
            TypeId::of::<HashMap<K, V, S>>(),
            ModelKind::Dictionary {
                key: K::model_metadata,
                value: V::model_metadata,
            },
        )
    }
}

impl<K: Bindable, V: Bindable> Bindable for BTreeMap<K, V> {
    fn model_metadata() -> ModelMetadata {
        ModelMetadata::new(
            std::any::type_name::<BTreeMap<K, V>>(),
            TypeId::of::<BTreeMap<K, V>>(),
            ModelKind::Dictionary {
                key: K::model_metadata,
                value: V::model_metadata,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_parsing_respects_width() {
        let inv = Culture::invariant();
        let t = SimpleType::Int {
            bits: 8,
            signed: true,
        };
        assert_eq!(t.parse("127", &inv), Some(json!(127)));
        assert_eq!(t.parse("128", &inv), None);
        assert_eq!(t.parse("-128", &inv), Some(json!(-128)));

        let u = SimpleType::Int {
            bits: 64,
            signed: false,
        };
        assert_eq!(u.parse("18446744073709551615", &inv), Some(json!(u64::MAX)));
        assert_eq!(u.parse("-1", &inv), None);
    }

    #[test]
    fn test_bool_and_enum_parsing() {
        let inv = Culture::invariant();
        assert_eq!(SimpleType::Bool.parse("TRUE", &inv), Some(json!(true)));
        assert_eq!(SimpleType::Bool.parse("yes", &inv), None);

        let e = SimpleType::Enum(&["Red", "Green"]);
        assert_eq!(e.parse("green", &inv), Some(json!("Green")));
        assert_eq!(e.parse("1", &inv), Some(json!("Green")));
        assert_eq!(e.parse("Blue", &inv), None);
    }

    #[test]
    fn test_guid_parsing() {
        let inv = Culture::invariant();
        let g = SimpleType::Guid.parse("6F9619FF-8B86-D011-B42D-00CF4FC964FF", &inv);
        assert_eq!(g, Some(json!("6f9619ff-8b86-d011-b42d-00cf4fc964ff")));
        assert_eq!(SimpleType::Guid.parse("nope", &inv), None);
    }

    #[test]
    fn test_accept_typed_scalars() {
        let int = SimpleType::Int {
            bits: 32,
            signed: true,
        };
        assert_eq!(int.accept(&json!(5)), Some(json!(5)));
        assert_eq!(int.accept(&json!(1.5)), None);
        assert_eq!(SimpleType::String.accept(&json!(5)), Some(json!("5")));
    }

    #[test]
    fn test_allows_null() {
        assert!(!i32::model_metadata().allows_null());
        assert!(Option::<i32>::model_metadata().allows_null());
        assert!(String::model_metadata().allows_null());
        assert!(Vec::<i32>::model_metadata().allows_null());
    }

    #[test]
    fn test_in_place_update_rules() {
        assert!(!String::model_metadata().can_update_in_place());
        assert!(!Box::<[i32]>::model_metadata().can_update_in_place());
        assert!(Vec::<i32>::model_metadata().can_update_in_place());
        assert!(HashMap::<String, i32>::model_metadata().can_update_in_place());
    }

    #[test]
    fn test_bind_filter() {
        let filter = BindFilter::from_lists("Name, Email", "");
        assert!(filter.is_property_allowed("name"));
        assert!(!filter.is_property_allowed("Password"));

        let filter = BindFilter::new().exclude(["Password"]);
        assert!(filter.is_property_allowed("Name"));
        assert!(!filter.is_property_allowed("password"));
    }

    #[test]
    fn test_create_model_for_complex() {
        let meta = ModelMetadata::complex::<()>(vec![
            PropertyMetadata::new("Name", String::model_metadata),
            PropertyMetadata::new("Age", i32::model_metadata).field("age"),
            PropertyMetadata::new("Nick", Option::<String>::model_metadata),
        ]);
        assert_eq!(
            meta.create_model(),
            json!({"Name": "", "age": 0, "Nick": null})
        );
    }

    #[test]
    fn test_property_metadata_label() {
        let p = PropertyMetadata::new("Email", String::model_metadata).display_name("E-mail");
        assert_eq!(p.label(), "E-mail");
        assert_eq!(p.metadata().display_name(), Some("E-mail"));
    }
}
