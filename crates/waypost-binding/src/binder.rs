//! The model binder protocol.
//!
//! A [`ModelBinder`] turns what a [`ValueProvider`] holds under one field path
//! into a value tree. Binders are looked up per type in a
//! [`ModelBinderDictionary`], which falls back to the
//! [`DefaultModelBinder`](crate::DefaultModelBinder).
//!
//! Each sub-binding (one property, one element) gets its own
//! [`ModelBindingContext`], but every binder in a pass writes into the same
//! [`ModelStateDictionary`], which is threaded through by `&mut`.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::default_binder::DefaultModelBinder;
use crate::metadata::{Bindable, ModelMetadata};
use crate::provider::ValueProvider;
use crate::state::ModelStateDictionary;

/// Predicate deciding which property names may be bound.
pub type PropertyFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Converts request values into a model value.
///
/// Returns `None` when nothing was bound. Failures are recorded in
/// `model_state` and never returned.
pub trait ModelBinder: Send + Sync {
    fn bind_model(
        &self,
        context: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
    ) -> Option<Value>;
}

/// A binder backed by a closure.
pub struct FnModelBinder<F> {
    f: F,
}

/// Wrap a closure as a [`ModelBinder`].
pub fn binder_fn<F>(f: F) -> FnModelBinder<F>
where
    F: Fn(&ModelBindingContext<'_>, &mut ModelStateDictionary) -> Option<Value> + Send + Sync,
{
    FnModelBinder { f }
}

impl<F> ModelBinder for FnModelBinder<F>
where
    F: Fn(&ModelBindingContext<'_>, &mut ModelStateDictionary) -> Option<Value> + Send + Sync,
{
    fn bind_model(
        &self,
        context: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
    ) -> Option<Value> {
        (self.f)(context, model_state)
    }
}

/// State for one binding operation.
#[derive(Clone)]
pub struct ModelBindingContext<'a> {
    pub model_metadata: ModelMetadata,
    /// Field path of the model, e.g. `person.Address`.
    pub model_name: String,
    /// Existing value to update in place, if any.
    pub model: Option<Value>,
    pub value_provider: &'a dyn ValueProvider,
    pub property_filter: Option<PropertyFilter>,
    /// Retry with the empty prefix when nothing matches `model_name`.
    pub fallback_to_empty_prefix: bool,
    pub binders: &'a ModelBinderDictionary,
}

impl<'a> ModelBindingContext<'a> {
    pub fn new(
        model_metadata: ModelMetadata,
        model_name: impl Into<String>,
        value_provider: &'a dyn ValueProvider,
        binders: &'a ModelBinderDictionary,
    ) -> Self {
        Self {
            model_metadata,
            model_name: model_name.into(),
            model: None,
            value_provider,
            property_filter: None,
            fallback_to_empty_prefix: false,
            binders,
        }
    }

    pub fn with_model(mut self, model: Option<Value>) -> Self {
        self.model = model;
        self
    }

    pub fn with_property_filter(mut self, filter: PropertyFilter) -> Self {
        self.property_filter = Some(filter);
        self
    }

    pub fn with_fallback_to_empty_prefix(mut self, fallback: bool) -> Self {
        self.fallback_to_empty_prefix = fallback;
        self
    }

    /// A context for a sub-field sharing this context's provider, binders
    /// and property filter. Collection and dictionary elements keep the
    /// filter; complex-model properties clear it.
    pub fn child(&self, model_metadata: ModelMetadata, model_name: impl Into<String>) -> Self {
        Self {
            model_metadata,
            model_name: model_name.into(),
            model: None,
            value_provider: self.value_provider,
            property_filter: self.property_filter.clone(),
            fallback_to_empty_prefix: false,
            binders: self.binders,
        }
    }

    pub fn is_property_allowed(&self, name: &str) -> bool {
        self.property_filter.as_ref().map_or(true, |f| f(name))
    }
}

impl fmt::Debug for ModelBindingContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBindingContext")
            .field("model_name", &self.model_name)
            .field("type_name", &self.model_metadata.type_name())
            .field("value_provider", &self.value_provider.name())
            .field("has_model", &self.model.is_some())
            .field("fallback_to_empty_prefix", &self.fallback_to_empty_prefix)
            .finish_non_exhaustive()
    }
}

/// Binders registered per type, with a default for everything else.
#[derive(Clone)]
pub struct ModelBinderDictionary {
    binders: HashMap<TypeId, Arc<dyn ModelBinder>>,
    default_binder: Arc<dyn ModelBinder>,
}

impl Default for ModelBinderDictionary {
    fn default() -> Self {
        Self {
            binders: HashMap::new(),
            default_binder: Arc::new(DefaultModelBinder),
        }
    }
}

impl ModelBinderDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `binder` for values of type `T`.
    pub fn insert<T: Bindable>(&mut self, binder: impl ModelBinder + 'static) {
        self.binders.insert(TypeId::of::<T>(), Arc::new(binder));
    }

    pub fn with<T: Bindable>(mut self, binder: impl ModelBinder + 'static) -> Self {
        self.insert::<T>(binder);
        self
    }

    pub fn set_default_binder(&mut self, binder: Arc<dyn ModelBinder>) {
        self.default_binder = binder;
    }

    pub fn len(&self) -> usize {
        self.binders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }

    /// The binder for the type described by `metadata`.
    pub fn get_binder(&self, metadata: &ModelMetadata) -> Arc<dyn ModelBinder> {
        self.binders
            .get(&metadata.type_id())
            .cloned()
            .unwrap_or_else(|| self.default_binder.clone())
    }

    /// Bind with the binder registered for the context's model type.
    pub fn bind(
        &self,
        context: &ModelBindingContext<'_>,
        model_state: &mut ModelStateDictionary,
    ) -> Option<Value> {
        self.get_binder(&context.model_metadata)
            .bind_model(context, model_state)
    }
}

impl fmt::Debug for ModelBinderDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBinderDictionary")
            .field("binders", &self.binders.len())
            .finish_non_exhaustive()
    }
}
