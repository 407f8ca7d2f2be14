//! Per-request value provider construction.
//!
//! Each [`ValueProviderFactory`] looks at the request and may contribute one
//! provider. [`ValueProviderFactories`] asks them in order and chains the
//! results, so earlier factories take precedence:
//!
//! | Factory | Source | Culture |
//! |---------|--------|---------|
//! | [`FormValueProviderFactory`] | posted form fields | request |
//! | [`JsonValueProviderFactory`] | `application/json` body | request |
//! | [`RouteDataValueProviderFactory`] | route values | invariant |
//! | [`QueryStringValueProviderFactory`] | query string | invariant |

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use waypost_binding::{
    DictionaryValueProvider, JsonValueProvider, NameValueCollectionValueProvider, ValueProvider,
    ValueProviderCollection,
};

use crate::context::ControllerContext;

/// Builds the value provider for one source of request data.
pub trait ValueProviderFactory: Send + Sync {
    /// `Ok(None)` when the request has nothing for this source.
    fn get_value_provider(
        &self,
        ctx: &ControllerContext,
    ) -> anyhow::Result<Option<Arc<dyn ValueProvider>>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FormValueProviderFactory;

impl ValueProviderFactory for FormValueProviderFactory {
    fn get_value_provider(
        &self,
        ctx: &ControllerContext,
    ) -> anyhow::Result<Option<Arc<dyn ValueProvider>>> {
        let form = ctx.request.form();
        if form.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(NameValueCollectionValueProvider::form(
            form.iter().cloned(),
            ctx.culture.clone(),
        ))))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonValueProviderFactory;

impl ValueProviderFactory for JsonValueProviderFactory {
    fn get_value_provider(
        &self,
        ctx: &ControllerContext,
    ) -> anyhow::Result<Option<Arc<dyn ValueProvider>>> {
        let is_json = ctx
            .request
            .content_type()
            .map_or(false, |ct| ct.eq_ignore_ascii_case("application/json"));
        let Some(body) = ctx.request.body().filter(|_| is_json) else {
            return Ok(None);
        };
        let provider = JsonValueProvider::from_body(body, ctx.culture.clone())
            .context("request body is not valid JSON")?;
        Ok(provider.map(|p| Arc::new(p) as Arc<dyn ValueProvider>))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouteDataValueProviderFactory;

impl ValueProviderFactory for RouteDataValueProviderFactory {
    fn get_value_provider(
        &self,
        ctx: &ControllerContext,
    ) -> anyhow::Result<Option<Arc<dyn ValueProvider>>> {
        Ok(Some(Arc::new(DictionaryValueProvider::route_data(
            ctx.route_data.values().clone(),
        ))))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryStringValueProviderFactory;

impl ValueProviderFactory for QueryStringValueProviderFactory {
    fn get_value_provider(
        &self,
        ctx: &ControllerContext,
    ) -> anyhow::Result<Option<Arc<dyn ValueProvider>>> {
        let pairs = ctx.request.query_pairs();
        if pairs.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::new(NameValueCollectionValueProvider::query_string(pairs))))
    }
}

/// The factories consulted for every request, highest precedence first.
#[derive(Clone)]
pub struct ValueProviderFactories {
    factories: Vec<Arc<dyn ValueProviderFactory>>,
}

impl Default for ValueProviderFactories {
    fn default() -> Self {
        Self::empty()
            .with(FormValueProviderFactory)
            .with(JsonValueProviderFactory)
            .with(RouteDataValueProviderFactory)
            .with(QueryStringValueProviderFactory)
    }
}

impl ValueProviderFactories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    pub fn with(mut self, factory: impl ValueProviderFactory + 'static) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Adds a factory ahead of every registered one.
    pub fn prepend(&mut self, factory: Arc<dyn ValueProviderFactory>) {
        self.factories.insert(0, factory);
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn get_value_provider(&self, ctx: &ControllerContext) -> anyhow::Result<ValueProviderCollection> {
        let mut collection = ValueProviderCollection::new();
        for factory in &self.factories {
            if let Some(provider) = factory.get_value_provider(ctx)? {
                collection.push(provider);
            }
        }
        Ok(collection)
    }
}

impl fmt::Debug for ValueProviderFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueProviderFactories")
            .field("factories", &self.factories.len())
            .finish()
    }
}
