//! Where filters come from.
//!
//! The invoker asks a [`FilterProviders`] collection for the filters of an
//! action. Each [`FilterProvider`] contributes unordered filters; the
//! collection merges them and applies [`order_filters`].

use std::fmt;
use std::sync::Arc;

use super::instance::{order_filters, Filter, FilterInfo, FilterInstance, FilterScope};
use crate::context::ControllerContext;
use crate::descriptor::ActionDescriptor;

/// A source of filters for an action.
pub trait FilterProvider: Send + Sync {
    fn get_filters(&self, ctx: &ControllerContext, action: &ActionDescriptor) -> Vec<Filter>;
}

/// Filters applied to every action.
#[derive(Clone, Default, Debug)]
pub struct GlobalFilterCollection {
    filters: Vec<Filter>,
}

impl GlobalFilterCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, filter: impl Into<FilterInstance>) {
        self.filters
            .push(Filter::new(filter.into(), FilterScope::Global, None));
    }

    pub fn add_ordered(&mut self, filter: impl Into<FilterInstance>, order: i32) {
        self.filters
            .push(Filter::new(filter.into(), FilterScope::Global, Some(order)));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl FilterProvider for GlobalFilterCollection {
    fn get_filters(&self, _: &ControllerContext, _: &ActionDescriptor) -> Vec<Filter> {
        self.filters.clone()
    }
}

/// Filters registered on the controller and on the action itself.
#[derive(Clone, Copy, Default, Debug)]
pub struct DescriptorFilterProvider;

impl FilterProvider for DescriptorFilterProvider {
    fn get_filters(&self, _: &ControllerContext, action: &ActionDescriptor) -> Vec<Filter> {
        action
            .controller_filters()
            .iter()
            .chain(action.filters())
            .cloned()
            .collect()
    }
}

/// The providers consulted for every action, in registration order.
#[derive(Clone)]
pub struct FilterProviders {
    providers: Vec<Arc<dyn FilterProvider>>,
}

impl Default for FilterProviders {
    /// Descriptor-registered filters only.
    fn default() -> Self {
        Self {
            providers: vec![Arc::new(DescriptorFilterProvider)],
        }
    }
}

impl FilterProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection with no providers at all.
    pub fn empty() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn with(mut self, provider: impl FilterProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn push(&mut self, provider: Arc<dyn FilterProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Merged, ordered and deduplicated filters for `action`.
    pub fn get_filters(&self, ctx: &ControllerContext, action: &ActionDescriptor) -> Vec<Filter> {
        let combined = self
            .providers
            .iter()
            .flat_map(|p| p.get_filters(ctx, action))
            .collect();
        order_filters(combined)
    }

    pub fn filter_info(&self, ctx: &ControllerContext, action: &ActionDescriptor) -> FilterInfo {
        FilterInfo::new(&self.get_filters(ctx, action))
    }
}

impl fmt::Debug for FilterProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterProviders")
            .field("providers", &self.providers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Request, RouteData};
    use crate::descriptor::{Controller, ControllerBuilder, ControllerDescriptor};
    use crate::filter::ActionFilter;
    use crate::parameters::ActionParameters;

    struct Marker(&'static str);
    impl ActionFilter for Marker {}

    struct Other;
    impl ActionFilter for Other {}

    struct ShopController;

    impl Controller for ShopController {
        fn describe(c: &mut ControllerBuilder<Self>) {
            c.filter(FilterInstance::of(Marker("controller")).action());
            c.filter(FilterInstance::of(Other).action());
            c.action(
                "Buy",
                |_: &mut Self, _: &mut ControllerContext, _: &ActionParameters| "ok",
            )
            .filter(FilterInstance::of(Marker("action")).action());
        }
    }

    #[test]
    fn test_single_instance_type_collapses_to_action_scope() {
        let d = ControllerDescriptor::of::<ShopController>();
        let ctx = ControllerContext::new(Request::get("/").unwrap(), RouteData::new());
        let mut global = GlobalFilterCollection::new();
        global.add(FilterInstance::of(Marker("global")).action());

        let providers = FilterProviders::new().with(global);
        let filters = providers.get_filters(&ctx, &d.actions()[0]);

        let scopes: Vec<FilterScope> = filters.iter().map(|f| f.scope).collect();
        assert_eq!(scopes, [FilterScope::Controller, FilterScope::Action]);
        assert!(filters[0].instance.type_name().ends_with("Other"));
        assert!(filters[1].instance.type_name().ends_with("Marker"));
    }

    #[test]
    fn test_empty_providers_yield_nothing() {
        let d = ControllerDescriptor::of::<ShopController>();
        let ctx = ControllerContext::new(Request::get("/").unwrap(), RouteData::new());
        let info = FilterProviders::empty().filter_info(&ctx, &d.actions()[0]);
        assert!(info.action_filters.is_empty());
    }
}
