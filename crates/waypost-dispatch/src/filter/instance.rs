//! Filter instances, scopes, ordering and per-capability buckets.

use std::any::{type_name, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::{ActionFilter, AuthorizationFilter, ExceptionFilter, ResultFilter};

/// Order given to filters registered without one.
pub const DEFAULT_ORDER: i32 = -1;

/// Where a filter was registered. Lower scopes run first at equal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterScope {
    First = 0,
    Global = 10,
    Controller = 20,
    Action = 30,
    Last = 100,
}

/// One filter object and the capabilities it opted into.
///
/// Built with [`FilterInstance::of`]:
///
/// ```rust
/// use waypost_dispatch::filter::{
///     ActionFilter, ExceptionContext, ExceptionFilter, FilterInstance,
/// };
///
/// struct Logging;
/// impl ActionFilter for Logging {}
/// impl ExceptionFilter for Logging {
///     fn on_exception(&self, _ctx: &mut ExceptionContext<'_>) {}
/// }
///
/// let instance = FilterInstance::of(Logging).action().exception().build();
/// assert!(instance.exception_filter().is_some());
/// assert!(instance.result_filter().is_none());
/// ```
#[derive(Clone)]
pub struct FilterInstance {
    type_id: TypeId,
    type_name: &'static str,
    allow_multiple: bool,
    authorization: Option<Arc<dyn AuthorizationFilter>>,
    action: Option<Arc<dyn ActionFilter>>,
    result: Option<Arc<dyn ResultFilter>>,
    exception: Option<Arc<dyn ExceptionFilter>>,
}

impl FilterInstance {
    pub fn of<T: Send + Sync + 'static>(filter: T) -> FilterInstanceBuilder<T> {
        FilterInstanceBuilder {
            filter: Arc::new(filter),
            instance: FilterInstance {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                allow_multiple: false,
                authorization: None,
                action: None,
                result: None,
                exception: None,
            },
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Several instances of this type may run for one action.
    pub fn allows_multiple(&self) -> bool {
        self.allow_multiple
    }

    pub fn authorization_filter(&self) -> Option<&Arc<dyn AuthorizationFilter>> {
        self.authorization.as_ref()
    }

    pub fn action_filter(&self) -> Option<&Arc<dyn ActionFilter>> {
        self.action.as_ref()
    }

    pub fn result_filter(&self) -> Option<&Arc<dyn ResultFilter>> {
        self.result.as_ref()
    }

    pub fn exception_filter(&self) -> Option<&Arc<dyn ExceptionFilter>> {
        self.exception.as_ref()
    }
}

impl fmt::Debug for FilterInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut capabilities = Vec::new();
        if self.authorization.is_some() {
            capabilities.push("authorization");
        }
        if self.action.is_some() {
            capabilities.push("action");
        }
        if self.result.is_some() {
            capabilities.push("result");
        }
        if self.exception.is_some() {
            capabilities.push("exception");
        }
        f.debug_struct("FilterInstance")
            .field("type_name", &self.type_name)
            .field("allow_multiple", &self.allow_multiple)
            .field("capabilities", &capabilities)
            .finish()
    }
}

/// Selects the capabilities of a filter; see [`FilterInstance::of`].
pub struct FilterInstanceBuilder<T> {
    filter: Arc<T>,
    instance: FilterInstance,
}

impl<T: Send + Sync + 'static> FilterInstanceBuilder<T> {
    pub fn authorization(mut self) -> Self
    where
        T: AuthorizationFilter,
    {
        self.instance.authorization = Some(self.filter.clone());
        self
    }

    pub fn action(mut self) -> Self
    where
        T: ActionFilter,
    {
        self.instance.action = Some(self.filter.clone());
        self
    }

    pub fn result(mut self) -> Self
    where
        T: ResultFilter,
    {
        self.instance.result = Some(self.filter.clone());
        self
    }

    pub fn exception(mut self) -> Self
    where
        T: ExceptionFilter,
    {
        self.instance.exception = Some(self.filter.clone());
        self
    }

    /// Keep every instance of this type instead of only the closest one.
    pub fn allow_multiple(mut self) -> Self {
        self.instance.allow_multiple = true;
        self
    }

    pub fn build(self) -> FilterInstance {
        self.instance
    }
}

impl<T: Send + Sync + 'static> From<FilterInstanceBuilder<T>> for FilterInstance {
    fn from(builder: FilterInstanceBuilder<T>) -> Self {
        builder.build()
    }
}

/// A filter instance placed at a scope with an optional explicit order.
#[derive(Clone, Debug)]
pub struct Filter {
    pub instance: FilterInstance,
    pub scope: FilterScope,
    order: Option<i32>,
}

impl Filter {
    pub fn new(instance: FilterInstance, scope: FilterScope, order: Option<i32>) -> Self {
        Self {
            instance,
            scope,
            order,
        }
    }

    /// The explicit order, or [`DEFAULT_ORDER`].
    pub fn order(&self) -> i32 {
        self.order.unwrap_or(DEFAULT_ORDER)
    }
}

/// Sorts by order then scope (stable), then drops duplicate instances of
/// types that do not allow multiples, keeping the last one.
pub fn order_filters(mut filters: Vec<Filter>) -> Vec<Filter> {
    filters.sort_by_key(|f| (f.order(), f.scope));

    let mut seen = HashSet::new();
    let mut kept: Vec<Filter> = filters
        .into_iter()
        .rev()
        .filter(|f| {
            let first = seen.insert(f.instance.type_id());
            first || f.instance.allows_multiple()
        })
        .collect();
    kept.reverse();
    kept
}

/// Ordered filters split by capability.
#[derive(Clone, Default)]
pub struct FilterInfo {
    pub authorization_filters: Vec<Arc<dyn AuthorizationFilter>>,
    pub action_filters: Vec<Arc<dyn ActionFilter>>,
    pub result_filters: Vec<Arc<dyn ResultFilter>>,
    pub exception_filters: Vec<Arc<dyn ExceptionFilter>>,
}

impl FilterInfo {
    /// Buckets already ordered filters; each keeps its position.
    pub fn new(filters: &[Filter]) -> Self {
        let mut info = FilterInfo::default();
        for filter in filters {
            let instance = &filter.instance;
            if let Some(f) = instance.authorization_filter() {
                info.authorization_filters.push(f.clone());
            }
            if let Some(f) = instance.action_filter() {
                info.action_filters.push(f.clone());
            }
            if let Some(f) = instance.result_filter() {
                info.result_filters.push(f.clone());
            }
            if let Some(f) = instance.exception_filter() {
                info.exception_filters.push(f.clone());
            }
        }
        info
    }
}

impl fmt::Debug for FilterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterInfo")
            .field("authorization_filters", &self.authorization_filters.len())
            .field("action_filters", &self.action_filters.len())
            .field("result_filters", &self.result_filters.len())
            .field("exception_filters", &self.exception_filters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct A;
    impl ActionFilter for A {}
    struct B;
    impl ActionFilter for B {}
    struct Many(u8);
    impl ActionFilter for Many {}

    fn filter(instance: FilterInstance, scope: FilterScope, order: Option<i32>) -> Filter {
        Filter::new(instance, scope, order)
    }

    fn names(filters: &[Filter]) -> Vec<String> {
        filters
            .iter()
            .map(|f| {
                let short = f.instance.type_name().rsplit("::").next().unwrap_or("");
                format!("{}@{:?}", short, f.scope)
            })
            .collect()
    }

    #[test]
    fn test_scope_ranks() {
        assert_eq!(FilterScope::First as i32, 0);
        assert_eq!(FilterScope::Global as i32, 10);
        assert_eq!(FilterScope::Controller as i32, 20);
        assert_eq!(FilterScope::Action as i32, 30);
        assert_eq!(FilterScope::Last as i32, 100);
    }

    #[test]
    fn test_unset_order_runs_before_explicit() {
        let ordered = order_filters(vec![
            filter(FilterInstance::of(A).action().build(), FilterScope::Global, Some(0)),
            filter(FilterInstance::of(B).action().build(), FilterScope::Action, None),
        ]);
        assert_eq!(names(&ordered), ["B@Action", "A@Global"]);
    }

    #[test]
    fn test_duplicates_keep_closest_to_action() {
        let ordered = order_filters(vec![
            filter(FilterInstance::of(A).action().build(), FilterScope::Action, None),
            filter(FilterInstance::of(A).action().build(), FilterScope::Global, None),
            filter(FilterInstance::of(B).action().build(), FilterScope::Controller, None),
            filter(FilterInstance::of(A).action().build(), FilterScope::Controller, None),
        ]);
        assert_eq!(names(&ordered), ["B@Controller", "A@Action"]);
    }

    #[test]
    fn test_allow_multiple_keeps_all() {
        let ordered = order_filters(vec![
            filter(FilterInstance::of(Many(1)).action().allow_multiple().build(), FilterScope::Global, None),
            filter(FilterInstance::of(Many(2)).action().allow_multiple().build(), FilterScope::Action, None),
        ]);
        assert_eq!(ordered.len(), 2);
    }

    #[test]
    fn test_filter_info_buckets() {
        struct Both;
        impl ActionFilter for Both {}
        impl ResultFilter for Both {}

        let info = FilterInfo::new(&[
            filter(FilterInstance::of(Both).action().result().build(), FilterScope::Global, None),
            filter(FilterInstance::of(A).action().build(), FilterScope::Action, None),
        ]);
        assert_eq!(info.action_filters.len(), 2);
        assert_eq!(info.result_filters.len(), 1);
        assert!(info.authorization_filters.is_empty());
    }

    fn scope_strategy() -> impl Strategy<Value = FilterScope> {
        prop_oneof![
            Just(FilterScope::First),
            Just(FilterScope::Global),
            Just(FilterScope::Controller),
            Just(FilterScope::Action),
            Just(FilterScope::Last),
        ]
    }

    proptest! {
        /// Ordered output is sorted by (order, scope) and keeps registration
        /// order among equal keys.
        #[test]
        fn ordering_is_sorted_and_stable(
            specs in prop::collection::vec((scope_strategy(), prop::option::of(-2i32..3)), 0..12)
        ) {
            let filters: Vec<Filter> = specs
                .iter()
                .enumerate()
                .map(|(i, (scope, order))| {
                    filter(
                        FilterInstance::of(Many(i as u8)).action().allow_multiple().build(),
                        *scope,
                        *order,
                    )
                })
                .collect();
            let ordered = order_filters(filters);
            prop_assert_eq!(ordered.len(), specs.len());
            for pair in ordered.windows(2) {
                let a = (pair[0].order(), pair[0].scope);
                let b = (pair[1].order(), pair[1].scope);
                prop_assert!(a <= b);
            }
        }

        /// Without multiples, exactly one filter per type survives: the last
        /// one in sorted order.
        #[test]
        fn dedup_keeps_last_per_type(
            specs in prop::collection::vec((any::<bool>(), scope_strategy(), prop::option::of(0i32..3)), 1..12)
        ) {
            let filters: Vec<Filter> = specs
                .iter()
                .map(|(is_a, scope, order)| {
                    let instance = if *is_a {
                        FilterInstance::of(A).action().build()
                    } else {
                        FilterInstance::of(B).action().build()
                    };
                    filter(instance, *scope, *order)
                })
                .collect();

            let mut sorted = filters.clone();
            sorted.sort_by_key(|f| (f.order(), f.scope));
            let ordered = order_filters(filters);

            let types: HashSet<TypeId> = sorted.iter().map(|f| f.instance.type_id()).collect();
            prop_assert_eq!(ordered.len(), types.len());
            for kept in &ordered {
                let last = sorted
                    .iter()
                    .rev()
                    .find(|f| f.instance.type_id() == kept.instance.type_id())
                    .unwrap();
                prop_assert_eq!((last.order(), last.scope), (kept.order(), kept.scope));
            }
        }
    }
}
