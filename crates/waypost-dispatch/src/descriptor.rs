//! Controller, action and parameter descriptors.
//!
//! Descriptors are the immutable metadata the invoker works from. A
//! controller describes itself once through [`Controller::describe`]; the
//! resulting [`ControllerDescriptor`] is cached per type (see
//! [`DescriptorCache`](crate::DescriptorCache)) and shared by every request.
//!
//! ```text
//! ControllerDescriptor (Home, HomeController)
//! ├── filters (controller scope)
//! └── ActionDescriptor (Index)
//!     ├── name selectors / method selectors
//!     ├── filters (action scope)
//!     ├── ParameterDescriptor (id: i32, prefix, include/exclude, binder)
//!     └── executor
//! ```
//!
//! # Registering Actions
//!
//! ```rust
//! use waypost_dispatch::{ActionParameters, Controller, ControllerBuilder, ControllerContext};
//!
//! struct HomeController;
//!
//! impl Controller for HomeController {
//!     fn describe(c: &mut ControllerBuilder<Self>) {
//!         c.action("Index", |_: &mut Self, _: &mut ControllerContext, _: &ActionParameters| {
//!             "Hello"
//!         });
//!         c.action("Show", |_: &mut Self, _: &mut ControllerContext, p: &ActionParameters| {
//!             Ok::<_, anyhow::Error>(format!("item {}", p.get::<u32>("id")?))
//!         })
//!         .param::<u32>("id")
//!         .http_get();
//!     }
//! }
//!
//! let descriptor = waypost_dispatch::ControllerDescriptor::of::<HomeController>();
//! assert_eq!(descriptor.controller_name(), "Home");
//! assert_eq!(descriptor.actions().len(), 2);
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;
use waypost_binding::{BindFilter, Bindable, MetadataFn, ModelBinder, ModelMetadata, PropertyFilter};

use crate::context::ControllerContext;
use crate::error::SelectionError;
use crate::filter::{Filter, FilterInstance, FilterScope};
use crate::parameters::ActionParameters;
use crate::result::{ActionResult, IntoActionResult};
use crate::selection;
use crate::selector::{AcceptVerbs, ActionMethodSelector, ActionName, ActionNameSelector, HttpVerb, NonAction};

/// Calls the action method on a controller instance.
pub type ActionExecutor = Arc<
    dyn Fn(&mut dyn Any, &mut ControllerContext, &ActionParameters) -> anyhow::Result<ActionResult>
        + Send
        + Sync,
>;

/// A controller type that registers its actions explicitly.
pub trait Controller: Any + Sized {
    fn describe(controller: &mut ControllerBuilder<Self>);
}

/// How one parameter is bound.
#[derive(Clone, Default)]
pub struct ParameterBindingInfo {
    binder: Option<Arc<dyn ModelBinder>>,
    prefix: Option<String>,
    filter: BindFilter,
}

impl ParameterBindingInfo {
    /// Binder overriding the one registered for the parameter type.
    pub fn binder(&self) -> Option<&Arc<dyn ModelBinder>> {
        self.binder.as_ref()
    }

    /// Field-name prefix used instead of the parameter name.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn bind_filter(&self) -> &BindFilter {
        &self.filter
    }

    /// Include/exclude lists as a property predicate, if any are set.
    pub fn property_filter(&self) -> Option<PropertyFilter> {
        if self.filter.is_empty() {
            return None;
        }
        let filter = self.filter.clone();
        Some(Arc::new(move |name: &str| filter.is_property_allowed(name)))
    }
}

impl fmt::Debug for ParameterBindingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBindingInfo")
            .field("binder", &self.binder.is_some())
            .field("prefix", &self.prefix)
            .field("filter", &self.filter)
            .finish()
    }
}

/// One declared action parameter.
#[derive(Clone)]
pub struct ParameterDescriptor {
    name: String,
    type_name: &'static str,
    metadata: MetadataFn,
    default_value: Option<Value>,
    binding_info: ParameterBindingInfo,
}

impl ParameterDescriptor {
    pub fn new<T: Bindable>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name::<T>(),
            metadata: T::model_metadata,
            default_value: None,
            binding_info: ParameterBindingInfo::default(),
        }
    }

    /// Bind from `prefix` instead of the parameter name. An explicit prefix
    /// disables the fallback to the empty prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.binding_info.prefix = Some(prefix.into());
        self
    }

    /// Only bind these properties (comma-separated).
    pub fn include(mut self, names: &str) -> Self {
        let filter = std::mem::take(&mut self.binding_info.filter);
        self.binding_info.filter = filter.include(split_list(names));
        self
    }

    /// Never bind these properties (comma-separated).
    pub fn exclude(mut self, names: &str) -> Self {
        let filter = std::mem::take(&mut self.binding_info.filter);
        self.binding_info.filter = filter.exclude(split_list(names));
        self
    }

    pub fn binder(mut self, binder: impl ModelBinder + 'static) -> Self {
        self.binding_info.binder = Some(Arc::new(binder));
        self
    }

    /// Value used when binding produced nothing.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn model_metadata(&self) -> ModelMetadata {
        (self.metadata)()
    }

    pub fn get_default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn binding_info(&self) -> &ParameterBindingInfo {
        &self.binding_info
    }
}

fn split_list(names: &str) -> impl Iterator<Item = &str> {
    names.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl fmt::Debug for ParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("default_value", &self.default_value)
            .field("binding_info", &self.binding_info)
            .finish()
    }
}

/// One invokable action of a controller.
pub struct ActionDescriptor {
    method_name: String,
    alias: Option<String>,
    controller_name: String,
    controller_type: &'static str,
    parameters: Vec<ParameterDescriptor>,
    name_selectors: Vec<Arc<dyn ActionNameSelector>>,
    method_selectors: Vec<Arc<dyn ActionMethodSelector>>,
    controller_filters: Arc<[Filter]>,
    filters: Vec<Filter>,
    validate_request: bool,
    executor: ActionExecutor,
    unique_id: OnceCell<String>,
}

impl ActionDescriptor {
    /// The name the action is requested by: its alias, or the method name.
    pub fn action_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.method_name)
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    pub fn controller_type(&self) -> &'static str {
        self.controller_type
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn name_selectors(&self) -> &[Arc<dyn ActionNameSelector>] {
        &self.name_selectors
    }

    pub fn method_selectors(&self) -> &[Arc<dyn ActionMethodSelector>] {
        &self.method_selectors
    }

    /// Aliased actions are matched through their name selectors only.
    pub fn is_aliased(&self) -> bool {
        !self.name_selectors.is_empty()
    }

    /// Filters registered on the owning controller.
    pub fn controller_filters(&self) -> &[Filter] {
        &self.controller_filters
    }

    /// Filters registered on this action.
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn validate_request(&self) -> bool {
        self.validate_request
    }

    /// Runs the action method against `controller`.
    pub fn execute(
        &self,
        controller: &mut dyn Any,
        ctx: &mut ControllerContext,
        parameters: &ActionParameters,
    ) -> anyhow::Result<ActionResult> {
        (self.executor)(controller, ctx, parameters)
    }

    /// `Method(param types)`, as shown in ambiguity errors.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self
            .parameters
            .iter()
            .map(|p| short_type_name(p.type_name))
            .collect();
        format!("{}({})", self.method_name, types.join(", "))
    }

    /// Stable identifier built from the descriptor kind, controller type,
    /// action name and method name. Computed on first use.
    pub fn unique_id(&self) -> &str {
        self.unique_id.get_or_init(|| {
            create_unique_id(&[
                "ActionDescriptor",
                self.controller_type,
                self.action_name(),
                &self.method_name,
            ])
        })
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("action_name", &self.action_name())
            .field("method_name", &self.method_name)
            .field("controller", &self.controller_name)
            .field("parameters", &self.parameters.len())
            .field("name_selectors", &self.name_selectors.len())
            .field("method_selectors", &self.method_selectors.len())
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}

/// Immutable description of a controller type.
pub struct ControllerDescriptor {
    controller_name: String,
    type_name: &'static str,
    type_id: TypeId,
    actions: Vec<Arc<ActionDescriptor>>,
    filters: Arc<[Filter]>,
    validate_request: bool,
    unique_id: OnceCell<String>,
}

impl ControllerDescriptor {
    /// Describes `C` by running its [`Controller::describe`].
    pub fn of<C: Controller>() -> Self {
        let mut builder = ControllerBuilder::<C>::new();
        C::describe(&mut builder);
        builder.build()
    }

    /// Name without the `Controller` suffix, e.g. `Home`.
    pub fn controller_name(&self) -> &str {
        &self.controller_name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Every registered action, in registration order.
    pub fn actions(&self) -> &[Arc<ActionDescriptor>] {
        &self.actions
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn validate_request(&self) -> bool {
        self.validate_request
    }

    pub fn unique_id(&self) -> &str {
        self.unique_id
            .get_or_init(|| create_unique_id(&["ControllerDescriptor", self.type_name]))
    }

    /// Resolves `action_name` for the current request.
    ///
    /// Returns `Ok(None)` when nothing matches and an error when more than one
    /// action does.
    pub fn find_action(
        &self,
        ctx: &ControllerContext,
        action_name: &str,
    ) -> Result<Option<Arc<ActionDescriptor>>, SelectionError> {
        selection::find_action(ctx, self, action_name)
    }
}

impl fmt::Debug for ControllerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDescriptor")
            .field("controller_name", &self.controller_name)
            .field("type_name", &self.type_name)
            .field(
                "actions",
                &self.actions.iter().map(|a| a.action_name()).collect::<Vec<_>>(),
            )
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Collects a controller's registrations; see [`Controller::describe`].
pub struct ControllerBuilder<C> {
    name: String,
    actions: Vec<ActionBuilder>,
    filters: Vec<Filter>,
    validate_request: bool,
    _controller: PhantomData<fn() -> C>,
}

impl<C: Controller> ControllerBuilder<C> {
    fn new() -> Self {
        let short = short_type_name(type_name::<C>());
        let name = short
            .strip_suffix("Controller")
            .filter(|s| !s.is_empty())
            .unwrap_or(&short)
            .to_string();
        Self {
            name,
            actions: Vec::new(),
            filters: Vec::new(),
            validate_request: true,
            _controller: PhantomData,
        }
    }

    /// Overrides the controller name derived from the type name.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Adds a controller-scoped filter without an explicit order.
    pub fn filter(&mut self, filter: impl Into<FilterInstance>) -> &mut Self {
        self.filters
            .push(Filter::new(filter.into(), FilterScope::Controller, None));
        self
    }

    pub fn filter_ordered(&mut self, filter: impl Into<FilterInstance>, order: i32) -> &mut Self {
        self.filters
            .push(Filter::new(filter.into(), FilterScope::Controller, Some(order)));
        self
    }

    /// Turns off request validation for every action of this controller.
    pub fn skip_request_validation(&mut self) -> &mut Self {
        self.validate_request = false;
        self
    }

    /// Registers the action method `method`.
    pub fn action<F, R>(&mut self, method: &str, f: F) -> &mut ActionBuilder
    where
        F: Fn(&mut C, &mut ControllerContext, &ActionParameters) -> R + Send + Sync + 'static,
        R: IntoActionResult,
    {
        let executor: ActionExecutor = Arc::new(move |controller, ctx, params| {
            let controller = controller.downcast_mut::<C>().ok_or_else(|| {
                anyhow::anyhow!(
                    "action invoked on an instance that is not a {}",
                    type_name::<C>()
                )
            })?;
            f(controller, ctx, params).into_action_result()
        });
        self.actions.push(ActionBuilder::new(method, executor));
        let last = self.actions.len() - 1;
        &mut self.actions[last]
    }

    fn build(self) -> ControllerDescriptor {
        let controller_type = type_name::<C>();
        let filters: Arc<[Filter]> = self.filters.into();
        let actions = self
            .actions
            .into_iter()
            .map(|a| Arc::new(a.build(&self.name, controller_type, filters.clone())))
            .collect();
        ControllerDescriptor {
            controller_name: self.name,
            type_name: controller_type,
            type_id: TypeId::of::<C>(),
            actions,
            filters,
            validate_request: self.validate_request,
            unique_id: OnceCell::new(),
        }
    }
}

/// Registration of one action; returned by [`ControllerBuilder::action`].
pub struct ActionBuilder {
    method_name: String,
    alias: Option<String>,
    parameters: Vec<ParameterDescriptor>,
    name_selectors: Vec<Arc<dyn ActionNameSelector>>,
    method_selectors: Vec<Arc<dyn ActionMethodSelector>>,
    filters: Vec<Filter>,
    validate_request: bool,
    executor: ActionExecutor,
}

impl ActionBuilder {
    fn new(method: &str, executor: ActionExecutor) -> Self {
        Self {
            method_name: method.to_string(),
            alias: None,
            parameters: Vec::new(),
            name_selectors: Vec::new(),
            method_selectors: Vec::new(),
            filters: Vec::new(),
            validate_request: true,
            executor,
        }
    }

    /// Exposes the action as `name` (an [`ActionName`] selector).
    pub fn alias(&mut self, name: &str) -> &mut Self {
        self.alias = Some(name.to_string());
        self.name_selectors.push(Arc::new(ActionName::new(name)));
        self
    }

    pub fn name_selector(&mut self, selector: impl ActionNameSelector + 'static) -> &mut Self {
        self.name_selectors.push(Arc::new(selector));
        self
    }

    pub fn selector(&mut self, selector: impl ActionMethodSelector + 'static) -> &mut Self {
        self.method_selectors.push(Arc::new(selector));
        self
    }

    pub fn accept_verbs(&mut self, verbs: impl IntoIterator<Item = HttpVerb>) -> &mut Self {
        self.selector(AcceptVerbs::new(verbs))
    }

    pub fn http_get(&mut self) -> &mut Self {
        self.selector(AcceptVerbs::get())
    }

    pub fn http_post(&mut self) -> &mut Self {
        self.selector(AcceptVerbs::post())
    }

    pub fn http_put(&mut self) -> &mut Self {
        self.selector(AcceptVerbs::put())
    }

    pub fn http_delete(&mut self) -> &mut Self {
        self.selector(AcceptVerbs::delete())
    }

    /// Keeps the method registered but never selectable.
    pub fn non_action(&mut self) -> &mut Self {
        self.selector(NonAction)
    }

    /// Declares a parameter bound by name.
    pub fn param<T: Bindable>(&mut self, name: &str) -> &mut Self {
        self.parameters.push(ParameterDescriptor::new::<T>(name));
        self
    }

    /// Declares a parameter with explicit binding configuration.
    pub fn parameter(&mut self, parameter: ParameterDescriptor) -> &mut Self {
        self.parameters.push(parameter);
        self
    }

    pub fn filter(&mut self, filter: impl Into<FilterInstance>) -> &mut Self {
        self.filters
            .push(Filter::new(filter.into(), FilterScope::Action, None));
        self
    }

    pub fn filter_ordered(&mut self, filter: impl Into<FilterInstance>, order: i32) -> &mut Self {
        self.filters
            .push(Filter::new(filter.into(), FilterScope::Action, Some(order)));
        self
    }

    pub fn skip_request_validation(&mut self) -> &mut Self {
        self.validate_request = false;
        self
    }

    fn build(
        self,
        controller_name: &str,
        controller_type: &'static str,
        controller_filters: Arc<[Filter]>,
    ) -> ActionDescriptor {
        ActionDescriptor {
            method_name: self.method_name,
            alias: self.alias,
            controller_name: controller_name.to_string(),
            controller_type,
            parameters: self.parameters,
            name_selectors: self.name_selectors,
            method_selectors: self.method_selectors,
            controller_filters,
            filters: self.filters,
            validate_request: self.validate_request,
            executor: self.executor,
            unique_id: OnceCell::new(),
        }
    }
}

/// Joins parts as `[len]part` so distinct part lists never collide.
fn create_unique_id(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| format!("[{}]{}", p.len(), p))
        .collect()
}

/// Strips module paths from a type name:
/// `core::option::Option<alloc::string::String>` becomes `Option<String>`.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
    out
}
