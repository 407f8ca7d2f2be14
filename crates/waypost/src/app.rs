//! The application: registered controllers plus one configured invoker.
//!
//! ```text
//! handle(request, route_data)
//!   ├── route_data["controller"] ──► ControllerRegistry ──(unknown)──► 404
//!   ├── factory(resolver) ──► controller instance
//!   ├── invoker.invoke_action(ctx, controller, descriptor, route_data["action"])
//!   │     Ok(true)  ──► response
//!   │     Ok(false) ──► 404
//!   │     Aborted   ──► response as written so far
//!   └──   other     ──► 500
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};
use waypost_binding::{Bindable, Culture, ModelBinder, ModelBinderDictionary};
use waypost_dispatch::filter::{FilterInstance, FilterProviders, GlobalFilterCollection, HandleErrorFilter};
use waypost_dispatch::{
    Controller, ControllerActionInvoker, ControllerContext, InvokeError, Request, Response,
    RouteData, ValueProviderFactories, ValueProviderFactory,
};

use crate::error::{RequestError, SetupError};
use crate::options::MvcOptions;
use crate::registry::ControllerRegistry;
use crate::resolver::{DependencyResolver, ServiceRegistry, Services};

/// A configured set of controllers ready to handle requests.
///
/// # Example
///
/// ```rust
/// use waypost::{ActionParameters, Application, Controller, ControllerBuilder, ControllerContext};
/// use waypost::{Request, RouteData};
///
/// #[derive(Default)]
/// struct HomeController;
///
/// impl Controller for HomeController {
///     fn describe(c: &mut ControllerBuilder<Self>) {
///         c.action("Index", |_: &mut Self, _: &mut ControllerContext, _: &ActionParameters| "home");
///     }
/// }
///
/// let app = Application::builder()
///     .controller_default::<HomeController>()
///     .build()
///     .unwrap();
///
/// let route = RouteData::new().with("controller", "home").with("action", "index");
/// let response = app.handle(Request::get("/").unwrap(), route);
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body_text(), "home");
/// ```
pub struct Application {
    controllers: ControllerRegistry,
    invoker: ControllerActionInvoker,
    resolver: Arc<dyn DependencyResolver>,
    culture: Culture,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn controllers(&self) -> &ControllerRegistry {
        &self.controllers
    }

    pub fn invoker(&self) -> &ControllerActionInvoker {
        &self.invoker
    }

    pub fn resolver(&self) -> &Arc<dyn DependencyResolver> {
        &self.resolver
    }

    /// A context for `request` with the application's culture and services.
    pub fn create_context(&self, request: Request, route_data: RouteData) -> ControllerContext {
        let mut ctx = ControllerContext::new(request, route_data).with_culture(self.culture.clone());
        ctx.extensions.insert(Services(self.resolver.clone()));
        ctx
    }

    /// Handles one request and always produces a response.
    pub fn handle(&self, request: Request, route_data: RouteData) -> Response {
        let mut ctx = self.create_context(request, route_data);
        match self.execute(&mut ctx) {
            Ok(true) | Err(RequestError::Invoke(InvokeError::Aborted)) => ctx.response,
            Ok(false) => status_response(404, "The resource cannot be found."),
            Err(err) => {
                let status = err.status();
                if status >= 500 {
                    warn!(path = ctx.request.path(), error = %err, "request failed");
                } else {
                    debug!(path = ctx.request.path(), error = %err, "request not routed");
                }
                status_response(status, &err.to_string())
            }
        }
    }

    /// Runs the action named by `ctx.route_data`.
    ///
    /// Returns `Ok(false)` when the controller exists but has no matching
    /// action.
    pub fn execute(&self, ctx: &mut ControllerContext) -> Result<bool, RequestError> {
        let controller_name = ctx
            .route_data
            .get_required_str("controller")
            .map_err(|e| RequestError::MissingRouteValue(e.to_string()))?
            .to_string();
        let action_name = ctx
            .route_data
            .get_required_str("action")
            .map_err(|e| RequestError::MissingRouteValue(e.to_string()))?
            .to_string();

        let registration = self.controllers.get(&controller_name).ok_or_else(|| {
            RequestError::ControllerNotFound {
                path: ctx.request.path().to_string(),
            }
        })?;
        let descriptor = registration.descriptor();

        let mut controller: Box<dyn Any> =
            registration
                .create(self.resolver.as_ref())
                .map_err(|source| RequestError::Activation {
                    controller: descriptor.type_name().to_string(),
                    source,
                })?;

        debug!(
            controller = descriptor.controller_name(),
            action = %action_name,
            "dispatching"
        );
        Ok(self
            .invoker
            .invoke_action(ctx, controller.as_mut(), descriptor, &action_name)?)
    }
}

fn status_response(status: u16, message: &str) -> Response {
    let mut response = Response::new();
    response.status = status;
    response.content_type = Some("text/plain".into());
    response.write(message);
    response
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("controllers", &self.controllers)
            .field("invoker", &self.invoker)
            .field("culture", &self.culture.name())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    options: MvcOptions,
    controllers: ControllerRegistry,
    pending_error: Option<SetupError>,
    global_filters: GlobalFilterCollection,
    binders: ModelBinderDictionary,
    value_provider_factories: ValueProviderFactories,
    services: ServiceRegistry,
    resolver: Option<Arc<dyn DependencyResolver>>,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self {
            options: MvcOptions::default(),
            controllers: ControllerRegistry::new(),
            pending_error: None,
            global_filters: GlobalFilterCollection::new(),
            binders: ModelBinderDictionary::new(),
            value_provider_factories: ValueProviderFactories::new(),
            services: ServiceRegistry::new(),
            resolver: None,
        }
    }

    pub fn options(mut self, options: MvcOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers `C`, created per request by `factory`.
    pub fn controller<C, F>(mut self, factory: F) -> Self
    where
        C: Controller,
        F: Fn(&dyn DependencyResolver) -> anyhow::Result<C> + Send + Sync + 'static,
    {
        if let Err(err) = self.controllers.register(factory) {
            self.pending_error.get_or_insert(err);
        }
        self
    }

    /// Registers `C`, created per request with `Default`.
    pub fn controller_default<C: Controller + Default>(self) -> Self {
        self.controller(|_| Ok(C::default()))
    }

    /// Adds a filter applied to every action.
    pub fn global_filter(mut self, filter: impl Into<FilterInstance>) -> Self {
        self.global_filters.add(filter);
        self
    }

    pub fn global_filter_ordered(mut self, filter: impl Into<FilterInstance>, order: i32) -> Self {
        self.global_filters.add_ordered(filter, order);
        self
    }

    /// Uses `binder` for every parameter or property of type `T`.
    pub fn binder<T: Bindable>(mut self, binder: impl ModelBinder + 'static) -> Self {
        self.binders.insert::<T>(binder);
        self
    }

    /// Adds a value provider factory ahead of the built-in ones.
    pub fn value_provider_factory(mut self, factory: impl ValueProviderFactory + 'static) -> Self {
        self.value_provider_factories.prepend(Arc::new(factory));
        self
    }

    /// Registers a service with the built-in resolver.
    pub fn service<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.services.insert(service);
        self
    }

    /// Replaces the built-in resolver; services added with
    /// [`service`](Self::service) are then ignored.
    pub fn resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<Application, SetupError> {
        if let Some(err) = self.pending_error {
            return Err(err);
        }
        let culture = self.options.culture()?;

        let mut global_filters = self.global_filters;
        if self.options.handle_errors {
            global_filters.add(HandleErrorFilter::new().with_message(self.options.error_message.clone()));
        }

        let invoker = ControllerActionInvoker::new()
            .with_binders(self.binders)
            .with_filter_providers(FilterProviders::new().with(global_filters))
            .with_value_provider_factories(self.value_provider_factories)
            .with_request_validation(self.options.validate_requests);

        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(self.services) as Arc<dyn DependencyResolver>);

        debug!(controllers = ?self.controllers.names(), "application built");
        Ok(Application {
            controllers: self.controllers,
            invoker,
            resolver,
            culture,
        })
    }
}
