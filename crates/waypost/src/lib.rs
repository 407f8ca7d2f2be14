//! # Waypost - controller actions with filters and model binding
//!
//! Waypost runs controller actions for a host that already has a request
//! and route values in hand. It picks the action, binds its parameters from
//! form fields, route values, the query string or a JSON body, runs it
//! through authorization, action, result and exception filters, and writes
//! the result into a response.
//!
//! ## Quick Start
//!
//! ```rust
//! use waypost::{ActionParameters, ActionResult, Application, Controller, ControllerBuilder};
//! use waypost::{ControllerContext, Request, RouteData};
//! use waypost::filter::AuthorizeFilter;
//!
//! #[derive(Default)]
//! struct AccountController;
//!
//! impl Controller for AccountController {
//!     fn describe(c: &mut ControllerBuilder<Self>) {
//!         c.action("Profile", |_: &mut Self, _: &mut ControllerContext, p: &ActionParameters| {
//!             Ok::<_, anyhow::Error>(format!("user {}", p.get::<u32>("id")?))
//!         })
//!         .param::<u32>("id")
//!         .http_get();
//!
//!         c.action("Admin", |_: &mut Self, _: &mut ControllerContext, _: &ActionParameters| {
//!             ActionResult::content("secret")
//!         })
//!         .filter(AuthorizeFilter::new().roles("admin"));
//!     }
//! }
//!
//! let app = Application::builder()
//!     .controller_default::<AccountController>()
//!     .build()
//!     .unwrap();
//!
//! let route = RouteData::new().with("controller", "account").with("action", "profile");
//! let response = app.handle(Request::get("/account/profile?id=7").unwrap(), route);
//! assert_eq!(response.body_text(), "user 7");
//!
//! let route = RouteData::new().with("controller", "account").with("action", "admin");
//! let response = app.handle(Request::get("/account/admin").unwrap(), route);
//! assert_eq!(response.status, 401);
//! ```
//!
//! ## Crates
//!
//! | Crate | Provides |
//! |-------|----------|
//! | `waypost-binding` | value providers, model metadata, binders, model state |
//! | `waypost-macros` | `#[derive(Bindable)]` |
//! | `waypost-dispatch` | descriptors, selection, filters, results, the invoker |
//! | `waypost` | [`Application`], controller registry, services, options |
//!
//! Models deriving [`Bindable`](macro@Bindable) expand to paths under
//! `waypost_binding`, so depend on that crate alongside this one.
//!
//! ## Configuration
//!
//! [`MvcOptions`] can be built in code or read from YAML with
//! [`MvcOptions::from_yaml`] / [`MvcOptions::from_path`].

mod app;
mod error;
mod options;
mod registry;
mod resolver;

pub use app::{Application, ApplicationBuilder};
pub use error::{RequestError, SetupError};
pub use options::MvcOptions;
pub use registry::{ControllerFactory, ControllerRegistration, ControllerRegistry};
pub use resolver::{DependencyResolver, Service, ServiceRegistry, Services};

pub use waypost_dispatch::{
    filter, selector, AbortSignal, AcceptVerbs, ActionDescriptor, ActionException, ActionParameters,
    ActionResult, Controller, ControllerActionInvoker, ControllerBuilder, ControllerContext,
    ControllerDescriptor, DescriptorCache, Extensions, HttpVerb, IntoActionResult, InvokeError,
    ParameterDescriptor, Request, Response, ResultExecutor, RouteData, SelectionError,
    ValueProviderFactories, ValueProviderFactory, ViewData,
};

pub use waypost_binding::{
    Bindable, Culture, ModelBinder, ModelBinderDictionary, ModelStateDictionary, ValueProvider,
};
pub use waypost_macros::Bindable;
