//! Action dispatch for the waypost MVC core.
//!
//! `waypost-dispatch` takes a controller instance, a request context and an
//! action name, and runs the matching action through an ordered filter
//! pipeline with model binding and exception recovery.
//!
//! # Quick Start
//!
//! ```
//! use waypost_dispatch::{
//!     ActionParameters, Controller, ControllerActionInvoker, ControllerBuilder,
//!     ControllerContext, Request, RouteData,
//! };
//!
//! struct GreetController;
//!
//! impl Controller for GreetController {
//!     fn describe(c: &mut ControllerBuilder<Self>) {
//!         c.action("Hello", |_: &mut Self, _: &mut ControllerContext, p: &ActionParameters| {
//!             Ok::<_, anyhow::Error>(format!("Hello, {}!", p.get::<String>("name")?))
//!         })
//!         .param::<String>("name");
//!     }
//! }
//!
//! let mut ctx = ControllerContext::new(
//!     Request::get("/greet/hello?name=Ann").unwrap(),
//!     RouteData::new(),
//! );
//! let found = ControllerActionInvoker::new()
//!     .invoke(&mut ctx, &mut GreetController, "hello")
//!     .unwrap();
//! assert!(found);
//! assert_eq!(ctx.response.body_text(), "Hello, Ann!");
//! ```
//!
//! # Architecture
//!
//! ```text
//! DescriptorCache ──► ControllerDescriptor ──► find_action (aliases, selectors)
//!                                                   │
//!                                                   ▼
//! ControllerActionInvoker ──► FilterProviders ──► FilterInfo
//!   │   authorization → validation → binding → action filters → result filters
//!   └── exception filters on any failure
//! ```
//!
//! | Module | Role |
//! |--------|------|
//! | [`descriptor`] | controller/action/parameter metadata and registration |
//! | [`filter`] | filter traits, stage contexts, ordering, providers, built-ins |
//! | [`ControllerActionInvoker`] | the pipeline itself |
//! | [`ActionResult`] | what actions return and how it is written to the [`Response`] |
//!
//! # Errors
//!
//! Action code and filters return `anyhow::Result`. Failures travel through
//! the pipeline as [`ActionException`] and leave it as [`InvokeError`]. To end
//! a response early without an error (after a redirect, say), return
//! [`AbortSignal`].

mod cache;
mod context;
pub mod descriptor;
mod error;
pub mod filter;
mod invoker;
mod parameters;
pub mod providers;
mod result;
mod selection;
pub mod selector;
pub mod validation;

pub use cache::DescriptorCache;
pub use context::{
    ControllerContext, Extensions, Request, Response, RouteData, ViewData, HTTP_METHOD_OVERRIDE,
};
pub use descriptor::{
    ActionBuilder, ActionDescriptor, ActionExecutor, Controller, ControllerBuilder,
    ControllerDescriptor, ParameterBindingInfo, ParameterDescriptor,
};
pub use error::{AbortSignal, ActionException, InvokeError, SelectionError};
pub use invoker::ControllerActionInvoker;
pub use parameters::ActionParameters;
pub use providers::{ValueProviderFactories, ValueProviderFactory};
pub use result::{ActionResult, IntoActionResult, ResultExecutor, JSON_GET_DENIED_MESSAGE};
pub use selector::{AcceptVerbs, ActionMethodSelector, ActionName, ActionNameSelector, HttpVerb, NonAction};
pub use validation::RequestValidationError;

// Re-exported so controllers only need this crate.
pub use waypost_binding as binding;
