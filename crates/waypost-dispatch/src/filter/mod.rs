//! The filter pipeline.
//!
//! Filters intercept the stages of an action invocation. A filter type opts
//! into one or more capabilities by implementing the matching trait:
//!
//! | Trait | Hooks | Runs |
//! |-------|-------|------|
//! | [`AuthorizationFilter`] | `on_authorization` | before binding; first result short-circuits |
//! | [`ActionFilter`] | `on_action_executing` / `on_action_executed` | around the action method |
//! | [`ResultFilter`] | `on_result_executing` / `on_result_executed` | around result execution |
//! | [`ExceptionFilter`] | `on_exception` | on failure, in reverse order |
//!
//! # Pipeline Position
//!
//! ```text
//! authorization filters ──(result set)──► execute that result, stop
//!   → request validation
//!   → parameter binding
//!   → action filters  ┐ before hooks outer → inner, action method,
//!                     ┘ after hooks inner → outer
//!   → result filters  ┐ same nesting around ActionResult::execute
//!                     ┘
//! any failure ──► exception filters (reverse order) ──► handled result or re-raise
//! ```
//!
//! # Ordering
//!
//! Filters sort by explicit order (unset counts as `-1`), then by
//! [`FilterScope`]. Instances of a type that does not allow multiples are
//! deduplicated keeping the one closest to the action. See
//! [`order_filters`].
//!
//! # Registering
//!
//! ```rust
//! use waypost_dispatch::filter::{ActionExecutingContext, ActionFilter, FilterInstance};
//!
//! struct Audit;
//!
//! impl ActionFilter for Audit {
//!     fn on_action_executing(&self, ctx: &mut ActionExecutingContext<'_>) -> anyhow::Result<()> {
//!         tracing::info!(action = ctx.action.action_name(), "audit");
//!         Ok(())
//!     }
//! }
//!
//! let filter: FilterInstance = FilterInstance::of(Audit).action().build();
//! assert!(filter.action_filter().is_some());
//! ```

mod builtin;
mod context;
mod instance;
mod provider;

pub use builtin::{
    AuthorizeFilter, HandleErrorFilter, HandleErrorInfo, Principal, RequireHttpsFilter,
    HTTPS_REQUIRED_MESSAGE,
};
pub use context::{
    ActionExecutedContext, ActionExecutingContext, AuthorizationContext, ExceptionContext,
    ResultExecutedContext, ResultExecutingContext,
};
pub use instance::{order_filters, Filter, FilterInfo, FilterInstance, FilterInstanceBuilder, FilterScope};
pub use provider::{DescriptorFilterProvider, FilterProvider, FilterProviders, GlobalFilterCollection};

/// Decides whether the request may reach the action.
///
/// Setting `ctx.result` short-circuits: no later authorization filter, no
/// binding and no action runs, and the result is executed directly.
pub trait AuthorizationFilter: Send + Sync {
    fn on_authorization(&self, ctx: &mut AuthorizationContext<'_>) -> anyhow::Result<()>;
}

/// Wraps the action method.
pub trait ActionFilter: Send + Sync {
    /// Setting `ctx.result` skips the action and every inner filter.
    fn on_action_executing(&self, _ctx: &mut ActionExecutingContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs exactly once per invocation that reached `on_action_executing`,
    /// whether the inner call returned, failed or was canceled.
    fn on_action_executed(&self, _ctx: &mut ActionExecutedContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Wraps result execution.
pub trait ResultFilter: Send + Sync {
    /// Setting `ctx.cancel` skips execution and every inner filter.
    fn on_result_executing(&self, _ctx: &mut ResultExecutingContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_result_executed(&self, _ctx: &mut ResultExecutedContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Observes failures from every earlier stage.
///
/// Set `ctx.exception_handled` (and usually `ctx.result`) to recover.
pub trait ExceptionFilter: Send + Sync {
    fn on_exception(&self, ctx: &mut ExceptionContext<'_>);
}
