//! The action invoker.
//!
//! [`ControllerActionInvoker::invoke_action`] runs one request through the
//! whole pipeline:
//!
//! ```text
//! find_action ──(none)──► Ok(false)
//!   → get_filters
//!   → authorization filters ──(result)──► execute result ──► Ok(true)
//!   → request validation
//!   → get_parameter_values
//!   → action filters around the action method
//!   → result filters around ActionResult::execute
//!   ╰─ any failure ──► exception filters ──(handled)──► execute their result
//!                                        └─(unhandled)─► Err(Unhandled)
//! ```
//!
//! # After Hooks
//!
//! Action and result filters nest: the first filter's before hook runs
//! first and its after hook runs last. An after hook runs exactly once for
//! every filter whose before hook completed, whether the inner call returned,
//! failed, raised [`AbortSignal`](crate::AbortSignal) or was canceled by a
//! short-circuit. A filter that short-circuits sees its own after hook with
//! `canceled = true`.
//!
//! # Failures
//!
//! Failures are carried as [`ActionException`]. An after hook may mark one
//! handled; otherwise it reaches the exception filters unchanged, and if none
//! of them handles it the same value is returned in
//! [`InvokeError::Unhandled`]. The abort signal bypasses exception filters
//! and becomes [`InvokeError::Aborted`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};
use waypost_binding::{ModelBinderDictionary, ModelBindingContext, ValueProvider};

use crate::cache::DescriptorCache;
use crate::context::ControllerContext;
use crate::descriptor::{ActionDescriptor, Controller, ControllerDescriptor, ParameterDescriptor};
use crate::error::{ActionException, InvokeError};
use crate::filter::{
    ActionExecutedContext, ActionExecutingContext, ActionFilter, AuthorizationContext,
    AuthorizationFilter, ExceptionContext, ExceptionFilter, FilterInfo, FilterProviders,
    ResultExecutedContext, ResultExecutingContext, ResultFilter,
};
use crate::parameters::ActionParameters;
use crate::providers::ValueProviderFactories;
use crate::result::ActionResult;
use crate::validation::validate_request;

/// Runs actions through the filter pipeline.
#[derive(Clone)]
pub struct ControllerActionInvoker {
    binders: ModelBinderDictionary,
    filter_providers: FilterProviders,
    value_provider_factories: ValueProviderFactories,
    validate_requests: bool,
}

impl Default for ControllerActionInvoker {
    fn default() -> Self {
        Self {
            binders: ModelBinderDictionary::new(),
            filter_providers: FilterProviders::new(),
            value_provider_factories: ValueProviderFactories::new(),
            validate_requests: true,
        }
    }
}

/// What the action stage produced.
struct ActionOutcome {
    result: Option<ActionResult>,
    canceled: bool,
}

/// What the result stage produced.
struct ResultOutcome {
    result: ActionResult,
    canceled: bool,
}

impl ControllerActionInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binders(mut self, binders: ModelBinderDictionary) -> Self {
        self.binders = binders;
        self
    }

    pub fn with_filter_providers(mut self, providers: FilterProviders) -> Self {
        self.filter_providers = providers;
        self
    }

    pub fn with_value_provider_factories(mut self, factories: ValueProviderFactories) -> Self {
        self.value_provider_factories = factories;
        self
    }

    /// Turns request validation off for every action, whatever the
    /// descriptors say.
    pub fn with_request_validation(mut self, enabled: bool) -> Self {
        self.validate_requests = enabled;
        self
    }

    pub fn binders(&self) -> &ModelBinderDictionary {
        &self.binders
    }

    pub fn filter_providers(&self) -> &FilterProviders {
        &self.filter_providers
    }

    /// Resolves the descriptor of `C` through the global cache and invokes
    /// `action_name` on `controller`.
    pub fn invoke<C: Controller>(
        &self,
        ctx: &mut ControllerContext,
        controller: &mut C,
        action_name: &str,
    ) -> Result<bool, InvokeError> {
        let descriptor = DescriptorCache::global().get::<C>();
        self.invoke_action(ctx, controller, &descriptor, action_name)
    }

    /// Runs `action_name` on `controller`.
    ///
    /// Returns `Ok(false)` when no action matches, so the caller can answer
    /// with a 404.
    pub fn invoke_action(
        &self,
        ctx: &mut ControllerContext,
        controller: &mut dyn Any,
        descriptor: &ControllerDescriptor,
        action_name: &str,
    ) -> Result<bool, InvokeError> {
        let Some(action) = descriptor.find_action(ctx, action_name)? else {
            debug!(
                controller = descriptor.controller_name(),
                action = action_name,
                "no action found"
            );
            return Ok(false);
        };

        let filters = self.get_filters(ctx, &action);
        debug!(
            controller = descriptor.controller_name(),
            action = action.action_name(),
            filters = ?filters,
            "invoking action"
        );

        let failure = match self.run_pipeline(ctx, controller, descriptor, &action, &filters) {
            Ok(()) => return Ok(true),
            Err(exception) => exception,
        };
        if failure.is_abort() {
            debug!(action = action.action_name(), "response ended");
            return Err(InvokeError::Aborted);
        }

        let exception_context = self.invoke_exception_filters(
            ctx,
            &action,
            &filters.exception_filters,
            failure.clone(),
        );
        if !exception_context.exception_handled {
            warn!(action = action.action_name(), error = %failure, "unhandled exception");
            return Err(InvokeError::Unhandled(failure));
        }

        let result = exception_context.result.unwrap_or_default();
        match self.invoke_action_result(ctx, &result) {
            Ok(()) => Ok(true),
            Err(err) => {
                let exception = ActionException::new(err);
                if exception.is_abort() {
                    Err(InvokeError::Aborted)
                } else {
                    warn!(action = action.action_name(), error = %exception, "handled result failed");
                    Err(InvokeError::Unhandled(exception))
                }
            }
        }
    }

    /// The ordered, deduplicated filters of `action`, bucketed by capability.
    pub fn get_filters(&self, ctx: &ControllerContext, action: &ActionDescriptor) -> FilterInfo {
        self.filter_providers.filter_info(ctx, action)
    }

    /// Binds every declared parameter of `action`.
    ///
    /// Binding problems land in `ctx.model_state`; only a value provider that
    /// cannot be built (a malformed JSON body, say) is an error.
    pub fn get_parameter_values(
        &self,
        ctx: &mut ControllerContext,
        action: &ActionDescriptor,
    ) -> anyhow::Result<ActionParameters> {
        let value_provider = self.value_provider_factories.get_value_provider(ctx)?;
        let mut parameters = ActionParameters::new();
        for parameter in action.parameters() {
            let value = self.get_parameter_value(ctx, &value_provider, parameter);
            parameters.insert(parameter.name(), value);
        }
        debug!(
            action = action.action_name(),
            parameters = parameters.len(),
            valid = ctx.model_state.is_valid(),
            "parameters bound"
        );
        Ok(parameters)
    }

    fn get_parameter_value(
        &self,
        ctx: &mut ControllerContext,
        value_provider: &dyn ValueProvider,
        parameter: &ParameterDescriptor,
    ) -> Value {
        let info = parameter.binding_info();
        let metadata = parameter.model_metadata();
        let binder = match info.binder() {
            Some(binder) => binder.clone(),
            None => self.binders.get_binder(&metadata),
        };

        let name = info.prefix().unwrap_or(parameter.name());
        let mut binding = ModelBindingContext::new(metadata, name, value_provider, &self.binders)
            .with_fallback_to_empty_prefix(info.prefix().is_none());
        if let Some(filter) = info.property_filter() {
            binding = binding.with_property_filter(filter);
        }

        binder
            .bind_model(&binding, &mut ctx.model_state)
            .or_else(|| parameter.get_default_value().cloned())
            .unwrap_or(Value::Null)
    }

    /// Executes `result` against the response.
    pub fn invoke_action_result(
        &self,
        ctx: &mut ControllerContext,
        result: &ActionResult,
    ) -> anyhow::Result<()> {
        trace!(result = result.kind(), "executing result");
        result.execute(ctx)
    }

    fn run_pipeline(
        &self,
        ctx: &mut ControllerContext,
        controller: &mut dyn Any,
        descriptor: &ControllerDescriptor,
        action: &ActionDescriptor,
        filters: &FilterInfo,
    ) -> Result<(), ActionException> {
        if let Some(result) =
            self.invoke_authorization_filters(ctx, action, &filters.authorization_filters)?
        {
            return self
                .invoke_action_result(ctx, &result)
                .map_err(ActionException::new);
        }

        if self.validate_requests && descriptor.validate_request() && action.validate_request() {
            validate_request(&ctx.request).map_err(|e| ActionException::new(e.into()))?;
        }

        let mut parameters = self
            .get_parameter_values(ctx, action)
            .map_err(ActionException::new)?;

        let outcome = self.invoke_action_filters(
            ctx,
            controller,
            action,
            &mut parameters,
            &filters.action_filters,
        )?;
        let result = outcome.result.unwrap_or_default();

        self.invoke_result_filters(ctx, &filters.result_filters, result)?;
        Ok(())
    }

    fn invoke_authorization_filters(
        &self,
        ctx: &mut ControllerContext,
        action: &ActionDescriptor,
        filters: &[Arc<dyn AuthorizationFilter>],
    ) -> Result<Option<ActionResult>, ActionException> {
        for filter in filters {
            let mut auth = AuthorizationContext {
                controller_context: &mut *ctx,
                action,
                result: None,
            };
            filter.on_authorization(&mut auth).map_err(ActionException::new)?;
            if let Some(result) = auth.result {
                trace!(action = action.action_name(), result = result.kind(), "authorization short-circuit");
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    fn invoke_action_filters(
        &self,
        ctx: &mut ControllerContext,
        controller: &mut dyn Any,
        action: &ActionDescriptor,
        parameters: &mut ActionParameters,
        filters: &[Arc<dyn ActionFilter>],
    ) -> Result<ActionOutcome, ActionException> {
        let Some((filter, inner_filters)) = filters.split_first() else {
            let result = action
                .execute(controller, ctx, parameters)
                .map_err(ActionException::new)?;
            return Ok(ActionOutcome {
                result: Some(result),
                canceled: false,
            });
        };

        let short_circuit = {
            let mut executing = ActionExecutingContext {
                controller_context: &mut *ctx,
                action,
                parameters: &mut *parameters,
                result: None,
            };
            filter
                .on_action_executing(&mut executing)
                .map_err(ActionException::new)?;
            executing.result
        };

        let inner = match short_circuit {
            Some(result) => {
                trace!(action = action.action_name(), "action filter short-circuit");
                Ok(ActionOutcome {
                    result: Some(result),
                    canceled: true,
                })
            }
            None => self.invoke_action_filters(ctx, controller, action, parameters, inner_filters),
        };

        let (canceled, exception, result) = match inner {
            Ok(outcome) => (outcome.canceled, None, outcome.result),
            Err(exception) => (false, Some(exception), None),
        };
        let reported = exception.as_ref().filter(|e| !e.is_abort()).cloned();

        let mut executed = ActionExecutedContext {
            controller_context: ctx,
            action,
            canceled,
            exception: reported,
            exception_handled: false,
            result,
        };
        filter
            .on_action_executed(&mut executed)
            .map_err(ActionException::new)?;

        match exception {
            Some(exception) if exception.is_abort() || !executed.exception_handled => Err(exception),
            _ => Ok(ActionOutcome {
                result: executed.result,
                canceled: executed.canceled,
            }),
        }
    }

    fn invoke_result_filters(
        &self,
        ctx: &mut ControllerContext,
        filters: &[Arc<dyn ResultFilter>],
        result: ActionResult,
    ) -> Result<ResultOutcome, ActionException> {
        let Some((filter, inner_filters)) = filters.split_first() else {
            self.invoke_action_result(ctx, &result)
                .map_err(ActionException::new)?;
            return Ok(ResultOutcome {
                result,
                canceled: false,
            });
        };

        let (result, cancel) = {
            let mut executing = ResultExecutingContext {
                controller_context: &mut *ctx,
                result,
                cancel: false,
            };
            filter
                .on_result_executing(&mut executing)
                .map_err(ActionException::new)?;
            (executing.result, executing.cancel)
        };

        let inner = if cancel {
            trace!(result = result.kind(), "result filter short-circuit");
            Ok(ResultOutcome {
                result: result.clone(),
                canceled: true,
            })
        } else {
            self.invoke_result_filters(ctx, inner_filters, result.clone())
        };

        let (outcome_result, canceled, exception) = match inner {
            Ok(outcome) => (outcome.result, outcome.canceled, None),
            Err(exception) => (result, false, Some(exception)),
        };
        let reported = exception.as_ref().filter(|e| !e.is_abort()).cloned();

        let mut executed = ResultExecutedContext {
            controller_context: ctx,
            result: outcome_result,
            canceled,
            exception: reported,
            exception_handled: false,
        };
        filter
            .on_result_executed(&mut executed)
            .map_err(ActionException::new)?;

        match exception {
            Some(exception) if exception.is_abort() || !executed.exception_handled => Err(exception),
            _ => Ok(ResultOutcome {
                result: executed.result,
                canceled: executed.canceled,
            }),
        }
    }

    /// Runs exception filters last to first. Every filter runs, including
    /// those after one that marked the failure handled.
    fn invoke_exception_filters<'a>(
        &self,
        ctx: &'a mut ControllerContext,
        action: &'a ActionDescriptor,
        filters: &[Arc<dyn ExceptionFilter>],
        exception: ActionException,
    ) -> ExceptionContext<'a> {
        let mut context = ExceptionContext {
            controller_context: ctx,
            action,
            exception,
            exception_handled: false,
            result: None,
        };
        for filter in filters.iter().rev() {
            filter.on_exception(&mut context);
        }
        context
    }
}

impl fmt::Debug for ControllerActionInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerActionInvoker")
            .field("binders", &self.binders.len())
            .field("filter_providers", &self.filter_providers)
            .field("value_provider_factories", &self.value_provider_factories)
            .field("validate_requests", &self.validate_requests)
            .finish()
    }
}
