//! Error types for action selection and invocation.
//!
//! Two kinds of failure leave the invoker:
//!
//! - [`SelectionError`]: the requested name matched more than one action.
//! - [`InvokeError::Unhandled`]: an action, filter or result failed and no
//!   exception filter handled it. The original [`ActionException`] is handed
//!   back, so callers can compare identities with [`ActionException::ptr_eq`].
//!
//! [`AbortSignal`] is not a failure. It ends the response early and always
//! propagates as [`InvokeError::Aborted`] once pending after-hooks have run.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Cooperative signal that ends the current response.
///
/// Return it from an action or filter (`Err(AbortSignal.into())`) to stop
/// processing. After-hooks still run; exception filters never see it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("the response was ended")]
pub struct AbortSignal;

/// A failure raised while running an action, a filter or a result.
///
/// Cloning shares the underlying error, so the value an exception filter
/// inspects is the same one the invoker re-raises.
#[derive(Clone)]
pub struct ActionException(Arc<anyhow::Error>);

impl ActionException {
    pub fn new(error: anyhow::Error) -> Self {
        Self(Arc::new(error))
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.0
    }

    /// Returns `true` if this is the cooperative [`AbortSignal`].
    pub fn is_abort(&self) -> bool {
        self.0.downcast_ref::<AbortSignal>().is_some()
    }

    /// Looks for an error of type `E` in the chain.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.0.chain().find_map(|cause| cause.downcast_ref::<E>())
    }

    /// Returns `true` if both values carry the same error instance.
    pub fn ptr_eq(&self, other: &ActionException) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<anyhow::Error> for ActionException {
    fn from(error: anyhow::Error) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for ActionException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl fmt::Debug for ActionException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionException").field(&self.0).finish()
    }
}

impl std::error::Error for ActionException {}

/// Action selection failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// More than one action accepts the request.
    #[error(
        "The current request for action '{action}' on controller type '{controller}' is ambiguous between the following action methods:{}",
        candidate_lines(.candidates)
    )]
    Ambiguous {
        action: String,
        controller: String,
        /// One `"{method}({params}) on type {declaring type}"` line per candidate.
        candidates: Vec<String>,
    },
}

fn candidate_lines(candidates: &[String]) -> String {
    candidates.iter().map(|c| format!("\n{}", c)).collect()
}

/// Errors returned by [`ControllerActionInvoker::invoke_action`](crate::ControllerActionInvoker::invoke_action).
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// A failure no exception filter handled.
    #[error("unhandled exception while invoking action: {0}")]
    Unhandled(#[source] ActionException),

    /// The response was ended with [`AbortSignal`].
    #[error("the response was ended")]
    Aborted,
}

impl InvokeError {
    /// The unhandled exception, if this is one.
    pub fn exception(&self) -> Option<&ActionException> {
        match self {
            InvokeError::Unhandled(exception) => Some(exception),
            _ => None,
        }
    }
}
