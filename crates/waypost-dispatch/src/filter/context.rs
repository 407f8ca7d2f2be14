//! Stage contexts handed to filters.
//!
//! Each context borrows the request's [`ControllerContext`] and adds the
//! fields of its stage. They live for one hook call; the invoker carries the
//! stage fields from one hook to the next.

use crate::context::ControllerContext;
use crate::descriptor::ActionDescriptor;
use crate::error::ActionException;
use crate::parameters::ActionParameters;
use crate::result::ActionResult;

pub struct AuthorizationContext<'a> {
    pub controller_context: &'a mut ControllerContext,
    pub action: &'a ActionDescriptor,
    /// Set to short-circuit the request.
    pub result: Option<ActionResult>,
}

pub struct ActionExecutingContext<'a> {
    pub controller_context: &'a mut ControllerContext,
    pub action: &'a ActionDescriptor,
    pub parameters: &'a mut ActionParameters,
    /// Set to skip the action.
    pub result: Option<ActionResult>,
}

pub struct ActionExecutedContext<'a> {
    pub controller_context: &'a mut ControllerContext,
    pub action: &'a ActionDescriptor,
    /// A filter short-circuited the action.
    pub canceled: bool,
    /// The failure raised by the inner call, if any.
    pub exception: Option<ActionException>,
    /// Set to stop `exception` from propagating.
    pub exception_handled: bool,
    pub result: Option<ActionResult>,
}

pub struct ResultExecutingContext<'a> {
    pub controller_context: &'a mut ControllerContext,
    /// The result about to execute; filters may replace it.
    pub result: ActionResult,
    /// Set to skip execution.
    pub cancel: bool,
}

pub struct ResultExecutedContext<'a> {
    pub controller_context: &'a mut ControllerContext,
    pub result: ActionResult,
    pub canceled: bool,
    pub exception: Option<ActionException>,
    pub exception_handled: bool,
}

pub struct ExceptionContext<'a> {
    pub controller_context: &'a mut ControllerContext,
    pub action: &'a ActionDescriptor,
    pub exception: ActionException,
    /// Earlier filters in this stage may already have set this.
    pub exception_handled: bool,
    /// Executed in place of the failed stage once handled.
    pub result: Option<ActionResult>,
}
