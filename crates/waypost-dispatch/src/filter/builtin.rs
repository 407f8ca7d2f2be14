//! Stock filters.
//!
//! - [`AuthorizeFilter`]: 401 unless the request's [`Principal`] passes
//! - [`RequireHttpsFilter`]: redirects GET requests to https, rejects others
//! - [`HandleErrorFilter`]: turns unhandled failures into a 500 response

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::context::{AuthorizationContext, ExceptionContext};
use super::instance::FilterInstance;
use super::{AuthorizationFilter, ExceptionFilter};
use crate::result::ActionResult;

/// The authenticated user of a request, stored in
/// [`Extensions`](crate::Extensions) by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
    name: String,
    roles: Vec<String>,
    authenticated: bool,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
            authenticated: true,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// Requires an authenticated principal, optionally restricted to users or
/// roles. Failing requests get a 401 result.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeFilter {
    users: Vec<String>,
    roles: Vec<String>,
}

impl AuthorizeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comma-separated user names allowed through.
    pub fn users(mut self, users: &str) -> Self {
        self.users = split_list(users);
        self
    }

    /// Comma-separated roles; membership in any one suffices.
    pub fn roles(mut self, roles: &str) -> Self {
        self.roles = split_list(roles);
        self
    }

    pub fn authorize(&self, principal: Option<&Principal>) -> bool {
        let Some(user) = principal.filter(|p| p.is_authenticated()) else {
            return false;
        };
        if !self.users.is_empty() && !self.users.iter().any(|u| u.eq_ignore_ascii_case(user.name())) {
            return false;
        }
        self.roles.is_empty() || self.roles.iter().any(|r| user.is_in_role(r))
    }
}

impl AuthorizationFilter for AuthorizeFilter {
    fn on_authorization(&self, ctx: &mut AuthorizationContext<'_>) -> anyhow::Result<()> {
        let principal = ctx.controller_context.extensions.get::<Principal>();
        if !self.authorize(principal) {
            trace!(action = ctx.action.action_name(), "authorization denied");
            ctx.result = Some(ActionResult::unauthorized());
        }
        Ok(())
    }
}

impl From<AuthorizeFilter> for FilterInstance {
    fn from(filter: AuthorizeFilter) -> Self {
        FilterInstance::of(filter).authorization().build()
    }
}

/// Message raised for non-GET requests over plain http.
pub const HTTPS_REQUIRED_MESSAGE: &str = "The requested resource can only be accessed via SSL.";

/// Forces https: GET requests are redirected, anything else fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireHttpsFilter;

impl AuthorizationFilter for RequireHttpsFilter {
    fn on_authorization(&self, ctx: &mut AuthorizationContext<'_>) -> anyhow::Result<()> {
        let request = &ctx.controller_context.request;
        if request.is_secure() {
            return Ok(());
        }
        if request.method() != "GET" {
            anyhow::bail!(HTTPS_REQUIRED_MESSAGE);
        }
        let mut url = request.url().clone();
        if url.set_scheme("https").is_err() || url.set_port(None).is_err() {
            anyhow::bail!(HTTPS_REQUIRED_MESSAGE);
        }
        ctx.result = Some(ActionResult::redirect(url.as_str()));
        Ok(())
    }
}

impl From<RequireHttpsFilter> for FilterInstance {
    fn from(filter: RequireHttpsFilter) -> Self {
        FilterInstance::of(filter).authorization().build()
    }
}

/// What [`HandleErrorFilter`] stores in view data under `"error"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleErrorInfo {
    pub controller: String,
    pub action: String,
    pub message: String,
}

type ErrorMatcher = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// Handles failures with a 500 response.
///
/// The response is cleared, view data gets a [`HandleErrorInfo`] under
/// `"error"`, and the failure is marked handled. Already handled failures and
/// failures rejected by [`only`](Self::only) are left alone.
#[derive(Clone)]
pub struct HandleErrorFilter {
    message: String,
    matcher: Option<ErrorMatcher>,
}

impl Default for HandleErrorFilter {
    fn default() -> Self {
        Self {
            message: "An error occurred while processing your request.".into(),
            matcher: None,
        }
    }
}

impl HandleErrorFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body of the 500 response.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Only handle failures whose chain contains an `E`.
    pub fn only<E>(mut self) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.matcher = Some(Arc::new(|err: &anyhow::Error| {
            err.chain().any(|cause| cause.is::<E>())
        }));
        self
    }
}

impl fmt::Debug for HandleErrorFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleErrorFilter")
            .field("message", &self.message)
            .field("filtered", &self.matcher.is_some())
            .finish()
    }
}

impl ExceptionFilter for HandleErrorFilter {
    fn on_exception(&self, ctx: &mut ExceptionContext<'_>) {
        if ctx.exception_handled || ctx.exception.is_abort() {
            return;
        }
        if let Some(matcher) = &self.matcher {
            if !matcher(ctx.exception.error()) {
                return;
            }
        }

        let info = HandleErrorInfo {
            controller: ctx.action.controller_name().to_string(),
            action: ctx.action.action_name().to_string(),
            message: ctx.exception.to_string(),
        };
        debug!(controller = %info.controller, action = %info.action, "handling error");

        let cc = &mut *ctx.controller_context;
        cc.response.clear();
        cc.response.status = 500;
        if let Ok(value) = serde_json::to_value(&info) {
            cc.view_data.insert_value("error", value);
        }
        ctx.result = Some(ActionResult::content(self.message.clone()));
        ctx.exception_handled = true;
    }
}

impl From<HandleErrorFilter> for FilterInstance {
    fn from(filter: HandleErrorFilter) -> Self {
        FilterInstance::of(filter).exception().build()
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ControllerContext, Request, RouteData};
    use crate::descriptor::{ActionDescriptor, Controller, ControllerBuilder, ControllerDescriptor};
    use crate::error::ActionException;
    use crate::parameters::ActionParameters;

    struct AdminController;

    impl Controller for AdminController {
        fn describe(c: &mut ControllerBuilder<Self>) {
            c.action(
                "Panel",
                |_: &mut Self, _: &mut ControllerContext, _: &ActionParameters| "panel",
            );
        }
    }

    fn action() -> std::sync::Arc<ActionDescriptor> {
        ControllerDescriptor::of::<AdminController>().actions()[0].clone()
    }

    fn authorize(filter: &dyn AuthorizationFilter, cc: &mut ControllerContext) -> anyhow::Result<Option<ActionResult>> {
        let action = action();
        let mut ctx = AuthorizationContext {
            controller_context: cc,
            action: &action,
            result: None,
        };
        filter.on_authorization(&mut ctx)?;
        Ok(ctx.result)
    }

    #[test]
    fn test_authorize_rules() {
        let filter = AuthorizeFilter::new().users("ann, bob").roles("admin");
        assert!(!filter.authorize(None));
        assert!(!filter.authorize(Some(&Principal::anonymous())));
        assert!(!filter.authorize(Some(&Principal::authenticated("ann"))));
        assert!(filter.authorize(Some(&Principal::authenticated("ANN").with_roles(["Admin"]))));
        assert!(!filter.authorize(Some(&Principal::authenticated("eve").with_roles(["admin"]))));
        assert!(AuthorizeFilter::new().authorize(Some(&Principal::authenticated("eve"))));
    }

    #[test]
    fn test_authorize_sets_401() {
        let mut cc = ControllerContext::new(Request::get("/").unwrap(), RouteData::new());
        let result = authorize(&AuthorizeFilter::new(), &mut cc).unwrap();
        assert!(matches!(result, Some(ActionResult::HttpStatus { status: 401, .. })));

        cc.extensions.insert(Principal::authenticated("ann"));
        assert!(authorize(&AuthorizeFilter::new(), &mut cc).unwrap().is_none());
    }

    #[test]
    fn test_require_https_redirects_get() {
        let mut cc = ControllerContext::new(
            Request::get("http://example.com:8080/admin?x=1").unwrap(),
            RouteData::new(),
        );
        let result = authorize(&RequireHttpsFilter, &mut cc).unwrap();
        match result {
            Some(ActionResult::Redirect { url, .. }) => {
                assert_eq!(url, "https://example.com/admin?x=1")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_require_https_rejects_post_and_passes_secure() {
        let mut cc = ControllerContext::new(Request::post("http://example.com/").unwrap(), RouteData::new());
        let err = authorize(&RequireHttpsFilter, &mut cc).unwrap_err();
        assert_eq!(err.to_string(), HTTPS_REQUIRED_MESSAGE);

        let mut cc = ControllerContext::new(Request::post("https://example.com/").unwrap(), RouteData::new());
        assert!(authorize(&RequireHttpsFilter, &mut cc).unwrap().is_none());
    }

    #[derive(Debug, thiserror::Error)]
    #[error("database down")]
    struct DbError;

    fn handle(filter: &HandleErrorFilter, err: anyhow::Error) -> (bool, ControllerContext) {
        let action = action();
        let mut cc = ControllerContext::new(Request::get("/").unwrap(), RouteData::new());
        cc.response.write("half-written");
        let mut ctx = ExceptionContext {
            controller_context: &mut cc,
            action: &action,
            exception: ActionException::new(err),
            exception_handled: false,
            result: None,
        };
        filter.on_exception(&mut ctx);
        let handled = ctx.exception_handled;
        (handled, cc)
    }

    #[test]
    fn test_handle_error_produces_500() {
        let (handled, cc) = handle(&HandleErrorFilter::new(), anyhow::anyhow!("boom"));
        assert!(handled);
        assert_eq!(cc.response.status, 500);
        assert!(cc.response.body.is_empty());
        let info: HandleErrorInfo = cc.view_data.get("error").unwrap();
        assert_eq!(info.action, "Panel");
        assert_eq!(info.controller, "Admin");
        assert_eq!(info.message, "boom");
    }

    #[test]
    fn test_handle_error_only_matching_types() {
        let filter = HandleErrorFilter::new().only::<DbError>();
        let (handled, _) = handle(&filter, anyhow::anyhow!("other"));
        assert!(!handled);
        let (handled, _) = handle(&filter, anyhow::Error::new(DbError).context("loading"));
        assert!(handled);
    }
}
