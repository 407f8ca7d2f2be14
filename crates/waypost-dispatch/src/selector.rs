//! Action selectors.
//!
//! Two kinds of predicate take part in action selection:
//!
//! - [`ActionNameSelector`]: decides which requested names reach an action.
//!   An action with at least one name selector is *aliased* and is no longer
//!   matched by its method name.
//! - [`ActionMethodSelector`]: vetoes a candidate for the current request,
//!   e.g. by HTTP verb. Candidates carrying method selectors are preferred
//!   over candidates without any.

use std::fmt;

use crate::context::ControllerContext;
use crate::descriptor::ActionDescriptor;

/// Decides whether an action answers to a requested name.
pub trait ActionNameSelector: Send + Sync {
    fn is_valid_name(
        &self,
        ctx: &ControllerContext,
        action_name: &str,
        action: &ActionDescriptor,
    ) -> bool;
}

/// Decides whether an action may serve the current request.
pub trait ActionMethodSelector: Send + Sync {
    fn is_valid_for_request(&self, ctx: &ControllerContext, action: &ActionDescriptor) -> bool;
}

/// Exposes an action under `name` instead of its method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionName(pub String);

impl ActionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl ActionNameSelector for ActionName {
    fn is_valid_name(&self, _: &ControllerContext, action_name: &str, _: &ActionDescriptor) -> bool {
        self.0.eq_ignore_ascii_case(action_name)
    }
}

/// HTTP verbs understood by [`AcceptVerbs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
    Options,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Head => "HEAD",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts requests whose (possibly overridden) verb is in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptVerbs {
    verbs: Vec<String>,
}

impl AcceptVerbs {
    pub fn new(verbs: impl IntoIterator<Item = HttpVerb>) -> Self {
        Self {
            verbs: verbs.into_iter().map(|v| v.as_str().to_string()).collect(),
        }
    }

    /// Verbs given by name, for methods outside [`HttpVerb`].
    pub fn from_names<I, S>(verbs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            verbs: verbs
                .into_iter()
                .map(|v| v.as_ref().to_ascii_uppercase())
                .collect(),
        }
    }

    pub fn get() -> Self {
        Self::new([HttpVerb::Get])
    }

    pub fn post() -> Self {
        Self::new([HttpVerb::Post])
    }

    pub fn put() -> Self {
        Self::new([HttpVerb::Put])
    }

    pub fn delete() -> Self {
        Self::new([HttpVerb::Delete])
    }

    pub fn verbs(&self) -> &[String] {
        &self.verbs
    }
}

impl ActionMethodSelector for AcceptVerbs {
    fn is_valid_for_request(&self, ctx: &ControllerContext, _: &ActionDescriptor) -> bool {
        let method = ctx.request.http_method();
        self.verbs.iter().any(|v| v.eq_ignore_ascii_case(&method))
    }
}

/// Marks a registered method as not callable as an action.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonAction;

impl ActionMethodSelector for NonAction {
    fn is_valid_for_request(&self, _: &ControllerContext, _: &ActionDescriptor) -> bool {
        false
    }
}
