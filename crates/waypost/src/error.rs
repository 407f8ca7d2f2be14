//! Error types for building and running an [`Application`](crate::Application).

use thiserror::Error;
use waypost_dispatch::InvokeError;

/// Failures while configuring an application.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("unknown culture: {0}")]
    UnknownCulture(String),

    #[error("duplicate controller: {0}")]
    DuplicateController(String),

    #[error("setup I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures while handling one request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    MissingRouteValue(String),

    #[error("The controller for path '{path}' was not found.")]
    ControllerNotFound { path: String },

    #[error("An error occurred when trying to create a controller of type '{controller}'.")]
    Activation {
        controller: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

impl RequestError {
    /// Status code the host should answer with.
    pub fn status(&self) -> u16 {
        match self {
            RequestError::MissingRouteValue(_) | RequestError::ControllerNotFound { .. } => 404,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_display() {
        let err = SetupError::DuplicateController("Home".into());
        assert_eq!(err.to_string(), "duplicate controller: Home");

        let err = SetupError::UnknownCulture("xx-YY".into());
        assert_eq!(err.to_string(), "unknown culture: xx-YY");
    }

    #[test]
    fn test_request_error_status() {
        let missing = RequestError::ControllerNotFound {
            path: "/nope".into(),
        };
        assert_eq!(missing.status(), 404);
        insta::assert_snapshot!(missing.to_string(), @"The controller for path '/nope' was not found.");

        let activation = RequestError::Activation {
            controller: "HomeController".into(),
            source: anyhow::anyhow!("no database"),
        };
        assert_eq!(activation.status(), 500);
    }
}
