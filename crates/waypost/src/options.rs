//! Application options.
//!
//! Options come from code ([`MvcOptions::default`] plus field updates) or
//! from YAML. Every key is optional:
//!
//! ```yaml
//! culture: de-DE            # culture used for form and JSON values
//! validate_requests: true   # reject markup in form and query values
//! handle_errors: false      # install a global HandleErrorFilter
//! error_message: "An error occurred while processing your request."
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use waypost_binding::Culture;

use crate::error::SetupError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MvcOptions {
    /// Culture name; `None` means invariant.
    pub culture: Option<String>,
    pub validate_requests: bool,
    pub handle_errors: bool,
    pub error_message: String,
}

impl Default for MvcOptions {
    fn default() -> Self {
        Self {
            culture: None,
            validate_requests: true,
            handle_errors: false,
            error_message: "An error occurred while processing your request.".into(),
        }
    }
}

impl MvcOptions {
    pub fn from_yaml(source: &str) -> Result<Self, SetupError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    /// The configured culture, resolved by name.
    pub fn culture(&self) -> Result<Culture, SetupError> {
        match self.culture.as_deref() {
            None | Some("") => Ok(Culture::invariant()),
            Some(name) => {
                Culture::from_name(name).ok_or_else(|| SetupError::UnknownCulture(name.to_string()))
            }
        }
    }
}
