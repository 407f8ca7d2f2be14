//! Declarative validation rules attached to model properties.
//!
//! Rules run after a complex model's properties are bound. `Required` is also
//! consulted before a null value is assigned so that its message wins over
//! any later "value is required" fallback.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

/// Custom rule: returns an error message for an invalid value.
pub type CustomRule = Arc<dyn Fn(Option<&Value>) -> Option<String> + Send + Sync>;

/// Model-level rule: inspects a whole bound model and reports member errors.
pub type ModelRule = Arc<dyn Fn(&Value) -> Vec<ValidationResult> + Send + Sync>;

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Property name relative to the validated model; empty for the model itself.
    pub member_name: String,
    pub message: String,
}

impl ValidationResult {
    pub fn new(member_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            member_name: member_name.into(),
            message: message.into(),
        }
    }
}

/// A validation rule with an optional message template.
///
/// Message templates may use `{0}` for the display name of the field.
#[derive(Clone)]
pub enum Validator {
    /// Value must be present and, for strings, not blank.
    Required { message: Option<String> },
    /// String length must fall within `min..=max`.
    StringLength {
        min: usize,
        max: usize,
        message: Option<String>,
    },
    /// Number must fall within `min..=max`.
    Range {
        min: f64,
        max: f64,
        message: Option<String>,
    },
    /// String must match the whole pattern.
    Pattern {
        regex: Regex,
        message: Option<String>,
    },
    /// Arbitrary rule.
    Custom(CustomRule),
}

impl Validator {
    pub fn required() -> Self {
        Validator::Required { message: None }
    }

    pub fn string_length(max: usize) -> Self {
        Validator::StringLength {
            min: 0,
            max,
            message: None,
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Validator::Range {
            min,
            max,
            message: None,
        }
    }

    /// Build a pattern rule. The pattern is anchored at both ends.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Validator::Pattern {
            regex,
            message: None,
        })
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>) -> Option<String> + Send + Sync + 'static,
    {
        Validator::Custom(Arc::new(f))
    }

    /// Replace the message template.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        let template = Some(template.into());
        match &mut self {
            Validator::Required { message }
            | Validator::StringLength { message, .. }
            | Validator::Range { message, .. }
            | Validator::Pattern { message, .. } => *message = template,
            Validator::Custom(_) => {}
        }
        self
    }

    /// Set the lower bound of a string length rule.
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        if let Validator::StringLength { min, .. } = &mut self {
            *min = min_length;
        }
        self
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Validator::Required { .. })
    }

    /// Check `value`; returns the formatted error message on failure.
    ///
    /// Only `Required` and custom rules look at absent values; the others
    /// treat null as valid.
    pub fn validate(&self, value: Option<&Value>, display_name: &str) -> Option<String> {
        let value = value.filter(|v| !v.is_null());
        match self {
            Validator::Required { message } => {
                let missing = match value {
                    None => true,
                    Some(Value::String(s)) => s.trim().is_empty(),
                    Some(_) => false,
                };
                missing.then(|| {
                    format_message(message, display_name, || {
                        format!("The {} field is required.", display_name)
                    })
                })
            }
            Validator::StringLength { min, max, message } => {
                let len = value?.as_str()?.chars().count();
                (len < *min || len > *max).then(|| {
                    format_message(message, display_name, || {
                        if *min > 0 {
                            format!(
                                "The field {} must be a string with a minimum length of {} and a maximum length of {}.",
                                display_name, min, max
                            )
                        } else {
                            format!(
                                "The field {} must be a string with a maximum length of {}.",
                                display_name, max
                            )
                        }
                    })
                })
            }
            Validator::Range { min, max, message } => {
                let number = match value? {
                    Value::Number(n) => n.as_f64()?,
                    Value::String(s) => s.trim().parse::<f64>().ok()?,
                    _ => return None,
                };
                (number < *min || number > *max).then(|| {
                    format_message(message, display_name, || {
                        format!(
                            "The field {} must be between {} and {}.",
                            display_name, min, max
                        )
                    })
                })
            }
            Validator::Pattern { regex, message } => {
                let text = match value? {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (!regex.is_match(&text)).then(|| {
                    format_message(message, display_name, || {
                        let pattern = regex.as_str();
                        let inner = pattern
                            .strip_prefix("^(?:")
                            .and_then(|p| p.strip_suffix(")$"))
                            .unwrap_or(pattern);
                        format!(
                            "The field {} must match the regular expression '{}'.",
                            display_name, inner
                        )
                    })
                })
            }
            Validator::Custom(rule) => rule(value),
        }
    }
}

fn format_message(
    template: &Option<String>,
    display_name: &str,
    default: impl FnOnce() -> String,
) -> String {
    match template {
        Some(t) => t.replace("{0}", display_name),
        None => default(),
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Required { .. } => write!(f, "Required"),
            Validator::StringLength { min, max, .. } => write!(f, "StringLength({}..={})", min, max),
            Validator::Range { min, max, .. } => write!(f, "Range({}..={})", min, max),
            Validator::Pattern { regex, .. } => write!(f, "Pattern({})", regex.as_str()),
            Validator::Custom(_) => write!(f, "Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required() {
        let v = Validator::required();
        assert_eq!(
            v.validate(None, "Name").as_deref(),
            Some("The Name field is required.")
        );
        assert!(v.validate(Some(&json!("  ")), "Name").is_some());
        assert!(v.validate(Some(&Value::Null), "Name").is_some());
        assert!(v.validate(Some(&json!("x")), "Name").is_none());
        assert!(v.validate(Some(&json!(0)), "Age").is_none());
    }

    #[test]
    fn test_string_length() {
        let v = Validator::string_length(3);
        assert!(v.validate(Some(&json!("abc")), "Code").is_none());
        assert_eq!(
            v.validate(Some(&json!("abcd")), "Code").as_deref(),
            Some("The field Code must be a string with a maximum length of 3.")
        );
        assert!(v.validate(None, "Code").is_none());

        let v = Validator::string_length(5).with_min_length(2);
        assert!(v
            .validate(Some(&json!("a")), "Code")
            .unwrap()
            .contains("minimum length of 2"));
    }

    #[test]
    fn test_range() {
        let v = Validator::range(1.0, 10.0);
        assert!(v.validate(Some(&json!(5)), "Qty").is_none());
        assert_eq!(
            v.validate(Some(&json!(11)), "Qty").as_deref(),
            Some("The field Qty must be between 1 and 10.")
        );
        assert!(v.validate(None, "Qty").is_none());
    }

    #[test]
    fn test_pattern() {
        let v = Validator::pattern("[a-z]+").unwrap();
        assert!(v.validate(Some(&json!("abc")), "Slug").is_none());
        assert_eq!(
            v.validate(Some(&json!("abc1")), "Slug").as_deref(),
            Some("The field Slug must match the regular expression '[a-z]+'.")
        );
    }

    #[test]
    fn test_custom_message_template() {
        let v = Validator::required().with_message("{0} is mandatory");
        assert_eq!(
            v.validate(None, "Email").as_deref(),
            Some("Email is mandatory")
        );
    }

    #[test]
    fn test_custom_rule() {
        let v = Validator::custom(|value| match value {
            Some(Value::String(s)) if s.contains('@') => None,
            _ => Some("not an email".into()),
        });
        assert!(v.validate(Some(&json!("a@b")), "Email").is_none());
        assert_eq!(v.validate(None, "Email").as_deref(), Some("not an email"));
    }
}
