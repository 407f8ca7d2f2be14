//! Request validation: rejecting potentially dangerous input.
//!
//! Runs after authorization and before parameter binding, unless the
//! controller or the action opts out. A form field or query string value is
//! dangerous when it contains `<` followed by a letter, `!`, `/` or `?`
//! (markup), or the sequence `&#` (a character reference).

use thiserror::Error;

use crate::context::Request;

/// Raised when a request value looks like markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "A potentially dangerous Request.{collection} value was detected from the client ({key}=\"{}\").",
    truncate(.value)
)]
pub struct RequestValidationError {
    /// `Form` or `QueryString`.
    pub collection: &'static str,
    pub key: String,
    pub value: String,
}

fn truncate(value: &str) -> String {
    if value.chars().count() <= 20 {
        return value.to_string();
    }
    let head: String = value.chars().take(15).collect();
    format!("{}...", head)
}

/// Returns `true` if `value` contains markup or a character reference.
pub fn is_dangerous_string(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.windows(2).any(|pair| match pair {
        [b'<', next] => next.is_ascii_alphabetic() || matches!(next, b'!' | b'/' | b'?'),
        [b'&', b'#'] => true,
        _ => false,
    })
}

/// Checks every form field, then every query string value.
pub fn validate_request(request: &Request) -> Result<(), RequestValidationError> {
    check("Form", request.form().iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    let query = request.query_pairs();
    check("QueryString", query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

fn check<'a>(
    collection: &'static str,
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
) -> Result<(), RequestValidationError> {
    for (key, value) in pairs {
        if is_dangerous_string(value) {
            return Err(RequestValidationError {
                collection,
                key: key.to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}
