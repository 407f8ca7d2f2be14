//! Action results and return-value conversion.
//!
//! An action returns anything implementing [`IntoActionResult`]. The invoker
//! turns it into an [`ActionResult`], runs the result filters around it and
//! finally calls [`ActionResult::execute`], which writes into the
//! [`Response`](crate::Response).
//!
//! # Return Value Conversion
//!
//! | Action returns | Result |
//! |----------------|--------|
//! | `ActionResult` | used as-is |
//! | `()` / `None` | [`ActionResult::Empty`] |
//! | `String`, numbers, `bool`, `Value`, ... | [`ActionResult::Content`] via `to_string()` |
//! | `Result<T, E>` | `T` converted as above, `E` raised as an action exception |

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::context::ControllerContext;
use crate::error::AbortSignal;

/// Message raised when a JSON result is requested with GET without opting in.
pub const JSON_GET_DENIED_MESSAGE: &str = "This request has been blocked because sensitive information could be disclosed to third party web sites when this is used in a GET request. To allow GET requests, set allow_get to true.";

/// A result type implemented outside this crate.
pub trait ResultExecutor: Send + Sync {
    fn execute(&self, ctx: &mut ControllerContext) -> anyhow::Result<()>;
}

/// What an action produced, executed after the result filters ran.
#[derive(Clone)]
pub enum ActionResult {
    /// Writes nothing.
    Empty,
    Content {
        content: String,
        content_type: Option<String>,
    },
    /// Serialized JSON. GET requests are refused unless `allow_get` is set.
    Json { data: Value, allow_get: bool },
    /// A 302 (or 301) redirect. With `end_response` the response is ended
    /// with [`AbortSignal`] once the redirect is written.
    Redirect {
        url: String,
        permanent: bool,
        end_response: bool,
    },
    HttpStatus {
        status: u16,
        description: Option<String>,
    },
    File {
        contents: Vec<u8>,
        content_type: String,
        download_name: Option<String>,
    },
    Custom(Arc<dyn ResultExecutor>),
}

impl ActionResult {
    pub fn content(content: impl Into<String>) -> Self {
        ActionResult::Content {
            content: content.into(),
            content_type: None,
        }
    }

    pub fn content_with_type(content: impl Into<String>, content_type: impl Into<String>) -> Self {
        ActionResult::Content {
            content: content.into(),
            content_type: Some(content_type.into()),
        }
    }

    pub fn json<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        Ok(ActionResult::Json {
            data: serde_json::to_value(data)?,
            allow_get: false,
        })
    }

    /// A JSON result that may be returned to GET requests.
    pub fn json_allow_get<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        Ok(ActionResult::Json {
            data: serde_json::to_value(data)?,
            allow_get: true,
        })
    }

    pub fn redirect(url: impl Into<String>) -> Self {
        ActionResult::Redirect {
            url: url.into(),
            permanent: false,
            end_response: false,
        }
    }

    pub fn redirect_permanent(url: impl Into<String>) -> Self {
        ActionResult::Redirect {
            url: url.into(),
            permanent: true,
            end_response: false,
        }
    }

    /// Redirects and ends the response.
    pub fn redirect_and_end(url: impl Into<String>) -> Self {
        ActionResult::Redirect {
            url: url.into(),
            permanent: false,
            end_response: true,
        }
    }

    pub fn http_status(status: u16) -> Self {
        ActionResult::HttpStatus {
            status,
            description: None,
        }
    }

    pub fn http_status_with_description(status: u16, description: impl Into<String>) -> Self {
        ActionResult::HttpStatus {
            status,
            description: Some(description.into()),
        }
    }

    pub fn unauthorized() -> Self {
        Self::http_status(401)
    }

    pub fn not_found() -> Self {
        Self::http_status(404)
    }

    pub fn file(contents: Vec<u8>, content_type: impl Into<String>) -> Self {
        ActionResult::File {
            contents,
            content_type: content_type.into(),
            download_name: None,
        }
    }

    pub fn file_download(
        contents: Vec<u8>,
        content_type: impl Into<String>,
        download_name: impl Into<String>,
    ) -> Self {
        ActionResult::File {
            contents,
            content_type: content_type.into(),
            download_name: Some(download_name.into()),
        }
    }

    pub fn custom(executor: impl ResultExecutor + 'static) -> Self {
        ActionResult::Custom(Arc::new(executor))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ActionResult::Empty)
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionResult::Empty => "empty",
            ActionResult::Content { .. } => "content",
            ActionResult::Json { .. } => "json",
            ActionResult::Redirect { .. } => "redirect",
            ActionResult::HttpStatus { .. } => "http_status",
            ActionResult::File { .. } => "file",
            ActionResult::Custom(_) => "custom",
        }
    }

    /// Writes the result into `ctx.response`.
    pub fn execute(&self, ctx: &mut ControllerContext) -> anyhow::Result<()> {
        let response = &mut ctx.response;
        match self {
            ActionResult::Empty => {}
            ActionResult::Content {
                content,
                content_type,
            } => {
                if let Some(content_type) = content_type {
                    response.content_type = Some(content_type.clone());
                }
                response.write(content);
            }
            ActionResult::Json { data, allow_get } => {
                if !allow_get && ctx.request.method() == "GET" {
                    anyhow::bail!(JSON_GET_DENIED_MESSAGE);
                }
                response.content_type = Some("application/json".into());
                response.write_bytes(&serde_json::to_vec(data)?);
            }
            ActionResult::Redirect {
                url,
                permanent,
                end_response,
            } => {
                response.redirect(url, *permanent);
                if *end_response {
                    return Err(AbortSignal.into());
                }
            }
            ActionResult::HttpStatus {
                status,
                description,
            } => {
                response.status = *status;
                response.status_description = description.clone();
            }
            ActionResult::File {
                contents,
                content_type,
                download_name,
            } => {
                response.content_type = Some(content_type.clone());
                if let Some(name) = download_name {
                    response.set_header(
                        "Content-Disposition",
                        format!("attachment; filename=\"{}\"", name),
                    );
                }
                response.write_bytes(contents);
            }
            ActionResult::Custom(executor) => executor.execute(ctx)?,
        }
        Ok(())
    }
}

impl Default for ActionResult {
    fn default() -> Self {
        ActionResult::Empty
    }
}

impl fmt::Debug for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionResult::Empty => f.write_str("Empty"),
            ActionResult::Content {
                content,
                content_type,
            } => f
                .debug_struct("Content")
                .field("content", content)
                .field("content_type", content_type)
                .finish(),
            ActionResult::Json { data, allow_get } => f
                .debug_struct("Json")
                .field("data", data)
                .field("allow_get", allow_get)
                .finish(),
            ActionResult::Redirect {
                url,
                permanent,
                end_response,
            } => f
                .debug_struct("Redirect")
                .field("url", url)
                .field("permanent", permanent)
                .field("end_response", end_response)
                .finish(),
            ActionResult::HttpStatus {
                status,
                description,
            } => f
                .debug_struct("HttpStatus")
                .field("status", status)
                .field("description", description)
                .finish(),
            ActionResult::File {
                contents,
                content_type,
                download_name,
            } => f
                .debug_struct("File")
                .field("len", &contents.len())
                .field("content_type", content_type)
                .field("download_name", download_name)
                .finish(),
            ActionResult::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Conversion from an action's return value into an [`ActionResult`].
pub trait IntoActionResult {
    fn into_action_result(self) -> anyhow::Result<ActionResult>;
}

impl IntoActionResult for ActionResult {
    fn into_action_result(self) -> anyhow::Result<ActionResult> {
        Ok(self)
    }
}

impl IntoActionResult for () {
    fn into_action_result(self) -> anyhow::Result<ActionResult> {
        Ok(ActionResult::Empty)
    }
}

impl<T: IntoActionResult> IntoActionResult for Option<T> {
    fn into_action_result(self) -> anyhow::Result<ActionResult> {
        match self {
            Some(value) => value.into_action_result(),
            None => Ok(ActionResult::Empty),
        }
    }
}

impl<T, E> IntoActionResult for Result<T, E>
where
    T: IntoActionResult,
    E: Into<anyhow::Error>,
{
    fn into_action_result(self) -> anyhow::Result<ActionResult> {
        self.map_err(Into::into)?.into_action_result()
    }
}

macro_rules! content_result {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoActionResult for $t {
                fn into_action_result(self) -> anyhow::Result<ActionResult> {
                    Ok(ActionResult::content(self.to_string()))
                }
            }
        )*
    };
}

content_result!(
    String, &str, char, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
    f32, f64, Value,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Request, RouteData};
    use serde_json::json;

    fn ctx(method: &str) -> ControllerContext {
        ControllerContext::new(Request::new(method, "/").unwrap(), RouteData::new())
    }

    #[test]
    fn test_return_value_conversion() {
        assert!(().into_action_result().unwrap().is_empty());
        assert!(None::<String>.into_action_result().unwrap().is_empty());
        match 42i32.into_action_result().unwrap() {
            ActionResult::Content { content, .. } => assert_eq!(content, "42"),
            other => panic!("unexpected {:?}", other),
        }
        let failed: Result<String, anyhow::Error> = Err(anyhow::anyhow!("nope"));
        assert_eq!(failed.into_action_result().unwrap_err().to_string(), "nope");
    }

    #[test]
    fn test_content_writes_body_and_type() {
        let mut ctx = ctx("GET");
        ActionResult::content_with_type("<p>hi</p>", "text/html")
            .execute(&mut ctx)
            .unwrap();
        assert_eq!(ctx.response.body_text(), "<p>hi</p>");
        assert_eq!(ctx.response.content_type.as_deref(), Some("text/html"));
    }

    #[test]
    fn test_json_denies_get_by_default() {
        let mut get = ctx("GET");
        let err = ActionResult::json(&json!({"a": 1}))
            .unwrap()
            .execute(&mut get)
            .unwrap_err();
        assert_eq!(err.to_string(), JSON_GET_DENIED_MESSAGE);

        let mut post = ctx("POST");
        ActionResult::json(&json!({"a": 1}))
            .unwrap()
            .execute(&mut post)
            .unwrap();
        assert_eq!(post.response.body_text(), r#"{"a":1}"#);

        ActionResult::json_allow_get(&[1, 2])
            .unwrap()
            .execute(&mut get)
            .unwrap();
        assert_eq!(get.response.body_text(), "[1,2]");
    }

    #[test]
    fn test_redirect_and_end_raises_abort() {
        let mut ctx = ctx("GET");
        let err = ActionResult::redirect_and_end("/login")
            .execute(&mut ctx)
            .unwrap_err();
        assert!(err.downcast_ref::<AbortSignal>().is_some());
        assert_eq!(ctx.response.status, 302);
        assert_eq!(ctx.response.header("Location"), Some("/login"));
    }

    #[test]
    fn test_file_download_sets_disposition() {
        let mut ctx = ctx("GET");
        ActionResult::file_download(vec![1, 2, 3], "application/octet-stream", "data.bin")
            .execute(&mut ctx)
            .unwrap();
        assert_eq!(ctx.response.body, vec![1, 2, 3]);
        assert_eq!(
            ctx.response.header("content-disposition"),
            Some("attachment; filename=\"data.bin\"")
        );
    }

    #[test]
    fn test_custom_result() {
        struct Teapot;
        impl ResultExecutor for Teapot {
            fn execute(&self, ctx: &mut ControllerContext) -> anyhow::Result<()> {
                ctx.response.status = 418;
                Ok(())
            }
        }
        let mut ctx = ctx("GET");
        ActionResult::custom(Teapot).execute(&mut ctx).unwrap();
        assert_eq!(ctx.response.status, 418);
    }
}
