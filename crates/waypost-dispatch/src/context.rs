//! Request-scoped state threaded through the pipeline.
//!
//! A [`ControllerContext`] is created per request and owned by the caller of
//! the invoker. Filters and actions receive `&mut` access to it through the
//! stage contexts in [`crate::filter`].
//!
//! # Contents
//!
//! | Field | Purpose |
//! |-------|---------|
//! | `request` | Method, URL, headers, form fields, body |
//! | `response` | Status, headers and body written by results |
//! | `route_data` | Values extracted by the (external) router |
//! | `view_data` | Ordered key/value data handed to renderers |
//! | `model_state` | Binding and validation errors for this request |
//! | `extensions` | Typed per-request values (principal, request id, ...) |
//! | `culture` | Culture used by form and JSON value providers |

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;
use waypost_binding::{Culture, ModelStateDictionary};

/// Header, form field or query key carrying a verb override for POST requests.
pub const HTTP_METHOD_OVERRIDE: &str = "X-HTTP-Method-Override";

/// Typed per-request values keyed by type.
///
/// Filters put values here (an authenticated principal, a request id) and
/// actions read them back.
///
/// ```rust
/// use waypost_dispatch::Extensions;
///
/// struct RequestId(u64);
///
/// let mut extensions = Extensions::new();
/// extensions.insert(RequestId(7));
/// assert_eq!(extensions.get_required::<RequestId>()?.0, 7);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Default)]
pub struct Extensions {
    values: HashMap<TypeId, Box<dyn Any>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, returning the previous value of the same type.
    pub fn insert<T: 'static>(&mut self, value: T) -> Option<T> {
        self.values
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast().ok().map(|b| *b))
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.values
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Like [`get`](Self::get), but a missing value is an error.
    pub fn get_required<T: 'static>(&self) -> Result<&T, anyhow::Error> {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "Extension missing: type {} not found in context",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok().map(|b| *b))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

/// An incoming request as seen by the pipeline.
///
/// Relative URLs are resolved against `http://localhost/`.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    url: Url,
    headers: Vec<(String, String)>,
    form: Vec<(String, String)>,
    body: Option<String>,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse("http://localhost/")?;
        Ok(Self {
            method: method.to_ascii_uppercase(),
            url: base.join(url)?,
            headers: Vec::new(),
            form: Vec::new(),
            body: None,
        })
    }

    pub fn get(url: &str) -> Result<Self, url::ParseError> {
        Self::new("GET", url)
    }

    pub fn post(url: &str) -> Result<Self, url::ParseError> {
        Self::new("POST", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds posted form fields.
    pub fn with_form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        if self.content_type().is_none() {
            self = self.with_header("Content-Type", "application/x-www-form-urlencoded");
        }
        self
    }

    /// Adds form fields from an `application/x-www-form-urlencoded` body.
    pub fn with_form_body(self, body: &str) -> Self {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect();
        self.with_form(pairs)
    }

    /// Sets a JSON body.
    pub fn with_json(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("Content-Type"));
        self.with_header("Content-Type", "application/json")
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The verb used for action selection.
    ///
    /// POST requests may override it through the `X-HTTP-Method-Override`
    /// header, form field or query key. Overrides to GET or POST are ignored.
    pub fn http_method(&self) -> String {
        if self.method != "POST" {
            return self.method.clone();
        }
        let override_value = self
            .header(HTTP_METHOD_OVERRIDE)
            .map(str::to_string)
            .or_else(|| self.form_value(HTTP_METHOD_OVERRIDE).map(str::to_string))
            .or_else(|| {
                self.query_pairs()
                    .into_iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(HTTP_METHOD_OVERRIDE))
                    .map(|(_, v)| v)
            });
        match override_value.map(|v| v.to_ascii_uppercase()) {
            Some(verb) if verb != "GET" && verb != "POST" => verb,
            _ => self.method.clone(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "https"
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url.query_pairs().into_owned().collect()
    }

    pub fn form(&self) -> &[(String, String)] {
        &self.form
    }

    fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Media type of the body without parameters.
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// What results write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_description: Option<String>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            status_description: None,
            content_type: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, text: &str) {
        self.body.extend_from_slice(text.as_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    /// The body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing any existing value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Points the client at `location` with a 302 (or 301 when permanent).
    pub fn redirect(&mut self, location: &str, permanent: bool) {
        self.status = if permanent { 301 } else { 302 };
        self.set_header("Location", location);
    }

    /// Discards everything written so far, keeping nothing but the defaults.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Values extracted from the URL by the router.
///
/// Lookups are case-insensitive; `controller` and `action` are the keys the
/// application host reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteData {
    values: Map<String, Value>,
}

impl RouteData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let existing = self
            .values
            .keys()
            .find(|k| k.eq_ignore_ascii_case(&key))
            .cloned();
        match existing {
            Some(existing) => {
                self.values.insert(existing, value.into());
            }
            None => {
                self.values.insert(key, value.into());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Like [`get_str`](Self::get_str), but a missing value is an error.
    pub fn get_required_str(&self, key: &str) -> Result<&str, anyhow::Error> {
        self.get_str(key)
            .ok_or_else(|| anyhow::anyhow!("The RouteData must contain an item named '{}'.", key))
    }

    pub fn controller(&self) -> Option<&str> {
        self.get_str("controller")
    }

    pub fn action(&self) -> Option<&str> {
        self.get_str("action")
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Ordered data handed from actions to renderers, with typed access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewData {
    values: Map<String, Value>,
    model: Option<Value>,
}

impl ViewData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Reads `key` as `T`. Missing keys and type mismatches yield `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set_model<T: Serialize>(&mut self, model: &T) -> Result<(), serde_json::Error> {
        self.model = Some(serde_json::to_value(model)?);
        Ok(())
    }

    pub fn model(&self) -> Option<&Value> {
        self.model.as_ref()
    }
}

/// Everything one request carries through the pipeline.
#[derive(Debug)]
pub struct ControllerContext {
    pub request: Request,
    pub response: Response,
    pub route_data: RouteData,
    pub view_data: ViewData,
    pub model_state: ModelStateDictionary,
    pub extensions: Extensions,
    pub culture: Culture,
}

impl ControllerContext {
    pub fn new(request: Request, route_data: RouteData) -> Self {
        Self {
            request,
            response: Response::new(),
            route_data,
            view_data: ViewData::new(),
            model_state: ModelStateDictionary::new(),
            extensions: Extensions::new(),
            culture: Culture::invariant(),
        }
    }

    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }
}
