//! Request options and request building.
//!
//! Options are layered: per-call options over the resource's configured
//! options over [`RequestOptions::defaults`]. Headers are deep-merged, every
//! other field is replaced by the upper layer when that layer sets it.

use crate::error::RequestError;
use composable_resource_core::http::{HttpRequest, Method};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// JSON:API media type sent by default.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Options for one network call.
///
/// Header names are stored lowercase.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    /// Method, `GET` when unset
    pub method: Option<Method>,
    /// Header name → value
    pub headers: BTreeMap<String, String>,
    /// JSON body, serialized into `body` when the request is built
    pub data: Option<Value>,
    /// Query parameters appended to the URL
    pub query: Option<Map<String, Value>>,
    /// Pre-serialized body
    pub body: Option<String>,
}

impl RequestOptions {
    /// Empty options; every field falls through to lower layers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hard defaults: `GET` with JSON:API `Accept` and `Content-Type`.
    #[must_use]
    pub fn defaults() -> Self {
        Self::new()
            .with_method(Method::Get)
            .with_header("Accept", JSON_API_MEDIA_TYPE)
            .with_header("Content-Type", JSON_API_MEDIA_TYPE)
    }

    /// Set the method
    #[must_use]
    pub const fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set one header
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the JSON body
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the query parameters
    #[must_use]
    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = Some(query);
        self
    }

    /// Set a pre-serialized body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Effective method
    #[must_use]
    pub fn method(&self) -> Method {
        self.method.unwrap_or_default()
    }

    /// Layer `over` on top of `self`.
    ///
    /// Headers from both layers are kept, `over` winning per name.
    #[must_use]
    pub fn merged_with(&self, over: &Self) -> Self {
        let mut headers = self.headers.clone();
        headers.extend(over.headers.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.clone())));

        Self {
            method: over.method.or(self.method),
            headers,
            data: over.data.clone().or_else(|| self.data.clone()),
            query: over.query.clone().or_else(|| self.query.clone()),
            body: over.body.clone().or_else(|| self.body.clone()),
        }
    }

    /// Resolve the three layers: hard defaults, `configured`, then `per_call`.
    #[must_use]
    pub fn resolve(configured: &Self, per_call: &Self) -> Self {
        Self::defaults().merged_with(configured).merged_with(per_call)
    }
}

/// Encode query parameters.
///
/// Scalars are written as-is, `null` as an empty value, arrays as repeated
/// keys, nested objects as their JSON text.
///
/// # Errors
///
/// Returns [`RequestError::Transport`] if the pairs cannot be URL-encoded.
pub fn encode_query(params: &Map<String, Value>) -> Result<String, RequestError> {
    let mut pairs: Vec<(&str, String)> = Vec::with_capacity(params.len());
    for (key, value) in params {
        match value {
            Value::Array(items) => pairs.extend(items.iter().map(|item| (key.as_str(), scalar(item)))),
            other => pairs.push((key.as_str(), scalar(other))),
        }
    }
    serde_urlencoded::to_string(&pairs).map_err(|e| RequestError::Transport(format!("invalid query: {e}")))
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Append an encoded query string to `url`.
#[must_use]
pub fn with_query_string(url: &str, query: &str) -> String {
    if query.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{url}&{query}")
    } else {
        format!("{url}?{query}")
    }
}

/// Build the outgoing request for a REQUEST action.
///
/// `data` is serialized into the body (and dropped from the options), then a
/// non-empty query is appended to the URL.
///
/// # Errors
///
/// Returns [`RequestError::Transport`] if the body or query cannot be encoded.
pub fn build_request(url: &str, options: &RequestOptions) -> Result<HttpRequest, RequestError> {
    let mut options = options.clone();

    if let Some(data) = options.data.take() {
        let body = serde_json::to_string(&data).map_err(|e| RequestError::Transport(format!("invalid body: {e}")))?;
        options.body = Some(body);
    }

    let url = match options.query.as_ref() {
        Some(query) if !query.is_empty() => with_query_string(url, &encode_query(query)?),
        _ => url.to_string(),
    };

    Ok(HttpRequest {
        method: options.method(),
        url,
        headers: options.headers,
        body: options.body,
    })
}
