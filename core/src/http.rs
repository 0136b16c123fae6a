//! HTTP value types and the transport capability.
//!
//! The transport is an external collaborator: one call, one attempt,
//! `(url, method, headers, body) → (status, status text, body)`. Keeping it
//! behind a trait lets tests script responses and lets production plug in
//! any client.
//!
//! # Dyn Compatibility
//!
//! [`HttpTransport`] uses explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` so it can be held as `Arc<dyn HttpTransport>` inside effects.

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// HTTP request method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// The method token as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built outgoing request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Absolute target URL, query string included
    pub url: String,
    /// Header name → value
    pub headers: BTreeMap<String, String>,
    /// Serialized body, if any
    pub body: Option<String>,
}

/// A response as returned by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Reason phrase (`"Not Found"`, ...)
    pub status_text: String,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a response from a status and raw body.
    #[must_use]
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    /// Whether the status is in `[200, 300)`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Whether the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The body as (lossy) UTF-8 text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failures that happen before any response exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established or was reset
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request timed out at the transport level
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other client-side failure (invalid URL, body stream error, ...)
    #[error("Transport failed: {0}")]
    Other(String),
}

/// Network-call primitive.
///
/// Implementations perform exactly one attempt. Non-2xx statuses are NOT
/// errors at this level; they come back as `Ok(HttpResponse)`.
pub trait HttpTransport: Send + Sync {
    /// Send a request and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response could be obtained at all.
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>>;
}
