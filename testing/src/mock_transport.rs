//! Scripted HTTP transport for tests
//!
//! Provides a deterministic stand-in for the network:
//! - [`MockTransport`]: replays scripted responses in order and records every
//!   request it receives

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Mutex poisoning only happens after a test already panicked

use composable_resource_core::http::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted reply.
#[derive(Clone, Debug)]
enum Reply {
    Respond(Result<HttpResponse, TransportError>),
    /// Never completes
    Hang,
}

/// In-memory transport for fast, deterministic network tests.
///
/// Replies are consumed in the order they were scripted. When the script runs
/// dry, the fallback reply is used (a `200 OK` with an empty body unless
/// configured otherwise). Clones share the script and the request log.
///
/// # Example
///
/// ```
/// use composable_resource_testing::MockTransport;
/// use composable_resource_core::http::{HttpRequest, HttpTransport};
/// use serde_json::json;
///
/// # async fn example() {
/// let transport = MockTransport::new()
///     .respond_json(201, json!({"id": "1", "name": "x"}));
///
/// let response = transport.send(HttpRequest::default()).await;
/// assert_eq!(response.map(|r| r.status).ok(), Some(201));
/// assert_eq!(transport.request_count(), 1);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Reply>>>,
    fallback: Arc<Mutex<Reply>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Create a transport with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(Reply::Respond(Ok(HttpResponse::new(200, "OK", Vec::new()))))),
            requests: Arc::new(Mutex::new(Vec::new())),
            latency: None,
        }
    }

    /// Queue a raw response
    #[must_use]
    pub fn respond(self, response: HttpResponse) -> Self {
        self.push(Reply::Respond(Ok(response)));
        self
    }

    /// Queue a response with a JSON body and the canonical reason phrase
    #[must_use]
    pub fn respond_json(self, status: u16, body: Value) -> Self {
        let bytes = serde_json::to_vec(&body).unwrap();
        self.respond(HttpResponse::new(status, reason_phrase(status), bytes))
    }

    /// Queue a response with a raw text body
    #[must_use]
    pub fn respond_text(self, status: u16, body: &str) -> Self {
        self.respond(HttpResponse::new(status, reason_phrase(status), body.as_bytes().to_vec()))
    }

    /// Queue a transport-level failure (no response at all)
    #[must_use]
    pub fn fail_with(self, error: TransportError) -> Self {
        self.push(Reply::Respond(Err(error)));
        self
    }

    /// Queue a reply that never arrives
    #[must_use]
    pub fn hang(self) -> Self {
        self.push(Reply::Hang);
        self
    }

    /// Reply used once the script is exhausted
    #[must_use]
    pub fn with_fallback(self, response: HttpResponse) -> Self {
        *self.fallback.lock().unwrap() = Reply::Respond(Ok(response));
        self
    }

    /// Delay every reply by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every request received so far, in arrival order
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request
    #[must_use]
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Number of requests received
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Number of scripted replies not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }

    fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    fn next_reply(&self) -> Reply {
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for MockTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        self.requests.lock().unwrap().push(request);
        let reply = self.next_reply();
        let latency = self.latency;

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            match reply {
                Reply::Respond(result) => result,
                Reply::Hang => std::future::pending().await,
            }
        })
    }
}

/// Canonical reason phrase for the statuses tests commonly script.
fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}
