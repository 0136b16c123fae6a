//! `reqwest`-backed [`HttpTransport`].

use composable_resource_core::http::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// HTTP transport over a shared `reqwest` client
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Transport with a default client
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Other`] if the client cannot be built
    /// (no TLS backend available).
    pub fn new() -> Result<Self, TransportError> {
        Self::build(Client::builder())
    }

    /// Transport over an existing client
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Transport whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Other`] if the client cannot be built
    /// (no TLS backend available).
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Self::build(Client::builder().timeout(timeout))
    }

    fn build(builder: reqwest::ClientBuilder) -> Result<Self, TransportError> {
        let client = builder.build().map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;

        let status = response.status();
        let body = response.bytes().await.map_err(classify)?;

        Ok(HttpResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default(),
            body.to_vec(),
        ))
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_connect() {
        TransportError::Connection(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        Box::pin(self.execute(request))
    }
}
