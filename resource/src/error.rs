//! Error types for resource operations

use composable_resource_core::http::TransportError;
use composable_resource_runtime::StoreError;
use serde_json::Value;
use thiserror::Error;

/// Why a request ended in a FAIL action.
///
/// Carried inside actions, hence `Clone + Eq`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The server answered outside `[200, 300)`
    #[error("HTTP {status}: {status_text}")]
    Http {
        /// Status code
        status: u16,
        /// Reason phrase
        status_text: String,
    },

    /// No response was obtained at all
    #[error("Transport error: {0}")]
    Transport(String),

    /// A successful response the response handler could not parse
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl RequestError {
    /// Short label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
        }
    }
}

impl From<TransportError> for RequestError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error.to_string())
    }
}

/// What an awaited operation is rejected with: the FAIL action's payload.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct Rejection {
    /// Parsed error body, `None` when absent or unparsable
    pub response: Option<Value>,
    /// The failure itself
    pub error: RequestError,
}

/// Errors surfaced by the resource API.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Configuration cannot be used
    #[error("Invalid resource configuration: {0}")]
    InvalidConfig(String),

    /// `call` named an action that is not in the registry
    #[error("Unknown action '{name}' on resource '{resource}'")]
    UnknownAction {
        /// Resource the call was made on
        resource: String,
        /// Name that was looked up
        name: String,
    },

    /// The completion handle was dropped before it settled
    #[error("Operation was abandoned before it settled")]
    Abandoned,

    /// Gave up waiting for an operation to settle
    #[error("Timed out waiting for operation to settle")]
    Timeout,

    /// The operation failed
    #[error("Operation rejected: {0}")]
    Rejected(Rejection),

    /// The store refused the action
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The HTTP client could not be set up
    #[error("HTTP client unavailable: {0}")]
    Transport(#[from] TransportError),
}

impl ResourceError {
    /// The rejection payload, if the operation failed remotely.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}
