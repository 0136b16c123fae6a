//! Correlation identifiers.
//!
//! A correlation id names one dispatched operation instance so that its
//! eventual outcome (success or failure) can be matched back to it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `CorrelationId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid correlation ID: {0}")]
pub struct ParseCorrelationIdError(String);

/// Identifier of one dispatched operation.
///
/// Ids are handed out by an [`IdGenerator`](crate::environment::IdGenerator).
/// They are unique for the lifetime of the generator but carry no meaning
/// across process restarts, so they must not be persisted.
///
/// # Examples
///
/// ```
/// use composable_resource_core::correlation::CorrelationId;
///
/// let id = CorrelationId::new(42);
/// assert_eq!(id.get(), 42);
/// assert_eq!(id.to_string(), "42");
/// assert_eq!("42".parse::<CorrelationId>().ok(), Some(id));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Wrap a raw counter value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationId {
    type Err = ParseCorrelationIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseCorrelationIdError(s.to_string()))
    }
}

impl From<u64> for CorrelationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
