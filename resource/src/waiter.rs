//! Completion handles for awaited operations.
//!
//! `await_action` hands the caller a [`Pending`] future and puts the matching
//! [`Completion`] inside the AWAIT action, from where it lands in the
//! `awaiting` table. The interceptor settles it when the operation's SUCCEED
//! or FAIL passes through.

use crate::error::{Rejection, ResourceError};
use composable_resource_core::correlation::CorrelationId;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;

type Outcome = Result<Value, Rejection>;

/// Settle-once handle shared between the AWAIT action and the state.
///
/// Clones refer to the same handle. Only the first settle has any effect.
#[derive(Clone)]
pub struct Completion {
    sender: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl Completion {
    /// A fresh handle and the future it settles.
    #[must_use]
    pub fn new(id: CorrelationId) -> (Self, Pending) {
        let (tx, rx) = oneshot::channel();
        let completion = Self {
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        (completion, Pending { id, receiver: rx })
    }

    /// Resolve with a response. Returns whether this call settled the handle.
    pub fn resolve(&self, response: Value) -> bool {
        self.settle(Ok(response))
    }

    /// Reject with a failure. Returns whether this call settled the handle.
    pub fn reject(&self, rejection: Rejection) -> bool {
        self.settle(Err(rejection))
    }

    /// Whether the handle has been settled (or its future dropped).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.lock().as_ref().is_none_or(oneshot::Sender::is_closed)
    }

    fn settle(&self, outcome: Outcome) -> bool {
        match self.lock().take() {
            // A dropped `Pending` still counts as settled here
            Some(sender) => {
                let _ = sender.send(outcome);
                true
            },
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<Outcome>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn same_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.sender, &other.sender)
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Entry of the `awaiting` table: who is waiting on which correlation id.
#[derive(Clone, Debug)]
pub struct Waiter {
    /// Correlation id of the awaited operation
    pub id: CorrelationId,
    /// Handle to settle
    pub completion: Completion,
}

impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.completion.same_handle(&other.completion)
    }
}

/// Caller-held future of an awaited operation.
///
/// Resolves with the SUCCEED response, fails with
/// [`ResourceError::Rejected`] on FAIL, or with [`ResourceError::Abandoned`]
/// if every copy of the completion handle was dropped unsettled. With no
/// matching outcome it stays pending forever.
#[derive(Debug)]
pub struct Pending {
    id: CorrelationId,
    receiver: oneshot::Receiver<Outcome>,
}

impl Pending {
    /// Correlation id of the awaited operation
    #[must_use]
    pub const fn id(&self) -> CorrelationId {
        self.id
    }

    /// Wait at most `timeout` for the operation to settle.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Timeout`] if nothing settled in time, or the
    /// same errors as awaiting the future directly.
    pub async fn wait_with_timeout(self, timeout: Duration) -> Result<Value, ResourceError> {
        tokio::time::timeout(timeout, self)
            .await
            .map_err(|_| ResourceError::Timeout)?
    }
}

impl Future for Pending {
    type Output = Result<Value, ResourceError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| match received {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(rejection)) => Err(ResourceError::Rejected(rejection)),
            Err(_) => Err(ResourceError::Abandoned),
        })
    }
}
