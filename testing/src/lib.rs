//! # Composable Resource Testing
//!
//! Testing utilities and helpers for the Composable Resource architecture.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (clock, HTTP transport)
//! - Given-When-Then harnesses for reducers and interceptors
//! - Helpers for running effects outside a store
//! - Property-based testing strategies for JSON payloads
//!
//! ## Example
//!
//! ```ignore
//! use composable_resource_testing::{MockTransport, test_clock};
//!
//! #[tokio::test]
//! async fn test_create_flow() {
//!     let transport = MockTransport::new().respond_json(201, json!({"id": "1"}));
//!     let store = issues_store(transport.clone(), test_clock());
//!
//!     let mut handle = store.send(issues.create(json!({"name": "x"}))).await?;
//!     handle.wait().await;
//!
//!     assert_eq!(transport.request_count(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use composable_resource_core::environment::Clock;

mod mock_transport;
mod reducer_test;

pub use interceptor_test::InterceptorTest;
pub use mock_transport::MockTransport;
pub use reducer_test::{assertions, ReducerTest};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until explicitly advanced, making timestamps in
    /// state reproducible. Clones share the current time.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_resource_testing::mocks::FixedClock;
    /// use composable_resource_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// assert_eq!(time1, clock.now());
    ///
    /// clock.advance(Duration::seconds(5));
    /// assert_eq!(clock.now() - time1, Duration::seconds(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities
pub mod helpers {
    use composable_resource_core::effect::Effect;
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Run an effect to completion outside a store and collect its actions
    ///
    /// Lets interceptor tests observe what a network effect would feed back
    /// without wiring up a full store.
    pub async fn run_effect<A>(effect: Effect<A>) -> Vec<A> {
        match effect {
            Effect::None => Vec::new(),
            Effect::Future(fut) => fut.await.into_iter().collect(),
            Effect::Stream(stream) => stream.collect().await,
        }
    }

    /// Run several effects one after another and concatenate their actions
    pub async fn run_effects<A>(effects: impl IntoIterator<Item = Effect<A>>) -> Vec<A> {
        let mut actions = Vec::new();
        for effect in effects {
            actions.extend(run_effect(effect).await);
        }
        actions
    }

    /// Wait on an action subscription until `predicate` matches
    ///
    /// Returns `None` on timeout or when the channel closes.
    pub async fn wait_for_action<A, F>(
        rx: &mut broadcast::Receiver<A>,
        predicate: F,
        timeout: Duration,
    ) -> Option<A>
    where
        A: Clone,
        F: Fn(&A) -> bool,
    {
        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(action) if predicate(&action) => return Some(action),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {},
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    /// Install a `tracing` subscriber honouring `RUST_LOG`, once per process
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use serde_json::{Map, Value};

    /// Scalar JSON values: null, booleans, integers and short strings
    pub fn json_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    /// Attribute maps with up to `max_len` lowercase keys and scalar values
    ///
    /// Never generates an `id` key, so generated attributes cannot collide
    /// with entity identity.
    pub fn attributes(max_len: usize) -> impl Strategy<Value = Map<String, Value>> {
        prop::collection::btree_map("[a-hj-z][a-z]{0,5}", json_scalar(), 0..=max_len)
            .prop_map(|entries| entries.into_iter().collect())
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock};
