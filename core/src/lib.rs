//! # Composable Resource Core
//!
//! Core traits and types for the Composable Resource architecture.
//!
//! This crate provides the abstractions an action-dispatch container is built
//! from: pure reducers, side-effecting interceptors that sit in front of them,
//! effect descriptions, and the injected environment capabilities (clock,
//! correlation id generation, HTTP transport).
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature
//! - **Action**: All possible inputs to a reducer
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Interceptor**: Dispatch-chain link that observes an action before the
//!   reducer does and describes derived dispatches and effects
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```ignore
//! use composable_resource_core::*;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         state.count += 1;
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

pub use effect::Effect;
pub use interceptor::{Interception, Interceptor};
pub use reducer::Reducer;

/// Reducer and interceptor composition
pub mod composition;

/// Correlation identifiers for dispatched operations
pub mod correlation;

/// HTTP value types and the transport capability
pub mod http;

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all state-transition logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Interceptor module - Side-effecting links in the dispatch chain
///
/// An interceptor sees every action before the reducer does. It can read the
/// current state and describe what should happen next: which derived actions
/// to dispatch through the whole chain first, whether (and which) action
/// continues to the reducer, and which effects to run afterwards.
///
/// Interceptors never mutate state. State changes only happen in reducers.
pub mod interceptor {
    use super::effect::Effect;
    use smallvec::SmallVec;
    use std::marker::PhantomData;

    /// The outcome of intercepting one action
    ///
    /// The runtime processes an interception in order:
    ///
    /// 1. every action in `dispatch`, each through the full chain (depth-first)
    /// 2. `forward`, if present, through the reducer
    /// 3. `effects`, spawned after the reducer ran
    pub struct Interception<Action> {
        /// Derived actions dispatched before the intercepted action continues
        pub dispatch: SmallVec<[Action; 2]>,

        /// The action that continues down the chain (`None` swallows it)
        pub forward: Option<Action>,

        /// Effects to execute once the forwarded action has been reduced
        pub effects: SmallVec<[Effect<Action>; 2]>,
    }

    impl<Action> Interception<Action> {
        /// Pass the action through unchanged, with no side effects
        #[must_use]
        pub fn pass(action: Action) -> Self {
            Self {
                dispatch: SmallVec::new(),
                forward: Some(action),
                effects: SmallVec::new(),
            }
        }

        /// Stop the action here; nothing reaches the reducer
        #[must_use]
        pub fn swallow() -> Self {
            Self {
                dispatch: SmallVec::new(),
                forward: None,
                effects: SmallVec::new(),
            }
        }

        /// Queue a derived action to be dispatched before the forwarded one
        #[must_use]
        pub fn dispatching(mut self, action: Action) -> Self {
            self.dispatch.push(action);
            self
        }

        /// Attach an effect to run after the forwarded action is reduced
        #[must_use]
        pub fn with_effect(mut self, effect: Effect<Action>) -> Self {
            self.effects.push(effect);
            self
        }
    }

    impl<Action> std::fmt::Debug for Interception<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Interception")
                .field("dispatch", &self.dispatch)
                .field("forward", &self.forward)
                .field("effects", &self.effects)
                .finish()
        }
    }

    /// The Interceptor trait - side-effect link in front of a reducer
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Interceptor for AuditInterceptor {
    ///     type State = AppState;
    ///     type Action = AppAction;
    ///     type Environment = AppEnvironment;
    ///
    ///     fn intercept(
    ///         &self,
    ///         _state: &AppState,
    ///         action: AppAction,
    ///         _env: &AppEnvironment,
    ///     ) -> Interception<AppAction> {
    ///         match action {
    ///             AppAction::Save { .. } => Interception::pass(action.clone())
    ///                 .dispatching(AppAction::Audit { action: Box::new(action) }),
    ///             other => Interception::pass(other),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Interceptor {
        /// The state type this interceptor reads
        type State;

        /// The action type this interceptor observes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Observe an action and describe what happens next
        fn intercept(
            &self,
            state: &Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Interception<Self::Action>;
    }

    /// Interceptor that forwards every action untouched
    pub struct PassThrough<S, A, E>(PhantomData<fn() -> (S, A, E)>);

    impl<S, A, E> PassThrough<S, A, E> {
        /// Create a pass-through interceptor
        #[must_use]
        pub const fn new() -> Self {
            Self(PhantomData)
        }
    }

    impl<S, A, E> Default for PassThrough<S, A, E> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<S, A, E> Clone for PassThrough<S, A, E> {
        fn clone(&self) -> Self {
            Self::new()
        }
    }

    impl<S, A, E> std::fmt::Debug for PassThrough<S, A, E> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "PassThrough")
        }
    }

    impl<S, A, E> Interceptor for PassThrough<S, A, E> {
        type State = S;
        type Action = A;
        type Environment = E;

        fn intercept(&self, _state: &S, action: A, _env: &E) -> Interception<A> {
            Interception::pass(action)
        }
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution).
pub mod effect {
    use futures::Stream;
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and interceptors and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the store
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Async computation producing several actions in order
        ///
        /// Every item is fed back into the store as it arrives.
        Stream(Pin<Box<dyn Stream<Item = Action> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Stream(_) => write!(f, "Effect::Stream(<stream>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap a future as an effect
        #[must_use]
        pub fn future<F>(future: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Wrap a stream as an effect
        #[must_use]
        pub fn stream<S>(stream: S) -> Self
        where
            S: Stream<Item = Action> + Send + 'static,
        {
            Effect::Stream(Box::pin(stream))
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter (or at construction time).
pub mod environment {
    use crate::correlation::CorrelationId;
    use chrono::{DateTime, Utc};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Source of correlation identifiers
    ///
    /// Implementations must never hand out the same id twice for the lifetime
    /// of the generator. Ids are not expected to survive a restart.
    pub trait IdGenerator: Send + Sync {
        /// Produce the next correlation id
        fn next_id(&self) -> CorrelationId;
    }

    /// Monotonic counter shared by every clone
    ///
    /// Resources built from clones of the same generator can never collide.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_resource_core::environment::{IdGenerator, SequentialIdGenerator};
    ///
    /// let ids = SequentialIdGenerator::new();
    /// let other = ids.clone();
    /// assert_eq!(ids.next_id().get(), 1);
    /// assert_eq!(other.next_id().get(), 2);
    /// ```
    #[derive(Debug, Clone)]
    pub struct SequentialIdGenerator {
        next: Arc<AtomicU64>,
    }

    impl SequentialIdGenerator {
        /// Start counting at 1
        #[must_use]
        pub fn new() -> Self {
            Self::starting_at(1)
        }

        /// Start counting at `first`
        #[must_use]
        pub fn starting_at(first: u64) -> Self {
            Self {
                next: Arc::new(AtomicU64::new(first)),
            }
        }
    }

    impl Default for SequentialIdGenerator {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> CorrelationId {
            CorrelationId::new(self.next.fetch_add(1, Ordering::Relaxed))
        }
    }
}
