//! Reducer and interceptor composition
//!
//! This module provides utilities for composing reducers and interceptors:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Focus a reducer on a subset of state
//! - **`combine_interceptors`**: Chain interceptors in dispatch order
//! - **`scope_interceptor`**: Let an interceptor read a subset of state
//!
//! # Examples
//!
//! ## Combining Reducers
//!
//! ```
//! use composable_resource_core::{Reducer, Effect, SmallVec};
//! use composable_resource_core::composition::combine_reducers;
//! use std::sync::Arc;
//!
//! #[derive(Clone, Default)]
//! struct AppState {
//!     count: i32,
//!     name: String,
//! }
//!
//! #[derive(Clone)]
//! enum AppAction {
//!     Increment,
//!     SetName(String),
//! }
//!
//! struct CounterReducer;
//! struct NameReducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = AppState;
//!     type Action = AppAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut AppState, action: AppAction, _env: &()) -> SmallVec<[Effect<AppAction>; 4]> {
//!         if matches!(action, AppAction::Increment) {
//!             state.count += 1;
//!         }
//!         SmallVec::new()
//!     }
//! }
//!
//! impl Reducer for NameReducer {
//!     type State = AppState;
//!     type Action = AppAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut AppState, action: AppAction, _env: &()) -> SmallVec<[Effect<AppAction>; 4]> {
//!         if let AppAction::SetName(name) = action {
//!             state.name = name;
//!         }
//!         SmallVec::new()
//!     }
//! }
//!
//! let combined = combine_reducers(vec![Arc::new(CounterReducer), Arc::new(NameReducer)]);
//!
//! let mut state = AppState::default();
//! let _ = combined.reduce(&mut state, AppAction::Increment, &());
//! assert_eq!(state.count, 1);
//! ```

use crate::effect::Effect;
use crate::interceptor::{Interception, Interceptor};
use crate::reducer::Reducer;
use smallvec::SmallVec;
use std::marker::PhantomData;
use std::sync::Arc;

/// Shared reducer trait object used by [`combine_reducers`].
pub type SharedReducer<S, A, E> = Arc<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Shared interceptor trait object used by [`combine_interceptors`].
pub type SharedInterceptor<S, A, E> =
    Arc<dyn Interceptor<State = S, Action = A, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in sequence, and all effects are collected and concatenated.
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<SharedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    A: Clone,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E> {
    reducers: Vec<SharedReducer<S, A, E>>,
}

impl<S, A, E> Clone for CombinedReducer<S, A, E> {
    fn clone(&self) -> Self {
        Self {
            reducers: self.reducers.clone(),
        }
    }
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    A: Clone,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects);
        }

        all_effects
    }
}

/// Scopes a reducer to operate on a subset of a larger state.
///
/// The sub-state is copied out, reduced, and written back whole, so the
/// parent state is only ever replaced, never edited in place by the child.
///
/// # Examples
///
/// ```
/// use composable_resource_core::{Reducer, Effect, SmallVec};
/// use composable_resource_core::composition::scope_reducer;
///
/// #[derive(Clone, Default)]
/// struct CounterState {
///     count: i32,
/// }
///
/// struct CounterReducer;
///
/// impl Reducer for CounterReducer {
///     type State = CounterState;
///     type Action = i32;
///     type Environment = ();
///
///     fn reduce(&self, state: &mut CounterState, by: i32, _env: &()) -> SmallVec<[Effect<i32>; 4]> {
///         state.count += by;
///         SmallVec::new()
///     }
/// }
///
/// #[derive(Clone, Default)]
/// struct AppState {
///     counter: CounterState,
///     other_data: String,
/// }
///
/// let scoped = scope_reducer(
///     CounterReducer,
///     |app: &AppState| &app.counter,
///     |app: &mut AppState, counter: CounterState| app.counter = counter,
/// );
///
/// let mut state = AppState::default();
/// let _ = scoped.reduce(&mut state, 3, &());
/// assert_eq!(state.counter.count, 3);
/// ```
pub fn scope_reducer<S, SubS, R, G, U>(reducer: R, get_state: G, set_state: U) -> ScopedReducer<S, SubS, R, G, U>
where
    SubS: Clone,
    R: Reducer<State = SubS>,
    G: Fn(&S) -> &SubS,
    U: Fn(&mut S, SubS),
{
    ScopedReducer {
        reducer,
        get_state,
        set_state,
        _phantom: PhantomData,
    }
}

/// A scoped reducer that operates on a subset of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, R, G, U> {
    reducer: R,
    get_state: G,
    set_state: U,
    _phantom: PhantomData<fn(S) -> SubS>,
}

impl<S, SubS, R, G, U> Clone for ScopedReducer<S, SubS, R, G, U>
where
    R: Clone,
    G: Clone,
    U: Clone,
{
    fn clone(&self) -> Self {
        Self {
            reducer: self.reducer.clone(),
            get_state: self.get_state.clone(),
            set_state: self.set_state.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<S, SubS, R, G, U> Reducer for ScopedReducer<S, SubS, R, G, U>
where
    SubS: Clone,
    R: Reducer<State = SubS>,
    G: Fn(&S) -> &SubS,
    U: Fn(&mut S, SubS),
{
    type State = S;
    type Action = R::Action;
    type Environment = R::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        // Structural copy of the slice
        let mut sub_state = (self.get_state)(state).clone();

        let effects = self.reducer.reduce(&mut sub_state, action, env);

        (self.set_state)(state, sub_state);

        effects
    }
}

/// Chains interceptors in dispatch order.
///
/// The first interceptor sees the original action; each following link sees
/// what the previous one forwarded. Derived dispatches and effects of every
/// link are concatenated in link order. A link that swallows the action ends
/// the chain.
#[must_use]
pub fn combine_interceptors<S, A, E>(
    interceptors: Vec<SharedInterceptor<S, A, E>>,
) -> CombinedInterceptor<S, A, E> {
    CombinedInterceptor { interceptors }
}

/// Interceptors chained by [`combine_interceptors`].
pub struct CombinedInterceptor<S, A, E> {
    interceptors: Vec<SharedInterceptor<S, A, E>>,
}

impl<S, A, E> Clone for CombinedInterceptor<S, A, E> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}

impl<S, A, E> Interceptor for CombinedInterceptor<S, A, E> {
    type State = S;
    type Action = A;
    type Environment = E;

    fn intercept(&self, state: &S, action: A, env: &E) -> Interception<A> {
        let mut combined = Interception::swallow();
        let mut current = Some(action);

        for interceptor in &self.interceptors {
            let Some(action) = current.take() else {
                break;
            };

            let interception = interceptor.intercept(state, action, env);
            combined.dispatch.extend(interception.dispatch);
            combined.effects.extend(interception.effects);
            current = interception.forward;
        }

        combined.forward = current;
        combined
    }
}

/// Lets an interceptor written against a sub-state read a larger state.
pub fn scope_interceptor<S, SubS, I, G>(interceptor: I, get_state: G) -> ScopedInterceptor<S, SubS, I, G>
where
    I: Interceptor<State = SubS>,
    G: Fn(&S) -> &SubS,
{
    ScopedInterceptor {
        interceptor,
        get_state,
        _phantom: PhantomData,
    }
}

/// An interceptor reading a subset of state.
///
/// Created by [`scope_interceptor`].
pub struct ScopedInterceptor<S, SubS, I, G> {
    interceptor: I,
    get_state: G,
    _phantom: PhantomData<fn(S) -> SubS>,
}

impl<S, SubS, I, G> Clone for ScopedInterceptor<S, SubS, I, G>
where
    I: Clone,
    G: Clone,
{
    fn clone(&self) -> Self {
        Self {
            interceptor: self.interceptor.clone(),
            get_state: self.get_state.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<S, SubS, I, G> Interceptor for ScopedInterceptor<S, SubS, I, G>
where
    I: Interceptor<State = SubS>,
    G: Fn(&S) -> &SubS,
{
    type State = S;
    type Action = I::Action;
    type Environment = I::Environment;

    fn intercept(
        &self,
        state: &S,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Interception<Self::Action> {
        self.interceptor.intercept((self.get_state)(state), action, env)
    }
}
