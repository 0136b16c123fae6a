//! Integration tests for the Store dispatch chain
//!
//! Exercises the interceptor → derived dispatch → reducer → effect pipeline
//! with a small request/response protocol: a `Start` action is turned into a
//! `Request` by the interceptor, the reducer answers the request with a
//! stream of `Item`s and a terminal `Done`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use composable_resource_core::{
    effect::Effect, interceptor::Interception, interceptor::Interceptor, reducer::Reducer, smallvec,
    SmallVec,
};
use composable_resource_runtime::Store;
use futures::stream;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Action {
    /// Intercepted: dispatches a `Request` first
    Start { id: u64, count: u32 },
    /// Reducer answers with a delayed stream of items
    Request { id: u64, count: u32 },
    Item { id: u64, value: u32 },
    /// Terminal action
    Done { id: u64 },
}

#[derive(Debug, Clone, Default)]
struct State {
    started: Vec<u64>,
    items: Vec<(u64, u32)>,
    done: Vec<u64>,
}

#[derive(Clone)]
struct Env;

#[derive(Clone)]
struct ChainReducer;

impl Reducer for ChainReducer {
    type State = State;
    type Action = Action;
    type Environment = Env;

    fn reduce(&self, state: &mut State, action: Action, _env: &Env) -> SmallVec<[Effect<Action>; 4]> {
        match action {
            Action::Start { id, .. } => {
                state.started.push(id);
                SmallVec::new()
            },
            Action::Request { id, count } => smallvec![Effect::stream(stream::unfold(0, move |i| async move {
                if i < count {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Some((Action::Item { id, value: i }, i + 1))
                } else if i == count {
                    Some((Action::Done { id }, i + 1))
                } else {
                    None
                }
            }))],
            Action::Item { id, value } => {
                state.items.push((id, value));
                SmallVec::new()
            },
            Action::Done { id } => {
                state.done.push(id);
                SmallVec::new()
            },
        }
    }
}

#[derive(Clone)]
struct ChainInterceptor;

impl Interceptor for ChainInterceptor {
    type State = State;
    type Action = Action;
    type Environment = Env;

    fn intercept(&self, _state: &State, action: Action, _env: &Env) -> Interception<Action> {
        match action {
            Action::Start { id, count } => {
                Interception::pass(Action::Start { id, count }).dispatching(Action::Request { id, count })
            },
            other => Interception::pass(other),
        }
    }
}

fn store() -> Store<State, Action, Env, ChainReducer, ChainInterceptor> {
    Store::new(State::default(), ChainReducer, ChainInterceptor, Env)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn handle_waits_for_stream_items_to_be_reduced() {
    let store = store();

    let mut handle = store.send(Action::Start { id: 1, count: 3 }).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

    let (items, done) = store.state(|s| (s.items.clone(), s.done.clone())).await;
    assert_eq!(items, vec![(1, 0), (1, 1), (1, 2)]);
    assert_eq!(done, vec![1]);
}

#[tokio::test]
async fn empty_stream_still_produces_terminal_action() {
    let store = store();

    let mut handle = store.send(Action::Start { id: 9, count: 0 }).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert!(store.state(|s| s.items.is_empty()).await);
    assert_eq!(store.state(|s| s.done.clone()).await, vec![9]);
}

#[tokio::test]
async fn observers_see_derived_request_before_start() {
    let store = store();
    let mut rx = store.subscribe_actions();

    let _ = store.send(Action::Start { id: 2, count: 1 }).await.unwrap();

    assert_eq!(rx.recv().await.unwrap(), Action::Request { id: 2, count: 1 });
    assert_eq!(rx.recv().await.unwrap(), Action::Start { id: 2, count: 1 });
    assert_eq!(rx.recv().await.unwrap(), Action::Item { id: 2, value: 0 });
    assert_eq!(rx.recv().await.unwrap(), Action::Done { id: 2 });
}

#[tokio::test]
async fn concurrent_operations_interleave_without_losing_items() {
    let store = store();

    let mut handles = Vec::new();
    for id in 0..5 {
        handles.push(store.send(Action::Start { id, count: 10 }).await.unwrap());
    }
    for handle in &mut handles {
        handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();
    }

    let (items, mut done) = store.state(|s| (s.items.clone(), s.done.clone())).await;
    assert_eq!(items.len(), 50);
    done.sort_unstable();
    assert_eq!(done, vec![0, 1, 2, 3, 4]);

    // Per-operation order is preserved even though operations interleave
    for id in 0..5 {
        let values: Vec<u32> = items.iter().filter(|(i, _)| *i == id).map(|(_, v)| *v).collect();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn shutdown_waits_for_running_streams() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = store();

    let _ = store.send(Action::Start { id: 4, count: 5 }).await.unwrap();
    store.shutdown(Duration::from_secs(2)).await.unwrap();

    assert_eq!(store.pending_effects(), 0);
    assert!(store.send(Action::Done { id: 4 }).await.is_err());
}
