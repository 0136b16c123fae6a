//! The resource reducer.
//!
//! Folds the lifecycle actions of one resource into its [`ResourceState`].
//! Intents (CREATE, GET, QUERY, UPDATE) and REQUEST leave state untouched;
//! they only matter to the interceptor.

use crate::action::{ActionKind, ResourceAction, ResourceName};
use crate::entity::Entity;
use crate::environment::ResourceEnvironment;
use crate::state::{Outcome, ResolutionRecord, ResourceState};
use crate::waiter::Waiter;
use composable_resource_core::environment::Clock;
use composable_resource_core::{effect::Effect, reducer::Reducer, SmallVec};

/// Reducer of one resource.
///
/// Actions addressed to other resources are ignored.
#[derive(Clone, Debug)]
pub struct ResourceReducer {
    name: ResourceName,
    resolved_capacity: Option<usize>,
}

impl ResourceReducer {
    /// Reducer for `name` with the given resolution-log bound
    #[must_use]
    pub const fn new(name: ResourceName, resolved_capacity: Option<usize>) -> Self {
        Self {
            name,
            resolved_capacity,
        }
    }

    /// Resource this reducer folds
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Reducer for ResourceReducer {
    type State = ResourceState;
    type Action = ResourceAction;
    type Environment = ResourceEnvironment;

    fn reduce(
        &self,
        state: &mut ResourceState,
        action: ResourceAction,
        env: &ResourceEnvironment,
    ) -> SmallVec<[Effect<ResourceAction>; 4]> {
        if !action.is_for(&self.name) {
            return SmallVec::new();
        }

        match action.kind {
            ActionKind::Succeed { action: trigger, .. } => {
                resolve(state, *trigger, Outcome::Succeeded, env, self.resolved_capacity);
            },
            ActionKind::Fail { action: trigger, .. } => {
                resolve(state, *trigger, Outcome::Failed, env, self.resolved_capacity);
            },
            ActionKind::Await { action: inner, waiter, .. } => match inner.correlation_id() {
                Some(id) => state.await_on(Waiter {
                    id,
                    completion: waiter.completion,
                }),
                None => tracing::warn!(action = %inner, "Cannot await an action without correlation id"),
            },
            ActionKind::Receive { id, attributes } => {
                state.upsert(Entity::new(id, attributes));
            },
            ActionKind::ReceiveMany { items } => {
                tracing::trace!(resource = %self.name, count = items.len(), "Receiving entities");
                for record in items {
                    state.upsert(record.into());
                }
            },
            ActionKind::Create { .. }
            | ActionKind::Get { .. }
            | ActionKind::Query { .. }
            | ActionKind::Update { .. }
            | ActionKind::Request { .. } => {},
        }

        SmallVec::new()
    }
}

fn resolve(
    state: &mut ResourceState,
    trigger: ResourceAction,
    outcome: Outcome,
    env: &ResourceEnvironment,
    capacity: Option<usize>,
) {
    let Some(id) = trigger.correlation_id() else {
        tracing::warn!(action = %trigger, "Outcome for an action without correlation id");
        return;
    };

    state.resolve(
        ResolutionRecord {
            id,
            action: trigger,
            outcome,
            resolved_at: env.clock.now(),
        },
        capacity,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, EntityRecord};
    use crate::error::RequestError;
    use crate::waiter::Completion;
    use composable_resource_core::correlation::CorrelationId;
    use composable_resource_testing::{assertions, test_clock, MockTransport, ReducerTest};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    fn env() -> ResourceEnvironment {
        ResourceEnvironment::new(Arc::new(MockTransport::new()), Arc::new(test_clock()))
    }

    fn reducer() -> ResourceReducer {
        ResourceReducer::new(Arc::from("issues"), Some(10))
    }

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn action(resource: &str, kind: ActionKind) -> ResourceAction {
        ResourceAction {
            resource: Arc::from(resource),
            kind,
        }
    }

    fn create(id: u64) -> ResourceAction {
        action("issues", ActionKind::Create {
            id: CorrelationId::new(id),
            data: json!({"name": "x"}),
        })
    }

    #[test]
    fn receive_upserts_with_id_winning() {
        ReducerTest::new(reducer())
            .with_env(env())
            .given_state(ResourceState::default())
            .when_action(action("issues", ActionKind::Receive {
                id: EntityId::from("1"),
                attributes: attrs(json!({"id": "other", "name": "x"})),
            }))
            .then_state(|state| {
                let entity = state.item(&EntityId::from("1"));
                assert_eq!(entity.map(Entity::to_json), Some(json!({"id": "1", "name": "x"})));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn receive_many_replaces_attributes() {
        ReducerTest::new(reducer())
            .with_env(env())
            .given_state(ResourceState::default())
            .when_action(action("issues", ActionKind::Receive {
                id: EntityId::Int(1),
                attributes: attrs(json!({"name": "old", "stale": true})),
            }))
            .when_action(action("issues", ActionKind::ReceiveMany {
                items: vec![
                    EntityRecord::new(EntityId::Int(1), attrs(json!({"name": "new"}))),
                    EntityRecord::new(EntityId::Int(2), attrs(json!({"name": "two"}))),
                ],
            }))
            .then_state(|state| {
                assert_eq!(state.items.len(), 2);
                let first = state.item(&EntityId::Int(1)).map(Entity::to_json);
                assert_eq!(first, Some(json!({"id": 1, "name": "new"})));
            })
            .run();
    }

    #[test]
    fn succeed_moves_waiter_to_resolved() {
        let (completion, _pending) = Completion::new(CorrelationId::new(1));

        ReducerTest::new(reducer())
            .with_env(env())
            .given_state(ResourceState::default())
            .when_action(action("issues", ActionKind::Await {
                id: CorrelationId::new(2),
                action: Box::new(create(1)),
                waiter: Waiter {
                    id: CorrelationId::new(2),
                    completion,
                },
            }))
            .when_action(action("issues", ActionKind::Succeed {
                id: CorrelationId::new(3),
                action: Box::new(create(1)),
                response: json!({"id": "1"}),
            }))
            .then_state(|state| {
                assert!(!state.is_awaiting(CorrelationId::new(1)));
                let records: Vec<_> = state.resolutions(CorrelationId::new(1)).collect();
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].outcome, Outcome::Succeeded);
                assert_eq!(records[0].action, create(1));
                assert_eq!(records[0].resolved_at, test_clock().now());
            })
            .run();
    }

    #[test]
    fn await_registers_inner_correlation_id() {
        let (completion, _pending) = Completion::new(CorrelationId::new(1));

        ReducerTest::new(reducer())
            .with_env(env())
            .given_state(ResourceState::default())
            .when_action(action("issues", ActionKind::Await {
                id: CorrelationId::new(2),
                action: Box::new(create(1)),
                waiter: Waiter {
                    id: CorrelationId::new(2),
                    completion,
                },
            }))
            .then_state(|state| {
                assert!(state.is_awaiting(CorrelationId::new(1)));
                assert!(!state.is_awaiting(CorrelationId::new(2)));
            })
            .run();
    }

    #[test]
    fn mismatched_outcome_leaves_waiter() {
        let (completion, _pending) = Completion::new(CorrelationId::new(1));

        ReducerTest::new(reducer())
            .with_env(env())
            .given_state(ResourceState::default())
            .when_action(action("issues", ActionKind::Await {
                id: CorrelationId::new(2),
                action: Box::new(create(1)),
                waiter: Waiter {
                    id: CorrelationId::new(2),
                    completion,
                },
            }))
            .when_action(action("issues", ActionKind::Fail {
                action: Box::new(create(99)),
                response: None,
                error: RequestError::Transport("down".into()),
            }))
            .then_state(|state| {
                assert!(state.is_awaiting(CorrelationId::new(1)));
                assert_eq!(state.resolutions(CorrelationId::new(99)).count(), 1);
                assert_eq!(state.resolutions(CorrelationId::new(1)).count(), 0);
            })
            .run();
    }

    #[test]
    fn other_resources_are_ignored() {
        let mut given = ResourceState::default();
        given.upsert(Entity::new(EntityId::Int(1), attrs(json!({"name": "x"}))));
        let expected = given.clone();

        ReducerTest::new(reducer())
            .with_env(env())
            .given_state(given)
            .when_action(action("users", ActionKind::Receive {
                id: EntityId::Int(1),
                attributes: attrs(json!({"name": "changed"})),
            }))
            .when_action(action("users", ActionKind::Succeed {
                id: CorrelationId::new(5),
                action: Box::new(create(4)),
                response: Value::Null,
            }))
            .then_state(move |state| assert_eq!(state, &expected))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn intents_leave_state_unchanged() {
        ReducerTest::new(reducer())
            .with_env(env())
            .given_state(ResourceState::default())
            .when_action(create(1))
            .when_action(action("issues", ActionKind::Query {
                id: CorrelationId::new(2),
                params: Map::new(),
            }))
            .then_state(|state| assert_eq!(state, &ResourceState::default()))
            .run();
    }
}
