//! Resource state: entity cache, awaiting table and resolution log.

use crate::action::ResourceAction;
use crate::entity::{Entity, EntityId};
use crate::waiter::Waiter;
use composable_resource_core::correlation::CorrelationId;
use composable_resource_core::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

/// How an awaited operation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// SUCCEED arrived
    Succeeded,
    /// FAIL arrived
    Failed,
}

/// One entry of the resolution log.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolutionRecord {
    /// Correlation id of the settled operation
    pub id: CorrelationId,
    /// The operation's intent
    pub action: ResourceAction,
    /// How it ended
    pub outcome: Outcome,
    /// When the outcome was reduced
    pub resolved_at: DateTime<Utc>,
}

/// State of one resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceState {
    /// Entity cache keyed by id
    pub items: HashMap<EntityId, Entity>,
    /// Waiters in arrival order, at most one per correlation id
    pub awaiting: Vec<Waiter>,
    /// Resolution log, oldest first
    pub resolved: VecDeque<ResolutionRecord>,
}

impl ResourceState {
    /// Cached entity by id
    #[must_use]
    pub fn item(&self, id: &EntityId) -> Option<&Entity> {
        self.items.get(id)
    }

    /// Waiter for a correlation id
    #[must_use]
    pub fn waiter(&self, id: CorrelationId) -> Option<&Waiter> {
        self.awaiting.iter().find(|w| w.id == id)
    }

    /// Whether anyone waits on `id`
    #[must_use]
    pub fn is_awaiting(&self, id: CorrelationId) -> bool {
        self.waiter(id).is_some()
    }

    /// Resolution records for `id`
    pub fn resolutions(&self, id: CorrelationId) -> impl Iterator<Item = &ResolutionRecord> {
        self.resolved.iter().filter(move |r| r.id == id)
    }

    /// Insert or replace an entity
    pub(crate) fn upsert(&mut self, entity: Entity) {
        self.items.insert(entity.id.clone(), entity);
    }

    /// Register a waiter, replacing any waiter with the same id
    ///
    /// Waiters whose caller stopped listening (a timed-out or dropped
    /// [`Pending`](crate::waiter::Pending)) are pruned on the way.
    pub(crate) fn await_on(&mut self, waiter: Waiter) {
        self.awaiting
            .retain(|w| w.id != waiter.id && !w.completion.is_settled());
        self.awaiting.push(waiter);
    }

    /// Drop the waiter for `id` and log the outcome
    ///
    /// With a capacity, the oldest records are dropped once it is exceeded.
    pub(crate) fn resolve(&mut self, record: ResolutionRecord, capacity: Option<usize>) {
        self.awaiting.retain(|w| w.id != record.id);
        self.resolved.push_back(record);

        if let Some(capacity) = capacity {
            while self.resolved.len() > capacity {
                if let Some(dropped) = self.resolved.pop_front() {
                    tracing::warn!(
                        correlation_id = %dropped.id,
                        capacity,
                        "Resolution log full, dropping oldest record"
                    );
                }
            }
        }
    }
}

static EMPTY: LazyLock<ResourceState> = LazyLock::new(ResourceState::default);

/// Host-level state: one [`ResourceState`] per resource name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceStates {
    slices: HashMap<String, ResourceState>,
}

impl ResourceStates {
    /// Empty host state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `name`; an empty state if the resource has seen no action yet
    #[must_use]
    pub fn slice(&self, name: &str) -> &ResourceState {
        self.slices.get(name).unwrap_or(&EMPTY)
    }

    /// Replace the state of `name`
    pub fn set(&mut self, name: &str, state: ResourceState) {
        if let Some(slice) = self.slices.get_mut(name) {
            *slice = state;
        } else {
            self.slices.insert(name.to_string(), state);
        }
    }

    /// Names with state, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::waiter::Completion;
    use serde_json::json;
    use std::sync::Arc;

    fn record(id: u64) -> ResolutionRecord {
        ResolutionRecord {
            id: CorrelationId::new(id),
            action: ResourceAction {
                resource: Arc::from("issues"),
                kind: ActionKind::Create {
                    id: CorrelationId::new(id),
                    data: json!({}),
                },
            },
            outcome: Outcome::Succeeded,
            resolved_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn resolution_log_honours_capacity() {
        let mut state = ResourceState::default();
        for id in 1..=5 {
            state.resolve(record(id), Some(3));
        }

        let ids: Vec<u64> = state.resolved.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn unlimited_log_keeps_everything() {
        let mut state = ResourceState::default();
        for id in 1..=5 {
            state.resolve(record(id), None);
        }
        assert_eq!(state.resolved.len(), 5);
    }

    #[test]
    fn awaiting_keeps_one_waiter_per_id() {
        let mut state = ResourceState::default();
        let (first, _p1) = Completion::new(CorrelationId::new(1));
        let (second, _p2) = Completion::new(CorrelationId::new(1));

        state.await_on(Waiter { id: CorrelationId::new(1), completion: first });
        state.await_on(Waiter { id: CorrelationId::new(1), completion: second.clone() });

        assert_eq!(state.awaiting.len(), 1);
        assert_eq!(
            state.waiter(CorrelationId::new(1)),
            Some(&Waiter { id: CorrelationId::new(1), completion: second })
        );
    }

    #[test]
    fn abandoned_waiters_are_pruned_on_next_await() {
        let mut state = ResourceState::default();
        let (gone, gone_pending) = Completion::new(CorrelationId::new(1));
        let (kept, _kept_pending) = Completion::new(CorrelationId::new(2));
        let (next, _next_pending) = Completion::new(CorrelationId::new(3));

        state.await_on(Waiter { id: CorrelationId::new(1), completion: gone });
        state.await_on(Waiter { id: CorrelationId::new(2), completion: kept });
        drop(gone_pending);
        state.await_on(Waiter { id: CorrelationId::new(3), completion: next });

        assert!(!state.is_awaiting(CorrelationId::new(1)));
        assert!(state.is_awaiting(CorrelationId::new(2)));
        assert!(state.is_awaiting(CorrelationId::new(3)));
        assert_eq!(state.awaiting.len(), 2);
    }

    #[test]
    fn missing_slice_reads_as_empty() {
        let mut states = ResourceStates::new();
        assert!(states.slice("issues").items.is_empty());

        let mut slice = ResourceState::default();
        slice.resolve(record(1), None);
        states.set("issues", slice);

        assert_eq!(states.slice("issues").resolved.len(), 1);
        assert!(states.slice("users").resolved.is_empty());
        assert_eq!(states.names().collect::<Vec<_>>(), vec!["issues"]);
    }
}
