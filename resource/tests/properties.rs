//! Property tests for the resource reducer.

use composable_resource::{
    ActionKind, EntityId, EntityRecord, ResourceAction, ResourceEnvironment, ResourceReducer, ResourceState,
};
use composable_resource_core::Reducer;
use composable_resource_testing::properties::attributes;
use composable_resource_testing::{test_clock, MockTransport};
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn env() -> ResourceEnvironment {
    ResourceEnvironment::new(Arc::new(MockTransport::new()), Arc::new(test_clock()))
}

fn action(resource: &str, kind: ActionKind) -> ResourceAction {
    ResourceAction {
        resource: Arc::from(resource),
        kind,
    }
}

fn entity_id() -> impl Strategy<Value = EntityId> {
    prop_oneof![
        (0_i64..20).prop_map(EntityId::Int),
        "[a-c]{1,2}".prop_map(EntityId::Str),
    ]
}

fn batch() -> impl Strategy<Value = Vec<(EntityId, Map<String, Value>)>> {
    prop::collection::vec((entity_id(), attributes(3)), 0..6)
}

proptest! {
    #[test]
    fn cache_holds_union_of_received_ids_with_last_write(batches in prop::collection::vec(batch(), 0..5)) {
        let reducer = ResourceReducer::new(Arc::from("issues"), None);
        let env = env();
        let mut state = ResourceState::default();

        let mut expected: HashMap<EntityId, Map<String, Value>> = HashMap::new();
        for batch in &batches {
            for (id, attrs) in batch {
                expected.insert(id.clone(), attrs.clone());
            }
            let items = batch
                .iter()
                .map(|(id, attrs)| EntityRecord::new(id.clone(), attrs.clone()))
                .collect();
            let effects = reducer.reduce(&mut state, action("issues", ActionKind::ReceiveMany { items }), &env);
            prop_assert!(effects.is_empty());
        }

        let ids: HashSet<_> = state.items.keys().cloned().collect();
        let expected_ids: HashSet<_> = expected.keys().cloned().collect();
        prop_assert_eq!(ids, expected_ids);

        for (id, attrs) in &expected {
            let cached = state.item(id).map(|e| e.attributes.clone());
            prop_assert_eq!(cached.as_ref(), Some(attrs));
        }
    }

    #[test]
    fn foreign_actions_never_change_state(
        seed in batch(),
        foreign in batch(),
    ) {
        let reducer = ResourceReducer::new(Arc::from("issues"), None);
        let env = env();
        let mut state = ResourceState::default();

        let items = seed.into_iter().map(|(id, attrs)| EntityRecord::new(id, attrs)).collect();
        let _ = reducer.reduce(&mut state, action("issues", ActionKind::ReceiveMany { items }), &env);
        let before = state.clone();

        for (id, attributes) in foreign {
            let _ = reducer.reduce(&mut state, action("users", ActionKind::Receive { id, attributes }), &env);
        }

        prop_assert_eq!(state, before);
    }
}
