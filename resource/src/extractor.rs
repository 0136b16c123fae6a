//! Decomposing response payloads into entity records.
//!
//! An [`Extractor`] walks a parsed response body and emits every JSON object
//! that represents one entity. [`collect_records`] turns those objects into
//! [`EntityRecord`]s for a receive-many action.

use crate::entity::EntityRecord;
use serde_json::{Map, Value};

/// Payload → individual entity objects.
///
/// Any `Fn(&Value, &mut dyn FnMut(&Value))` closure is an extractor.
pub trait Extractor: Send + Sync {
    /// Call `emit` once per entity contained in `payload`.
    fn extract(&self, payload: &Value, emit: &mut dyn FnMut(&Value));
}

impl<F> Extractor for F
where
    F: Fn(&Value, &mut dyn FnMut(&Value)) + Send + Sync,
{
    fn extract(&self, payload: &Value, emit: &mut dyn FnMut(&Value)) {
        self(payload, emit);
    }
}

/// Arrays are iterated; any other payload is one entity.
///
/// `null` (an empty body) yields nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl Extractor for DefaultExtractor {
    fn extract(&self, payload: &Value, emit: &mut dyn FnMut(&Value)) {
        match payload {
            Value::Null => {},
            Value::Array(items) => items.iter().for_each(|item| emit(item)),
            other => emit(other),
        }
    }
}

/// JSON:API documents: `{ "data": resource | [resource] }`.
///
/// Each resource object `{ id, type, attributes }` is flattened into
/// `{ id, ...attributes }`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApiExtractor;

impl JsonApiExtractor {
    fn flatten(resource: &Value) -> Value {
        let mut object = resource
            .get("attributes")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);
        if let Some(id) = resource.get("id") {
            object.insert("id".to_string(), id.clone());
        }
        Value::Object(object)
    }
}

impl Extractor for JsonApiExtractor {
    fn extract(&self, payload: &Value, emit: &mut dyn FnMut(&Value)) {
        match payload.get("data") {
            Some(Value::Array(resources)) => {
                for resource in resources {
                    emit(&Self::flatten(resource));
                }
            },
            Some(resource @ Value::Object(_)) => emit(&Self::flatten(resource)),
            _ => {},
        }
    }
}

/// Run `extractor` over `payload` and keep every emitted object with an id.
///
/// Objects without a usable `id` are skipped with a warning.
pub fn collect_records(extractor: &dyn Extractor, payload: &Value) -> Vec<EntityRecord> {
    let mut records = Vec::new();
    extractor.extract(payload, &mut |value: &Value| match EntityRecord::from_json(value) {
        Some(record) => records.push(record),
        None => tracing::warn!(payload = %value, "Skipping extracted record without an id"),
    });
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use serde_json::json;

    fn ids(records: &[EntityRecord]) -> Vec<EntityId> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn default_iterates_arrays() {
        let records = collect_records(&DefaultExtractor, &json!([{"id": 1}, {"id": 2, "name": "b"}]));
        assert_eq!(ids(&records), vec![EntityId::Int(1), EntityId::Int(2)]);
        assert_eq!(records[1].attributes.get("name"), Some(&json!("b")));
    }

    #[test]
    fn default_treats_object_as_single_entity() {
        let records = collect_records(&DefaultExtractor, &json!({"id": "1", "name": "x"}));
        assert_eq!(ids(&records), vec![EntityId::from("1")]);
    }

    #[test]
    fn null_payload_yields_nothing() {
        assert!(collect_records(&DefaultExtractor, &Value::Null).is_empty());
    }

    #[test]
    fn records_without_id_are_skipped() {
        let records = collect_records(&DefaultExtractor, &json!([{"name": "no id"}, {"id": 5}, 42]));
        assert_eq!(ids(&records), vec![EntityId::Int(5)]);
    }

    #[test]
    fn json_api_documents_are_unwrapped() {
        let document = json!({
            "data": [
                {"id": "1", "type": "issues", "attributes": {"title": "a"}},
                {"id": "2", "type": "issues", "attributes": {"title": "b"}}
            ],
            "meta": {"total": 2}
        });

        let records = collect_records(&JsonApiExtractor, &document);
        assert_eq!(ids(&records), vec![EntityId::from("1"), EntityId::from("2")]);
        assert_eq!(records[0].attributes, json!({"title": "a"}).as_object().cloned().unwrap_or_default());

        let single = collect_records(&JsonApiExtractor, &json!({"data": {"id": "9", "type": "issues"}}));
        assert_eq!(ids(&single), vec![EntityId::from("9")]);
    }

    #[test]
    fn closures_are_extractors() {
        let nested = |payload: &Value, emit: &mut dyn FnMut(&Value)| {
            if let Some(Value::Array(items)) = payload.get("items") {
                items.iter().for_each(|item| emit(item));
            }
        };

        let records = collect_records(&nested, &json!({"items": [{"id": 1}], "next": null}));
        assert_eq!(ids(&records), vec![EntityId::Int(1)]);
    }
}
