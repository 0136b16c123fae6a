//! Entities held in the cache and their identifiers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identity of an entity: a JSON integer or string.
///
/// `1` and `"1"` are different identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Integer identifier
    Int(i64),
    /// Integer identifier above `i64::MAX`
    UInt(u64),
    /// String identifier
    Str(String),
}

impl EntityId {
    /// Read an identifier out of a JSON value.
    ///
    /// Returns `None` for anything that is not an integer or a string;
    /// fractional numbers such as `1.5` are not identifiers.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int).or_else(|| n.as_u64().map(Self::UInt)),
            Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    /// The identifier as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(n) => Value::from(*n),
            Self::UInt(n) => Value::from(*n),
            Self::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::UInt(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// A cached entity.
///
/// `attributes` never contains an `id` key; identity lives in `id` only.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Identity
    pub id: EntityId,
    /// Everything else the server sent
    pub attributes: Map<String, Value>,
}

impl Entity {
    /// Build an entity, dropping any `id` attribute in favour of `id`.
    #[must_use]
    pub fn new(id: EntityId, mut attributes: Map<String, Value>) -> Self {
        attributes.remove("id");
        Self { id, attributes }
    }

    /// Look up one attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Attributes with `patch` shallow-merged over them.
    #[must_use]
    pub fn merged(&self, patch: &Map<String, Value>) -> Map<String, Value> {
        let mut attributes = self.attributes.clone();
        for (key, value) in patch {
            attributes.insert(key.clone(), value.clone());
        }
        attributes.remove("id");
        attributes
    }

    /// The entity as one JSON object, `{ ...attributes, id }`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = self.attributes.clone();
        object.insert("id".to_string(), self.id.to_value());
        Value::Object(object)
    }
}

/// One `{ id, attributes }` pair as carried by a receive-many action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Identity
    pub id: EntityId,
    /// Attributes, without `id`
    pub attributes: Map<String, Value>,
}

impl EntityRecord {
    /// Build a record, dropping any `id` attribute in favour of `id`.
    #[must_use]
    pub fn new(id: EntityId, mut attributes: Map<String, Value>) -> Self {
        attributes.remove("id");
        Self { id, attributes }
    }

    /// Split a JSON object into a record.
    ///
    /// Returns `None` when the value is not an object or carries no usable `id`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let id = EntityId::from_value(object.get("id")?)?;
        Some(Self::new(id, object.clone()))
    }
}

impl From<EntityRecord> for Entity {
    fn from(record: EntityRecord) -> Self {
        Self::new(record.id, record.attributes)
    }
}
