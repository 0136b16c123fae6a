//! Resource actions.
//!
//! Every action carries the name of the resource it belongs to; reducers and
//! interceptors of other resources let it pass untouched. All kinds except
//! FAIL, RECEIVE and RECEIVE_MANY also carry a fresh correlation id.

use crate::entity::{EntityId, EntityRecord};
use crate::error::RequestError;
use crate::request::RequestOptions;
use crate::waiter::Waiter;
use composable_resource_core::correlation::CorrelationId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Name of a resource, shared by every action it produces.
pub type ResourceName = Arc<str>;

/// Stable action-type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    /// Network call
    #[serde(rename = "RESOURCE_API_REQUEST")]
    Request,
    /// Create intent
    #[serde(rename = "RESOURCE_CREATE")]
    Create,
    /// Read-one intent
    #[serde(rename = "RESOURCE_GET")]
    Get,
    /// Update intent
    #[serde(rename = "RESOURCE_UPDATE")]
    Update,
    /// Read-many intent
    #[serde(rename = "RESOURCE_QUERY")]
    Query,
    /// One entity arrived
    #[serde(rename = "RESOURCE_RECEIVE")]
    Receive,
    /// A batch of entities arrived
    #[serde(rename = "RESOURCE_RECEIVE_MANY")]
    ReceiveMany,
    /// Caller waits on an operation
    #[serde(rename = "RESOURCE_AWAIT_ACTION")]
    Await,
    /// Operation failed
    #[serde(rename = "RESOURCE_FAIL_ACTION")]
    Fail,
    /// Operation succeeded
    #[serde(rename = "RESOURCE_SUCCEED_ACTION")]
    Succeed,
}

impl ActionType {
    /// Every tag, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Request,
        Self::Create,
        Self::Get,
        Self::Update,
        Self::Query,
        Self::Receive,
        Self::ReceiveMany,
        Self::Await,
        Self::Fail,
        Self::Succeed,
    ];

    /// The wire tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "RESOURCE_API_REQUEST",
            Self::Create => "RESOURCE_CREATE",
            Self::Get => "RESOURCE_GET",
            Self::Update => "RESOURCE_UPDATE",
            Self::Query => "RESOURCE_QUERY",
            Self::Receive => "RESOURCE_RECEIVE",
            Self::ReceiveMany => "RESOURCE_RECEIVE_MANY",
            Self::Await => "RESOURCE_AWAIT_ACTION",
            Self::Fail => "RESOURCE_FAIL_ACTION",
            Self::Succeed => "RESOURCE_SUCCEED_ACTION",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action addressed to one resource.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceAction {
    /// Resource the action belongs to
    pub resource: ResourceName,
    /// What happened
    pub kind: ActionKind,
}

/// Payload of a [`ResourceAction`].
#[derive(Clone, Debug, PartialEq)]
pub enum ActionKind {
    /// Create an entity from `data`
    Create {
        /// Correlation id
        id: CorrelationId,
        /// Request body
        data: Value,
    },
    /// Read one entity
    Get {
        /// Correlation id
        id: CorrelationId,
        /// Lookup spec, at least `{ "id": .. }`
        params: Map<String, Value>,
    },
    /// Read many entities
    Query {
        /// Correlation id
        id: CorrelationId,
        /// Query-string parameters
        params: Map<String, Value>,
    },
    /// Patch one entity
    Update {
        /// Correlation id
        id: CorrelationId,
        /// Entity being patched
        target: EntityId,
        /// Attributes to change
        data: Map<String, Value>,
    },
    /// Perform a network call on behalf of `trigger`
    Request {
        /// Correlation id of the request itself
        id: CorrelationId,
        /// The intent that caused the call
        trigger: Box<ResourceAction>,
        /// Target URL, without query string
        url: String,
        /// Resolved options
        options: RequestOptions,
    },
    /// `action` succeeded with `response`
    Succeed {
        /// Correlation id of this outcome
        id: CorrelationId,
        /// The intent that succeeded
        action: Box<ResourceAction>,
        /// Parsed response body
        response: Value,
    },
    /// `action` failed
    Fail {
        /// The intent that failed
        action: Box<ResourceAction>,
        /// Parsed error body, `None` when absent or unparsable
        response: Option<Value>,
        /// What went wrong
        error: RequestError,
    },
    /// One entity arrived
    Receive {
        /// Entity id
        id: EntityId,
        /// Full attribute set
        attributes: Map<String, Value>,
    },
    /// A batch of entities arrived
    ReceiveMany {
        /// Records in arrival order
        items: Vec<EntityRecord>,
    },
    /// A caller waits on `action`
    Await {
        /// Correlation id of the await itself
        id: CorrelationId,
        /// The awaited intent
        action: Box<ResourceAction>,
        /// Completion the interceptor settles
        waiter: Waiter,
    },
}

impl ResourceAction {
    /// Tag of this action.
    #[must_use]
    pub const fn action_type(&self) -> ActionType {
        match self.kind {
            ActionKind::Create { .. } => ActionType::Create,
            ActionKind::Get { .. } => ActionType::Get,
            ActionKind::Query { .. } => ActionType::Query,
            ActionKind::Update { .. } => ActionType::Update,
            ActionKind::Request { .. } => ActionType::Request,
            ActionKind::Succeed { .. } => ActionType::Succeed,
            ActionKind::Fail { .. } => ActionType::Fail,
            ActionKind::Receive { .. } => ActionType::Receive,
            ActionKind::ReceiveMany { .. } => ActionType::ReceiveMany,
            ActionKind::Await { .. } => ActionType::Await,
        }
    }

    /// Correlation id, if this kind carries one.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<CorrelationId> {
        match &self.kind {
            ActionKind::Create { id, .. }
            | ActionKind::Get { id, .. }
            | ActionKind::Query { id, .. }
            | ActionKind::Update { id, .. }
            | ActionKind::Request { id, .. }
            | ActionKind::Succeed { id, .. }
            | ActionKind::Await { id, .. } => Some(*id),
            ActionKind::Fail { .. } | ActionKind::Receive { .. } | ActionKind::ReceiveMany { .. } => None,
        }
    }

    /// The inner action of REQUEST, SUCCEED, FAIL and AWAIT.
    #[must_use]
    pub fn inner(&self) -> Option<&Self> {
        match &self.kind {
            ActionKind::Request { trigger: action, .. }
            | ActionKind::Succeed { action, .. }
            | ActionKind::Fail { action, .. }
            | ActionKind::Await { action, .. } => Some(action.as_ref()),
            _ => None,
        }
    }

    /// Whether the action belongs to `resource`.
    #[must_use]
    pub fn is_for(&self, resource: &str) -> bool {
        &*self.resource == resource
    }

    /// Whether this is a terminal outcome (SUCCEED or FAIL).
    #[must_use]
    pub const fn is_outcome(&self) -> bool {
        matches!(self.kind, ActionKind::Succeed { .. } | ActionKind::Fail { .. })
    }

    /// Correlation id of the operation a SUCCEED/FAIL settles.
    #[must_use]
    pub fn settles(&self) -> Option<CorrelationId> {
        match &self.kind {
            ActionKind::Succeed { action, .. } | ActionKind::Fail { action, .. } => action.correlation_id(),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action_type(), self.resource)?;
        if let Some(id) = self.correlation_id() {
            write!(f, " #{id}")?;
        }
        Ok(())
    }
}

/// An intent without correlation stamp, as produced by registered actions.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// See [`ActionKind::Create`]
    Create {
        /// Request body
        data: Value,
    },
    /// See [`ActionKind::Get`]; a non-object is treated as a bare id
    Get {
        /// Lookup spec or bare id
        params: Value,
    },
    /// See [`ActionKind::Query`]
    Query {
        /// Query-string parameters
        params: Map<String, Value>,
    },
    /// See [`ActionKind::Update`]
    Update {
        /// Entity being patched
        target: EntityId,
        /// Attributes to change
        data: Map<String, Value>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_are_exact() {
        let tags: Vec<&str> = ActionType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "RESOURCE_API_REQUEST",
                "RESOURCE_CREATE",
                "RESOURCE_GET",
                "RESOURCE_UPDATE",
                "RESOURCE_QUERY",
                "RESOURCE_RECEIVE",
                "RESOURCE_RECEIVE_MANY",
                "RESOURCE_AWAIT_ACTION",
                "RESOURCE_FAIL_ACTION",
                "RESOURCE_SUCCEED_ACTION",
            ]
        );
    }

    #[test]
    fn serde_uses_the_same_tags() {
        for tag in ActionType::ALL {
            let json = serde_json::to_value(tag).ok();
            assert_eq!(json, Some(Value::String(tag.as_str().to_string())));
            assert_eq!(serde_json::from_value::<ActionType>(json!(tag.to_string())).ok(), Some(tag));
        }
    }

    #[test]
    fn fail_has_no_correlation_id() {
        let trigger = ResourceAction {
            resource: Arc::from("issues"),
            kind: ActionKind::Create {
                id: CorrelationId::new(1),
                data: json!({}),
            },
        };
        let fail = ResourceAction {
            resource: Arc::from("issues"),
            kind: ActionKind::Fail {
                action: Box::new(trigger),
                response: None,
                error: RequestError::Transport("down".into()),
            },
        };

        assert_eq!(fail.correlation_id(), None);
        assert_eq!(fail.settles(), Some(CorrelationId::new(1)));
        assert!(fail.is_outcome());
        assert_eq!(fail.to_string(), "RESOURCE_FAIL_ACTION issues");
    }
}
