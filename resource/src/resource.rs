//! The action factory.
//!
//! A [`Resource`] stamps every action it builds with its name and, where the
//! kind carries one, a fresh correlation id from the injected generator.
//! Building an action has no side effect; nothing happens until it is sent
//! to a store running this resource's interceptor.

use crate::action::{ActionKind, Operation, ResourceAction, ResourceName};
use crate::config::ResourceConfig;
use crate::entity::{EntityId, EntityRecord};
use crate::error::{RequestError, ResourceError};
use crate::interceptor::ResourceInterceptor;
use crate::reducer::ResourceReducer;
use crate::request::RequestOptions;
use crate::waiter::{Completion, Pending, Waiter};
use composable_resource_core::correlation::CorrelationId;
use composable_resource_core::environment::IdGenerator;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A named remote collection of entities.
///
/// Cheap to clone; clones share configuration and id generator.
///
/// # Example
///
/// ```
/// use composable_resource::{Resource, ResourceConfig};
/// use composable_resource_core::environment::SequentialIdGenerator;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), composable_resource::ResourceError> {
/// let issues = Resource::new(
///     ResourceConfig::new("issues").with_endpoint("https://api.example.com/issues"),
///     Arc::new(SequentialIdGenerator::new()),
/// )?;
///
/// let create = issues.create(json!({"title": "Broken build"}));
/// assert_eq!(create.correlation_id().map(|id| id.get()), Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Resource {
    name: ResourceName,
    config: Arc<ResourceConfig>,
    ids: Arc<dyn IdGenerator>,
}

impl Resource {
    /// Build a resource from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] if the configuration is
    /// rejected by [`ResourceConfig::validate`].
    pub fn new(config: ResourceConfig, ids: Arc<dyn IdGenerator>) -> Result<Self, ResourceError> {
        config.validate()?;
        Ok(Self {
            name: Arc::from(config.name()),
            config: Arc::new(config),
            ids,
        })
    }

    /// Resource name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Reducer folding this resource's actions
    #[must_use]
    pub fn reducer(&self) -> ResourceReducer {
        ResourceReducer::new(Arc::clone(&self.name), self.config.resolved_capacity())
    }

    /// Interceptor performing this resource's side effects
    #[must_use]
    pub fn interceptor(&self) -> ResourceInterceptor {
        ResourceInterceptor::new(self.clone())
    }

    fn next_id(&self) -> CorrelationId {
        self.ids.next_id()
    }

    fn action(&self, kind: ActionKind) -> ResourceAction {
        ResourceAction {
            resource: Arc::clone(&self.name),
            kind,
        }
    }

    /// CREATE with `data` as the request body
    #[must_use]
    pub fn create(&self, data: Value) -> ResourceAction {
        self.action(ActionKind::Create {
            id: self.next_id(),
            data,
        })
    }

    /// GET one entity
    ///
    /// Anything that is not a JSON object is a bare id: `get(json!(7))` looks
    /// up `{ "id": 7 }`.
    #[must_use]
    pub fn get(&self, params: Value) -> ResourceAction {
        let params = match params {
            Value::Object(map) => map,
            id => {
                let mut map = Map::new();
                map.insert("id".to_string(), id);
                map
            },
        };
        self.action(ActionKind::Get {
            id: self.next_id(),
            params,
        })
    }

    /// QUERY with `params` as the query string
    #[must_use]
    pub fn query(&self, params: Map<String, Value>) -> ResourceAction {
        self.action(ActionKind::Query {
            id: self.next_id(),
            params,
        })
    }

    /// UPDATE entity `target` with `data`
    ///
    /// The correlation id and the target entity id are distinct.
    #[must_use]
    pub fn update(&self, target: impl Into<EntityId>, data: Map<String, Value>) -> ResourceAction {
        self.action(ActionKind::Update {
            id: self.next_id(),
            target: target.into(),
            data,
        })
    }

    /// REQUEST on behalf of `trigger`
    ///
    /// `options` is layered over the configured options, which are layered
    /// over the hard defaults. `endpoint` defaults to the configured endpoint.
    #[must_use]
    pub fn request(&self, trigger: ResourceAction, options: &RequestOptions, endpoint: Option<String>) -> ResourceAction {
        self.action(ActionKind::Request {
            id: self.next_id(),
            trigger: Box::new(trigger),
            url: endpoint.unwrap_or_else(|| self.config.endpoint().to_string()),
            options: RequestOptions::resolve(self.config.options(), options),
        })
    }

    /// SUCCEED of `trigger` with `response`
    #[must_use]
    pub fn succeed(&self, trigger: ResourceAction, response: Value) -> ResourceAction {
        self.action(ActionKind::Succeed {
            id: self.next_id(),
            action: Box::new(trigger),
            response,
        })
    }

    /// FAIL of `trigger`; carries no correlation id of its own
    #[must_use]
    pub fn fail(&self, trigger: ResourceAction, response: Option<Value>, error: RequestError) -> ResourceAction {
        self.action(ActionKind::Fail {
            action: Box::new(trigger),
            response,
            error,
        })
    }

    /// RECEIVE of one entity
    #[must_use]
    pub fn receive(&self, id: impl Into<EntityId>, attributes: Map<String, Value>) -> ResourceAction {
        self.action(ActionKind::Receive {
            id: id.into(),
            attributes,
        })
    }

    /// RECEIVE_MANY of a batch
    #[must_use]
    pub fn receive_many(&self, items: Vec<EntityRecord>) -> ResourceAction {
        self.action(ActionKind::ReceiveMany { items })
    }

    /// AWAIT `action`
    ///
    /// Returns the AWAIT action to send and the future that settles when the
    /// SUCCEED or FAIL of `action` passes through the interceptor. Sending
    /// the AWAIT also dispatches `action` itself.
    ///
    /// `action` should carry a correlation id; awaiting a FAIL, RECEIVE or
    /// RECEIVE_MANY never settles.
    #[must_use]
    pub fn await_action(&self, action: ResourceAction) -> (ResourceAction, Pending) {
        let target = action.correlation_id().unwrap_or_else(|| self.next_id());
        let (completion, pending) = Completion::new(target);

        let awaiting = self.action(ActionKind::Await {
            id: self.next_id(),
            action: Box::new(action),
            waiter: Waiter {
                id: target,
                completion,
            },
        });
        (awaiting, pending)
    }

    /// Stamp an operation
    #[must_use]
    pub fn operation(&self, operation: Operation) -> ResourceAction {
        match operation {
            Operation::Create { data } => self.create(data),
            Operation::Get { params } => self.get(params),
            Operation::Query { params } => self.query(params),
            Operation::Update { target, data } => self.update(target, data),
        }
    }

    /// Build the action registered under `name`
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownAction`] if nothing is registered
    /// under `name`.
    pub fn call(&self, name: &str, args: Value) -> Result<ResourceAction, ResourceError> {
        let constructor = self
            .config
            .actions()
            .get(name)
            .ok_or_else(|| ResourceError::UnknownAction {
                resource: self.name.to_string(),
                name: name.to_string(),
            })?;
        Ok(self.operation(constructor(args)))
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
