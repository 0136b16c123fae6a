//! Awaitable operations on one resource.
//!
//! [`ResourceClient`] wraps the AWAIT dance: build the intent, send it wrapped
//! in an AWAIT, then wait for the interceptor to settle the completion.

use crate::action::ResourceAction;
use crate::entity::{Entity, EntityId};
use crate::error::ResourceError;
use crate::resource::Resource;
use crate::resources::ResourceStore;
use serde_json::{Map, Value};
use std::time::Duration;

/// Request/response view of one resource on a running store
#[derive(Clone)]
pub struct ResourceClient {
    store: ResourceStore,
    resource: Resource,
    timeout: Option<Duration>,
}

impl ResourceClient {
    /// Client for `resource` on `store`, waiting without limit
    #[must_use]
    pub const fn new(store: ResourceStore, resource: Resource) -> Self {
        Self {
            store,
            resource,
            timeout: None,
        }
    }

    /// Give up on operations that do not settle within `timeout`
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The resource this client drives
    #[must_use]
    pub const fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Create an entity
    ///
    /// # Errors
    ///
    /// See [`ResourceClient::perform`].
    pub async fn create(&self, data: Value) -> Result<Value, ResourceError> {
        self.perform(self.resource.create(data)).await
    }

    /// Read one entity
    ///
    /// # Errors
    ///
    /// See [`ResourceClient::perform`].
    pub async fn get(&self, params: Value) -> Result<Value, ResourceError> {
        self.perform(self.resource.get(params)).await
    }

    /// Read many entities
    ///
    /// # Errors
    ///
    /// See [`ResourceClient::perform`].
    pub async fn query(&self, params: Map<String, Value>) -> Result<Value, ResourceError> {
        self.perform(self.resource.query(params)).await
    }

    /// Patch one entity
    ///
    /// # Errors
    ///
    /// See [`ResourceClient::perform`].
    pub async fn update(&self, target: impl Into<EntityId>, data: Map<String, Value>) -> Result<Value, ResourceError> {
        self.perform(self.resource.update(target, data)).await
    }

    /// Run a registered action
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownAction`] for unregistered names,
    /// otherwise see [`ResourceClient::perform`].
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ResourceError> {
        let action = self.resource.call(name, args)?;
        self.perform(action).await
    }

    /// Send `action` under an AWAIT and wait for its outcome
    ///
    /// Returns only after the network round-trip the action started has been
    /// folded into state, so [`item`](Self::item) sees what the server sent.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::Rejected`] when the operation FAILs
    /// - [`ResourceError::Timeout`] when a timeout is set and elapses
    /// - [`ResourceError::Abandoned`] when the waiter is dropped unsettled
    /// - [`ResourceError::Store`] when the store refuses the action
    #[tracing::instrument(skip(self, action), fields(resource = %self.resource.name(), action = %action))]
    pub async fn perform(&self, action: ResourceAction) -> Result<Value, ResourceError> {
        let (awaiting, pending) = self.resource.await_action(action);
        let mut handle = self.store.send(awaiting).await?;

        let settled = async move {
            let outcome = pending.await;
            // The waiter settles on SUCCEED; RECEIVE_MANY follows from the same effect
            handle.wait().await;
            outcome
        };

        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, settled)
                .await
                .map_err(|_| ResourceError::Timeout)?,
            None => settled.await,
        }
    }

    /// Cached entity by id
    pub async fn item(&self, id: impl Into<EntityId>) -> Option<Entity> {
        let id = id.into();
        let name = self.resource.name().to_string();
        self.store
            .state(move |states| states.slice(&name).item(&id).cloned())
            .await
    }

    /// Every cached entity, in no particular order
    pub async fn items(&self) -> Vec<Entity> {
        let name = self.resource.name().to_string();
        self.store
            .state(move |states| states.slice(&name).items.values().cloned().collect())
            .await
    }
}

impl std::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("resource", &self.resource.name())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
