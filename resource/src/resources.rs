//! Mounting resources into one store.
//!
//! Each resource owns the slice of [`ResourceStates`] under its name. The host
//! reducer routes an action to the slice of the resource it names; the host
//! interceptor chains every resource interceptor, each reading its own slice.

use crate::action::{ResourceAction, ResourceName};
use crate::client::ResourceClient;
use crate::config::ResourceConfig;
use crate::environment::ResourceEnvironment;
use crate::error::ResourceError;
use crate::resource::Resource;
use crate::state::ResourceStates;
use composable_resource_core::composition::{
    combine_interceptors, combine_reducers, scope_interceptor, scope_reducer, CombinedInterceptor, CombinedReducer,
    SharedInterceptor, SharedReducer,
};
use composable_resource_core::environment::{IdGenerator, SequentialIdGenerator};
use composable_resource_core::{Effect, Reducer, SmallVec};
use composable_resource_runtime::{Store, StoreConfig};
use std::sync::Arc;

/// Reducer over every mounted resource
pub type HostReducer = CombinedReducer<ResourceStates, ResourceAction, ResourceEnvironment>;

/// Interceptor chain over every mounted resource
pub type HostInterceptor = CombinedInterceptor<ResourceStates, ResourceAction, ResourceEnvironment>;

/// Store running a set of resources
pub type ResourceStore = Store<ResourceStates, ResourceAction, ResourceEnvironment, HostReducer, HostInterceptor>;

/// Registry of the resources sharing one store.
///
/// Every resource draws correlation ids from the same generator, so ids are
/// unique across the whole store.
#[derive(Clone)]
pub struct Resources {
    resources: Vec<Resource>,
    ids: Arc<dyn IdGenerator>,
}

impl Resources {
    /// Empty registry with a sequential id generator
    #[must_use]
    pub fn new() -> Self {
        Self::with_ids(Arc::new(SequentialIdGenerator::new()))
    }

    /// Empty registry drawing ids from `ids`
    #[must_use]
    pub fn with_ids(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            resources: Vec::new(),
            ids,
        }
    }

    /// Register a resource
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] if the configuration is
    /// invalid or the name is already taken.
    pub fn register(&mut self, config: ResourceConfig) -> Result<Resource, ResourceError> {
        if self.get(config.name()).is_some() {
            return Err(ResourceError::InvalidConfig(format!(
                "resource '{}' is already registered",
                config.name()
            )));
        }

        let resource = Resource::new(config, Arc::clone(&self.ids))?;
        tracing::debug!(resource = %resource.name(), endpoint = %resource.config().endpoint(), "Registered resource");
        self.resources.push(resource.clone());
        Ok(resource)
    }

    /// Registered resource by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name() == name)
    }

    /// Registered resources in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Reducer folding every resource into its slice
    #[must_use]
    pub fn reducer(&self) -> HostReducer {
        let reducers = self
            .resources
            .iter()
            .map(|resource| {
                let name: ResourceName = Arc::from(resource.name());
                let read = Arc::clone(&name);
                let write = Arc::clone(&name);

                let scoped = scope_reducer(
                    resource.reducer(),
                    move |states: &ResourceStates| states.slice(&read),
                    move |states: &mut ResourceStates, slice| states.set(&write, slice),
                );
                Arc::new(Routed { name, inner: scoped }) as SharedReducer<_, _, _>
            })
            .collect();

        combine_reducers(reducers)
    }

    /// Interceptor chain, in registration order
    #[must_use]
    pub fn interceptor(&self) -> HostInterceptor {
        let interceptors = self
            .resources
            .iter()
            .map(|resource| {
                let name: ResourceName = Arc::from(resource.name());
                let scoped = scope_interceptor(resource.interceptor(), move |states: &ResourceStates| {
                    states.slice(&name)
                });
                Arc::new(scoped) as SharedInterceptor<_, _, _>
            })
            .collect();

        combine_interceptors(interceptors)
    }

    /// Store running every registered resource
    #[must_use]
    pub fn store(&self, environment: ResourceEnvironment) -> ResourceStore {
        Store::new(ResourceStates::new(), self.reducer(), self.interceptor(), environment)
    }

    /// Store with explicit runtime configuration
    #[must_use]
    pub fn store_with_config(&self, environment: ResourceEnvironment, config: StoreConfig) -> ResourceStore {
        Store::with_config(
            ResourceStates::new(),
            self.reducer(),
            self.interceptor(),
            environment,
            config,
        )
    }

    /// Client for the resource `name` on `store`
    #[must_use]
    pub fn client(&self, store: &ResourceStore, name: &str) -> Option<ResourceClient> {
        self.get(name)
            .map(|resource| ResourceClient::new(store.clone(), resource.clone()))
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.resources.iter().map(Resource::name))
            .finish()
    }
}

/// Skips the slice copy for actions addressed elsewhere.
struct Routed<R> {
    name: ResourceName,
    inner: R,
}

impl<R> Reducer for Routed<R>
where
    R: Reducer<State = ResourceStates, Action = ResourceAction, Environment = ResourceEnvironment>,
{
    type State = ResourceStates;
    type Action = ResourceAction;
    type Environment = ResourceEnvironment;

    fn reduce(
        &self,
        state: &mut ResourceStates,
        action: ResourceAction,
        env: &ResourceEnvironment,
    ) -> SmallVec<[Effect<ResourceAction>; 4]> {
        if action.is_for(&self.name) {
            self.inner.reduce(state, action, env)
        } else {
            SmallVec::new()
        }
    }
}
