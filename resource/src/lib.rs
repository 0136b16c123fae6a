//! # Composable Resource
//!
//! Declarative CRUD resources on top of the Composable Resource runtime.
//!
//! A resource is a named remote collection of entities. Configuring one yields
//! four pieces that plug into a [`Store`](composable_resource_runtime::Store):
//!
//! - **Extractor**: turns a response payload into entity records
//! - **Action factory** ([`Resource`]): builds correlated lifecycle actions
//! - **Reducer** ([`ResourceReducer`]): folds outcomes and received entities
//!   into the entity cache, awaiting table and resolution log
//! - **Interceptor** ([`ResourceInterceptor`]): turns intents into REQUESTs,
//!   performs them and settles waiters
//!
//! ## Lifecycle
//!
//! ```text
//! CREATE / GET / QUERY / UPDATE
//!   └─ REQUEST ──(network)──┬─ SUCCEED ─ RECEIVE_MANY
//!                           └─ FAIL
//! AWAIT(action) dispatches `action` and settles when its SUCCEED/FAIL passes
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use composable_resource::{ReqwestTransport, ResourceConfig, ResourceEnvironment, Resources};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), composable_resource::ResourceError> {
//! let mut resources = Resources::new();
//! resources.register(ResourceConfig::new("issues").with_endpoint("https://api.example.com/issues"))?;
//!
//! let store = resources.store(ResourceEnvironment::with_transport(Arc::new(ReqwestTransport::new()?)));
//! if let Some(issues) = resources.client(&store, "issues") {
//!     let created = issues.create(json!({"title": "Broken build"})).await?;
//!     println!("{created}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod client;
pub mod config;
pub mod entity;
pub mod environment;
pub mod error;
pub mod extractor;
pub mod interceptor;
pub mod reducer;
pub mod request;
pub mod resource;
pub mod resources;
pub mod state;
pub mod transport;
pub mod waiter;

pub use action::{ActionKind, ActionType, Operation, ResourceAction, ResourceName};
pub use client::ResourceClient;
pub use config::{DefaultSingleUri, JsonResponseHandler, ResourceConfig, ResponseHandler, SingleUri};
pub use entity::{Entity, EntityId, EntityRecord};
pub use environment::ResourceEnvironment;
pub use error::{Rejection, RequestError, ResourceError};
pub use extractor::{DefaultExtractor, Extractor, JsonApiExtractor};
pub use interceptor::ResourceInterceptor;
pub use reducer::ResourceReducer;
pub use request::RequestOptions;
pub use resource::Resource;
pub use resources::{HostInterceptor, HostReducer, ResourceStore, Resources};
pub use state::{Outcome, ResolutionRecord, ResourceState, ResourceStates};
pub use transport::ReqwestTransport;
pub use waiter::{Completion, Pending, Waiter};
