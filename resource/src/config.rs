//! Resource configuration.
//!
//! # Example
//!
//! ```
//! use composable_resource::config::ResourceConfig;
//! use composable_resource::action::Operation;
//! use composable_resource::extractor::JsonApiExtractor;
//! use serde_json::json;
//!
//! let config = ResourceConfig::new("issues")
//!     .with_endpoint("https://api.example.com/issues")
//!     .with_extractor(JsonApiExtractor)
//!     .with_optimistic(true)
//!     .with_action("open", |_args| Operation::Query {
//!         params: json!({"status": "open"}).as_object().cloned().unwrap_or_default(),
//!     });
//!
//! assert_eq!(config.name(), "issues");
//! assert!(config.actions().contains("open"));
//! ```

use crate::action::Operation;
use crate::entity::EntityId;
use crate::error::{RequestError, ResourceError};
use crate::extractor::{DefaultExtractor, Extractor};
use crate::request::RequestOptions;
use composable_resource_core::http::HttpResponse;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Default bound of the resolution log.
pub const DEFAULT_RESOLVED_CAPACITY: usize = 1000;

/// Typed constructor registered under an action name.
pub type ActionConstructor = Arc<dyn Fn(Value) -> Operation + Send + Sync>;

/// Explicit registry of custom operations, frozen once the resource is built.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    entries: BTreeMap<String, ActionConstructor>,
}

impl ActionRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `constructor` under `name`, replacing any previous entry
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(Value) -> Operation + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(constructor));
    }

    /// Constructor registered under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionConstructor> {
        self.entries.get(name)
    }

    /// Whether `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Turns a successful response into the SUCCEED payload.
pub trait ResponseHandler: Send + Sync {
    /// Parse the response body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Decode`] when the body cannot be parsed.
    fn handle(&self, response: &HttpResponse) -> Result<Value, RequestError>;
}

impl<F> ResponseHandler for F
where
    F: Fn(&HttpResponse) -> Result<Value, RequestError> + Send + Sync,
{
    fn handle(&self, response: &HttpResponse) -> Result<Value, RequestError> {
        self(response)
    }
}

/// Parses the body as JSON; an empty body is `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseHandler;

impl ResponseHandler for JsonResponseHandler {
    fn handle(&self, response: &HttpResponse) -> Result<Value, RequestError> {
        if response.is_empty() {
            return Ok(Value::Null);
        }
        response.json().map_err(|e| RequestError::Decode(e.to_string()))
    }
}

/// Builds the URL of a single entity from a lookup spec.
pub trait SingleUri: Send + Sync {
    /// URL for the entity described by `spec`.
    fn uri(&self, config: &ResourceConfig, spec: &Map<String, Value>) -> String;
}

impl<F> SingleUri for F
where
    F: Fn(&ResourceConfig, &Map<String, Value>) -> String + Send + Sync,
{
    fn uri(&self, config: &ResourceConfig, spec: &Map<String, Value>) -> String {
        self(config, spec)
    }
}

/// `{endpoint}/{id}`; the bare endpoint when `spec` has no id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSingleUri;

impl SingleUri for DefaultSingleUri {
    fn uri(&self, config: &ResourceConfig, spec: &Map<String, Value>) -> String {
        let endpoint = config.endpoint();
        let segment = match spec.get("id") {
            None | Some(Value::Null) => return endpoint.to_string(),
            Some(value) => EntityId::from_value(value).map_or_else(|| value.to_string(), |id| id.to_string()),
        };
        format!("{}/{segment}", endpoint.trim_end_matches('/'))
    }
}

/// Configuration of one resource.
#[derive(Clone)]
pub struct ResourceConfig {
    name: String,
    endpoint: String,
    actions: ActionRegistry,
    extractor: Arc<dyn Extractor>,
    options: RequestOptions,
    optimistic: bool,
    response_handler: Arc<dyn ResponseHandler>,
    single_uri: Arc<dyn SingleUri>,
    resolved_capacity: Option<usize>,
}

impl ResourceConfig {
    /// Configuration with defaults for everything but the name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: String::new(),
            actions: ActionRegistry::new(),
            extractor: Arc::new(DefaultExtractor),
            options: RequestOptions::new(),
            optimistic: false,
            response_handler: Arc::new(JsonResponseHandler),
            single_uri: Arc::new(DefaultSingleUri),
            resolved_capacity: Some(DEFAULT_RESOLVED_CAPACITY),
        }
    }

    /// Configuration from the environment
    ///
    /// Reads `RESOURCE_ENDPOINT` (required) and `RESOURCE_OPTIMISTIC`
    /// (`true`/`false`/`1`/`0`, default `false`).
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] if the endpoint is missing or
    /// the optimistic flag cannot be parsed.
    pub fn from_env(name: impl Into<String>) -> Result<Self, ResourceError> {
        let endpoint = std::env::var("RESOURCE_ENDPOINT")
            .map_err(|_| ResourceError::InvalidConfig("RESOURCE_ENDPOINT is not set".to_string()))?;

        let optimistic = match std::env::var("RESOURCE_OPTIMISTIC") {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                ResourceError::InvalidConfig(format!("RESOURCE_OPTIMISTIC must be a boolean, got '{raw}'"))
            })?,
            Err(_) => false,
        };

        Ok(Self::new(name).with_endpoint(endpoint).with_optimistic(optimistic))
    }

    /// Set the base endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Register a custom operation
    #[must_use]
    pub fn with_action<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Value) -> Operation + Send + Sync + 'static,
    {
        self.actions.register(name, constructor);
        self
    }

    /// Set the payload extractor
    #[must_use]
    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Set the default request options
    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable or disable optimistic updates
    #[must_use]
    pub const fn with_optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = optimistic;
        self
    }

    /// Set the response handler
    #[must_use]
    pub fn with_response_handler(mut self, handler: impl ResponseHandler + 'static) -> Self {
        self.response_handler = Arc::new(handler);
        self
    }

    /// Set the single-entity URL builder
    #[must_use]
    pub fn with_single_uri(mut self, single_uri: impl SingleUri + 'static) -> Self {
        self.single_uri = Arc::new(single_uri);
        self
    }

    /// Bound the resolution log; `None` keeps unlimited history
    #[must_use]
    pub const fn with_resolved_capacity(mut self, capacity: Option<usize>) -> Self {
        self.resolved_capacity = capacity;
        self
    }

    /// Check the configuration can back a resource
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::InvalidConfig`] for an empty name or a zero
    /// resolution-log capacity.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.name.trim().is_empty() {
            return Err(ResourceError::InvalidConfig("resource name must not be empty".to_string()));
        }
        if self.resolved_capacity == Some(0) {
            return Err(ResourceError::InvalidConfig(
                "resolved capacity must be positive, use None for unlimited".to_string(),
            ));
        }
        Ok(())
    }

    /// Resource name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Custom operations
    #[must_use]
    pub const fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Payload extractor
    #[must_use]
    pub fn extractor(&self) -> &dyn Extractor {
        self.extractor.as_ref()
    }

    /// Default request options
    #[must_use]
    pub const fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Whether updates are applied optimistically
    #[must_use]
    pub const fn optimistic(&self) -> bool {
        self.optimistic
    }

    /// Response handler
    #[must_use]
    pub fn response_handler(&self) -> &dyn ResponseHandler {
        self.response_handler.as_ref()
    }

    /// URL of the entity described by `spec`
    #[must_use]
    pub fn single_uri(&self, spec: &Map<String, Value>) -> String {
        self.single_uri.uri(self, spec)
    }

    /// Resolution-log bound
    #[must_use]
    pub const fn resolved_capacity(&self) -> Option<usize> {
        self.resolved_capacity
    }
}

impl fmt::Debug for ResourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("actions", &self.actions)
            .field("options", &self.options)
            .field("optimistic", &self.optimistic)
            .field("resolved_capacity", &self.resolved_capacity)
            .finish_non_exhaustive()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
