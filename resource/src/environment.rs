//! Injected dependencies of resource reducers and interceptors.

use composable_resource_core::environment::{Clock, SystemClock};
use composable_resource_core::http::HttpTransport;
use std::sync::Arc;

/// Capabilities shared by every resource of a store.
#[derive(Clone)]
pub struct ResourceEnvironment {
    /// Network-call primitive
    pub transport: Arc<dyn HttpTransport>,
    /// Time source for resolution timestamps
    pub clock: Arc<dyn Clock>,
}

impl ResourceEnvironment {
    /// Environment from explicit capabilities
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }

    /// Environment with the system clock
    #[must_use]
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(transport, Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for ResourceEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceEnvironment").finish_non_exhaustive()
    }
}
