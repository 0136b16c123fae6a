//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for the dispatch chain and for the
//! network calls resources perform:
//! - Store dispatch and reducer execution
//! - Effect spawning
//! - Resource requests, responses and failures
//!
//! # Example
//!
//! ```rust,no_run
//! use composable_resource_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//!
//! // ... run the store ...
//!
//! if let Some(exposition) = recorder.render() {
//!     println!("{exposition}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Process-wide Prometheus recorder.
///
/// Installs the global recorder and renders the exposition format on demand.
/// Serving it (or pushing it somewhere) is up to the host application.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// A recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the metrics exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), this logs
    /// a warning and succeeds without a handle.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this recorder was never installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Store
    describe_counter!(
        "store_actions_total",
        "Total number of actions folded by the reducer"
    );
    describe_counter!(
        "store_rejected_actions_total",
        "Total number of actions rejected during shutdown"
    );
    describe_histogram!(
        "reducer_execution_duration_seconds",
        "Time taken to execute reducers"
    );

    // Effects
    describe_counter!(
        "effects_spawned_total",
        "Total number of effects spawned, by kind"
    );

    // Resources
    describe_counter!(
        "resource_requests_total",
        "Total number of network calls issued by resources"
    );
    describe_counter!(
        "resource_request_failures_total",
        "Total number of resource requests that ended in a FAIL action"
    );
    describe_histogram!(
        "resource_request_duration_seconds",
        "Time from issuing a resource request to receiving its response"
    );
}

/// Reducer metrics recorder.
pub struct ReducerMetrics;

impl ReducerMetrics {
    /// Record an action folded by the reducer.
    pub fn record_action(duration: Duration) {
        counter!("store_actions_total").increment(1);
        histogram!("reducer_execution_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Effect metrics recorder.
pub struct EffectMetrics;

impl EffectMetrics {
    /// Record an effect being spawned.
    pub fn record_spawn(kind: &'static str) {
        counter!("effects_spawned_total", "kind" => kind).increment(1);
    }
}

/// Resource request metrics recorder.
pub struct RequestMetrics;

impl RequestMetrics {
    /// Record a network call being issued.
    pub fn record_request(resource: &str, method: &'static str) {
        counter!(
            "resource_requests_total",
            "resource" => resource.to_string(),
            "method" => method
        )
        .increment(1);
    }

    /// Record a response arriving, whatever its status.
    pub fn record_response(resource: &str, status: u16, duration: Duration) {
        histogram!(
            "resource_request_duration_seconds",
            "resource" => resource.to_string(),
            "status" => status.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a request ending in failure.
    ///
    /// `kind` is `"http"`, `"transport"` or `"decode"`.
    pub fn record_failure(resource: &str, kind: &'static str) {
        counter!(
            "resource_request_failures_total",
            "resource" => resource.to_string(),
            "kind" => kind
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninstalled_recorder_renders_nothing() {
        let recorder = MetricsRecorder::new();
        assert!(recorder.handle().is_none());
        assert!(recorder.render().is_none());
    }

    #[test]
    fn install_succeeds_even_when_already_installed() {
        let mut first = MetricsRecorder::new();
        let mut second = MetricsRecorder::new();

        assert!(first.install().is_ok());
        assert!(second.install().is_ok());
    }

    #[test]
    fn request_metrics_render() {
        let mut recorder = MetricsRecorder::new();
        assert!(recorder.install().is_ok());

        RequestMetrics::record_request("issues", "GET");
        RequestMetrics::record_response("issues", 404, Duration::from_millis(12));
        RequestMetrics::record_failure("issues", "http");
        ReducerMetrics::record_action(Duration::from_micros(40));

        // Another test may own the recorder; metrics are still recorded then
        if let Some(rendered) = recorder.render() {
            assert!(rendered.contains("resource_requests_total"));
            assert!(rendered.contains("resource_request_failures_total"));
            assert!(rendered.contains("store_actions_total"));
        }
    }
}
