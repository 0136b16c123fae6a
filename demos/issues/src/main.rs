//! Issues Demo - a remote collection driven through a resource store
//!
//! Creates, reads, lists and patches todos on a JSON REST API, looks up the
//! owner of one of them through a second resource on the same store, then
//! prints the Prometheus exposition of the requests it made.
//!
//! # Running the Example
//!
//! ```bash
//! RESOURCE_ENDPOINT=https://jsonplaceholder.typicode.com/todos \
//! RESOURCE_OPTIMISTIC=true \
//! RUST_LOG=info,composable_resource=debug \
//! cargo run -p issues-demo
//! ```
//!
//! Without `RESOURCE_ENDPOINT` the public jsonplaceholder API is used.

#![allow(missing_docs)]

use anyhow::Context;
use composable_resource::{Operation, ReqwestTransport, ResourceConfig, ResourceEnvironment, ResourceError, Resources};
use composable_resource_runtime::metrics::MetricsRecorder;
use composable_resource_runtime::StoreConfig;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FALLBACK_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/todos";
const USERS_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/users";

fn config() -> anyhow::Result<ResourceConfig> {
    let config = match ResourceConfig::from_env("todos") {
        Ok(config) => config,
        Err(ResourceError::InvalidConfig(reason)) if std::env::var_os("RESOURCE_ENDPOINT").is_none() => {
            tracing::info!(%reason, endpoint = FALLBACK_ENDPOINT, "Falling back to public endpoint");
            ResourceConfig::new("todos").with_endpoint(FALLBACK_ENDPOINT)
        },
        Err(error) => return Err(error).context("Invalid resource configuration"),
    };

    Ok(config.with_action("open", |_| Operation::Query {
        params: json!({"completed": false, "_limit": 5})
            .as_object()
            .cloned()
            .unwrap_or_default(),
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,composable_resource=debug,issues_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut metrics = MetricsRecorder::new();
    metrics.install().context("Failed to install metrics recorder")?;

    let mut resources = Resources::new();
    resources.register(config()?)?;
    resources.register(ResourceConfig::new("users").with_endpoint(
        std::env::var("USERS_ENDPOINT").unwrap_or_else(|_| USERS_ENDPOINT.to_string()),
    ))?;

    let transport = ReqwestTransport::with_timeout(Duration::from_secs(10))?;
    let store = resources.store_with_config(
        ResourceEnvironment::with_transport(Arc::new(transport)),
        StoreConfig::default().with_shutdown_timeout(Duration::from_secs(5)),
    );
    let todos = resources
        .client(&store, "todos")
        .context("todos resource not registered")?
        .with_timeout(Duration::from_secs(15));
    let users = resources
        .client(&store, "users")
        .context("users resource not registered")?
        .with_timeout(Duration::from_secs(15));

    let created = todos
        .create(json!({"title": "Write the release notes", "completed": false}))
        .await?;
    tracing::info!(%created, "Created");

    let first = todos.get(json!(1)).await?;
    tracing::info!(%first, "Fetched");

    if let Some(owner) = first.get("userId").cloned() {
        let user = users.get(owner).await?;
        tracing::info!(name = %user["name"], "Owner");
    }

    let open = todos.call("open", Value::Null).await?;
    let count = open.as_array().map_or(0, Vec::len);
    tracing::info!(count, "Listed open todos");

    let mut patch = Map::new();
    patch.insert("completed".to_string(), Value::Bool(true));
    match todos.update(1, patch).await {
        Ok(updated) => tracing::info!(%updated, "Updated"),
        Err(error) => tracing::warn!(%error, response = ?error.rejection(), "Update rejected"),
    }

    if let Some(cached) = todos.item(1).await {
        tracing::info!(entity = %cached.to_json(), "Cached");
    }
    tracing::info!(cached = todos.items().await.len(), "Entity cache size");

    store.shutdown_default().await?;

    if let Some(exposition) = metrics.render() {
        println!("{exposition}");
    }

    Ok(())
}
