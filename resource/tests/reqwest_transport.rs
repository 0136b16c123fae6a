//! Resources over real HTTP against a wiremock server.

use composable_resource::request::JSON_API_MEDIA_TYPE;
use composable_resource::{
    EntityId, RequestError, RequestOptions, ReqwestTransport, ResourceConfig, ResourceEnvironment, ResourceError,
    Resources,
};
use composable_resource_testing::helpers;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn attrs(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

async fn mount(server: &MockServer, config: ResourceConfig) -> Result<composable_resource::ResourceClient, ResourceError> {
    helpers::init_tracing();

    let mut resources = Resources::new();
    resources.register(config)?;
    let store = resources.store(ResourceEnvironment::with_transport(Arc::new(ReqwestTransport::new()?)));

    let client = resources
        .client(&store, "issues")
        .ok_or_else(|| ResourceError::InvalidConfig(format!("issues not mounted on {}", server.uri())))?;
    Ok(client.with_timeout(Duration::from_secs(5)))
}

#[tokio::test]
async fn create_posts_json_api_body() -> Result<(), ResourceError> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/issues"))
        .and(header("accept", JSON_API_MEDIA_TYPE))
        .and(header("content-type", JSON_API_MEDIA_TYPE))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({"title": "Broken build"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7, "title": "Broken build"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ResourceConfig::new("issues")
        .with_endpoint(format!("{}/issues", server.uri()))
        .with_options(RequestOptions::new().with_header("Authorization", "Bearer secret"));
    let client = mount(&server, config).await?;

    let created = client.create(json!({"title": "Broken build"})).await?;
    assert_eq!(created, json!({"id": 7, "title": "Broken build"}));
    Ok(())
}

#[tokio::test]
async fn query_encodes_parameters() -> Result<(), ResourceError> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/issues"))
        .and(query_param("status", "open"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "title": "one"},
            {"id": 2, "title": "two"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = mount(
        &server,
        ResourceConfig::new("issues").with_endpoint(format!("{}/issues", server.uri())),
    )
    .await?;

    let listed = client.query(attrs(json!({"status": "open", "page": 2}))).await?;
    assert_eq!(listed.as_array().map(Vec::len), Some(2));

    assert_eq!(client.items().await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn update_patches_single_uri() -> Result<(), ResourceError> {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/issues/7"))
        .and(body_json(json!({"title": "Fixed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "title": "Fixed"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = mount(
        &server,
        ResourceConfig::new("issues")
            .with_endpoint(format!("{}/issues/", server.uri()))
            .with_optimistic(true),
    )
    .await?;

    client.update(7, attrs(json!({"title": "Fixed"}))).await?;

    let title = client.item(EntityId::Int(7)).await.and_then(|e| e.get("title").cloned());
    assert_eq!(title, Some(json!("Fixed")));
    Ok(())
}

#[tokio::test]
async fn error_status_rejects_with_body() -> Result<(), ResourceError> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/issues/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": [{"title": "missing"}]})))
        .mount(&server)
        .await;

    let client = mount(
        &server,
        ResourceConfig::new("issues").with_endpoint(format!("{}/issues", server.uri())),
    )
    .await?;

    let error = client.get(json!(404)).await.err();
    let rejection = error.as_ref().and_then(ResourceError::rejection);

    assert_eq!(
        rejection.map(|r| r.error.clone()),
        Some(RequestError::Http {
            status: 404,
            status_text: "Not Found".into()
        })
    );
    assert_eq!(
        rejection.and_then(|r| r.response.clone()),
        Some(json!({"errors": [{"title": "missing"}]}))
    );
    Ok(())
}

#[tokio::test]
async fn slow_server_is_a_transport_failure() -> Result<(), ResourceError> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::with_timeout(Duration::from_millis(100))?;

    let mut resources = Resources::new();
    let issues = resources.register(ResourceConfig::new("issues").with_endpoint(format!("{}/issues", server.uri())))?;
    let store = resources.store(ResourceEnvironment::with_transport(Arc::new(transport)));

    let (awaiting, pending) = issues.await_action(issues.query(Map::new()));
    store.send(awaiting).await?;

    let rejection = pending
        .wait_with_timeout(Duration::from_secs(5))
        .await
        .err()
        .and_then(|e| e.rejection().cloned());
    assert!(matches!(
        rejection.map(|r| r.error),
        Some(RequestError::Transport(_))
    ));
    Ok(())
}
