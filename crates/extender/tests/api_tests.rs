//! Integration tests for the extender HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use extender_lib::{
    collector::{StaticSource, UtilizationCollector},
    health::{components, ComponentHealth, ComponentStatus, HealthRegistry},
    observability::{ExtenderMetrics, StructuredLogger},
    BiasMode, Extender, LabelFilter, ScoringConfig, ScoringEngine,
};
use green_extender::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app(source: StaticSource) -> (Router, Arc<AppState>) {
    let logger = StructuredLogger::new("api-test");
    let metrics = ExtenderMetrics::new();
    let config = ScoringConfig::new(BiasMode::FavorPresent, 0.75, 2, 10_000.0).unwrap();
    let engine = ScoringEngine::new(
        config,
        UtilizationCollector::new(Arc::new(source)),
        logger.clone(),
        metrics.clone(),
    );
    let extender = Extender::new(engine, LabelFilter::default(), logger, metrics);

    let health_registry = HealthRegistry::new();
    health_registry.register(components::METRICS_SOURCE).await;

    let state = Arc::new(AppState::new(extender, health_registry));
    (create_router(state.clone()), state)
}

fn node(name: &str, labels: Value, renewables: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Node",
        "metadata": {
            "name": name,
            "labels": labels,
            "annotations": {"renewables": renewables, "rated-power": "1000"}
        },
        "status": {"allocatable": {"cpu": "4", "memory": "16Gi"}}
    })
}

fn extender_args(nodes: Vec<Value>) -> Value {
    json!({
        "pod": {"metadata": {"name": "batch-job", "namespace": "analytics"}},
        "nodes": {"items": nodes}
    })
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_banner_and_version() {
    let (app, _state) = setup_test_app(StaticSource::new()).await;

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"Welcome to green-extender!");

    let response = app.oneshot(get("/version")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        String::from_utf8(body_bytes(response).await).unwrap(),
        env!("CARGO_PKG_VERSION")
    );
}

#[tokio::test]
async fn test_filter_keeps_labelled_nodes() {
    let (app, _state) = setup_test_app(StaticSource::new()).await;
    let args = extender_args(vec![
        node("solar-1", json!({"green": "true"}), "0.8;0.6"),
        node("diesel-1", json!({}), "0.1;0.1"),
    ]);

    let response = app
        .oneshot(post("/filter", args.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;

    let items = result["nodes"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["metadata"]["name"], "solar-1");
    // Echoed verbatim, unknown fields included
    assert_eq!(items[0]["kind"], "Node");
    assert_eq!(items[0]["status"]["allocatable"]["memory"], "16Gi");
    assert!(result["failedNodes"]["diesel-1"].is_string());
    assert!(result.get("error").is_none());
}

#[tokio::test]
async fn test_filter_bad_body_returns_error_field() {
    let (app, _state) = setup_test_app(StaticSource::new()).await;

    let response = app.oneshot(post("/filter", "not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert!(!result["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_prioritize_returns_scores_in_request_order() {
    let source = StaticSource::new()
        .with_usage("cloudy", 1.0)
        .with_usage("sunny", 1.0);
    let (app, state) = setup_test_app(source).await;
    let args = extender_args(vec![
        node("cloudy", json!({"green": "true"}), "0.3;0.2"),
        node("sunny", json!({"green": "true"}), "0.9;0.9"),
    ]);

    let response = app
        .oneshot(post("/prioritize", args.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let priorities = body_json(response).await;
    let priorities = priorities.as_array().unwrap();

    assert_eq!(priorities.len(), 2);
    assert_eq!(priorities[0]["host"], "cloudy");
    assert_eq!(priorities[1]["host"], "sunny");
    assert_eq!(priorities[1]["score"], 10);
    assert!(priorities[0]["score"].as_i64().unwrap() < 10);

    let health = state.health_registry.health().await;
    assert_eq!(
        health.components[components::METRICS_SOURCE].status,
        extender_lib::ComponentStatus::Healthy
    );
}

#[tokio::test]
async fn test_prioritize_bad_body_returns_empty_list() {
    let (app, _state) = setup_test_app(StaticSource::new()).await;

    let response = app.oneshot(post("/prioritize", "{\"nodes\": 7")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_prioritize_metrics_failure_returns_500() {
    let (app, state) = setup_test_app(StaticSource::new()).await;
    state.health_registry.set_ready(true).await;
    let args = extender_args(vec![node("dark", json!({"green": "true"}), "0.5;0.5")]);

    let response = app
        .clone()
        .oneshot(post("/prioritize", args.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("dark"));

    // Degraded, but still serving
    let response = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "degraded");

    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_prioritize_node_names_only() {
    let (app, _state) = setup_test_app(StaticSource::new()).await;
    let args = json!({"nodenames": ["a", "b"]});

    let response = app
        .oneshot(post("/prioritize", args.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([{"host": "a", "score": 0}, {"host": "b", "score": 0}])
    );
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app(StaticSource::new()).await;
    state
        .health_registry
        .update(
            components::METRICS_SOURCE,
            ComponentHealth {
                status: ComponentStatus::Unhealthy,
                message: Some("metrics API unreachable".to_string()),
                last_check_timestamp: 0,
            },
        )
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_tracks_startup() {
    let (app, state) = setup_test_app(StaticSource::new()).await;

    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["ready"], false);

    state.health_registry.set_ready(true).await;

    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state) = setup_test_app(StaticSource::new()).await;

    // Touch the counters so every family has samples
    let filter_args = extender_args(vec![node("x", json!({}), "0.1;0.1")]);
    app.clone()
        .oneshot(post("/filter", filter_args.to_string()))
        .await
        .unwrap();
    ExtenderMetrics::new().observe_prioritize_latency(0.002);

    let response = app.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains("green_extender_filter_latency_seconds"));
    assert!(text.contains("green_extender_prioritize_latency_seconds_bucket"));
    assert!(text.contains("green_extender_requests_total{endpoint=\"filter\"}"));
    assert!(text.contains("green_extender_nodes_filtered_out_total"));
}

#[test]
fn test_router_builds_outside_runtime() {
    let (app, _state) = tokio_test::block_on(setup_test_app(StaticSource::new()));
    let response = tokio_test::block_on(app.oneshot(get("/"))).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
