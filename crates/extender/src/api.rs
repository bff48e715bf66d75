//! HTTP API: scheduler extender endpoints, health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use extender_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    Extender, ExtenderFilterResult,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub extender: Extender,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(extender: Extender, health_registry: HealthRegistry) -> Self {
        Self {
            extender,
            health_registry,
        }
    }
}

async fn index() -> &'static str {
    "Welcome to green-extender!"
}

async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Always 200; problems travel in the result's `error` field
async fn filter(State(state): State<Arc<AppState>>, body: Bytes) -> Json<ExtenderFilterResult> {
    Json(state.extender.filter_body(&body))
}

/// 500 when utilization could not be collected for some node
async fn prioritize(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match state.extender.prioritize_body(&body).await {
        Ok(priorities) => {
            state
                .health_registry
                .set_healthy(components::METRICS_SOURCE)
                .await;
            (StatusCode::OK, Json(priorities)).into_response()
        }
        Err(e) => {
            let message = e.to_string();
            state
                .health_registry
                .set_degraded(components::METRICS_SOURCE, message.clone())
                .await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
                .into_response()
        }
    }
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/version", get(version))
        .route("/filter", post(filter))
        .route("/prioritize", post(prioritize))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting extender server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
