//! HTTP routes — webhooks and the read-only REST API.

pub mod api;
pub mod webhook;

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::dispatcher::Dispatcher;
use crate::handlers::TaskContext;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub ctx: TaskContext,
    pub dispatcher: Dispatcher,
}

/// Build the service's Axum router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        // Webhooks
        .route("/webhook/github", post(github_webhook))
        .route("/webhook/copr", post(copr_webhook))
        .route("/webhook/koji", post(koji_webhook))
        .route("/webhook/testing-farm", post(testing_farm_webhook))
        // Read-only API
        .route("/api/koji-builds", get(list_koji_builds))
        .route("/api/koji-builds/{build_id}", get(get_koji_build))
        .route("/api/testing-farm/{pipeline_id}", get(get_test_run))
        // Liveness
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// ── Webhooks ──

async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    crate::metrics::webhook_received("github");
    webhook::handle_github(&state, &headers, body).await
}

async fn copr_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    crate::metrics::webhook_received("copr");
    webhook::handle_copr(&state, body).await
}

async fn koji_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    crate::metrics::webhook_received("koji");
    webhook::handle_koji(&state, body).await
}

async fn testing_farm_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    crate::metrics::webhook_received("testing-farm");
    webhook::handle_testing_farm(&state, body).await
}

// ── Read-only API ──

async fn list_koji_builds(
    State(state): State<AppState>,
    Query(query): Query<api::RangeQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    api::list_koji_builds(&state, query).await
}

async fn get_koji_build(
    State(state): State<AppState>,
    Path(build_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    api::get_koji_build(&state, &build_id).await
}

async fn get_test_run(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    api::get_test_run(&state, &pipeline_id).await
}
