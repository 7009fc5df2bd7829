//! Webhook handlers — normalize inbound payloads into events, find the
//! project whose config applies, and hand the matching tasks to the
//! dispatcher.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

use crate::events::copr::parse_copr_event;
use crate::events::forge::parse_github_event;
use crate::events::koji::parse_koji_event;
use crate::events::testing_farm::parse_testing_farm_event;
use crate::events::Event;
use crate::forge::validate_signature;
use crate::jobs::PackageConfig;

use super::AppState;

/// Handle an incoming forge webhook payload.
pub async fn handle_github(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<StatusCode, StatusCode> {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !validate_signature(&state.ctx.config.webhook_secret, &body, signature) {
        tracing::warn!("Webhook signature validation failed");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let event_type = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    if event_type == "ping" {
        tracing::info!("Received GitHub ping webhook");
        return Ok(StatusCode::OK);
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;

    let event = match parse_github_event(event_type, &payload) {
        Ok(Some(event)) => event,
        Ok(None) => {
            tracing::debug!("Ignoring webhook event: {}", event_type);
            return Ok(StatusCode::OK);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting malformed forge payload");
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let Some(key) = event.trigger_key() else {
        return Ok(StatusCode::OK);
    };
    let Some(package_config) = project_config(state, key.namespace(), key.repo_name()).await?
    else {
        return Ok(StatusCode::OK);
    };

    enqueue(state, &event, &package_config).await
}

pub async fn handle_copr(state: &AppState, body: Bytes) -> Result<StatusCode, StatusCode> {
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let event = parse_copr_event(&payload).map_err(|e| {
        tracing::warn!(error = %e, "Rejecting malformed Copr payload");
        StatusCode::BAD_REQUEST
    })?;

    dispatch_callback(state, event).await
}

pub async fn handle_koji(state: &AppState, body: Bytes) -> Result<StatusCode, StatusCode> {
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let event = parse_koji_event(&payload).map_err(|e| {
        tracing::warn!(error = %e, "Rejecting malformed Koji payload");
        StatusCode::BAD_REQUEST
    })?;

    dispatch_callback(state, event).await
}

pub async fn handle_testing_farm(state: &AppState, body: Bytes) -> Result<StatusCode, StatusCode> {
    let payload: serde_json::Value =
        serde_json::from_slice(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    let event = parse_testing_farm_event(&payload).map_err(|e| {
        tracing::warn!(error = %e, "Rejecting malformed Testing Farm payload");
        StatusCode::BAD_REQUEST
    })?;

    dispatch_callback(state, event).await
}

/// Correlates a backend callback with a stored run, walks run → trigger →
/// project to recover the package config, then enqueues. A callback for a
/// run this service never recorded resolves to zero tasks.
async fn dispatch_callback(state: &AppState, event: Event) -> Result<StatusCode, StatusCode> {
    let trigger_id = match &event {
        Event::CoprBuildStart(e) | Event::CoprBuildEnd(e) => state
            .ctx
            .copr_builds
            .get_by_build_target(&e.build_id, &e.chroot)
            .await
            .map_err(internal)?
            .map(|b| b.trigger_id),
        Event::KojiBuildStart(e) | Event::KojiBuildEnd(e) => state
            .ctx
            .koji_builds
            .get_by_build_id(&e.build_id)
            .await
            .map_err(internal)?
            .map(|b| b.trigger_id),
        Event::TestingFarmResults(e) => state
            .ctx
            .test_runs
            .get_by_pipeline_id(&e.pipeline_id)
            .await
            .map_err(internal)?
            .map(|r| r.trigger_id),
        _ => None,
    };

    let Some(trigger_id) = trigger_id else {
        tracing::warn!(
            external_id = event.external_id().unwrap_or_default(),
            kind = %event.kind(),
            "Callback does not correlate with any recorded run"
        );
        return Ok(StatusCode::OK);
    };

    let Some(trigger) = state.ctx.triggers.get(trigger_id).await.map_err(internal)? else {
        tracing::warn!(trigger_id, "Recorded run has no trigger object");
        return Ok(StatusCode::OK);
    };

    let Some(package_config) =
        project_config(state, &trigger.namespace, &trigger.repo_name).await?
    else {
        return Ok(StatusCode::OK);
    };

    enqueue(state, &event, &package_config).await
}

async fn project_config(
    state: &AppState,
    namespace: &str,
    repo_name: &str,
) -> Result<Option<PackageConfig>, StatusCode> {
    let project = state
        .ctx
        .projects
        .find_by_repo(namespace, repo_name)
        .await
        .map_err(internal)?;

    let Some(project) = project else {
        tracing::debug!("No project registered for repo: {}/{}", namespace, repo_name);
        return Ok(None);
    };

    let config = project.package_config().map_err(|e| {
        tracing::error!(project_id = project.id, error = %e, "Stored package config is invalid");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Some(config))
}

async fn enqueue(
    state: &AppState,
    event: &Event,
    package_config: &PackageConfig,
) -> Result<StatusCode, StatusCode> {
    let enqueued = state
        .dispatcher
        .enqueue_event(event, package_config)
        .await
        .map_err(internal)?;

    tracing::info!(kind = %event.kind(), tasks = enqueued, "Webhook dispatched");
    if enqueued == 0 {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::ACCEPTED)
    }
}

fn internal(e: anyhow::Error) -> StatusCode {
    tracing::error!(error = %e, "Webhook processing error");
    StatusCode::INTERNAL_SERVER_ERROR
}
