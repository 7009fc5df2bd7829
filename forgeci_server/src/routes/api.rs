//! Read-only REST API over recorded runs.

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::models::{KojiBuild, TestRun};

use super::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// 0-based inclusive range over builds ordered newest first.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub first: Option<i64>,
    pub last: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct KojiBuildJson {
    pub build_id: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub build_logs_url: Option<String>,
    pub submitted_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<KojiBuild> for KojiBuildJson {
    fn from(b: KojiBuild) -> Self {
        KojiBuildJson {
            build_id: b.build_id,
            target: b.target,
            status: b.status,
            commit_sha: b.commit_sha,
            web_url: b.web_url,
            build_logs_url: b.build_logs_url,
            submitted_time: b.submitted_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TestRunJson {
    pub pipeline_id: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub submitted_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<TestRun> for TestRunJson {
    fn from(r: TestRun) -> Self {
        TestRunJson {
            pipeline_id: r.pipeline_id,
            target: r.target,
            status: r.status,
            commit_sha: r.commit_sha,
            web_url: r.web_url,
            submitted_time: r.submitted_time,
        }
    }
}

/// Partial listing with a `Content-Range` header, newest builds first.
pub async fn list_koji_builds(
    state: &AppState,
    query: RangeQuery,
) -> Result<Response, StatusCode> {
    let first = query.first.unwrap_or(0).max(0);
    let last = query
        .last
        .unwrap_or(first + DEFAULT_PAGE_SIZE - 1)
        .clamp(first, first + MAX_PAGE_SIZE - 1);

    let builds = state
        .ctx
        .koji_builds
        .get_range(first, last)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Koji build listing failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let body: Vec<KojiBuildJson> = builds.into_iter().map(KojiBuildJson::from).collect();
    let range = if body.is_empty() {
        "koji-builds */*".to_string()
    } else {
        format!("koji-builds {}-{}/*", first + 1, first + body.len() as i64)
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_RANGE,
        HeaderValue::from_str(&range).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    );
    Ok((StatusCode::PARTIAL_CONTENT, headers, Json(body)).into_response())
}

pub async fn get_koji_build(
    state: &AppState,
    build_id: &str,
) -> Result<Json<KojiBuildJson>, StatusCode> {
    state
        .ctx
        .koji_builds
        .get_by_build_id(build_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Koji build lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map(KojiBuildJson::from)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_test_run(
    state: &AppState,
    pipeline_id: &str,
) -> Result<Json<TestRunJson>, StatusCode> {
    state
        .ctx
        .test_runs
        .get_by_pipeline_id(pipeline_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Test run lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map(TestRunJson::from)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
