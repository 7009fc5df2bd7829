//! Testing Farm run records — keyed by the externally assigned pipeline id.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::test_runs;

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = test_runs)]
pub struct TestRun {
    pub id: i64,
    pub pipeline_id: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub submitted_time: Option<DateTime<Utc>>,
    pub trigger_id: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = test_runs)]
pub struct NewTestRun {
    pub pipeline_id: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub submitted_time: Option<DateTime<Utc>>,
    pub trigger_id: i64,
}
