//! Koji (production) build records and Copr build records.
//!
//! Both are keyed by the backend-assigned build id; Copr builds additionally
//! carry one row per chroot target.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{copr_builds, koji_builds};

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = koji_builds)]
pub struct KojiBuild {
    pub id: i64,
    pub build_id: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub build_logs_url: Option<String>,
    pub submitted_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub finished_time: Option<DateTime<Utc>>,
    pub trigger_id: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = koji_builds)]
pub struct NewKojiBuild {
    pub build_id: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub build_logs_url: Option<String>,
    pub submitted_time: Option<DateTime<Utc>>,
    pub trigger_id: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = copr_builds)]
pub struct CoprBuild {
    pub id: i64,
    pub build_id: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub submitted_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub finished_time: Option<DateTime<Utc>>,
    pub trigger_id: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = copr_builds)]
pub struct NewCoprBuild {
    pub build_id: String,
    pub target: String,
    pub status: String,
    pub commit_sha: String,
    pub web_url: Option<String>,
    pub submitted_time: Option<DateTime<Utc>>,
    pub trigger_id: i64,
}
