//! Registered projects — each row carries the repository's declared
//! package configuration (jobs) as JSONB.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::jobs::PackageConfig;
use crate::schema::projects;

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = projects)]
pub struct Project {
    pub id: i64,
    pub namespace: String,
    pub repo_name: String,
    pub project_url: String,
    pub package_config: serde_json::Value,
    pub active: bool,
    pub create_date: Option<DateTime<Utc>>,
    pub write_date: Option<DateTime<Utc>>,
}

impl Project {
    /// Deserializes the declared job configurations.
    pub fn package_config(&self) -> anyhow::Result<PackageConfig> {
        Ok(serde_json::from_value(self.package_config.clone())?)
    }
}
