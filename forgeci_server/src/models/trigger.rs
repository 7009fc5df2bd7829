//! Trigger objects — the persisted entity a pipeline run is anchored to.
//!
//! A trigger is one of {pull request, git branch, release}, modeled as an
//! explicit tagged union rather than resolved from row contents at runtime.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::triggers;

/// Lookup key identifying a trigger object within a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerKey {
    PullRequest {
        namespace: String,
        repo_name: String,
        project_url: String,
        pr_id: i64,
    },
    GitBranch {
        namespace: String,
        repo_name: String,
        project_url: String,
        branch_name: String,
    },
    Release {
        namespace: String,
        repo_name: String,
        project_url: String,
        release_tag: String,
    },
}

impl TriggerKey {
    pub fn kind(&self) -> &'static str {
        match self {
            TriggerKey::PullRequest { .. } => "pull_request",
            TriggerKey::GitBranch { .. } => "branch_push",
            TriggerKey::Release { .. } => "release",
        }
    }

    pub fn project_url(&self) -> &str {
        match self {
            TriggerKey::PullRequest { project_url, .. }
            | TriggerKey::GitBranch { project_url, .. }
            | TriggerKey::Release { project_url, .. } => project_url,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            TriggerKey::PullRequest { namespace, .. }
            | TriggerKey::GitBranch { namespace, .. }
            | TriggerKey::Release { namespace, .. } => namespace,
        }
    }

    pub fn repo_name(&self) -> &str {
        match self {
            TriggerKey::PullRequest { repo_name, .. }
            | TriggerKey::GitBranch { repo_name, .. }
            | TriggerKey::Release { repo_name, .. } => repo_name,
        }
    }

    pub fn pr_id(&self) -> Option<i64> {
        match self {
            TriggerKey::PullRequest { pr_id, .. } => Some(*pr_id),
            _ => None,
        }
    }

    pub fn branch_name(&self) -> Option<&str> {
        match self {
            TriggerKey::GitBranch { branch_name, .. } => Some(branch_name),
            _ => None,
        }
    }

    pub fn release_tag(&self) -> Option<&str> {
        match self {
            TriggerKey::Release { release_tag, .. } => Some(release_tag),
            _ => None,
        }
    }
}

/// A persisted trigger object. Owns zero or more pipeline runs.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = triggers)]
pub struct TriggerObject {
    pub id: i64,
    pub kind: String,
    pub namespace: String,
    pub repo_name: String,
    pub project_url: String,
    pub pr_id: Option<i64>,
    pub branch_name: Option<String>,
    pub release_tag: Option<String>,
    pub create_date: Option<DateTime<Utc>>,
}

impl TriggerObject {
    /// Reconstructs the tagged lookup key from a persisted row.
    pub fn key(&self) -> Option<TriggerKey> {
        match self.kind.as_str() {
            "pull_request" => Some(TriggerKey::PullRequest {
                namespace: self.namespace.clone(),
                repo_name: self.repo_name.clone(),
                project_url: self.project_url.clone(),
                pr_id: self.pr_id?,
            }),
            "branch_push" => Some(TriggerKey::GitBranch {
                namespace: self.namespace.clone(),
                repo_name: self.repo_name.clone(),
                project_url: self.project_url.clone(),
                branch_name: self.branch_name.clone()?,
            }),
            "release" => Some(TriggerKey::Release {
                namespace: self.namespace.clone(),
                repo_name: self.repo_name.clone(),
                project_url: self.project_url.clone(),
                release_tag: self.release_tag.clone()?,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = triggers)]
pub struct NewTrigger {
    pub kind: String,
    pub namespace: String,
    pub repo_name: String,
    pub project_url: String,
    pub pr_id: Option<i64>,
    pub branch_name: Option<String>,
    pub release_tag: Option<String>,
}

impl NewTrigger {
    pub fn from_key(key: &TriggerKey) -> Self {
        NewTrigger {
            kind: key.kind().to_string(),
            namespace: key.namespace().to_string(),
            repo_name: key.repo_name().to_string(),
            project_url: key.project_url().to_string(),
            pr_id: key.pr_id(),
            branch_name: key.branch_name().map(str::to_string),
            release_tag: key.release_tag().map(str::to_string),
        }
    }
}
