//! Repository-style store traits over the pipeline state.
//!
//! Handlers only ever see these traits; the Postgres implementation lives in
//! `pg.rs`, the in-memory one (tests, local runs without a database) in
//! `memory.rs`. Status updates are single-row atomic in both.

use async_trait::async_trait;

use super::koji_build::{CoprBuild, KojiBuild, NewCoprBuild, NewKojiBuild};
use super::project::Project;
use super::test_run::{NewTestRun, TestRun};
use super::trigger::{TriggerKey, TriggerObject};
use super::RunStatus;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Looks up a registered project by forge namespace and repo name.
    async fn find_by_repo(&self, namespace: &str, repo_name: &str)
        -> anyhow::Result<Option<Project>>;
}

#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Looks up or creates the trigger object for the given key.
    async fn get_or_create(&self, key: &TriggerKey) -> anyhow::Result<TriggerObject>;

    async fn get(&self, id: i64) -> anyhow::Result<Option<TriggerObject>>;
}

#[async_trait]
pub trait TestRunStore: Send + Sync {
    async fn create(&self, new: NewTestRun) -> anyhow::Result<TestRun>;

    /// Idempotent lookup by the externally assigned pipeline id.
    async fn get_by_pipeline_id(&self, pipeline_id: &str) -> anyhow::Result<Option<TestRun>>;

    /// Records a result callback: status and, when given, the log URL, as
    /// one atomic single-row write. Racing callbacks for the same pipeline
    /// id must never leave one callback's status next to the other's URL.
    async fn set_result(
        &self,
        pipeline_id: &str,
        status: RunStatus,
        web_url: Option<&str>,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait CoprBuildStore: Send + Sync {
    async fn create(&self, new: NewCoprBuild) -> anyhow::Result<CoprBuild>;

    async fn get_by_build_target(
        &self,
        build_id: &str,
        target: &str,
    ) -> anyhow::Result<Option<CoprBuild>>;

    /// Sets the status; records start/finished timestamps as the status
    /// enters running or a terminal state.
    async fn set_status(
        &self,
        build_id: &str,
        target: &str,
        status: RunStatus,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait KojiBuildStore: Send + Sync {
    async fn create(&self, new: NewKojiBuild) -> anyhow::Result<KojiBuild>;

    async fn get_by_build_id(&self, build_id: &str) -> anyhow::Result<Option<KojiBuild>>;

    /// Records a state callback: status and, when given, the task web URL,
    /// atomically; start/finished timestamps follow the status like
    /// `CoprBuildStore::set_status`.
    async fn set_result(
        &self,
        build_id: &str,
        status: RunStatus,
        web_url: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Read-only listing for the REST API; `first`/`last` are 0-based
    /// offsets into the records ordered by internal id descending.
    async fn get_range(&self, first: i64, last: i64) -> anyhow::Result<Vec<KojiBuild>>;
}
