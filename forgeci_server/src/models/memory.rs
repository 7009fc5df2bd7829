//! In-memory store implementation.
//!
//! Backs the test suite and local runs without a database. A single mutex
//! guards all tables, so every status transition is atomic with respect to
//! concurrent callbacks for the same id.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::koji_build::{CoprBuild, KojiBuild, NewCoprBuild, NewKojiBuild};
use super::project::Project;
use super::store::{CoprBuildStore, KojiBuildStore, ProjectStore, TestRunStore, TriggerStore};
use super::test_run::{NewTestRun, TestRun};
use super::trigger::{TriggerKey, TriggerObject};
use super::RunStatus;

#[derive(Default)]
struct State {
    next_id: i64,
    projects: Vec<Project>,
    triggers: Vec<TriggerObject>,
    copr_builds: Vec<CoprBuild>,
    koji_builds: Vec<KojiBuild>,
    test_runs: Vec<TestRun>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a project (test and local-run setup).
    pub async fn add_project(
        &self,
        namespace: &str,
        repo_name: &str,
        project_url: &str,
        package_config: serde_json::Value,
    ) {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.projects.push(Project {
            id,
            namespace: namespace.to_string(),
            repo_name: repo_name.to_string(),
            project_url: project_url.to_string(),
            package_config,
            active: true,
            create_date: Some(Utc::now()),
            write_date: None,
        });
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find_by_repo(
        &self,
        namespace: &str,
        repo_name: &str,
    ) -> anyhow::Result<Option<Project>> {
        let state = self.state.lock().await;
        Ok(state
            .projects
            .iter()
            .find(|p| p.active && p.namespace == namespace && p.repo_name == repo_name)
            .cloned())
    }
}

#[async_trait]
impl TriggerStore for MemoryStore {
    async fn get_or_create(&self, key: &TriggerKey) -> anyhow::Result<TriggerObject> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .triggers
            .iter()
            .find(|t| t.key().as_ref() == Some(key))
        {
            return Ok(existing.clone());
        }
        let id = state.next_id();
        let trigger = TriggerObject {
            id,
            kind: key.kind().to_string(),
            namespace: key.namespace().to_string(),
            repo_name: key.repo_name().to_string(),
            project_url: key.project_url().to_string(),
            pr_id: key.pr_id(),
            branch_name: key.branch_name().map(str::to_string),
            release_tag: key.release_tag().map(str::to_string),
            create_date: Some(Utc::now()),
        };
        state.triggers.push(trigger.clone());
        Ok(trigger)
    }

    async fn get(&self, id: i64) -> anyhow::Result<Option<TriggerObject>> {
        let state = self.state.lock().await;
        Ok(state.triggers.iter().find(|t| t.id == id).cloned())
    }
}

#[async_trait]
impl TestRunStore for MemoryStore {
    async fn create(&self, new: NewTestRun) -> anyhow::Result<TestRun> {
        let mut state = self.state.lock().await;
        if state
            .test_runs
            .iter()
            .any(|r| r.pipeline_id == new.pipeline_id)
        {
            anyhow::bail!("duplicate pipeline id: {}", new.pipeline_id);
        }
        let id = state.next_id();
        let run = TestRun {
            id,
            pipeline_id: new.pipeline_id,
            target: new.target,
            status: new.status,
            commit_sha: new.commit_sha,
            web_url: new.web_url,
            submitted_time: new.submitted_time,
            trigger_id: new.trigger_id,
        };
        state.test_runs.push(run.clone());
        Ok(run)
    }

    async fn get_by_pipeline_id(&self, pipeline_id: &str) -> anyhow::Result<Option<TestRun>> {
        let state = self.state.lock().await;
        Ok(state
            .test_runs
            .iter()
            .find(|r| r.pipeline_id == pipeline_id)
            .cloned())
    }

    async fn set_result(
        &self,
        pipeline_id: &str,
        status: RunStatus,
        web_url: Option<&str>,
    ) -> anyhow::Result<()> {
        // Both fields change under one lock acquisition.
        let mut state = self.state.lock().await;
        if let Some(run) = state
            .test_runs
            .iter_mut()
            .find(|r| r.pipeline_id == pipeline_id)
        {
            run.status = status.as_str().to_string();
            if let Some(url) = web_url {
                run.web_url = Some(url.to_string());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CoprBuildStore for MemoryStore {
    async fn create(&self, new: NewCoprBuild) -> anyhow::Result<CoprBuild> {
        let mut state = self.state.lock().await;
        if state
            .copr_builds
            .iter()
            .any(|b| b.build_id == new.build_id && b.target == new.target)
        {
            anyhow::bail!("duplicate copr build: {}:{}", new.build_id, new.target);
        }
        let id = state.next_id();
        let build = CoprBuild {
            id,
            build_id: new.build_id,
            target: new.target,
            status: new.status,
            commit_sha: new.commit_sha,
            web_url: new.web_url,
            submitted_time: new.submitted_time,
            start_time: None,
            finished_time: None,
            trigger_id: new.trigger_id,
        };
        state.copr_builds.push(build.clone());
        Ok(build)
    }

    async fn get_by_build_target(
        &self,
        build_id: &str,
        target: &str,
    ) -> anyhow::Result<Option<CoprBuild>> {
        let state = self.state.lock().await;
        Ok(state
            .copr_builds
            .iter()
            .find(|b| b.build_id == build_id && b.target == target)
            .cloned())
    }

    async fn set_status(
        &self,
        build_id: &str,
        target: &str,
        status: RunStatus,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if let Some(build) = state
            .copr_builds
            .iter_mut()
            .find(|b| b.build_id == build_id && b.target == target)
        {
            build.status = status.as_str().to_string();
            match status {
                RunStatus::Running => build.start_time = Some(Utc::now()),
                s if s.is_terminal() => build.finished_time = Some(Utc::now()),
                _ => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl KojiBuildStore for MemoryStore {
    async fn create(&self, new: NewKojiBuild) -> anyhow::Result<KojiBuild> {
        let mut state = self.state.lock().await;
        if state.koji_builds.iter().any(|b| b.build_id == new.build_id) {
            anyhow::bail!("duplicate koji build: {}", new.build_id);
        }
        let id = state.next_id();
        let build = KojiBuild {
            id,
            build_id: new.build_id,
            target: new.target,
            status: new.status,
            commit_sha: new.commit_sha,
            web_url: new.web_url,
            build_logs_url: new.build_logs_url,
            submitted_time: new.submitted_time,
            start_time: None,
            finished_time: None,
            trigger_id: new.trigger_id,
        };
        state.koji_builds.push(build.clone());
        Ok(build)
    }

    async fn get_by_build_id(&self, build_id: &str) -> anyhow::Result<Option<KojiBuild>> {
        let state = self.state.lock().await;
        Ok(state
            .koji_builds
            .iter()
            .find(|b| b.build_id == build_id)
            .cloned())
    }

    async fn set_result(
        &self,
        build_id: &str,
        status: RunStatus,
        web_url: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if let Some(build) = state
            .koji_builds
            .iter_mut()
            .find(|b| b.build_id == build_id)
        {
            build.status = status.as_str().to_string();
            if let Some(url) = web_url {
                build.web_url = Some(url.to_string());
            }
            match status {
                RunStatus::Running => build.start_time = Some(Utc::now()),
                s if s.is_terminal() => build.finished_time = Some(Utc::now()),
                _ => {}
            }
        }
        Ok(())
    }

    async fn get_range(&self, first: i64, last: i64) -> anyhow::Result<Vec<KojiBuild>> {
        let state = self.state.lock().await;
        let mut builds: Vec<KojiBuild> = state.koji_builds.clone();
        builds.sort_by(|a, b| b.id.cmp(&a.id));
        let first = first.max(0) as usize;
        let count = (last - first as i64 + 1).max(0) as usize;
        Ok(builds.into_iter().skip(first).take(count).collect())
    }
}
