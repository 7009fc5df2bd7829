//! Copr build handlers: submission on forge events, state ingestion on
//! Copr callbacks.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;

use crate::events::{CoprBuildEvent, Event};
use crate::jobs::{JobConfig, JobType, PackageConfig, TriggerKind};
use crate::models::koji_build::NewCoprBuild;
use crate::models::{NewTestRun, RunStatus, TriggerKey};
use crate::reporting::{build_check_name, test_check_name, StatusReporter};
use crate::forge::CommitState;

use super::{JobHandler, TaskContext, TaskError, TaskResults};

fn copr_status(word: &str) -> RunStatus {
    match word {
        "pending" | "waiting" | "importing" => RunStatus::Queued,
        "starting" | "running" => RunStatus::Running,
        "succeeded" => RunStatus::Passed,
        "failed" => RunStatus::Failed,
        "canceled" => RunStatus::Error,
        _ => RunStatus::Unknown,
    }
}

/// Submits a Copr build for a pull request or a pushed branch.
pub struct CoprBuildHandler {
    ctx: TaskContext,
    job_config: JobConfig,
    trigger_key: TriggerKey,
    commit_sha: String,
    event_trigger: TriggerKind,
    event_branch: Option<String>,
}

impl CoprBuildHandler {
    pub fn build(
        ctx: &TaskContext,
        event: &Event,
        job_config: &JobConfig,
        _package_config: &PackageConfig,
    ) -> Option<Box<dyn JobHandler>> {
        let trigger_key = event.trigger_key()?;
        let commit_sha = event.commit_sha()?.to_string();
        let event_trigger = event.kind().implied_trigger()?;
        Some(Box::new(CoprBuildHandler {
            ctx: ctx.clone(),
            job_config: job_config.clone(),
            trigger_key,
            commit_sha,
            event_trigger,
            event_branch: event.branch().map(str::to_string),
        }))
    }

    fn targets(&self) -> Vec<String> {
        if self.job_config.metadata.targets.is_empty() {
            self.ctx.config.default_targets.clone()
        } else {
            self.job_config.metadata.targets.clone()
        }
    }
}

#[async_trait]
impl JobHandler for CoprBuildHandler {
    fn name(&self) -> &'static str {
        "copr_build"
    }

    /// Re-validates trigger compatibility at per-handler granularity:
    /// several job configs may target this handler, and a commit-triggered
    /// one only applies when the pushed branch matches its declared branch.
    fn pre_check(&self) -> bool {
        if self.job_config.trigger != self.event_trigger {
            return false;
        }
        if self.event_trigger == TriggerKind::Commit {
            if let Some(declared) = &self.job_config.metadata.branch {
                return self.event_branch.as_deref() == Some(declared.as_str());
            }
        }
        true
    }

    async fn run(&mut self, _workdir: &Path) -> Result<TaskResults, TaskError> {
        let trigger = self
            .ctx
            .triggers
            .get_or_create(&self.trigger_key)
            .await
            .map_err(TaskError::transient)?;

        let targets = self.targets();
        if targets.is_empty() {
            return Err(TaskError::permanent(anyhow::anyhow!(
                "no build targets configured"
            )));
        }
        let submission = self
            .ctx
            .copr
            .submit_build(
                &trigger.namespace,
                &trigger.repo_name,
                &self.commit_sha,
                &targets,
            )
            .await
            .map_err(TaskError::transient)?;

        tracing::info!(
            build_id = %submission.build_id,
            targets = targets.len(),
            "Copr build submitted"
        );

        let reporter =
            StatusReporter::for_trigger(self.ctx.forge.clone(), &trigger, &self.commit_sha);
        for target in &targets {
            // Re-delivered submissions must not duplicate run records.
            let existing = self
                .ctx
                .copr_builds
                .get_by_build_target(&submission.build_id, target)
                .await
                .map_err(TaskError::transient)?;
            if existing.is_none() {
                self.ctx
                    .copr_builds
                    .create(NewCoprBuild {
                        build_id: submission.build_id.clone(),
                        target: target.clone(),
                        status: RunStatus::Queued.as_str().to_string(),
                        commit_sha: self.commit_sha.clone(),
                        web_url: Some(submission.web_url.clone()),
                        submitted_time: Some(Utc::now()),
                        trigger_id: trigger.id,
                    })
                    .await
                    .map_err(TaskError::transient)?;
            }

            reporter
                .report(
                    CommitState::Pending,
                    "RPM build is queued",
                    &submission.web_url,
                    &build_check_name(target),
                )
                .await
                .map_err(TaskError::transient)?;
        }

        Ok(TaskResults::ok_with("copr_build_id", submission.build_id))
    }
}

/// Ingests Copr build start/end callbacks and, on a successful end, fans
/// out configured tests against the finished build.
pub struct CoprBuildEndHandler {
    ctx: TaskContext,
    event: CoprBuildEvent,
    package_config: PackageConfig,
}

impl CoprBuildEndHandler {
    pub fn build(
        ctx: &TaskContext,
        event: &Event,
        _job_config: &JobConfig,
        package_config: &PackageConfig,
    ) -> Option<Box<dyn JobHandler>> {
        let e = match event {
            Event::CoprBuildStart(e) | Event::CoprBuildEnd(e) => e.clone(),
            _ => return None,
        };
        Some(Box::new(CoprBuildEndHandler {
            ctx: ctx.clone(),
            event: e,
            package_config: package_config.clone(),
        }))
    }

    async fn launch_tests(
        &self,
        trigger_id: i64,
        namespace: &str,
        repo_name: &str,
        commit_sha: &str,
        reporter: &StatusReporter,
    ) -> Result<(), TaskError> {
        let wants_tests = self
            .package_config
            .jobs
            .iter()
            .any(|j| j.job_type == JobType::Tests);
        if !wants_tests {
            return Ok(());
        }

        let submission = self
            .ctx
            .testing_farm
            .submit_tests(
                namespace,
                repo_name,
                commit_sha,
                &self.event.build_id,
                &self.event.chroot,
            )
            .await
            .map_err(TaskError::transient)?;

        tracing::info!(
            pipeline_id = %submission.pipeline_id,
            chroot = %self.event.chroot,
            "Testing Farm request submitted"
        );

        let existing = self
            .ctx
            .test_runs
            .get_by_pipeline_id(&submission.pipeline_id)
            .await
            .map_err(TaskError::transient)?;
        if existing.is_none() {
            self.ctx
                .test_runs
                .create(NewTestRun {
                    pipeline_id: submission.pipeline_id.clone(),
                    target: self.event.chroot.clone(),
                    status: RunStatus::Queued.as_str().to_string(),
                    commit_sha: commit_sha.to_string(),
                    web_url: Some(submission.web_url.clone()),
                    submitted_time: Some(Utc::now()),
                    trigger_id,
                })
                .await
                .map_err(TaskError::transient)?;
        }

        reporter
            .report(
                CommitState::Pending,
                "Tests are queued",
                &submission.web_url,
                &test_check_name(&self.event.chroot),
            )
            .await
            .map_err(TaskError::transient)?;

        Ok(())
    }
}

#[async_trait]
impl JobHandler for CoprBuildEndHandler {
    fn name(&self) -> &'static str {
        "copr_build_end"
    }

    async fn run(&mut self, _workdir: &Path) -> Result<TaskResults, TaskError> {
        let build = self
            .ctx
            .copr_builds
            .get_by_build_target(&self.event.build_id, &self.event.chroot)
            .await
            .map_err(TaskError::transient)?;

        let Some(build) = build else {
            tracing::warn!(
                build_id = %self.event.build_id,
                chroot = %self.event.chroot,
                "Copr callback for a build this service never recorded"
            );
            return Ok(TaskResults::ok());
        };

        let status = copr_status(&self.event.status);
        self.ctx
            .copr_builds
            .set_status(&self.event.build_id, &self.event.chroot, status)
            .await
            .map_err(TaskError::transient)?;

        let Some(trigger) = self
            .ctx
            .triggers
            .get(build.trigger_id)
            .await
            .map_err(TaskError::transient)?
        else {
            tracing::warn!(trigger_id = build.trigger_id, "Run has no trigger object");
            return Ok(TaskResults::ok());
        };

        let (state, description) = match status {
            RunStatus::Running | RunStatus::Queued => {
                (CommitState::Pending, "RPM build is in progress")
            }
            RunStatus::Passed => (CommitState::Success, "RPMs were built successfully"),
            RunStatus::Failed => (CommitState::Failure, "RPMs failed to build"),
            RunStatus::Error | RunStatus::Unknown => {
                (CommitState::Error, "RPM build ended unexpectedly")
            }
        };

        let url = build.web_url.clone().unwrap_or_default();
        let reporter =
            StatusReporter::for_trigger(self.ctx.forge.clone(), &trigger, &build.commit_sha);
        reporter
            .report(state, description, &url, &build_check_name(&build.target))
            .await
            .map_err(TaskError::transient)?;

        if status == RunStatus::Passed {
            self.launch_tests(
                trigger.id,
                &trigger.namespace,
                &trigger.repo_name,
                &build.commit_sha,
                &reporter,
            )
            .await?;
        }

        Ok(TaskResults::ok_with("copr_build_id", self.event.build_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::super::testing::harness;
    use super::*;
    use crate::events::testdata::{copr_end_event, pr_event, push_event};
    use crate::models::store::{CoprBuildStore, TestRunStore};

    fn build_config() -> JobConfig {
        JobConfig::new(JobType::CoprBuild, TriggerKind::PullRequest)
            .with_targets(&["fedora-rawhide-x86_64"])
    }

    #[test]
    fn push_to_configured_branch_passes_pre_check() {
        let h = harness();
        let jc = JobConfig::new(JobType::CoprBuild, TriggerKind::Commit).with_branch("build-branch");
        let pc = PackageConfig::new(vec![jc.clone()]);
        let handler =
            CoprBuildHandler::build(&h.ctx, &push_event("build-branch"), &jc, &pc).unwrap();
        assert!(handler.pre_check());
    }

    #[test]
    fn push_to_other_branch_fails_pre_check() {
        let h = harness();
        let jc = JobConfig::new(JobType::CoprBuild, TriggerKind::Commit).with_branch("build-branch");
        let pc = PackageConfig::new(vec![jc.clone()]);
        let handler = CoprBuildHandler::build(&h.ctx, &push_event("main"), &jc, &pc).unwrap();
        assert!(!handler.pre_check());
    }

    #[test]
    fn mismatched_trigger_fails_pre_check() {
        let h = harness();
        let jc = JobConfig::new(JobType::CoprBuild, TriggerKind::Commit);
        let pc = PackageConfig::new(vec![jc.clone()]);
        let handler = CoprBuildHandler::build(&h.ctx, &pr_event(), &jc, &pc).unwrap();
        assert!(!handler.pre_check());
    }

    #[tokio::test]
    async fn submission_records_runs_and_reports_pending() {
        let h = harness();
        let jc = build_config();
        let pc = PackageConfig::new(vec![jc.clone()]);
        let mut handler = CoprBuildHandler::build(&h.ctx, &pr_event(), &jc, &pc).unwrap();

        let results = handler.run(Path::new("/tmp")).await.unwrap();
        assert!(results.success);
        let build_id = results.details.get("copr_build_id").unwrap();

        let run = h
            .store
            .get_by_build_target(build_id, "fedora-rawhide-x86_64")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, "queued");

        let reported = h.forge.reported();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].context, "forgeci/rpm-build:fedora-rawhide-x86_64");
        assert_eq!(reported[0].state, CommitState::Pending);
    }

    #[tokio::test]
    async fn rerun_does_not_duplicate_run_records() {
        let h = harness();
        let jc = build_config();
        let pc = PackageConfig::new(vec![jc.clone()]);

        // A record for the build id the mock will assign already exists,
        // as after a retried task whose first attempt died mid-way.
        let trigger = h
            .ctx
            .triggers
            .get_or_create(&pr_event().trigger_key().unwrap())
            .await
            .unwrap();
        h.ctx
            .copr_builds
            .create(NewCoprBuild {
                build_id: "1000".to_string(),
                target: "fedora-rawhide-x86_64".to_string(),
                status: "queued".to_string(),
                commit_sha: "0011aabb".to_string(),
                web_url: None,
                submitted_time: None,
                trigger_id: trigger.id,
            })
            .await
            .unwrap();

        let mut handler = CoprBuildHandler::build(&h.ctx, &pr_event(), &jc, &pc).unwrap();
        let results = handler.run(Path::new("/tmp")).await.unwrap();
        assert!(results.success);
        assert_eq!(results.details.get("copr_build_id").unwrap(), "1000");
        assert_eq!(h.forge.reported().len(), 1);
    }

    #[tokio::test]
    async fn missing_targets_is_a_permanent_failure() {
        let mut h = harness();
        h.ctx.config.default_targets.clear();

        let jc = JobConfig::new(JobType::CoprBuild, TriggerKind::PullRequest);
        let pc = PackageConfig::new(vec![jc.clone()]);
        let mut handler = CoprBuildHandler::build(&h.ctx, &pr_event(), &jc, &pc).unwrap();

        let err = handler.run(Path::new("/tmp")).await.unwrap_err();
        assert!(matches!(err, TaskError::Permanent(_)));
    }

    #[tokio::test]
    async fn unknown_build_callback_is_not_an_error() {
        let h = harness();
        let jc = build_config();
        let pc = PackageConfig::new(vec![jc.clone()]);
        let event = copr_end_event("404404", "fedora-rawhide-x86_64", "succeeded");
        let mut handler = CoprBuildEndHandler::build(&h.ctx, &event, &jc, &pc).unwrap();

        let results = handler.run(Path::new("/tmp")).await.unwrap();
        assert!(results.success);
        assert!(h.forge.reported().is_empty());
        assert!(h
            .store
            .get_by_build_target("404404", "fedora-rawhide-x86_64")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn successful_end_reports_and_launches_configured_tests() {
        let h = harness();
        let jc = build_config();
        let pc = PackageConfig::new(vec![
            jc.clone(),
            JobConfig::new(JobType::Tests, TriggerKind::PullRequest),
        ]);

        // Submit first so the callback has a record to correlate with.
        let mut submit = CoprBuildHandler::build(&h.ctx, &pr_event(), &jc, &pc).unwrap();
        let results = submit.run(Path::new("/tmp")).await.unwrap();
        let build_id = results.details.get("copr_build_id").unwrap().clone();

        let event = copr_end_event(&build_id, "fedora-rawhide-x86_64", "succeeded");
        let mut end = CoprBuildEndHandler::build(&h.ctx, &event, &jc, &pc).unwrap();
        end.run(Path::new("/tmp")).await.unwrap();

        let run = h
            .store
            .get_by_build_target(&build_id, "fedora-rawhide-x86_64")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, "passed");

        // queued build + build success + tests queued
        let reported = h.forge.reported();
        assert_eq!(reported.len(), 3);
        assert_eq!(reported[1].state, CommitState::Success);
        assert!(reported[2].context.starts_with("forgeci/testing-farm:"));

        let tf_run = h
            .store
            .get_by_pipeline_id("tf-pipeline-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tf_run.status, "queued");
    }

    #[tokio::test]
    async fn failed_end_reports_failure_and_skips_tests() {
        let h = harness();
        let jc = build_config();
        let pc = PackageConfig::new(vec![
            jc.clone(),
            JobConfig::new(JobType::Tests, TriggerKind::PullRequest),
        ]);

        let mut submit = CoprBuildHandler::build(&h.ctx, &pr_event(), &jc, &pc).unwrap();
        let results = submit.run(Path::new("/tmp")).await.unwrap();
        let build_id = results.details.get("copr_build_id").unwrap().clone();

        let event = copr_end_event(&build_id, "fedora-rawhide-x86_64", "failed");
        let mut end = CoprBuildEndHandler::build(&h.ctx, &event, &jc, &pc).unwrap();
        end.run(Path::new("/tmp")).await.unwrap();

        let reported = h.forge.reported();
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[1].state, CommitState::Failure);
        assert!(h.store.get_by_pipeline_id("tf-pipeline-1").await.unwrap().is_none());
    }
}
