//! Koji (production) build handlers: submission on releases, state
//! ingestion on Koji callbacks.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;

use crate::events::{Event, KojiBuildEvent};
use crate::forge::CommitState;
use crate::jobs::{JobConfig, PackageConfig};
use crate::models::{NewKojiBuild, RunStatus, TriggerKey};
use crate::reporting::{build_check_name, StatusReporter};

use super::{JobHandler, TaskContext, TaskError, TaskResults};

fn koji_status(state: &str) -> RunStatus {
    match state {
        "BUILDING" => RunStatus::Running,
        "COMPLETE" => RunStatus::Passed,
        "FAILED" => RunStatus::Failed,
        "CANCELED" => RunStatus::Error,
        _ => RunStatus::Unknown,
    }
}

/// Submits Koji scratch builds when a release is published.
pub struct KojiBuildHandler {
    ctx: TaskContext,
    job_config: JobConfig,
    trigger_key: TriggerKey,
    commit_sha: String,
}

impl KojiBuildHandler {
    pub fn build(
        ctx: &TaskContext,
        event: &Event,
        job_config: &JobConfig,
        _package_config: &PackageConfig,
    ) -> Option<Box<dyn JobHandler>> {
        let trigger_key = event.trigger_key()?;
        let commit_sha = event.commit_sha()?.to_string();
        Some(Box::new(KojiBuildHandler {
            ctx: ctx.clone(),
            job_config: job_config.clone(),
            trigger_key,
            commit_sha,
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
impl JobHandler for KojiBuildHandler {
    fn name(&self) -> &'static str {
        "production_build"
    }

    async fn run(&mut self, _workdir: &Path) -> Result<TaskResults, TaskError> {
        let targets = self.targets();
        if targets.is_empty() {
            return Err(TaskError::permanent(anyhow::anyhow!(
                "no build targets configured"
            )));
        }

        let trigger = self
            .ctx
            .triggers
            .get_or_create(&self.trigger_key)
            .await
            .map_err(TaskError::transient)?;

        let reporter =
            StatusReporter::for_trigger(self.ctx.forge.clone(), &trigger, &self.commit_sha);

        let mut build_ids = Vec::new();
        for target in targets {
            let submission = self
                .ctx
                .koji
                .submit_build(
                    &trigger.namespace,
                    &trigger.repo_name,
                    &self.commit_sha,
                    &target,
                )
                .await
                .map_err(TaskError::transient)?;

            tracing::info!(build_id = %submission.build_id, target = %target, "Koji build submitted");

            let existing = self
                .ctx
                .koji_builds
                .get_by_build_id(&submission.build_id)
                .await
                .map_err(TaskError::transient)?;
            if existing.is_none() {
                self.ctx
                    .koji_builds
                    .create(NewKojiBuild {
                        build_id: submission.build_id.clone(),
                        target: target.clone(),
                        status: RunStatus::Queued.as_str().to_string(),
                        commit_sha: self.commit_sha.clone(),
                        web_url: Some(submission.web_url.clone()),
                        build_logs_url: None,
                        submitted_time: Some(Utc::now()),
                        trigger_id: trigger.id,
                    })
                    .await
                    .map_err(TaskError::transient)?;
            }

            reporter
                .report(
                    CommitState::Pending,
                    "Production build is queued",
                    &submission.web_url,
                    &build_check_name(&target),
                )
                .await
                .map_err(TaskError::transient)?;

            build_ids.push(submission.build_id);
        }

        Ok(TaskResults::ok_with("koji_build_ids", build_ids.join(",")))
    }
}

/// Ingests Koji build state callbacks and mirrors them to the forge.
pub struct KojiBuildReportHandler {
    ctx: TaskContext,
    event: KojiBuildEvent,
}

impl KojiBuildReportHandler {
    pub fn build(
        ctx: &TaskContext,
        event: &Event,
        _job_config: &JobConfig,
        _package_config: &PackageConfig,
    ) -> Option<Box<dyn JobHandler>> {
        let e = match event {
            Event::KojiBuildStart(e) | Event::KojiBuildEnd(e) => e.clone(),
            _ => return None,
        };
        Some(Box::new(KojiBuildReportHandler {
            ctx: ctx.clone(),
            event: e,
        }))
    }
}

#[async_trait]
impl JobHandler for KojiBuildReportHandler {
    fn name(&self) -> &'static str {
        "production_build_report"
    }

    async fn run(&mut self, _workdir: &Path) -> Result<TaskResults, TaskError> {
        let build = self
            .ctx
            .koji_builds
            .get_by_build_id(&self.event.build_id)
            .await
            .map_err(TaskError::transient)?;

        let Some(build) = build else {
            tracing::warn!(
                build_id = %self.event.build_id,
                "Koji callback for a build this service never recorded"
            );
            return Ok(TaskResults::ok());
        };

        let status = koji_status(&self.event.state);
        self.ctx
            .koji_builds
            .set_result(&self.event.build_id, status, self.event.web_url.as_deref())
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
                (CommitState::Pending, "Production build is in progress")
            }
            RunStatus::Passed => (CommitState::Success, "Production build succeeded"),
            RunStatus::Failed => (CommitState::Failure, "Production build failed"),
            RunStatus::Error | RunStatus::Unknown => {
                (CommitState::Error, "Production build ended unexpectedly")
            }
        };

        let url = self
            .event
            .web_url
            .clone()
            .or_else(|| build.web_url.clone())
            .unwrap_or_default();
        let reporter =
            StatusReporter::for_trigger(self.ctx.forge.clone(), &trigger, &build.commit_sha);
        reporter
            .report(state, description, &url, &build_check_name(&build.target))
            .await
            .map_err(TaskError::transient)?;

        Ok(TaskResults::ok_with("koji_build_id", self.event.build_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::super::testing::harness;
    use super::*;
    use crate::events::testdata::release_event;
    use crate::jobs::{JobType, TriggerKind};
    use crate::models::store::KojiBuildStore;

    fn release_config() -> JobConfig {
        JobConfig::new(JobType::ProductionBuild, TriggerKind::Release)
            .with_targets(&["f36"])
    }

    fn koji_event(build_id: &str, state: &str) -> Event {
        Event::KojiBuildEnd(KojiBuildEvent {
            build_id: build_id.to_string(),
            state: state.to_string(),
            web_url: Some(format!("https://koji.example.com/taskinfo?taskID={build_id}")),
            build_logs_url: None,
        })
    }

    #[tokio::test]
    async fn release_submission_records_build_and_reports_pending() {
        let h = harness();
        let jc = release_config();
        let pc = PackageConfig::new(vec![jc.clone()]);
        let mut handler =
            KojiBuildHandler::build(&h.ctx, &release_event("v1.0"), &jc, &pc).unwrap();

        let results = handler.run(Path::new("/tmp")).await.unwrap();
        assert!(results.success);
        let build_id = results.details.get("koji_build_ids").unwrap();

        let run = h.store.get_by_build_id(build_id).await.unwrap().unwrap();
        assert_eq!(run.status, "queued");
        assert_eq!(run.target, "f36");

        let reported = h.forge.reported();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].state, CommitState::Pending);
        assert_eq!(reported[0].context, "forgeci/rpm-build:f36");
    }

    #[tokio::test]
    async fn unknown_build_callback_is_not_an_error() {
        let h = harness();
        let jc = release_config();
        let pc = PackageConfig::new(vec![jc.clone()]);
        let event = koji_event("424242", "COMPLETE");
        let mut handler = KojiBuildReportHandler::build(&h.ctx, &event, &jc, &pc).unwrap();

        let results = handler.run(Path::new("/tmp")).await.unwrap();
        assert!(results.success);
        assert!(h.forge.reported().is_empty());
    }

    #[tokio::test]
    async fn complete_callback_marks_passed_and_reports_success() {
        let h = harness();
        let jc = release_config();
        let pc = PackageConfig::new(vec![jc.clone()]);

        let mut submit =
            KojiBuildHandler::build(&h.ctx, &release_event("v1.0"), &jc, &pc).unwrap();
        let results = submit.run(Path::new("/tmp")).await.unwrap();
        let build_id = results.details.get("koji_build_ids").unwrap().clone();

        let event = koji_event(&build_id, "COMPLETE");
        let mut report = KojiBuildReportHandler::build(&h.ctx, &event, &jc, &pc).unwrap();
        report.run(Path::new("/tmp")).await.unwrap();

        let run = h.store.get_by_build_id(&build_id).await.unwrap().unwrap();
        assert_eq!(run.status, "passed");

        let reported = h.forge.reported();
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[1].state, CommitState::Success);
    }

    #[tokio::test]
    async fn canceled_callback_reports_error() {
        let h = harness();
        let jc = release_config();
        let pc = PackageConfig::new(vec![jc.clone()]);

        let mut submit =
            KojiBuildHandler::build(&h.ctx, &release_event("v1.0"), &jc, &pc).unwrap();
        let results = submit.run(Path::new("/tmp")).await.unwrap();
        let build_id = results.details.get("koji_build_ids").unwrap().clone();

        let event = koji_event(&build_id, "CANCELED");
        let mut report = KojiBuildReportHandler::build(&h.ctx, &event, &jc, &pc).unwrap();
        report.run(Path::new("/tmp")).await.unwrap();

        let run = h.store.get_by_build_id(&build_id).await.unwrap().unwrap();
        assert_eq!(run.status, "error");
        assert_eq!(h.forge.reported()[1].state, CommitState::Error);
    }
}
