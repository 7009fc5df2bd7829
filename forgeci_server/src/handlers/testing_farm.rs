//! Testing Farm result ingestion.

use std::path::Path;

use async_trait::async_trait;

use crate::events::{Event, TestingFarmResult, TestingFarmResultsEvent};
use crate::forge::CommitState;
use crate::jobs::{JobConfig, PackageConfig};
use crate::models::RunStatus;
use crate::reporting::{test_check_name, StatusReporter};

use super::{JobHandler, TaskContext, TaskError, TaskResults};

const GIT_CLONE_ERROR_PREFIX: &str = "Command '['git', 'clone'";
const GIT_CLONE_ERROR_SUFFIX: &str = "failed with exit code 128";
const CLUSTER_ISSUE_URL: &str = "https://pagure.io/centos-infra/issue/85";
const INSTALLABILITY_TEST: &str = "/install/copr-build";

/// Forge-facing interpretation of one results callback.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Interpretation {
    state: CommitState,
    description: String,
    url: String,
}

/// Maps a raw results callback to a commit status, special-casing the two
/// shapes that would otherwise mislead users: the synthetic
/// installability-only run, and a git-clone infrastructure failure inside
/// the Testing Farm cluster. Anything else surfaces the callback message
/// verbatim. The overrides are exclusive, install-only wins.
fn interpret(event: &TestingFarmResultsEvent) -> Interpretation {
    let (state, passed) = match event.result {
        TestingFarmResult::Passed => (CommitState::Success, true),
        TestingFarmResult::Error => (CommitState::Error, false),
        _ => (CommitState::Failure, false),
    };

    let (description, url) = if event.tests.len() == 1
        && event.tests[0].name == INSTALLABILITY_TEST
    {
        let description = if passed {
            "Installation passed"
        } else {
            "Installation failed"
        };
        (description.to_string(), event.log_url.clone())
    } else if event.message.starts_with(GIT_CLONE_ERROR_PREFIX)
        && event.message.ends_with(GIT_CLONE_ERROR_SUFFIX)
    {
        (
            "Problem with Testing-Farm cluster".to_string(),
            CLUSTER_ISSUE_URL.to_string(),
        )
    } else {
        (event.message.clone(), event.log_url.clone())
    };

    Interpretation {
        state,
        description,
        url,
    }
}

/// Records the final state of a Testing Farm pipeline and mirrors it to
/// the forge.
pub struct TestingFarmResultsHandler {
    ctx: TaskContext,
    event: TestingFarmResultsEvent,
}

impl TestingFarmResultsHandler {
    pub fn build(
        ctx: &TaskContext,
        event: &Event,
        _job_config: &JobConfig,
        _package_config: &PackageConfig,
    ) -> Option<Box<dyn JobHandler>> {
        let Event::TestingFarmResults(e) = event else {
            return None;
        };
        Some(Box::new(TestingFarmResultsHandler {
            ctx: ctx.clone(),
            event: e.clone(),
        }))
    }
}

#[async_trait]
impl JobHandler for TestingFarmResultsHandler {
    fn name(&self) -> &'static str {
        "testing_farm_results"
    }

    async fn run(&mut self, _workdir: &Path) -> Result<TaskResults, TaskError> {
        let run = self
            .ctx
            .test_runs
            .get_by_pipeline_id(&self.event.pipeline_id)
            .await
            .map_err(TaskError::transient)?;

        let Some(run) = run else {
            tracing::warn!(
                pipeline_id = %self.event.pipeline_id,
                "Results callback for a pipeline this service never submitted"
            );
            return Ok(TaskResults::ok());
        };

        let status = match self.event.result {
            TestingFarmResult::Passed => RunStatus::Passed,
            TestingFarmResult::Error => RunStatus::Error,
            _ => RunStatus::Failed,
        };
        let log_url = Some(self.event.log_url.as_str()).filter(|u| !u.is_empty());
        self.ctx
            .test_runs
            .set_result(&self.event.pipeline_id, status, log_url)
            .await
            .map_err(TaskError::transient)?;

        let Some(trigger) = self
            .ctx
            .triggers
            .get(run.trigger_id)
            .await
            .map_err(TaskError::transient)?
        else {
            tracing::warn!(trigger_id = run.trigger_id, "Run has no trigger object");
            return Ok(TaskResults::ok());
        };

        let chroot = if self.event.copr_chroot.is_empty() {
            run.target.clone()
        } else {
            self.event.copr_chroot.clone()
        };
        let interp = interpret(&self.event);

        StatusReporter::for_trigger(self.ctx.forge.clone(), &trigger, &run.commit_sha)
            .report(
                interp.state,
                &interp.description,
                &interp.url,
                &test_check_name(&chroot),
            )
            .await
            .map_err(TaskError::transient)?;

        Ok(TaskResults::ok_with(
            "pipeline_id",
            self.event.pipeline_id.clone(),
        ))
    }
}
