//! Handler registry — a static table mapping (event kind, job type) to
//! handler constructors.
//!
//! The table is built at compile time instead of through self-registering
//! annotations, so resolution order is deterministic and there is no hidden
//! global registration state.

use crate::events::{Event, EventKind};
use crate::jobs::{matching_jobs, JobConfig, JobType, PackageConfig};

use super::copr_build::{CoprBuildEndHandler, CoprBuildHandler};
use super::koji_build::{KojiBuildHandler, KojiBuildReportHandler};
use super::testing_farm::TestingFarmResultsHandler;
use super::{JobHandler, TaskContext};

type BuildFn = fn(&TaskContext, &Event, &JobConfig, &PackageConfig) -> Option<Box<dyn JobHandler>>;

pub struct HandlerEntry {
    pub task_name: &'static str,
    pub job_type: JobType,
    pub events: &'static [EventKind],
    pub build: BuildFn,
}

/// All handlers this service knows about, in resolution order.
pub static HANDLERS: &[HandlerEntry] = &[
    HandlerEntry {
        task_name: "copr_build",
        job_type: JobType::CoprBuild,
        events: &[EventKind::PullRequestSync, EventKind::Push],
        build: CoprBuildHandler::build,
    },
    HandlerEntry {
        task_name: "copr_build_end",
        job_type: JobType::CoprBuild,
        events: &[EventKind::CoprBuildStart, EventKind::CoprBuildEnd],
        build: CoprBuildEndHandler::build,
    },
    HandlerEntry {
        task_name: "production_build",
        job_type: JobType::ProductionBuild,
        events: &[EventKind::Release],
        build: KojiBuildHandler::build,
    },
    HandlerEntry {
        task_name: "production_build_report",
        job_type: JobType::ProductionBuild,
        events: &[EventKind::KojiBuildStart, EventKind::KojiBuildEnd],
        build: KojiBuildReportHandler::build,
    },
    HandlerEntry {
        task_name: "testing_farm_results",
        job_type: JobType::Tests,
        events: &[EventKind::TestingFarmResults],
        build: TestingFarmResultsHandler::build,
    },
];

/// One resolved (handler, job config) pair ready for dispatch.
pub struct ResolvedTask {
    pub entry: &'static HandlerEntry,
    pub job_config: JobConfig,
}

/// Resolves the handler set for an event: composes the job-config matcher
/// with the static registry. Pure; an event nothing reacts to resolves to
/// an empty set.
pub fn resolve(event: &Event, package_config: &PackageConfig) -> Vec<ResolvedTask> {
    let kind = event.kind();
    let mut resolved = Vec::new();
    for job_config in matching_jobs(event, package_config) {
        for entry in HANDLERS {
            if entry.job_type == job_config.job_type && entry.events.contains(&kind) {
                resolved.push(ResolvedTask {
                    entry,
                    job_config: job_config.clone(),
                });
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testdata::{pr_event, push_event, release_event, testing_farm_event};
    use crate::jobs::TriggerKind;

    fn config(jobs: Vec<JobConfig>) -> PackageConfig {
        PackageConfig::new(jobs)
    }

    #[test]
    fn event_without_matching_job_resolves_to_empty_set() {
        let pc = config(vec![JobConfig::new(
            JobType::CoprBuild,
            TriggerKind::Release,
        )]);
        assert!(resolve(&pr_event(), &pc).is_empty());
    }

    #[test]
    fn pr_sync_resolves_copr_build_handler() {
        let pc = config(vec![
            JobConfig::new(JobType::CoprBuild, TriggerKind::PullRequest),
            JobConfig::new(JobType::Tests, TriggerKind::PullRequest),
        ]);
        let resolved = resolve(&pr_event(), &pc);
        // The tests job has no handler reacting to PR sync; only the build
        // handler fires.
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entry.task_name, "copr_build");
    }

    #[test]
    fn testing_farm_callback_resolves_results_handler_only() {
        let pc = config(vec![
            JobConfig::new(JobType::CoprBuild, TriggerKind::PullRequest),
            JobConfig::new(JobType::Tests, TriggerKind::PullRequest),
        ]);
        let resolved = resolve(&testing_farm_event("p-1"), &pc);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entry.task_name, "testing_farm_results");
        assert_eq!(resolved[0].job_config.job_type, JobType::Tests);
    }

    #[test]
    fn push_event_honors_branch_filter_before_resolution() {
        let pc = config(vec![
            JobConfig::new(JobType::CoprBuild, TriggerKind::Commit).with_branch("build-branch"),
        ]);
        assert_eq!(resolve(&push_event("build-branch"), &pc).len(), 1);
        assert!(resolve(&push_event("main"), &pc).is_empty());
    }

    #[test]
    fn release_resolves_production_build() {
        let pc = config(vec![JobConfig::new(
            JobType::ProductionBuild,
            TriggerKind::Release,
        )]);
        let resolved = resolve(&release_event("v1.0"), &pc);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entry.task_name, "production_build");
    }

    #[test]
    fn duplicate_job_configs_resolve_one_task_each() {
        let pc = config(vec![
            JobConfig::new(JobType::CoprBuild, TriggerKind::PullRequest),
            JobConfig::new(JobType::CoprBuild, TriggerKind::PullRequest)
                .with_targets(&["fedora-33-x86_64"]),
        ]);
        let resolved = resolve(&pr_event(), &pc);
        assert_eq!(resolved.len(), 2);
    }
}
