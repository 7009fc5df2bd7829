//! Job configurations declared by a repository, and the matching rules
//! that select which of them apply to an inbound event.

use serde::{Deserialize, Serialize};

use crate::events::Event;

/// The action a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    CoprBuild,
    Tests,
    ProductionBuild,
    ProposeDownstream,
}

/// The event class allowed to invoke a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    PullRequest,
    Commit,
    Release,
}

/// Per-job metadata: branch filter for commit triggers, chroot targets
/// for build/test jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(rename = "job")]
    pub job_type: JobType,
    pub trigger: TriggerKind,
    #[serde(default)]
    pub metadata: JobMetadata,
}

impl JobConfig {
    pub fn new(job_type: JobType, trigger: TriggerKind) -> Self {
        JobConfig {
            job_type,
            trigger,
            metadata: JobMetadata::default(),
        }
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.metadata.branch = Some(branch.to_string());
        self
    }

    pub fn with_targets(mut self, targets: &[&str]) -> Self {
        self.metadata.targets = targets.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// The repository's declared job configurations, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageConfig {
    pub jobs: Vec<JobConfig>,
}

impl PackageConfig {
    pub fn new(jobs: Vec<JobConfig>) -> Self {
        PackageConfig { jobs }
    }
}

/// Returns the job configurations applicable to the event, preserving
/// declaration order.
///
/// Forge-originated events imply a trigger kind and filter on it; for
/// commit-triggered configs the pushed branch must additionally equal the
/// declared branch (no declared branch matches any). Backend callbacks
/// imply no trigger kind, so every config passes through here and the
/// handler registry's (event kind, job type) table does the narrowing.
/// No match is an empty result, not an error.
pub fn matching_jobs<'a>(event: &Event, package_config: &'a PackageConfig) -> Vec<&'a JobConfig> {
    let implied = match event.kind().implied_trigger() {
        Some(t) => t,
        None => return package_config.jobs.iter().collect(),
    };

    package_config
        .jobs
        .iter()
        .filter(|job| job.trigger == implied)
        .filter(|job| match (implied, &job.metadata.branch) {
            (TriggerKind::Commit, Some(declared)) => event.branch() == Some(declared.as_str()),
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::testdata::{pr_event, push_event, testing_farm_event};

    #[test]
    fn no_matching_trigger_yields_empty() {
        let config = PackageConfig::new(vec![JobConfig::new(
            JobType::CoprBuild,
            TriggerKind::Release,
        )]);
        assert!(matching_jobs(&pr_event(), &config).is_empty());
    }

    #[test]
    fn pull_request_event_matches_pull_request_jobs() {
        let config = PackageConfig::new(vec![
            JobConfig::new(JobType::CoprBuild, TriggerKind::PullRequest),
            JobConfig::new(JobType::Tests, TriggerKind::PullRequest),
            JobConfig::new(JobType::CoprBuild, TriggerKind::Commit),
        ]);
        let matched = matching_jobs(&pr_event(), &config);
        assert_eq!(matched.len(), 2);
        // Declaration order preserved
        assert_eq!(matched[0].job_type, JobType::CoprBuild);
        assert_eq!(matched[1].job_type, JobType::Tests);
    }

    #[test]
    fn commit_job_filters_on_declared_branch() {
        let config = PackageConfig::new(vec![JobConfig::new(
            JobType::CoprBuild,
            TriggerKind::Commit,
        )
        .with_branch("build-branch")]);

        assert_eq!(matching_jobs(&push_event("build-branch"), &config).len(), 1);
        assert!(matching_jobs(&push_event("main"), &config).is_empty());
    }

    #[test]
    fn commit_job_without_declared_branch_matches_any() {
        let config = PackageConfig::new(vec![JobConfig::new(
            JobType::CoprBuild,
            TriggerKind::Commit,
        )]);
        assert_eq!(matching_jobs(&push_event("whatever"), &config).len(), 1);
    }

    #[test]
    fn backend_callback_passes_all_jobs_through() {
        let config = PackageConfig::new(vec![
            JobConfig::new(JobType::CoprBuild, TriggerKind::PullRequest),
            JobConfig::new(JobType::Tests, TriggerKind::PullRequest),
        ]);
        let matched = matching_jobs(&testing_farm_event("pipeline-1"), &config);
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn package_config_from_json() {
        let config: PackageConfig = serde_json::from_value(serde_json::json!({
            "jobs": [
                {"job": "copr_build", "trigger": "pull_request",
                 "metadata": {"targets": ["fedora-rawhide-x86_64"]}},
                {"job": "tests", "trigger": "pull_request"},
            ]
        }))
        .unwrap();
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.jobs[0].metadata.targets, ["fedora-rawhide-x86_64"]);
        assert_eq!(config.jobs[1].metadata.branch, None);
    }
}
