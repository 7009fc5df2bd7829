//! Typed representation of every inbound event kind.
//!
//! Each webhook payload is normalized into exactly one `Event`, carrying
//! the correlation fields (commit SHA, PR id, branch, external build or
//! pipeline id) the dispatch core needs. Events are immutable once built.

pub mod copr;
pub mod forge;
pub mod koji;
pub mod testing_farm;

pub use copr::CoprBuildEvent;
pub use forge::{PullRequestEvent, PushEvent, ReleaseEvent};
pub use koji::KojiBuildEvent;
pub use testing_farm::{TestResult, TestingFarmResult, TestingFarmResultsEvent};

use thiserror::Error;

use crate::jobs::TriggerKind;
use crate::models::TriggerKey;

/// Payload rejected before dispatch.
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unsupported event kind: {0}")]
    UnsupportedKind(String),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PullRequestSync,
    Push,
    Release,
    CoprBuildStart,
    CoprBuildEnd,
    KojiBuildStart,
    KojiBuildEnd,
    TestingFarmResults,
}

impl EventKind {
    /// The trigger kind a forge-originated event implies for job-config
    /// matching. Backend callbacks imply none; they correlate with stored
    /// runs by external id instead.
    pub fn implied_trigger(&self) -> Option<TriggerKind> {
        match self {
            EventKind::PullRequestSync => Some(TriggerKind::PullRequest),
            EventKind::Push => Some(TriggerKind::Commit),
            EventKind::Release => Some(TriggerKind::Release),
            EventKind::CoprBuildStart
            | EventKind::CoprBuildEnd
            | EventKind::KojiBuildStart
            | EventKind::KojiBuildEnd
            | EventKind::TestingFarmResults => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PullRequestSync => "pull_request_sync",
            EventKind::Push => "push",
            EventKind::Release => "release",
            EventKind::CoprBuildStart => "copr_build_start",
            EventKind::CoprBuildEnd => "copr_build_end",
            EventKind::KojiBuildStart => "koji_build_start",
            EventKind::KojiBuildEnd => "koji_build_end",
            EventKind::TestingFarmResults => "testing_farm_results",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound event, produced once per accepted payload.
#[derive(Debug, Clone)]
pub enum Event {
    PullRequest(PullRequestEvent),
    Push(PushEvent),
    Release(ReleaseEvent),
    CoprBuildStart(CoprBuildEvent),
    CoprBuildEnd(CoprBuildEvent),
    KojiBuildStart(KojiBuildEvent),
    KojiBuildEnd(KojiBuildEvent),
    TestingFarmResults(TestingFarmResultsEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PullRequest(_) => EventKind::PullRequestSync,
            Event::Push(_) => EventKind::Push,
            Event::Release(_) => EventKind::Release,
            Event::CoprBuildStart(_) => EventKind::CoprBuildStart,
            Event::CoprBuildEnd(_) => EventKind::CoprBuildEnd,
            Event::KojiBuildStart(_) => EventKind::KojiBuildStart,
            Event::KojiBuildEnd(_) => EventKind::KojiBuildEnd,
            Event::TestingFarmResults(_) => EventKind::TestingFarmResults,
        }
    }

    pub fn commit_sha(&self) -> Option<&str> {
        match self {
            Event::PullRequest(e) => Some(&e.commit_sha),
            Event::Push(e) => Some(&e.commit_sha),
            Event::Release(e) => Some(&e.commit_sha),
            _ => None,
        }
    }

    pub fn pr_id(&self) -> Option<i64> {
        match self {
            Event::PullRequest(e) => Some(e.pr_id),
            _ => None,
        }
    }

    pub fn branch(&self) -> Option<&str> {
        match self {
            Event::Push(e) => Some(&e.branch),
            _ => None,
        }
    }

    /// External build/pipeline id, for backend callbacks.
    pub fn external_id(&self) -> Option<&str> {
        match self {
            Event::CoprBuildStart(e) | Event::CoprBuildEnd(e) => Some(&e.build_id),
            Event::KojiBuildStart(e) | Event::KojiBuildEnd(e) => Some(&e.build_id),
            Event::TestingFarmResults(e) => Some(&e.pipeline_id),
            _ => None,
        }
    }

    /// The trigger object key a forge-originated event anchors runs to.
    pub fn trigger_key(&self) -> Option<TriggerKey> {
        match self {
            Event::PullRequest(e) => Some(TriggerKey::PullRequest {
                namespace: e.namespace.clone(),
                repo_name: e.repo_name.clone(),
                project_url: e.project_url.clone(),
                pr_id: e.pr_id,
            }),
            Event::Push(e) => Some(TriggerKey::GitBranch {
                namespace: e.namespace.clone(),
                repo_name: e.repo_name.clone(),
                project_url: e.project_url.clone(),
                branch_name: e.branch.clone(),
            }),
            Event::Release(e) => Some(TriggerKey::Release {
                namespace: e.namespace.clone(),
                repo_name: e.repo_name.clone(),
                project_url: e.project_url.clone(),
                release_tag: e.tag_name.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
pub mod testdata {
    //! Canned events shared by unit tests across modules.

    use super::*;

    pub fn pr_event() -> Event {
        Event::PullRequest(PullRequestEvent {
            pr_id: 342,
            namespace: "example-org".to_string(),
            repo_name: "hello-world".to_string(),
            project_url: "https://github.com/example-org/hello-world".to_string(),
            commit_sha: "0011aabb".to_string(),
            source_branch: "feature".to_string(),
        })
    }

    pub fn push_event(branch: &str) -> Event {
        Event::Push(PushEvent {
            namespace: "example-org".to_string(),
            repo_name: "hello-world".to_string(),
            project_url: "https://github.com/example-org/hello-world".to_string(),
            branch: branch.to_string(),
            commit_sha: "ccdd2233".to_string(),
        })
    }

    pub fn release_event(tag: &str) -> Event {
        Event::Release(ReleaseEvent {
            namespace: "example-org".to_string(),
            repo_name: "hello-world".to_string(),
            project_url: "https://github.com/example-org/hello-world".to_string(),
            tag_name: tag.to_string(),
            commit_sha: "eeff4455".to_string(),
        })
    }

    pub fn testing_farm_event(pipeline_id: &str) -> Event {
        Event::TestingFarmResults(TestingFarmResultsEvent {
            pipeline_id: pipeline_id.to_string(),
            result: TestingFarmResult::Passed,
            tests: vec![],
            log_url: "https://tf.example.com/logs/1".to_string(),
            copr_chroot: "fedora-rawhide-x86_64".to_string(),
            message: "all tests passed".to_string(),
        })
    }

    pub fn copr_end_event(build_id: &str, chroot: &str, status: &str) -> Event {
        Event::CoprBuildEnd(CoprBuildEvent {
            build_id: build_id.to_string(),
            chroot: chroot.to_string(),
            status: status.to_string(),
        })
    }
}
