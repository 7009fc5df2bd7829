//! Pipeline state models — trigger objects and run records.

pub mod koji_build;
pub mod memory;
pub mod pg;
pub mod project;
pub mod store;
pub mod test_run;
pub mod trigger;

pub use koji_build::{CoprBuild, KojiBuild, NewCoprBuild, NewKojiBuild};
pub use memory::MemoryStore;
pub use pg::PgStore;
pub use project::Project;
pub use store::{CoprBuildStore, KojiBuildStore, ProjectStore, TestRunStore, TriggerStore};
pub use test_run::{NewTestRun, TestRun};
pub use trigger::{TriggerKey, TriggerObject};

use serde::{Deserialize, Serialize};

/// Lifecycle status of a pipeline run or build record.
///
/// Stored as a varchar; callbacks overwrite it last-write-wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Passed,
    Failed,
    Error,
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
            RunStatus::Error => "error",
            RunStatus::Unknown => "unknown",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "queued" => RunStatus::Queued,
            "running" => RunStatus::Running,
            "passed" => RunStatus::Passed,
            "failed" => RunStatus::Failed,
            "error" => RunStatus::Error,
            _ => RunStatus::Unknown,
        }
    }

    /// True for statuses that no further callback is expected to change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Passed | RunStatus::Failed | RunStatus::Error)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for s in [
            RunStatus::Queued,
            RunStatus::Running,
            RunStatus::Passed,
            RunStatus::Failed,
            RunStatus::Error,
        ] {
            assert_eq!(RunStatus::from_str_lossy(s.as_str()), s);
        }
        assert_eq!(RunStatus::from_str_lossy("bogus"), RunStatus::Unknown);
    }

    #[test]
    fn terminal_statuses() {
        assert!(RunStatus::Passed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Error.is_terminal());
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }
}
