//! Job handler contract and shared task plumbing.
//!
//! A handler is one unit of work resolved from an inbound event: it runs as
//! its own asynchronous task, goes through
//! created → precondition-checked → {skipped | running} → cleaned-up, and
//! reports its outcome through `TaskResults` / `TaskError`.

pub mod copr_build;
pub mod koji_build;
pub mod registry;
pub mod testing_farm;

pub use registry::{resolve, HandlerEntry, ResolvedTask, HANDLERS};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::backends::{CoprClient, KojiClient, TestingFarmClient};
use crate::config::ServiceConfig;
use crate::forge::ForgeClient;
use crate::models::store::{
    CoprBuildStore, KojiBuildStore, ProjectStore, TestRunStore, TriggerStore,
};

/// Everything a handler needs at run time. Cheap to clone; one clone per
/// dispatched task, nothing shared mutably between tasks.
#[derive(Clone)]
pub struct TaskContext {
    pub config: ServiceConfig,
    pub projects: Arc<dyn ProjectStore>,
    pub triggers: Arc<dyn TriggerStore>,
    pub copr_builds: Arc<dyn CoprBuildStore>,
    pub koji_builds: Arc<dyn KojiBuildStore>,
    pub test_runs: Arc<dyn TestRunStore>,
    pub forge: Arc<dyn ForgeClient>,
    pub copr: Arc<dyn CoprClient>,
    pub koji: Arc<dyn KojiClient>,
    pub testing_farm: Arc<dyn TestingFarmClient>,
}

/// Outcome of a completed handler run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResults {
    pub success: bool,
    pub details: BTreeMap<String, String>,
}

impl TaskResults {
    pub fn ok() -> Self {
        TaskResults {
            success: true,
            details: BTreeMap::new(),
        }
    }

    pub fn ok_with(key: &str, value: impl Into<String>) -> Self {
        let mut details = BTreeMap::new();
        details.insert(key.to_string(), value.into());
        TaskResults {
            success: true,
            details,
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        let mut details = BTreeMap::new();
        details.insert("error".to_string(), msg.into());
        TaskResults {
            success: false,
            details,
        }
    }
}

/// Failure taxonomy driving the retry decision at the dispatch boundary.
#[derive(Debug, Error)]
pub enum TaskError {
    /// External service unavailable or timed out; eligible for bounded
    /// retry with backoff.
    #[error("transient failure: {0}")]
    Transient(anyhow::Error),

    /// Malformed input or unrecoverable state; never retried.
    #[error("permanent failure: {0}")]
    Permanent(anyhow::Error),
}

impl TaskError {
    pub fn transient(err: impl Into<anyhow::Error>) -> Self {
        TaskError::Transient(err.into())
    }

    pub fn permanent(err: impl Into<anyhow::Error>) -> Self {
        TaskError::Permanent(err.into())
    }
}

/// One job-type-specific unit of work.
#[async_trait]
pub trait JobHandler: Send {
    /// Task name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Handler-specific precondition on top of what the resolver already
    /// guaranteed. Returning false skips the handler without side effects.
    fn pre_check(&self) -> bool {
        true
    }

    /// Runs inside `workdir`, an isolated short-lived directory removed by
    /// the dispatcher afterwards whether or not the run succeeded.
    async fn run(&mut self, workdir: &Path) -> Result<TaskResults, TaskError>;
}

/// Recursively empties and keeps a task working directory's parent intact.
///
/// Symlinks are unlinked, never followed: a dangling symlink or a symlink
/// to a directory outside the workdir must not break cleanup or delete
/// anything it points at.
pub fn clean_workdir(dir: &Path) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let meta = std::fs::symlink_metadata(&path)?;
        if meta.file_type().is_symlink() || meta.is_file() {
            std::fs::remove_file(&path)?;
        } else {
            std::fs::remove_dir_all(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub mod testing {
    //! Shared context construction for handler tests.

    use std::sync::Arc;

    use super::TaskContext;
    use crate::backends::testing::{MockCopr, MockKoji, MockTestingFarm};
    use crate::config::ServiceConfig;
    use crate::forge::testing::MockForge;
    use crate::models::MemoryStore;

    pub struct TestHarness {
        pub ctx: TaskContext,
        pub store: Arc<MemoryStore>,
        pub forge: Arc<MockForge>,
    }

    pub fn harness() -> TestHarness {
        let store = Arc::new(MemoryStore::new());
        let forge = Arc::new(MockForge::new());
        let ctx = TaskContext {
            config: ServiceConfig::for_tests(),
            projects: store.clone(),
            triggers: store.clone(),
            copr_builds: store.clone(),
            koji_builds: store.clone(),
            test_runs: store.clone(),
            forge: forge.clone(),
            copr: Arc::new(MockCopr::new()),
            koji: Arc::new(MockKoji::new()),
            testing_farm: Arc::new(MockTestingFarm::new()),
        };
        TestHarness { ctx, store, forge }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_handles_symlinks_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();

        std::fs::create_dir(root.join("a")).unwrap();
        std::fs::write(root.join("b"), "a").unwrap();
        std::os::unix::fs::symlink(root.join("b"), root.join("c")).unwrap();
        std::os::unix::fs::symlink(root.join("a"), root.join("d")).unwrap();
        std::os::unix::fs::symlink("nope", root.join("e")).unwrap();
        std::os::unix::fs::symlink("nopez/", root.join("f")).unwrap();
        std::fs::write(root.join(".g"), "g").unwrap();
        std::os::unix::fs::symlink(root.join(".g"), root.join(".h")).unwrap();

        clean_workdir(root).unwrap();

        assert_eq!(std::fs::read_dir(root).unwrap().count(), 0);
    }

    #[test]
    fn cleanup_does_not_follow_symlinked_directory() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("keep"), "important").unwrap();

        let tmp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("link")).unwrap();

        clean_workdir(tmp.path()).unwrap();

        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
        assert!(outside.path().join("keep").exists());
    }

    #[test]
    fn cleanup_of_empty_dir_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        clean_workdir(tmp.path()).unwrap();
    }
}
