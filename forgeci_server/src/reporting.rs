//! Status reporting — translates pipeline outcomes into forge-visible
//! commit statuses with deterministic check names.

use std::sync::Arc;

use crate::forge::{CommitState, ForgeClient};
use crate::models::TriggerObject;

/// Check name for a test run against the given chroot.
pub fn test_check_name(chroot: &str) -> String {
    format!("forgeci/testing-farm:{chroot}")
}

/// Check name for an RPM build against the given target.
pub fn build_check_name(target: &str) -> String {
    format!("forgeci/rpm-build:{target}")
}

/// Posts one commit status per call. Repeated calls with the same check
/// name overwrite the previous state on the forge side.
pub struct StatusReporter {
    forge: Arc<dyn ForgeClient>,
    namespace: String,
    repo_name: String,
    commit_sha: String,
}

impl StatusReporter {
    pub fn new(forge: Arc<dyn ForgeClient>, namespace: &str, repo_name: &str, commit_sha: &str) -> Self {
        Self {
            forge,
            namespace: namespace.to_string(),
            repo_name: repo_name.to_string(),
            commit_sha: commit_sha.to_string(),
        }
    }

    /// Builds a reporter addressing the commit a trigger object's run
    /// was recorded against.
    pub fn for_trigger(forge: Arc<dyn ForgeClient>, trigger: &TriggerObject, commit_sha: &str) -> Self {
        Self::new(forge, &trigger.namespace, &trigger.repo_name, commit_sha)
    }

    /// Reports one status. A forge API failure propagates to the caller,
    /// where the dispatch layer treats it as transient and retries; the
    /// persisted run state is unaffected either way.
    pub async fn report(
        &self,
        state: CommitState,
        description: &str,
        url: &str,
        check_name: &str,
    ) -> anyhow::Result<()> {
        tracing::debug!(
            sha = %self.commit_sha,
            state = %state,
            check = check_name,
            "Reporting commit status"
        );
        self.forge
            .report_status(
                &self.namespace,
                &self.repo_name,
                &self.commit_sha,
                state,
                description,
                url,
                check_name,
            )
            .await?;
        crate::metrics::status_reported(state.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::testing::MockForge;

    #[test]
    fn check_names_are_deterministic() {
        assert_eq!(
            test_check_name("fedora-rawhide-x86_64"),
            "forgeci/testing-farm:fedora-rawhide-x86_64"
        );
        assert_eq!(
            build_check_name("fedora-33-aarch64"),
            "forgeci/rpm-build:fedora-33-aarch64"
        );
    }

    #[tokio::test]
    async fn report_passes_through_to_forge() {
        let forge = Arc::new(MockForge::new());
        let reporter = StatusReporter::new(forge.clone(), "ns", "repo", "abc123");
        reporter
            .report(CommitState::Success, "ok", "https://x", "forgeci/testing-farm:f")
            .await
            .unwrap();

        let reported = forge.reported();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].commit_sha, "abc123");
        assert_eq!(reported[0].state, CommitState::Success);
    }

    #[tokio::test]
    async fn forge_failure_propagates() {
        let forge = Arc::new(MockForge::failing());
        let reporter = StatusReporter::new(forge, "ns", "repo", "abc123");
        assert!(reporter
            .report(CommitState::Success, "ok", "https://x", "c")
            .await
            .is_err());
    }
}
