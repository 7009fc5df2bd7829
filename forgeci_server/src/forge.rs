//! Forge integration — webhook signature validation and commit statuses.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Commit status value understood by the forge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Pending => "pending",
            CommitState::Success => "success",
            CommitState::Failure => "failure",
            CommitState::Error => "error",
        }
    }
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client for the originating forge's status API.
///
/// Setting the same (sha, context) twice overwrites; calls are idempotent
/// from the caller's perspective.
#[async_trait]
pub trait ForgeClient: Send + Sync {
    async fn report_status(
        &self,
        namespace: &str,
        repo_name: &str,
        commit_sha: &str,
        state: CommitState,
        description: &str,
        url: &str,
        context: &str,
    ) -> anyhow::Result<()>;
}

/// Validate a GitHub webhook signature (X-Hub-Signature-256).
pub fn validate_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        tracing::warn!("Webhook secret not configured, skipping validation");
        return true;
    }

    let sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    let sig_bytes = match hex::decode(sig) {
        Ok(b) => b,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&sig_bytes).is_ok()
}

/// GitHub commit-status client.
pub struct GithubForge {
    token: String,
    client: reqwest::Client,
}

impl GithubForge {
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ForgeClient for GithubForge {
    async fn report_status(
        &self,
        namespace: &str,
        repo_name: &str,
        commit_sha: &str,
        state: CommitState,
        description: &str,
        url: &str,
        context: &str,
    ) -> anyhow::Result<()> {
        if self.token.is_empty() {
            tracing::debug!("Forge token not set, skipping status update");
            return Ok(());
        }

        let api_url =
            format!("https://api.github.com/repos/{namespace}/{repo_name}/statuses/{commit_sha}");
        let body = serde_json::json!({
            "state": state.as_str(),
            "description": description,
            "target_url": url,
            "context": context,
        });

        let resp = self
            .client
            .post(&api_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "forgeci")
            .json(&body)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("forge status update failed: {status} {text}");
        }

        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    //! Recording forge client for handler tests.

    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ReportedStatus {
        pub commit_sha: String,
        pub state: CommitState,
        pub description: String,
        pub url: String,
        pub context: String,
    }

    #[derive(Default)]
    pub struct MockForge {
        pub reported: Mutex<Vec<ReportedStatus>>,
        pub fail: bool,
    }

    impl MockForge {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn reported(&self) -> Vec<ReportedStatus> {
            self.reported.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ForgeClient for MockForge {
        async fn report_status(
            &self,
            _namespace: &str,
            _repo_name: &str,
            commit_sha: &str,
            state: CommitState,
            description: &str,
            url: &str,
            context: &str,
        ) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("forge unreachable");
            }
            self.reported.lock().unwrap().push(ReportedStatus {
                commit_sha: commit_sha.to_string(),
                state,
                description: description.to_string(),
                url: url.to_string(),
                context: context.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_skips_validation() {
        assert!(validate_signature("", b"payload", "sha256=whatever"));
    }

    #[test]
    fn valid_signature_accepted() {
        let secret = "s3cret";
        let payload = b"hello";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        let sig = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));
        assert!(validate_signature(secret, payload, &sig));
    }

    #[test]
    fn tampered_payload_rejected() {
        let secret = "s3cret";
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(b"hello");
        let sig = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));
        assert!(!validate_signature(secret, b"tampered", &sig));
    }

    #[test]
    fn garbage_signature_rejected() {
        assert!(!validate_signature("s3cret", b"hello", "not-hex"));
    }
}
