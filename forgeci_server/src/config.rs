//! Service configuration — loaded from environment variables.

use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Forge webhook secret for HMAC validation.
    pub webhook_secret: String,
    /// Forge API token for commit status updates.
    pub forge_token: String,
    /// Copr API base URL.
    pub copr_api_url: String,
    /// Copr project owner submissions run under.
    pub copr_owner: String,
    /// Koji hub gateway base URL.
    pub koji_api_url: String,
    /// Testing Farm API base URL.
    pub testing_farm_api_url: String,
    /// Testing Farm API token.
    pub testing_farm_token: String,
    /// Parent directory for per-task working directories.
    pub work_dir: PathBuf,
    /// Number of dispatcher worker tasks.
    pub workers: usize,
    /// Bound on the queued-task channel.
    pub queue_capacity: usize,
    /// Maximum delivery attempts per task (first run included).
    pub retry_max_attempts: u32,
    /// Base retry delay in seconds; doubles per attempt.
    pub retry_base_secs: u64,
    /// Cap on the retry delay in seconds.
    pub retry_max_secs: u64,
    /// Chroot targets used when a job config declares none.
    pub default_targets: Vec<String>,
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let webhook_secret = std::env::var("FORGECI_WEBHOOK_SECRET").unwrap_or_default();
        let forge_token = std::env::var("FORGECI_FORGE_TOKEN").unwrap_or_default();
        let copr_api_url = std::env::var("FORGECI_COPR_API_URL")
            .unwrap_or_else(|_| "https://copr.fedorainfracloud.org/api_3".to_string());
        let copr_owner = std::env::var("FORGECI_COPR_OWNER").unwrap_or_else(|_| "forgeci".to_string());
        let koji_api_url = std::env::var("FORGECI_KOJI_API_URL")
            .unwrap_or_else(|_| "https://koji.fedoraproject.org/kojihub".to_string());
        let testing_farm_api_url = std::env::var("FORGECI_TESTING_FARM_API_URL")
            .unwrap_or_else(|_| "https://api.dev.testing-farm.io/v0.1".to_string());
        let testing_farm_token = std::env::var("FORGECI_TESTING_FARM_TOKEN").unwrap_or_default();
        let work_dir = std::env::var("FORGECI_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("forgeci"));
        let default_targets = std::env::var("FORGECI_DEFAULT_TARGETS")
            .unwrap_or_else(|_| "fedora-rawhide-x86_64".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if webhook_secret.is_empty() {
            tracing::warn!("FORGECI_WEBHOOK_SECRET not set -- webhook signature validation disabled");
        }
        if forge_token.is_empty() {
            tracing::warn!("FORGECI_FORGE_TOKEN not set -- commit status updates will fail");
        }

        Self {
            webhook_secret,
            forge_token,
            copr_api_url,
            copr_owner,
            koji_api_url,
            testing_farm_api_url,
            testing_farm_token,
            work_dir,
            workers: env_parsed("FORGECI_WORKERS", 4),
            queue_capacity: env_parsed("FORGECI_QUEUE_CAPACITY", 1024),
            retry_max_attempts: env_parsed("FORGECI_RETRY_MAX_ATTEMPTS", 5),
            retry_base_secs: env_parsed("FORGECI_RETRY_BASE_SECS", 2),
            retry_max_secs: env_parsed("FORGECI_RETRY_MAX_SECS", 300),
            default_targets,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            webhook_secret: "test-secret".to_string(),
            forge_token: "test-token".to_string(),
            copr_api_url: "https://copr.example.com/api_3".to_string(),
            copr_owner: "forgeci".to_string(),
            koji_api_url: "https://koji.example.com".to_string(),
            testing_farm_api_url: "https://tf.example.com".to_string(),
            testing_farm_token: "tf-token".to_string(),
            work_dir: std::env::temp_dir(),
            workers: 2,
            queue_capacity: 16,
            retry_max_attempts: 3,
            retry_base_secs: 0,
            retry_max_secs: 1,
            default_targets: vec!["fedora-rawhide-x86_64".to_string()],
        }
    }
}
