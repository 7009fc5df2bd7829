//! Build/test backend clients (Copr, Testing Farm).
//!
//! Both backends are opaque external services: submissions return an
//! externally assigned id that later callbacks are correlated by.

use async_trait::async_trait;

/// Result of submitting a Copr build.
#[derive(Debug, Clone)]
pub struct BuildSubmission {
    pub build_id: String,
    pub web_url: String,
}

/// Result of submitting a Testing Farm request.
#[derive(Debug, Clone)]
pub struct TestSubmission {
    pub pipeline_id: String,
    pub web_url: String,
}

#[async_trait]
pub trait CoprClient: Send + Sync {
    /// Submits one build covering all requested chroot targets.
    async fn submit_build(
        &self,
        namespace: &str,
        repo_name: &str,
        commit_sha: &str,
        targets: &[String],
    ) -> anyhow::Result<BuildSubmission>;
}

#[async_trait]
pub trait TestingFarmClient: Send + Sync {
    /// Requests a test run against a finished build on one chroot.
    async fn submit_tests(
        &self,
        namespace: &str,
        repo_name: &str,
        commit_sha: &str,
        copr_build_id: &str,
        chroot: &str,
    ) -> anyhow::Result<TestSubmission>;
}

#[async_trait]
pub trait KojiClient: Send + Sync {
    /// Submits a production (scratch) build for one target.
    async fn submit_build(
        &self,
        namespace: &str,
        repo_name: &str,
        commit_sha: &str,
        target: &str,
    ) -> anyhow::Result<BuildSubmission>;
}

/// Copr HTTP API client.
pub struct CoprHttp {
    api_url: String,
    owner: String,
    client: reqwest::Client,
}

impl CoprHttp {
    pub fn new(api_url: String, owner: String) -> Self {
        Self {
            api_url,
            owner,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CoprClient for CoprHttp {
    async fn submit_build(
        &self,
        namespace: &str,
        repo_name: &str,
        commit_sha: &str,
        targets: &[String],
    ) -> anyhow::Result<BuildSubmission> {
        let body = serde_json::json!({
            "ownername": self.owner,
            "projectname": format!("{namespace}-{repo_name}"),
            "committish": commit_sha,
            "chroots": targets,
        });

        let resp = self
            .client
            .post(format!("{}/build/create", self.api_url))
            .json(&body)
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await?
            .error_for_status()?;

        let json: serde_json::Value = resp.json().await?;
        let build_id = json["id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("copr response missing build id"))?
            .to_string();
        let web_url = json["web_url"].as_str().unwrap_or_default().to_string();

        Ok(BuildSubmission { build_id, web_url })
    }
}

/// Koji hub XMLRPC-gateway client (REST facade).
pub struct KojiHttp {
    api_url: String,
    client: reqwest::Client,
}

impl KojiHttp {
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl KojiClient for KojiHttp {
    async fn submit_build(
        &self,
        namespace: &str,
        repo_name: &str,
        commit_sha: &str,
        target: &str,
    ) -> anyhow::Result<BuildSubmission> {
        let body = serde_json::json!({
            "source": format!("https://github.com/{namespace}/{repo_name}#{commit_sha}"),
            "target": target,
            "scratch": true,
        });

        let resp = self
            .client
            .post(format!("{}/build", self.api_url))
            .json(&body)
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await?
            .error_for_status()?;

        let json: serde_json::Value = resp.json().await?;
        let build_id = json["task_id"]
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("koji response missing task id"))?
            .to_string();
        let web_url = format!("{}/taskinfo?taskID={build_id}", self.api_url);

        Ok(BuildSubmission { build_id, web_url })
    }
}

/// Testing Farm HTTP API client.
pub struct TestingFarmHttp {
    api_url: String,
    api_token: String,
    client: reqwest::Client,
}

impl TestingFarmHttp {
    pub fn new(api_url: String, api_token: String) -> Self {
        Self {
            api_url,
            api_token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TestingFarmClient for TestingFarmHttp {
    async fn submit_tests(
        &self,
        namespace: &str,
        repo_name: &str,
        commit_sha: &str,
        copr_build_id: &str,
        chroot: &str,
    ) -> anyhow::Result<TestSubmission> {
        let body = serde_json::json!({
            "api_key": self.api_token,
            "test": {"fmf": {"url": format!("https://github.com/{namespace}/{repo_name}")}},
            "environments": [{
                "os": chroot,
                "artifacts": [{"type": "fedora-copr-build", "id": copr_build_id}],
            }],
            "ref": commit_sha,
        });

        let resp = self
            .client
            .post(format!("{}/requests", self.api_url))
            .json(&body)
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await?
            .error_for_status()?;

        let json: serde_json::Value = resp.json().await?;
        let pipeline_id = json["id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("testing farm response missing request id"))?
            .to_string();
        let web_url = format!("{}/requests/{pipeline_id}", self.api_url);

        Ok(TestSubmission { pipeline_id, web_url })
    }
}

#[cfg(test)]
pub mod testing {
    //! Canned backend clients for handler tests.

    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[derive(Default)]
    pub struct MockCopr {
        next_id: AtomicU64,
        calls: AtomicU64,
        pub fail: bool,
    }

    impl MockCopr {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        /// Number of submission attempts seen, failed ones included.
        pub fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CoprClient for MockCopr {
        async fn submit_build(
            &self,
            _namespace: &str,
            _repo_name: &str,
            _commit_sha: &str,
            _targets: &[String],
        ) -> anyhow::Result<BuildSubmission> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("copr unreachable");
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1000;
            Ok(BuildSubmission {
                build_id: id.to_string(),
                web_url: format!("https://copr.example.com/builds/{id}"),
            })
        }
    }

    #[derive(Default)]
    pub struct MockKoji {
        next_id: AtomicU64,
    }

    impl MockKoji {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl KojiClient for MockKoji {
        async fn submit_build(
            &self,
            _namespace: &str,
            _repo_name: &str,
            _commit_sha: &str,
            _target: &str,
        ) -> anyhow::Result<BuildSubmission> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 9000;
            Ok(BuildSubmission {
                build_id: id.to_string(),
                web_url: format!("https://koji.example.com/taskinfo?taskID={id}"),
            })
        }
    }

    #[derive(Default)]
    pub struct MockTestingFarm {
        next_id: AtomicU64,
    }

    impl MockTestingFarm {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl TestingFarmClient for MockTestingFarm {
        async fn submit_tests(
            &self,
            _namespace: &str,
            _repo_name: &str,
            _commit_sha: &str,
            _copr_build_id: &str,
            _chroot: &str,
        ) -> anyhow::Result<TestSubmission> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TestSubmission {
                pipeline_id: format!("tf-pipeline-{id}"),
                web_url: format!("https://tf.example.com/requests/tf-pipeline-{id}"),
            })
        }
    }
}
