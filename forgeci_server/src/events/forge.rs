//! Forge webhook payload parsing (GitHub push / pull_request / release).

use super::{Event, EventParseError};

#[derive(Debug, Clone)]
pub struct PullRequestEvent {
    pub pr_id: i64,
    pub namespace: String,
    pub repo_name: String,
    pub project_url: String,
    pub commit_sha: String,
    pub source_branch: String,
}

#[derive(Debug, Clone)]
pub struct PushEvent {
    pub namespace: String,
    pub repo_name: String,
    pub project_url: String,
    pub branch: String,
    pub commit_sha: String,
}

#[derive(Debug, Clone)]
pub struct ReleaseEvent {
    pub namespace: String,
    pub repo_name: String,
    pub project_url: String,
    pub tag_name: String,
    pub commit_sha: String,
}

/// Parses a GitHub webhook payload into an event.
///
/// Returns `Ok(None)` for event types and PR actions this service does not
/// react to; those are acknowledged and dropped. Payloads of a handled type
/// that are missing a required correlation field are rejected.
pub fn parse_github_event(
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<Option<Event>, EventParseError> {
    match event_type {
        "pull_request" => parse_pull_request(payload),
        "push" => parse_push(payload),
        "release" => parse_release(payload),
        _ => Ok(None),
    }
}

fn repo_coords(
    payload: &serde_json::Value,
) -> Result<(String, String, String), EventParseError> {
    let full_name = payload["repository"]["full_name"]
        .as_str()
        .ok_or(EventParseError::MissingField("repository.full_name"))?;
    let (namespace, repo_name) = full_name
        .split_once('/')
        .ok_or_else(|| EventParseError::Malformed(format!("repository name: {full_name}")))?;
    let project_url = payload["repository"]["html_url"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://github.com/{full_name}"));
    Ok((namespace.to_string(), repo_name.to_string(), project_url))
}

fn parse_pull_request(payload: &serde_json::Value) -> Result<Option<Event>, EventParseError> {
    let action = payload["action"].as_str().unwrap_or_default();
    if action != "opened" && action != "synchronize" && action != "reopened" {
        return Ok(None);
    }

    let (namespace, repo_name, project_url) = repo_coords(payload)?;
    let pr_id = payload["number"]
        .as_i64()
        .ok_or(EventParseError::MissingField("number"))?;
    let commit_sha = payload["pull_request"]["head"]["sha"]
        .as_str()
        .ok_or(EventParseError::MissingField("pull_request.head.sha"))?;
    let source_branch = payload["pull_request"]["head"]["ref"]
        .as_str()
        .ok_or(EventParseError::MissingField("pull_request.head.ref"))?;

    Ok(Some(Event::PullRequest(PullRequestEvent {
        pr_id,
        namespace,
        repo_name,
        project_url,
        commit_sha: commit_sha.to_string(),
        source_branch: source_branch.to_string(),
    })))
}

fn parse_push(payload: &serde_json::Value) -> Result<Option<Event>, EventParseError> {
    let (namespace, repo_name, project_url) = repo_coords(payload)?;
    let commit_sha = payload["after"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or(EventParseError::MissingField("after"))?;
    let branch = payload["ref"]
        .as_str()
        .and_then(|r| r.strip_prefix("refs/heads/"))
        .filter(|b| !b.is_empty())
        .ok_or(EventParseError::MissingField("ref"))?;

    Ok(Some(Event::Push(PushEvent {
        namespace,
        repo_name,
        project_url,
        branch: branch.to_string(),
        commit_sha: commit_sha.to_string(),
    })))
}

fn parse_release(payload: &serde_json::Value) -> Result<Option<Event>, EventParseError> {
    let action = payload["action"].as_str().unwrap_or_default();
    if action != "published" {
        return Ok(None);
    }

    let (namespace, repo_name, project_url) = repo_coords(payload)?;
    let tag_name = payload["release"]["tag_name"]
        .as_str()
        .ok_or(EventParseError::MissingField("release.tag_name"))?;
    let commit_sha = payload["release"]["target_commitish"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or(EventParseError::MissingField("release.target_commitish"))?;

    Ok(Some(Event::Release(ReleaseEvent {
        namespace,
        repo_name,
        project_url,
        tag_name: tag_name.to_string(),
        commit_sha: commit_sha.to_string(),
    })))
}
