//! Koji build state-change callback parsing.

use super::{Event, EventParseError};

#[derive(Debug, Clone)]
pub struct KojiBuildEvent {
    pub build_id: String,
    /// Koji state word: "BUILDING", "COMPLETE", "FAILED", "CANCELED".
    pub state: String,
    pub web_url: Option<String>,
    pub build_logs_url: Option<String>,
}

pub fn parse_koji_event(payload: &serde_json::Value) -> Result<Event, EventParseError> {
    let build_id = payload["build_id"]
        .as_i64()
        .map(|id| id.to_string())
        .or_else(|| payload["build_id"].as_str().map(str::to_string))
        .ok_or(EventParseError::MissingField("build_id"))?;
    let state = payload["state"]
        .as_str()
        .ok_or(EventParseError::MissingField("state"))?;

    let event = KojiBuildEvent {
        build_id,
        state: state.to_string(),
        web_url: payload["web_url"].as_str().map(str::to_string),
        build_logs_url: payload["logs_url"].as_str().map(str::to_string),
    };

    if state == "BUILDING" {
        Ok(Event::KojiBuildStart(event))
    } else {
        Ok(Event::KojiBuildEnd(event))
    }
}
