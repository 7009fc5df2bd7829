//! Copr build callback parsing.
//!
//! Copr notifies once when a chroot build starts and once when it ends;
//! both carry the backend-assigned build id and the chroot name.

use super::{Event, EventParseError};

#[derive(Debug, Clone)]
pub struct CoprBuildEvent {
    pub build_id: String,
    pub chroot: String,
    /// Backend status word: "succeeded", "failed", "running", ...
    pub status: String,
}

pub fn parse_copr_event(payload: &serde_json::Value) -> Result<Event, EventParseError> {
    let topic = payload["topic"]
        .as_str()
        .ok_or(EventParseError::MissingField("topic"))?;

    let build_id = payload["build"]
        .as_i64()
        .map(|id| id.to_string())
        .or_else(|| payload["build"].as_str().map(str::to_string))
        .ok_or(EventParseError::MissingField("build"))?;
    let chroot = payload["chroot"]
        .as_str()
        .ok_or(EventParseError::MissingField("chroot"))?;
    let status = payload["status"].as_str().unwrap_or("unknown");

    let event = CoprBuildEvent {
        build_id,
        chroot: chroot.to_string(),
        status: status.to_string(),
    };

    match topic {
        "build.start" => Ok(Event::CoprBuildStart(event)),
        "build.end" => Ok(Event::CoprBuildEnd(event)),
        other => Err(EventParseError::UnsupportedKind(other.to_string())),
    }
}
