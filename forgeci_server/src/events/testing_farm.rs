//! Testing Farm result callback parsing.

use serde::Deserialize;

use super::{Event, EventParseError};

/// Overall result reported by Testing Farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestingFarmResult {
    Passed,
    Failed,
    Error,
    #[serde(other)]
    Unknown,
}

/// One named test within a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub result: String,
}

#[derive(Debug, Clone)]
pub struct TestingFarmResultsEvent {
    pub pipeline_id: String,
    pub result: TestingFarmResult,
    pub tests: Vec<TestResult>,
    pub log_url: String,
    pub copr_chroot: String,
    pub message: String,
}

pub fn parse_testing_farm_event(
    payload: &serde_json::Value,
) -> Result<Event, EventParseError> {
    let pipeline_id = payload["pipeline_id"]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or(EventParseError::MissingField("pipeline_id"))?;
    let result: TestingFarmResult = serde_json::from_value(payload["result"].clone())
        .map_err(|_| EventParseError::MissingField("result"))?;
    let tests: Vec<TestResult> = match payload.get("tests") {
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| EventParseError::Malformed(format!("tests: {e}")))?,
        None => vec![],
    };

    Ok(Event::TestingFarmResults(TestingFarmResultsEvent {
        pipeline_id: pipeline_id.to_string(),
        result,
        tests,
        log_url: payload["log_url"].as_str().unwrap_or_default().to_string(),
        copr_chroot: payload["copr_chroot"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        message: payload["message"].as_str().unwrap_or_default().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn parses_results_callback() {
        let payload = serde_json::json!({
            "pipeline_id": "614d240a-1e27-4758-ad6a-ed3d34281924",
            "result": "passed",
            "tests": [{"name": "/smoke", "result": "passed"}],
            "log_url": "https://tf.example.com/logs/614d240a",
            "copr_chroot": "fedora-rawhide-x86_64",
            "message": "ok",
        });
        let event = parse_testing_farm_event(&payload).unwrap();
        assert_eq!(event.kind(), EventKind::TestingFarmResults);
        let Event::TestingFarmResults(tf) = event else {
            unreachable!()
        };
        assert_eq!(tf.result, TestingFarmResult::Passed);
        assert_eq!(tf.tests.len(), 1);
    }

    #[test]
    fn unrecognized_result_maps_to_unknown() {
        let payload = serde_json::json!({
            "pipeline_id": "p1",
            "result": "infra-weirdness",
        });
        let Event::TestingFarmResults(tf) = parse_testing_farm_event(&payload).unwrap() else {
            unreachable!()
        };
        assert_eq!(tf.result, TestingFarmResult::Unknown);
    }

    #[test]
    fn rejects_missing_pipeline_id() {
        let payload = serde_json::json!({"result": "passed"});
        assert!(matches!(
            parse_testing_farm_event(&payload),
            Err(EventParseError::MissingField("pipeline_id"))
        ));
    }
}
