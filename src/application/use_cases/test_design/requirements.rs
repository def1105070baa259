use super::{log_unusable, prompts, TestDesignUseCase};
use crate::application::use_cases::structured_output::parse_structured;
use crate::domain::llm_config::CallProfile;
use crate::domain::pipeline::{RequirementExtraction, ResponseState};
use crate::domain::requirement::decode_requirements;
use serde_json::Value;
use tracing::{info, warn};

const REQUIREMENTS_KEY: &str = "requirements";

/// Number of test cases to ask for. Counts under `floor` are not trusted and
/// are raised to at least `target_floor`.
pub fn target_count(effective: usize, floor: usize, target_floor: usize) -> usize {
    if effective < floor {
        target_floor.max(effective)
    } else {
        effective
    }
}

impl TestDesignUseCase {
    pub async fn extract_requirements(&self, document_text: &str) -> RequirementExtraction {
        let floor = self.settings.requirement_floor;
        let target_floor = self.settings.target_floor;
        let user = prompts::build_requirement_prompt(document_text, floor, target_floor);

        let reply = self
            .ask(
                CallProfile::RequirementExtraction,
                prompts::REQUIREMENT_SYSTEM_PROMPT,
                &user,
                None,
            )
            .await;

        let raw = match reply.response {
            Ok(raw) => raw,
            Err(err) => {
                return RequirementExtraction {
                    requirements: Vec::new(),
                    reported_total: None,
                    target_count: target_floor,
                    state: ResponseState::CallFailed,
                    issues: Vec::new(),
                    error: Some(err.to_string()),
                    raw_response: String::new(),
                    run: Some(reply.run),
                };
            }
        };

        let parsed = parse_structured(&raw, Some(REQUIREMENTS_KEY));
        let state = parsed.state();
        let reported_total = parsed
            .object()
            .and_then(|map| map.get("total_requirements"))
            .and_then(count_value);

        let (requirements, issues) = match parsed.items(REQUIREMENTS_KEY) {
            Some(items) => decode_requirements(items),
            None => (Vec::new(), Vec::new()),
        };

        let error = if !state.is_usable() {
            log_unusable(CallProfile::RequirementExtraction, &raw);
            Some("Requirement list could not be parsed from the response".to_string())
        } else {
            None
        };

        let effective = reported_total.unwrap_or(requirements.len());
        let target = if requirements.is_empty() {
            target_floor
        } else {
            target_count(effective, floor, target_floor)
        };

        if !issues.is_empty() {
            warn!(dropped = issues.len(), "Skipped malformed requirement records");
        }
        info!(
            requirements = requirements.len(),
            reported_total = ?reported_total,
            target,
            state = ?state,
            "Requirement extraction finished"
        );

        RequirementExtraction {
            requirements,
            reported_total,
            target_count: target,
            state,
            issues,
            error,
            raw_response: raw,
            run: Some(reply.run),
        }
    }
}

fn count_value(value: &Value) -> Option<usize> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .map(|n| n as usize)
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as usize)),
        Value::String(text) => text.trim().parse::<usize>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_count_floor() {
        assert_eq!(target_count(12, 30, 35), 35);
        assert_eq!(target_count(29, 30, 35), 35);
        assert_eq!(target_count(30, 30, 35), 30);
        assert_eq!(target_count(48, 30, 35), 48);
        assert_eq!(target_count(0, 30, 35), 35);
    }

    #[test]
    fn test_count_value_accepts_numeric_strings() {
        assert_eq!(count_value(&json!(42)), Some(42));
        assert_eq!(count_value(&json!("17")), Some(17));
        assert_eq!(count_value(&json!(3.0)), Some(3));
        assert_eq!(count_value(&json!(-1)), None);
        assert_eq!(count_value(&json!("many")), None);
    }
}
