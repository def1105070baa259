use super::text::requirement_preview;
use super::{log_unusable, prompts, TestDesignUseCase};
use crate::application::use_cases::structured_output::parse_structured;
use crate::domain::generation_options::GenerationOptions;
use crate::domain::llm_config::CallProfile;
use crate::domain::pipeline::{RequirementExtraction, ResponseState, TestCaseSynthesis};
use crate::domain::test_case::decode_test_cases;
use tracing::{info, warn};

const TEST_CASES_KEY: &str = "test_cases";

impl TestDesignUseCase {
    /// Generates the test-case set. A degraded extraction (no requirements)
    /// still runs, with the oracle told to enumerate requirements itself.
    pub async fn synthesize_test_cases(
        &self,
        document_text: &str,
        extraction: &RequirementExtraction,
        options: &GenerationOptions,
    ) -> TestCaseSynthesis {
        let target = extraction.target_count;
        let preview = if extraction.is_degraded() {
            None
        } else {
            Some(requirement_preview(
                &extraction.requirements,
                self.settings.requirement_preview,
            ))
        };
        let summary =
            prompts::requirement_summary(target, preview.as_deref(), self.settings.target_floor);
        let user = prompts::build_synthesis_prompt(&prompts::SynthesisPrompt {
            framework: self.framework(),
            document_text,
            requirement_summary: &summary,
            target_count: target,
            options,
        });

        let reply = self
            .ask(
                CallProfile::TestCaseSynthesis,
                prompts::SYNTHESIS_SYSTEM_PROMPT,
                &user,
                None,
            )
            .await;

        let raw = match reply.response {
            Ok(raw) => raw,
            Err(err) => {
                return TestCaseSynthesis {
                    test_cases: Vec::new(),
                    target_count: target,
                    state: ResponseState::CallFailed,
                    issues: Vec::new(),
                    error: Some(err.to_string()),
                    raw_response: String::new(),
                    run: Some(reply.run),
                };
            }
        };

        let parsed = parse_structured(&raw, Some(TEST_CASES_KEY));
        let state = parsed.state();
        let (test_cases, issues) = match parsed.items(TEST_CASES_KEY) {
            Some(items) => decode_test_cases(items),
            None => (Vec::new(), Vec::new()),
        };

        let error = if !state.is_usable() {
            log_unusable(CallProfile::TestCaseSynthesis, &raw);
            Some("Test cases could not be parsed from the response".to_string())
        } else if test_cases.is_empty() {
            Some("The response contained no usable test cases".to_string())
        } else {
            None
        };

        if !issues.is_empty() {
            warn!(dropped = issues.len(), "Skipped malformed test case records");
        }
        if state.is_usable() && test_cases.len() != target {
            info!(
                requested = target,
                received = test_cases.len(),
                "Test case count differs from target"
            );
        }
        info!(test_cases = test_cases.len(), state = ?state, "Test case synthesis finished");

        TestCaseSynthesis {
            test_cases,
            target_count: target,
            state,
            issues,
            error,
            raw_response: raw,
            run: Some(reply.run),
        }
    }
}
