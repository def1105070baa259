use super::text::{char_prefix, coverage_case_summary};
use super::{log_unusable, prompts, TestDesignUseCase};
use crate::application::use_cases::structured_output::{
    parse_structured, recover_keyed_array, recover_number_field, StructuredOutput,
};
use crate::domain::coverage::{CoverageReport, RawCoverageReport};
use crate::domain::llm_config::CallProfile;
use crate::domain::pipeline::{CoverageAnalysis, ResponseState};
use crate::domain::test_case::TestCaseRecord;
use serde_json::Value;
use tracing::info;

const COVERED_KEY: &str = "covered_requirements";
const MISSING_KEY: &str = "missing_requirements";

impl TestDesignUseCase {
    /// Asks the oracle which parts of the document the test cases cover.
    /// Only a prefix of the document and the first cases are sent.
    pub async fn reconcile_coverage(
        &self,
        document_text: &str,
        test_cases: &[TestCaseRecord],
    ) -> CoverageAnalysis {
        let prefix = char_prefix(document_text, self.settings.coverage_prefix_chars);
        let summary = coverage_case_summary(test_cases, self.settings.summary_limit);
        let user = prompts::build_coverage_prompt(prefix, &summary);

        let reply = self
            .ask(
                CallProfile::CoverageReconciliation,
                prompts::COVERAGE_SYSTEM_PROMPT,
                &user,
                None,
            )
            .await;

        let raw = match reply.response {
            Ok(raw) => raw,
            Err(err) => {
                return CoverageAnalysis {
                    report: None,
                    state: ResponseState::CallFailed,
                    issues: Vec::new(),
                    error: Some(err.to_string()),
                    raw_response: String::new(),
                    run: Some(reply.run),
                };
            }
        };

        let parsed = parse_structured(&raw, Some(COVERED_KEY));
        let state = parsed.state();
        let raw_report = match parsed.output {
            StructuredOutput::Complete(Value::Object(map)) => {
                serde_json::from_value::<RawCoverageReport>(Value::Object(map))
                    .ok()
                    .map(|raw_report| (raw_report, false))
            }
            StructuredOutput::Partial(_) => {
                recovered_report(&raw).map(|raw_report| (raw_report, true))
            }
            _ => None,
        };

        let Some((raw_report, truncated)) = raw_report else {
            log_unusable(CallProfile::CoverageReconciliation, &raw);
            return CoverageAnalysis {
                report: None,
                state: ResponseState::Unrecoverable,
                issues: Vec::new(),
                error: Some("Coverage report could not be parsed from the response".to_string()),
                raw_response: raw,
                run: Some(reply.run),
            };
        };

        let (report, issues) = if truncated {
            CoverageReport::from_recovered(raw_report)
        } else {
            CoverageReport::from_raw(raw_report)
        };
        info!(
            total = report.total_requirements,
            covered = report.covered.len(),
            missing = report.missing.len(),
            percentage = report.coverage_percentage,
            state = ?state,
            "Coverage reconciliation finished"
        );

        CoverageAnalysis {
            report: Some(report),
            state,
            issues,
            error: None,
            raw_response: raw,
            run: Some(reply.run),
        }
    }
}

/// Salvages both lists from a cut-off report, each from its own key, along
/// with any totals stated before the cut.
fn recovered_report(raw: &str) -> Option<RawCoverageReport> {
    let covered = recover_keyed_array(raw, COVERED_KEY)
        .or_else(|| recover_keyed_array(raw, "covered"))
        .unwrap_or_default();
    let missing = recover_keyed_array(raw, MISSING_KEY)
        .or_else(|| recover_keyed_array(raw, "missing"))
        .unwrap_or_default();
    if covered.is_empty() && missing.is_empty() {
        return None;
    }
    Some(RawCoverageReport {
        total_requirements: recover_number_field(raw, "total_requirements"),
        covered_requirements: covered,
        missing_requirements: missing,
        coverage_percentage: recover_number_field(raw, "coverage_percentage"),
        summary: None,
    })
}
