use crate::domain::coverage::CoverageReport;
use crate::domain::oracle_run::OracleRun;
use crate::domain::record_issue::RecordIssue;
use crate::domain::requirement::Requirement;
use crate::domain::test_case::{ClassifiedTestCase, TestCaseRecord};
use crate::domain::ui_coverage::{ScreenCoverage, UiCoverageSummary};
use serde::{Deserialize, Serialize};

/// How much of an oracle response made it into typed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseState {
    Complete,
    /// Truncated or decorated output; only self-contained items were kept.
    Partial,
    Unrecoverable,
    /// The call itself failed, so there is no response text.
    CallFailed,
}

impl ResponseState {
    pub fn is_usable(&self) -> bool {
        matches!(self, ResponseState::Complete | ResponseState::Partial)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementExtraction {
    pub requirements: Vec<Requirement>,
    /// `total_requirements` as the oracle reported it.
    pub reported_total: Option<usize>,
    /// Count handed to synthesis, after the floor is applied.
    pub target_count: usize,
    pub state: ResponseState,
    pub issues: Vec<RecordIssue>,
    pub error: Option<String>,
    pub raw_response: String,
    pub run: Option<OracleRun>,
}

impl RequirementExtraction {
    /// Synthesis runs without a reference list when nothing was extracted.
    pub fn is_degraded(&self) -> bool {
        self.requirements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseSynthesis {
    pub test_cases: Vec<TestCaseRecord>,
    /// What the oracle was asked for; the actual count may differ.
    pub target_count: usize,
    pub state: ResponseState,
    pub issues: Vec<RecordIssue>,
    pub error: Option<String>,
    pub raw_response: String,
    pub run: Option<OracleRun>,
}

impl TestCaseSynthesis {
    pub fn classified(&self) -> Vec<ClassifiedTestCase<'_>> {
        self.test_cases.iter().map(ClassifiedTestCase::from).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAnalysis {
    pub report: Option<CoverageReport>,
    pub state: ResponseState,
    pub issues: Vec<RecordIssue>,
    pub error: Option<String>,
    pub raw_response: String,
    pub run: Option<OracleRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiCoverageAnalysis {
    pub screens: Vec<ScreenCoverage>,
    pub summary: UiCoverageSummary,
}

impl UiCoverageAnalysis {
    /// Screens that failed are kept for display but left out of the totals.
    pub fn from_screens(screens: Vec<ScreenCoverage>) -> Self {
        let summary = UiCoverageSummary::merge(
            screens
                .iter()
                .filter(|screen| screen.error.is_none())
                .map(|screen| screen.summary),
        );
        Self { screens, summary }
    }
}

/// Latest stage run that produced nothing usable. The results stored before
/// it are left in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: String,
    pub state: ResponseState,
    pub error: String,
    pub raw_response: String,
}

/// Ratio at or above which the test-case set is shown as one case per requirement.
pub const ONE_TO_ONE_THRESHOLD: f64 = 95.0;

/// Everything one session has produced so far. Each stage replaces its own
/// slot wholesale; nothing is merged. A run with no usable output replaces
/// nothing and is recorded in `last_failure` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineContext {
    pub session_id: String,
    pub document_text: String,
    pub source_files: Vec<String>,
    pub requirements: Option<RequirementExtraction>,
    pub test_cases: Option<TestCaseSynthesis>,
    pub coverage: Option<CoverageAnalysis>,
    pub ui_analyses: Option<UiCoverageAnalysis>,
    pub generated_at: Option<i64>,
    #[serde(default)]
    pub last_failure: Option<StageFailure>,
}

impl PipelineContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            document_text: String::new(),
            source_files: Vec::new(),
            requirements: None,
            test_cases: None,
            coverage: None,
            ui_analyses: None,
            generated_at: None,
            last_failure: None,
        }
    }

    pub fn with_document(mut self, text: impl Into<String>, source_files: Vec<String>) -> Self {
        self.apply_document(text.into(), source_files);
        self
    }

    /// A new document invalidates every result derived from the old one.
    pub fn apply_document(&mut self, text: String, source_files: Vec<String>) {
        self.document_text = text;
        self.source_files = source_files;
        self.requirements = None;
        self.test_cases = None;
        self.coverage = None;
        self.ui_analyses = None;
        self.generated_at = None;
        self.last_failure = None;
    }

    pub fn apply_requirements(&mut self, extraction: RequirementExtraction) {
        self.requirements = Some(extraction);
    }

    /// Coverage and UI analyses were computed against the old set, so they go
    /// too. An empty synthesis is not stored; returns whether it was.
    pub fn apply_test_cases(&mut self, synthesis: TestCaseSynthesis) -> bool {
        if synthesis.test_cases.is_empty() {
            self.last_failure = Some(StageFailure {
                stage: "test_case_synthesis".to_string(),
                state: synthesis.state,
                error: synthesis
                    .error
                    .unwrap_or_else(|| "No test cases were generated".to_string()),
                raw_response: synthesis.raw_response,
            });
            return false;
        }
        self.test_cases = Some(synthesis);
        self.coverage = None;
        self.ui_analyses = None;
        self.generated_at = Some(chrono::Utc::now().timestamp_millis());
        self.last_failure = None;
        true
    }

    pub fn apply_coverage(&mut self, analysis: CoverageAnalysis) -> bool {
        if analysis.report.is_none() {
            self.last_failure = Some(StageFailure {
                stage: "coverage".to_string(),
                state: analysis.state,
                error: analysis
                    .error
                    .unwrap_or_else(|| "No coverage report was produced".to_string()),
                raw_response: analysis.raw_response,
            });
            return false;
        }
        self.coverage = Some(analysis);
        self.last_failure = None;
        true
    }

    /// A batch where every screen failed is not stored.
    pub fn apply_ui_analyses(&mut self, analysis: UiCoverageAnalysis) -> bool {
        let all_failed = !analysis.screens.is_empty()
            && analysis.screens.iter().all(|screen| screen.error.is_some());
        if all_failed {
            let error = analysis
                .screens
                .iter()
                .filter_map(|screen| {
                    screen
                        .error
                        .as_ref()
                        .map(|error| format!("{}: {}", screen.screen_name, error))
                })
                .collect::<Vec<_>>()
                .join("; ");
            self.last_failure = Some(StageFailure {
                stage: "ui_coverage".to_string(),
                state: ResponseState::CallFailed,
                error,
                raw_response: String::new(),
            });
            return false;
        }
        self.ui_analyses = Some(analysis);
        self.last_failure = None;
        true
    }

    pub fn has_document(&self) -> bool {
        !self.document_text.trim().is_empty()
    }

    pub fn test_case_records(&self) -> &[TestCaseRecord] {
        self.test_cases
            .as_ref()
            .map(|synthesis| synthesis.test_cases.as_slice())
            .unwrap_or(&[])
    }

    pub fn requirement_list(&self) -> &[Requirement] {
        self.requirements
            .as_ref()
            .map(|extraction| extraction.requirements.as_slice())
            .unwrap_or(&[])
    }

    /// Test cases per requirement, as a percentage. `None` without requirements.
    pub fn mapping_ratio(&self) -> Option<f64> {
        let requirements = self.requirement_list().len();
        if requirements == 0 {
            return None;
        }
        Some(self.test_case_records().len() as f64 / requirements as f64 * 100.0)
    }

    pub fn is_one_to_one(&self) -> bool {
        self.mapping_ratio()
            .map(|ratio| ratio >= ONE_TO_ONE_THRESHOLD)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coverage::RawCoverageReport;
    use crate::domain::priority::Priority;
    use crate::domain::requirement::RequirementType;
    use crate::domain::test_case::fixtures::test_case_json;

    fn requirement(id: &str) -> Requirement {
        Requirement {
            id: id.to_string(),
            requirement_type: RequirementType::Workflow,
            module: "Login".to_string(),
            title: "Sign in".to_string(),
            description: "Sign in".to_string(),
            priority: Priority::High,
            testable: true,
        }
    }

    fn synthesis(count: usize) -> TestCaseSynthesis {
        let test_cases = (0..count)
            .map(|i| {
                serde_json::from_value(test_case_json(&format!("TC_{:03}", i), "Login - Workflow"))
                    .unwrap()
            })
            .collect();
        TestCaseSynthesis {
            test_cases,
            target_count: count,
            state: ResponseState::Complete,
            issues: Vec::new(),
            error: None,
            raw_response: String::new(),
            run: None,
        }
    }

    fn extraction(count: usize) -> RequirementExtraction {
        RequirementExtraction {
            requirements: (1..=count).map(|i| requirement(&format!("REQ-{:03}", i))).collect(),
            reported_total: Some(count),
            target_count: count,
            state: ResponseState::Complete,
            issues: Vec::new(),
            error: None,
            raw_response: String::new(),
            run: None,
        }
    }

    fn coverage() -> CoverageAnalysis {
        let (report, issues) = CoverageReport::from_raw(RawCoverageReport::default());
        CoverageAnalysis {
            report: Some(report),
            state: ResponseState::Complete,
            issues,
            error: None,
            raw_response: "{}".to_string(),
            run: None,
        }
    }

    #[test]
    fn test_new_test_cases_clear_derived_analyses() {
        let mut ctx = PipelineContext::new("s1").with_document("doc", vec!["a.txt".to_string()]);
        ctx.apply_test_cases(synthesis(2));
        assert!(ctx.apply_coverage(coverage()));
        assert!(ctx.apply_ui_analyses(UiCoverageAnalysis::from_screens(Vec::new())));

        ctx.apply_test_cases(synthesis(3));
        assert_eq!(ctx.test_case_records().len(), 3);
        assert!(ctx.coverage.is_none());
        assert!(ctx.ui_analyses.is_none());
    }

    #[test]
    fn test_unusable_runs_keep_stored_results() {
        let mut ctx = PipelineContext::new("s1").with_document("doc", Vec::new());
        ctx.apply_test_cases(synthesis(2));
        ctx.apply_coverage(coverage());

        let failed = TestCaseSynthesis {
            state: ResponseState::CallFailed,
            error: Some("LLM service unavailable".to_string()),
            ..synthesis(0)
        };
        assert!(!ctx.apply_test_cases(failed));
        assert_eq!(ctx.test_case_records().len(), 2);
        assert!(ctx.coverage.is_some());
        let failure = ctx.last_failure.clone().unwrap();
        assert_eq!(failure.stage, "test_case_synthesis");
        assert_eq!(failure.state, ResponseState::CallFailed);

        let prose = CoverageAnalysis {
            report: None,
            state: ResponseState::Unrecoverable,
            issues: Vec::new(),
            error: None,
            raw_response: "prose".to_string(),
            run: None,
        };
        assert!(!ctx.apply_coverage(prose));
        assert!(ctx.coverage.as_ref().unwrap().report.is_some());
        assert_eq!(ctx.last_failure.as_ref().unwrap().raw_response, "prose");

        assert!(ctx.apply_coverage(coverage()));
        assert!(ctx.last_failure.is_none());
    }

    #[test]
    fn test_all_failed_screens_keep_previous_analysis() {
        let mut ctx = PipelineContext::new("s1");
        ctx.apply_ui_analyses(UiCoverageAnalysis::from_screens(Vec::new()));
        let failed = ScreenCoverage {
            screen_name: "Login".to_string(),
            screen_type: "unknown".to_string(),
            elements: Vec::new(),
            mappings: Vec::new(),
            reported_coverage: None,
            notes: String::new(),
            summary: UiCoverageSummary::default(),
            error: Some("timeout".to_string()),
        };
        assert!(!ctx.apply_ui_analyses(UiCoverageAnalysis::from_screens(vec![failed])));
        assert!(ctx.ui_analyses.as_ref().unwrap().screens.is_empty());
        assert_eq!(ctx.last_failure.as_ref().unwrap().error, "Login: timeout");
    }

    #[test]
    fn test_new_document_resets_everything() {
        let mut ctx = PipelineContext::new("s1").with_document("doc", Vec::new());
        ctx.apply_requirements(extraction(2));
        ctx.apply_test_cases(synthesis(2));
        ctx.apply_document("other".to_string(), Vec::new());
        assert!(ctx.requirements.is_none());
        assert!(ctx.test_case_records().is_empty());
    }

    #[test]
    fn test_mapping_ratio() {
        let mut ctx = PipelineContext::new("s1");
        assert_eq!(ctx.mapping_ratio(), None);
        ctx.apply_requirements(extraction(20));
        ctx.apply_test_cases(synthesis(19));
        assert_eq!(ctx.mapping_ratio(), Some(95.0));
        assert!(ctx.is_one_to_one());
        ctx.apply_test_cases(synthesis(10));
        assert!(!ctx.is_one_to_one());
    }
}
