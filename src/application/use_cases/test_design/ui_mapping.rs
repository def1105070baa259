use super::text::{element_summary, mapping_case_summary};
use super::{log_unusable, prompts, TestDesignUseCase};
use crate::application::use_cases::structured_output::parse_structured;
use crate::domain::coverage::CoverageLevel;
use crate::domain::lenient::value_to_text;
use crate::domain::llm_config::CallProfile;
use crate::domain::pipeline::UiCoverageAnalysis;
use crate::domain::record_issue::decode_serde;
use crate::domain::test_case::TestCaseRecord;
use crate::domain::ui_coverage::{ElementMapping, ScreenCoverage, UiCoverageSummary, UiElement};
use crate::infrastructure::llm_clients::ImageInput;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

const ELEMENTS_KEY: &str = "elements";
const MAPPINGS_KEY: &str = "mappings";
const UNKNOWN_SCREEN_TYPE: &str = "unknown";

#[derive(Debug, Clone)]
pub struct ScreenshotInput {
    pub screen_name: String,
    pub image: ImageInput,
}

struct ExtractedElements {
    screen_type: String,
    elements: Vec<UiElement>,
}

struct MappedElements {
    mappings: Vec<ElementMapping>,
    reported_coverage: Option<f64>,
    notes: String,
}

impl TestDesignUseCase {
    /// Step A: reads the controls off one screenshot.
    async fn extract_elements(
        &self,
        image: &ImageInput,
    ) -> std::result::Result<ExtractedElements, String> {
        let reply = self
            .ask(
                CallProfile::ElementExtraction,
                prompts::ELEMENT_SYSTEM_PROMPT,
                prompts::ELEMENT_EXTRACTION_PROMPT,
                Some(image),
            )
            .await;
        let raw = reply.response.map_err(|err| err.to_string())?;

        let parsed = parse_structured(&raw, Some(ELEMENTS_KEY));
        if !parsed.state().is_usable() {
            log_unusable(CallProfile::ElementExtraction, &raw);
            return Err("UI elements could not be parsed from the response".to_string());
        }

        let screen_type = parsed
            .object()
            .and_then(|map| map.get("screen_type"))
            .and_then(value_to_text)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_SCREEN_TYPE.to_string());
        let (elements, issues) = match parsed.items(ELEMENTS_KEY) {
            Some(items) => decode_serde::<UiElement>(items),
            None => (Vec::new(), Vec::new()),
        };
        if !issues.is_empty() {
            warn!(dropped = issues.len(), "Skipped malformed UI elements");
        }

        Ok(ExtractedElements {
            screen_type,
            elements,
        })
    }

    /// Step B: matches the extracted controls against the test-case set.
    async fn map_elements(
        &self,
        screen_name: &str,
        elements: &[UiElement],
        test_cases: &[TestCaseRecord],
    ) -> std::result::Result<MappedElements, String> {
        let cases = mapping_case_summary(
            test_cases,
            self.settings.summary_limit,
            self.settings.description_preview_chars,
        );
        let user = prompts::build_mapping_prompt(screen_name, &element_summary(elements), &cases);

        let reply = self
            .ask(
                CallProfile::ElementMapping,
                prompts::MAPPING_SYSTEM_PROMPT,
                &user,
                None,
            )
            .await;
        let raw = reply.response.map_err(|err| err.to_string())?;

        let parsed = parse_structured(&raw, Some(MAPPINGS_KEY));
        if !parsed.state().is_usable() {
            log_unusable(CallProfile::ElementMapping, &raw);
            return Err("Element mappings could not be parsed from the response".to_string());
        }

        let reported_coverage = parsed
            .object()
            .and_then(|map| map.get("overall_coverage"))
            .and_then(number_value)
            .map(|value| value.clamp(0.0, 100.0));
        let notes = parsed
            .object()
            .and_then(|map| map.get("summary"))
            .and_then(value_to_text)
            .unwrap_or_default();
        let (mappings, issues) = match parsed.items(MAPPINGS_KEY) {
            Some(items) => decode_serde::<ElementMapping>(items),
            None => (Vec::new(), Vec::new()),
        };
        if !issues.is_empty() {
            warn!(dropped = issues.len(), "Skipped malformed element mappings");
        }

        Ok(MappedElements {
            mappings,
            reported_coverage,
            notes,
        })
    }

    /// Both steps for one screenshot. Failures are recorded on the result.
    pub async fn analyze_screen(
        &self,
        screenshot: &ScreenshotInput,
        test_cases: &[TestCaseRecord],
    ) -> ScreenCoverage {
        let mut screen = ScreenCoverage {
            screen_name: screenshot.screen_name.clone(),
            screen_type: UNKNOWN_SCREEN_TYPE.to_string(),
            elements: Vec::new(),
            mappings: Vec::new(),
            reported_coverage: None,
            notes: String::new(),
            summary: UiCoverageSummary::default(),
            error: None,
        };

        let extracted = match self.extract_elements(&screenshot.image).await {
            Ok(extracted) => extracted,
            Err(err) => {
                warn!(screen = %screen.screen_name, error = %err, "Element extraction failed");
                screen.error = Some(err);
                return screen;
            }
        };
        screen.screen_type = extracted.screen_type;
        screen.elements = extracted.elements;

        if screen.elements.is_empty() {
            info!(screen = %screen.screen_name, "No UI elements found, skipping mapping");
            return screen;
        }

        match self
            .map_elements(&screen.screen_name, &screen.elements, test_cases)
            .await
        {
            Ok(mapped) => {
                screen.mappings = mapped.mappings;
                screen.reported_coverage = mapped.reported_coverage;
                screen.notes = mapped.notes;
            }
            Err(err) => {
                // Unmapped is not the same as uncovered: the summary stays empty.
                warn!(screen = %screen.screen_name, error = %err, "Element mapping failed");
                screen.error = Some(err);
                return screen;
            }
        }

        screen.summary = screen_summary(&screen.elements, &screen.mappings);
        info!(
            screen = %screen.screen_name,
            elements = screen.elements.len(),
            coverage = screen.summary.coverage_percentage,
            "Screen analysed"
        );
        screen
    }

    /// Runs every screenshot, up to `ui_concurrency` at a time. Results keep
    /// input order and are aggregated only after all screens finish.
    pub async fn analyze_screens(
        &self,
        screenshots: Vec<ScreenshotInput>,
        test_cases: &[TestCaseRecord],
    ) -> UiCoverageAnalysis {
        let limit = self.settings.ui_concurrency.max(1);
        if limit == 1 || screenshots.len() <= 1 {
            let mut screens = Vec::with_capacity(screenshots.len());
            for screenshot in &screenshots {
                screens.push(self.analyze_screen(screenshot, test_cases).await);
            }
            return UiCoverageAnalysis::from_screens(screens);
        }

        let semaphore = Arc::new(Semaphore::new(limit));
        let test_cases: Arc<Vec<TestCaseRecord>> = Arc::new(test_cases.to_vec());
        let mut handles = Vec::with_capacity(screenshots.len());
        for screenshot in screenshots {
            let sem = semaphore.clone();
            let use_case = self.clone();
            let cases = test_cases.clone();
            let fallback_name = screenshot.screen_name.clone();
            let handle = tokio::spawn(async move {
                let _permit = sem.acquire_owned().await;
                use_case.analyze_screen(&screenshot, &cases).await
            });
            handles.push((fallback_name, handle));
        }

        let mut screens = Vec::with_capacity(handles.len());
        for (screen_name, handle) in handles {
            match handle.await {
                Ok(screen) => screens.push(screen),
                Err(err) => screens.push(ScreenCoverage {
                    screen_name,
                    screen_type: UNKNOWN_SCREEN_TYPE.to_string(),
                    elements: Vec::new(),
                    mappings: Vec::new(),
                    reported_coverage: None,
                    notes: String::new(),
                    summary: UiCoverageSummary::default(),
                    error: Some(format!("Screen analysis task failed: {}", err)),
                }),
            }
        }
        UiCoverageAnalysis::from_screens(screens)
    }
}

/// Elements the oracle left unmapped count as uncovered.
fn screen_summary(elements: &[UiElement], mappings: &[ElementMapping]) -> UiCoverageSummary {
    let unmapped = elements.len().saturating_sub(mappings.len());
    UiCoverageSummary::from_levels(
        mappings
            .iter()
            .map(|mapping| mapping.coverage_level)
            .chain(std::iter::repeat(CoverageLevel::None).take(unmapped)),
    )
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(label: &str) -> UiElement {
        serde_json::from_value(json!({"type": "input_field", "label": label})).unwrap()
    }

    fn mapping(level: &str) -> ElementMapping {
        serde_json::from_value(json!({
            "element_type": "input_field",
            "element_label": "Email",
            "coverage_level": level
        }))
        .unwrap()
    }

    #[test]
    fn test_unmapped_elements_count_as_none() {
        let elements: Vec<UiElement> = (0..4).map(|i| element(&format!("F{}", i))).collect();
        let summary = screen_summary(&elements, &[mapping("Full"), mapping("Partial")]);
        assert_eq!(summary.total_elements, 4);
        assert_eq!(summary.none, 2);
        assert_eq!(summary.coverage_percentage, 37.5);
    }

    #[test]
    fn test_number_value_accepts_percent_text() {
        assert_eq!(number_value(&json!("85%")), Some(85.0));
        assert_eq!(number_value(&json!(40)), Some(40.0));
        assert_eq!(number_value(&json!(null)), None);
    }
}
