use crate::domain::coverage::CoverageReport;
use crate::domain::pipeline::UiCoverageAnalysis;
use chrono::{DateTime, Utc};
use std::fmt::Write;

const SCREEN_RULE_WIDTH: usize = 60;

/// Plain-text requirements coverage report.
pub fn coverage_text_report(report: &CoverageReport, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "REQUIREMENTS COVERAGE REPORT");
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out);
    let _ = writeln!(out, "SUMMARY");
    let _ = writeln!(out, "=======");
    let _ = writeln!(out, "Coverage Percentage: {:.1}%", report.coverage_percentage);
    let _ = writeln!(out, "Total Requirements: {}", report.total_requirements);
    let _ = writeln!(out, "Covered Requirements: {}", report.covered.len());
    let _ = writeln!(out, "Missing Requirements: {}", report.missing.len());
    if !report.summary.is_empty() {
        let _ = writeln!(out, "Analysis: {}", report.summary);
    }
    if report.partial {
        let _ = writeln!(out, "Note: the response was cut off, so the lists may be incomplete.");
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "COVERED REQUIREMENTS ({})", report.covered.len());
    let _ = writeln!(out, "========================");
    for covered in &report.covered {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}: {}", or_na(&covered.requirement_id), covered.requirement);
        let _ = writeln!(out, "  Coverage: {}", covered.coverage_level);
        let _ = writeln!(out, "  Test Cases: {}", covered.covered_by.join(", "));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "MISSING REQUIREMENTS ({})", report.missing.len());
    let _ = writeln!(out, "=======================");
    for missing in &report.missing {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}: {}", or_na(&missing.requirement_id), missing.requirement);
        let _ = writeln!(out, "  Priority: {}", missing.priority.label());
        let _ = writeln!(out, "  Reason: {}", or_na(&missing.reason));
    }
    out
}

/// Plain-text UI coverage report, one block per screen.
pub fn ui_text_report(analysis: &UiCoverageAnalysis, generated_at: DateTime<Utc>) -> String {
    let summary = &analysis.summary;
    let mut out = String::new();
    let _ = writeln!(out, "UI COVERAGE ANALYSIS REPORT");
    let _ = writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out);
    let _ = writeln!(out, "OVERALL SUMMARY");
    let _ = writeln!(out, "===============");
    let _ = writeln!(out, "Coverage: {:.1}%", summary.coverage_percentage);
    let _ = writeln!(out, "Total UI Elements: {}", summary.total_elements);
    let _ = writeln!(out, "Fully Covered: {}", summary.full);
    let _ = writeln!(out, "Partially Covered: {}", summary.partial);
    let _ = writeln!(out, "Not Covered: {}", summary.none);

    let rule = "=".repeat(SCREEN_RULE_WIDTH);
    for screen in &analysis.screens {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "SCREEN: {}", screen.screen_name);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Screen Type: {}", screen.screen_type);
        let _ = writeln!(out, "Coverage: {:.1}%", screen.summary.coverage_percentage);
        if let Some(error) = &screen.error {
            let _ = writeln!(out, "Error: {}", error);
        }
        if !screen.notes.is_empty() {
            let _ = writeln!(out, "Summary: {}", screen.notes);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "UI ELEMENTS:");
        let _ = writeln!(out, "{}", "-".repeat(SCREEN_RULE_WIDTH));

        for mapping in &screen.mappings {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}: {}", mapping.element_type, mapping.element_label);
            let _ = writeln!(out, "  Coverage: {}", mapping.coverage_level);
            let _ = writeln!(out, "  Confidence: {:.0}%", mapping.confidence * 100.0);
            if !mapping.covered_by.is_empty() {
                let _ = writeln!(out, "  Test Cases: {}", mapping.covered_by.join(", "));
            }
            if !mapping.missing_scenarios.is_empty() {
                let _ = writeln!(out, "  Missing Scenarios:");
                for scenario in &mapping.missing_scenarios {
                    let _ = writeln!(out, "    - {}", scenario);
                }
            }
        }
    }
    out
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coverage::RawCoverageReport;
    use crate::domain::ui_coverage::{ElementMapping, ScreenCoverage, UiCoverageSummary};
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_coverage_report_lists_both_sections() {
        let raw: RawCoverageReport = serde_json::from_value(json!({
            "covered": [{"requirement": "Login", "requirement_id": "REQ-001",
                         "covered_by": ["TC_001", "TC_002"], "coverage_level": "Full"}],
            "missing": [{"requirement": "Audit", "requirement_id": "", "priority": "High"}],
            "coverage_percentage": 50
        }))
        .unwrap();
        let (report, _) = CoverageReport::from_raw(raw);
        let text = coverage_text_report(&report, at());

        assert!(text.contains("Generated: 2026-03-01 09:30:00"));
        assert!(text.contains("Coverage Percentage: 50.0%"));
        assert!(text.contains("REQ-001: Login\n  Coverage: Full\n  Test Cases: TC_001, TC_002"));
        assert!(text.contains("N/A: Audit\n  Priority: High\n  Reason: N/A"));
        assert!(!text.contains("cut off"));

        let (recovered, _) = CoverageReport::from_recovered(RawCoverageReport::default());
        assert!(coverage_text_report(&recovered, at()).contains("Note: the response was cut off"));
    }

    #[test]
    fn test_ui_report_shows_mappings() {
        let mapping: ElementMapping = serde_json::from_value(json!({
            "element_type": "button", "element_label": "Save", "coverage_level": "Partial",
            "confidence": 0.75, "missing_scenarios": ["Double click"]
        }))
        .unwrap();
        let summary = UiCoverageSummary::from_mappings(std::slice::from_ref(&mapping));
        let screen = ScreenCoverage {
            screen_name: "Profile".to_string(),
            screen_type: "form".to_string(),
            elements: Vec::new(),
            mappings: vec![mapping],
            reported_coverage: None,
            notes: String::new(),
            summary,
            error: None,
        };
        let text = ui_text_report(&UiCoverageAnalysis::from_screens(vec![screen]), at());

        assert!(text.contains("Coverage: 50.0%"));
        assert!(text.contains("SCREEN: Profile"));
        assert!(text.contains("  Confidence: 75%"));
        assert!(text.contains("    - Double click"));
    }
}
