use crate::domain::requirement::Requirement;
use crate::domain::test_case::TestCaseRecord;
use crate::domain::ui_coverage::UiElement;

/// Single-line preview for logs and error messages.
pub(crate) fn preview_text(value: &str, limit: usize) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let snippet: String = trimmed.chars().take(limit).collect();
    if trimmed.chars().count() > limit {
        format!("{}…", snippet)
    } else {
        snippet
    }
}

/// First `limit` characters, cut on a char boundary.
pub(crate) fn char_prefix(value: &str, limit: usize) -> &str {
    match value.char_indices().nth(limit) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}

/// Numbered titles of the first `limit` requirements, with a remainder line.
pub(crate) fn requirement_preview(requirements: &[Requirement], limit: usize) -> String {
    let mut lines: Vec<String> = requirements
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, requirement)| {
            format!(
                "{}. {} (Type: {})",
                index + 1,
                requirement.title,
                requirement.requirement_type
            )
        })
        .collect();
    if requirements.len() > limit {
        lines.push(format!(
            "... and {} more requirements",
            requirements.len() - limit
        ));
    }
    lines.join("\n")
}

/// `- id: condition (Module: module)` for the first `limit` cases.
pub(crate) fn coverage_case_summary(test_cases: &[TestCaseRecord], limit: usize) -> String {
    test_cases
        .iter()
        .take(limit)
        .map(|case| {
            format!(
                "- {}: {} (Module: {})",
                case.test_case_id, case.test_condition, case.tc_module
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `- id: condition | Description: description` with the description cut short.
pub(crate) fn mapping_case_summary(
    test_cases: &[TestCaseRecord],
    limit: usize,
    description_chars: usize,
) -> String {
    test_cases
        .iter()
        .take(limit)
        .map(|case| {
            format!(
                "- {}: {} | Description: {}",
                case.test_case_id,
                case.test_condition,
                char_prefix(&case.test_case_description, description_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn element_summary(elements: &[UiElement]) -> String {
    elements
        .iter()
        .map(|element| {
            format!(
                "- {}: {} (Required: {})",
                element.element_type, element.label, element.required
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_case::fixtures::test_case_json;

    fn cases(count: usize) -> Vec<TestCaseRecord> {
        (1..=count)
            .map(|i| {
                let mut value = test_case_json(&format!("TC_{:03}", i), "Login - Workflow");
                value["test_case_description"] = serde_json::json!("é".repeat(200));
                serde_json::from_value(value).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_char_prefix_is_boundary_safe() {
        assert_eq!(char_prefix("ééé", 2), "éé");
        assert_eq!(char_prefix("ab", 5), "ab");
    }

    #[test]
    fn test_summaries_respect_limit() {
        let cases = cases(120);
        let coverage = coverage_case_summary(&cases, 100);
        assert_eq!(coverage.lines().count(), 100);
        assert!(coverage.starts_with("- TC_001: Condition for TC_001 (Module: Login - Workflow)"));

        let mapping = mapping_case_summary(&cases, 100, 150);
        let first = mapping.lines().next().unwrap();
        assert_eq!(first.split("Description: ").nth(1).unwrap().chars().count(), 150);
    }

    #[test]
    fn test_preview_text() {
        assert_eq!(preview_text("   ", 10), "<empty>");
        assert_eq!(preview_text("abcdef", 3), "abc…");
    }
}
