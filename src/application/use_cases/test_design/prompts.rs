use crate::domain::generation_options::GenerationOptions;

pub(crate) const REQUIREMENT_SYSTEM_PROMPT: &str =
    "You are an expert Business Analyst specialized in requirements analysis and extraction.";

pub(crate) const SYNTHESIS_SYSTEM_PROMPT: &str = "You are an expert QA Test Analyst specialized in creating comprehensive test cases from Business Requirements Documents.";

pub(crate) const COVERAGE_SYSTEM_PROMPT: &str = "You are an expert QA analyst specialized in requirements traceability and coverage analysis.";

pub(crate) const ELEMENT_SYSTEM_PROMPT: &str =
    "You are a UI analyst who lists the interactive elements visible in application screenshots.";

pub(crate) const MAPPING_SYSTEM_PROMPT: &str =
    "You are an expert QA analyst specialized in UI test coverage analysis.";

/// Used when no framework file is configured.
pub(crate) const DEFAULT_SYNTHESIS_FRAMEWORK: &str = r#"# Test Case Generation Framework

Every test case is one row in a fourteen-column sheet:

| Column | Content |
|---|---|
| product_name | Application or product under test |
| process_category | Functional area, e.g. Account Opening |
| business_process_id | Identifier of the business process, e.g. BP-01 |
| business_process | Name of the business process |
| scenario_id | Identifier of the scenario, e.g. SC-01 |
| scenario_description | One sentence describing the scenario |
| category | Positive or Negative |
| importance | Critical, High, Medium or Low |
| test_case_id | Unique id, e.g. TC_001 |
| tc_module | Module name followed by the test type suffix |
| test_condition | What is being verified |
| prerequisite | State required before execution |
| test_case_description | Numbered execution steps |
| expected_result | Observable outcome that passes the test |

Workflow cases walk the full path: log in, navigate, enter data, submit, approve where
approval exists, verify the resulting status and notifications, then log out.
Field validation cases exercise one field or form section each: mandatory checks,
formats, lengths and ranges.
Negative cases violate exactly one business rule and state the expected error."#;

pub(crate) fn build_requirement_prompt(document_text: &str, floor: usize, target: usize) -> String {
    format!(
        r#"Extract the functional requirements from the Business Requirements Document below.

## DOCUMENT

{document_text}

## TASK

Extract at least {floor} unique, atomic, testable requirements. Aim for {target} to 50 when the document supports it. Break large features into granular requirements: one per screen, form section, workflow step, validation rule and user role.

Cover all seven categories, with a minimum per category:
1. UI (8+): screens, form sections, buttons, navigation, search and filters, uploads, dialogs
2. Process (10+): registration, transactions, approval levels, status changes, notifications, batch jobs
3. Validation (8+): field formats, mandatory fields, ranges, cross-field rules, duplicates
4. Integration (3+): APIs, third-party services, imports and exports
5. Reporting (3+): reports, exports, inquiries, dashboards
6. Security (3+): authentication, authorization, roles, sessions, audit trail
7. BusinessRule/Calculation (5+): calculations, fees, conditional processing, status rules

No duplicates. If the document looks thin, decompose existing features further.

## OUTPUT

Return only a JSON object:
{{
  "total_requirements": <number>,
  "requirements": [
    {{
      "requirement_id": "REQ-001",
      "requirement_type": "UI|Workflow|Data|Integration|Report|Security|BusinessRule",
      "module": "Module name",
      "title": "Specific requirement title",
      "description": "What the system must do",
      "priority": "Critical|High|Medium|Low",
      "testable": true
    }}
  ]
}}"#
    )
}

pub(crate) struct SynthesisPrompt<'a> {
    pub framework: &'a str,
    pub document_text: &'a str,
    pub requirement_summary: &'a str,
    pub target_count: usize,
    pub options: &'a GenerationOptions,
}

pub(crate) fn build_synthesis_prompt(input: &SynthesisPrompt<'_>) -> String {
    let options = input.options;
    let target = input.target_count;
    let variations = if options.variations.is_empty() {
        "Identify from the document".to_string()
    } else {
        options.variations.join(", ")
    };

    format!(
        r#"{framework}

---

## DOCUMENT

{document}

---

## REQUIREMENTS ANALYSIS

{requirements}

---

## INSTRUCTIONS

Generate exactly {target} test cases, one for each identified requirement. Break complex features into several specific cases.

Domain: {domain}
{focus}
Variations to consider: {variations}

Distribution:
- About 20% field validation cases. tc_module ends with "- Field Validation".
- About 60% workflow cases. tc_module ends with "- Workflow".
- About {negative}% negative cases. tc_module ends with "- Negative Test".
- The remainder covers reports, inquiries and modifications, named accordingly.

Every tc_module must carry one of these suffixes, e.g. "Account Opening - Workflow".

## OUTPUT

Return only a JSON object with a "test_cases" array. Each item has these fourteen fields:
product_name, process_category, business_process_id, business_process, scenario_id,
scenario_description, category, importance, test_case_id, tc_module, test_condition,
prerequisite, test_case_description, expected_result.

{{
  "test_cases": [
    {{
      "product_name": "Banking Application",
      "process_category": "Account Opening",
      "tc_module": "Account Opening - Field Validation",
      "...": "..."
    }}
  ]
}}"#,
        framework = input.framework.trim(),
        document = input.document_text,
        requirements = input.requirement_summary,
        target = target,
        domain = options.domain_instruction(),
        focus = options.focus_instruction(),
        variations = variations,
        negative = options.negative_ratio,
    )
}

/// Reference list shown to the synthesis call.
pub(crate) fn requirement_summary(
    target_count: usize,
    preview: Option<&str>,
    floor_target: usize,
) -> String {
    match preview {
        Some(preview) if !preview.is_empty() => format!(
            "Generate exactly {} test cases, one for each requirement:\n{}",
            target_count, preview
        ),
        _ => format!(
            "No requirement list is available. Identify at least {} granular requirements from the document yourself.",
            floor_target
        ),
    }
}

pub(crate) fn build_coverage_prompt(document_prefix: &str, case_summary: &str) -> String {
    format!(
        r#"Perform a requirements coverage analysis.

## DOCUMENT

{document_prefix}

## GENERATED TEST CASES

{case_summary}

## TASK

1. Identify every functional requirement, feature and business rule in the document.
2. Decide which of them the test cases cover, fully or partially.
3. List the ones that are not covered, with the reason and a priority.

## OUTPUT

Return only a JSON object:
{{
  "total_requirements": <number>,
  "covered_requirements": [
    {{"requirement": "Description", "requirement_id": "REQ-001", "covered_by": ["TC_001"], "coverage_level": "Full|Partial"}}
  ],
  "missing_requirements": [
    {{"requirement": "Description", "requirement_id": "REQ-010", "reason": "Why it is not covered", "priority": "High|Medium|Low"}}
  ],
  "coverage_percentage": <number>,
  "summary": "Short analysis"
}}"#
    )
}

pub(crate) const ELEMENT_EXTRACTION_PROMPT: &str = r#"List every interactive element in this screenshot.

For each element give its type (input_field, button, link, checkbox, dropdown, radio_button, textarea, ...), its visible label or text, whether it is required (an asterisk or "required" marker), its placeholder and a short description.

Return only JSON, without markdown:
{
  "screen_type": "login|form|dashboard|...",
  "elements": [
    {"type": "input_field", "label": "Email Address", "required": true, "placeholder": "Enter your email", "description": "Login email"}
  ]
}"#;

pub(crate) fn build_mapping_prompt(screen_name: &str, elements: &str, case_summary: &str) -> String {
    format!(
        r#"Map the UI elements of one screen to the test cases that exercise them.

SCREEN: {screen_name}

UI ELEMENTS:
{elements}

TEST CASES:
{case_summary}

Match on label mentions in the description, on the element type and action (enter, click, select, verify), and on meaning ("user email" matches "email field").

Return only a JSON object:
{{
  "mappings": [
    {{
      "element_type": "input_field",
      "element_label": "Email Address",
      "covered_by": ["TC_001"],
      "coverage_level": "Full|Partial|None",
      "confidence": 0.9,
      "missing_scenarios": ["Scenario not yet tested"]
    }}
  ],
  "overall_coverage": <number>,
  "summary": "Short summary"
}}"#
    )
}
