use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket a test case falls into, derived from the suffix convention on its
/// `tc_module` ("- Field Validation", "- Workflow", "- Negative Test").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestType {
    #[serde(rename = "Field-Level")]
    FieldLevel,
    Functional,
    Negative,
    #[serde(rename = "Report/Inquiry")]
    ReportInquiry,
    Modification,
    Other,
}

/// Rules are checked top to bottom; the first hit wins.
const CLASSIFICATION_RULES: &[(TestType, &[&str])] = &[
    (TestType::FieldLevel, &["field validation", "field-level"]),
    (TestType::Functional, &["workflow", "functional"]),
    (TestType::Negative, &["negative"]),
    (TestType::ReportInquiry, &["report", "inquiry"]),
    (TestType::Modification, &["modification", "update"]),
];

impl TestType {
    pub const ALL: [TestType; 6] = [
        TestType::FieldLevel,
        TestType::Functional,
        TestType::Negative,
        TestType::ReportInquiry,
        TestType::Modification,
        TestType::Other,
    ];

    pub fn classify(tc_module: &str) -> TestType {
        let lowered = tc_module.to_lowercase();
        CLASSIFICATION_RULES
            .iter()
            .find(|(_, needles)| needles.iter().any(|needle| lowered.contains(needle)))
            .map(|(test_type, _)| *test_type)
            .unwrap_or(TestType::Other)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TestType::FieldLevel => "Field-Level",
            TestType::Functional => "Functional",
            TestType::Negative => "Negative",
            TestType::ReportInquiry => "Report/Inquiry",
            TestType::Modification => "Modification",
            TestType::Other => "Other",
        }
    }

    /// Whether the module carried one of the three suffixes the generator is asked for.
    pub fn is_primary(&self) -> bool {
        matches!(
            self,
            TestType::FieldLevel | TestType::Functional | TestType::Negative
        )
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
