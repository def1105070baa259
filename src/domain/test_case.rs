use crate::domain::lenient;
use crate::domain::priority::Priority;
use crate::domain::test_type::TestType;
use crate::domain::record_issue::{decode_each, RecordIssue};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TestCaseCategory {
    Positive,
    Negative,
}

impl TestCaseCategory {
    pub fn label(&self) -> &'static str {
        match self {
            TestCaseCategory::Positive => "Positive",
            TestCaseCategory::Negative => "Negative",
        }
    }
}

impl fmt::Display for TestCaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for TestCaseCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = lenient::string(deserializer)?;
        let lowered = raw.to_lowercase();
        // "Negative" is checked first so "Non-positive" style labels land there.
        if lowered.contains("negative") {
            Ok(TestCaseCategory::Negative)
        } else if lowered.contains("positive") {
            Ok(TestCaseCategory::Positive)
        } else {
            Err(serde::de::Error::custom(format!(
                "unknown category '{}'",
                raw
            )))
        }
    }
}

/// One generated test case in the fourteen-column layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub product_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub process_category: String,
    #[serde(deserialize_with = "lenient::string")]
    pub business_process_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub business_process: String,
    #[serde(deserialize_with = "lenient::string")]
    pub scenario_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub scenario_description: String,
    pub category: TestCaseCategory,
    pub importance: Priority,
    #[serde(deserialize_with = "lenient::string")]
    pub test_case_id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub tc_module: String,
    #[serde(deserialize_with = "lenient::string")]
    pub test_condition: String,
    #[serde(deserialize_with = "lenient::string")]
    pub prerequisite: String,
    #[serde(deserialize_with = "lenient::string")]
    pub test_case_description: String,
    #[serde(deserialize_with = "lenient::string")]
    pub expected_result: String,
}

impl TestCaseRecord {
    pub fn test_type(&self) -> TestType {
        TestType::classify(&self.tc_module)
    }
}

/// Record plus its derived type, for callers that display or export.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedTestCase<'a> {
    #[serde(flatten)]
    pub record: &'a TestCaseRecord,
    pub test_type: TestType,
}

impl<'a> From<&'a TestCaseRecord> for ClassifiedTestCase<'a> {
    fn from(record: &'a TestCaseRecord) -> Self {
        Self {
            record,
            test_type: record.test_type(),
        }
    }
}

/// Decodes test cases in order. A repeated `test_case_id` is rejected; the
/// first record with that id is kept.
pub fn decode_test_cases(items: Vec<serde_json::Value>) -> (Vec<TestCaseRecord>, Vec<RecordIssue>) {
    let mut seen = HashSet::new();
    decode_each(items, |item, _| {
        let record: TestCaseRecord = serde_json::from_value(item).map_err(|e| e.to_string())?;
        if !seen.insert(record.test_case_id.clone()) {
            return Err(format!("duplicate test_case_id '{}'", record.test_case_id));
        }
        Ok(record)
    })
}
