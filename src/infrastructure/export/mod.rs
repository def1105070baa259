// ============================================================
// TEST CASE EXPORT
// ============================================================
// Tabular sheets for the generated test cases, rendered as CSV

mod reports;

use crate::domain::error::{AppError, Result};
use crate::domain::priority::Priority;
use crate::domain::test_case::{TestCaseCategory, TestCaseRecord};
use crate::domain::test_type::TestType;
use csv::WriterBuilder;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub use reports::{coverage_text_report, ui_text_report};

pub const ALL_SHEET: &str = "All Test Cases";
pub const FIELD_LEVEL_SHEET: &str = "Field-Level Tests";
pub const FUNCTIONAL_SHEET: &str = "Functional Tests";
pub const NEGATIVE_SHEET: &str = "Negative Tests";
pub const OTHER_SHEET: &str = "Other Tests";
pub const SUMMARY_SHEET: &str = "Summary";

/// Display headers in export order. "Test Type" follows "TC Module".
pub const COLUMNS: [&str; 15] = [
    "Product Name",
    "Process Category",
    "Business Process ID",
    "Business Process",
    "Scenario ID",
    "Scenario Description",
    "Category",
    "Importance",
    "Test Case ID",
    "TC Module",
    "Test Type",
    "Test Condition",
    "Pre-requisite",
    "Test Case Description",
    "Expected Result",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = WriterBuilder::new()
            .flexible(false)
            .from_writer(Vec::new());
        writer
            .write_record(&self.headers)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("CSV output is not UTF-8: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }
}

/// Builds every sheet. Type sheets appear only when they have rows; the
/// summary is always present.
pub fn build_export(records: &[TestCaseRecord]) -> Workbook {
    let mut all = Sheet::new(ALL_SHEET, &COLUMNS);
    let mut by_type: BTreeMap<&'static str, Sheet> = BTreeMap::new();

    for record in records {
        let test_type = record.test_type();
        let row = record_row(record, test_type);
        let sheet_name = match test_type {
            TestType::FieldLevel => FIELD_LEVEL_SHEET,
            TestType::Functional => FUNCTIONAL_SHEET,
            TestType::Negative => NEGATIVE_SHEET,
            _ => OTHER_SHEET,
        };
        by_type
            .entry(sheet_name)
            .or_insert_with(|| Sheet::new(sheet_name, &COLUMNS))
            .rows
            .push(row.clone());
        all.rows.push(row);
    }

    let mut sheets = vec![all];
    for name in [FIELD_LEVEL_SHEET, FUNCTIONAL_SHEET, NEGATIVE_SHEET, OTHER_SHEET] {
        if let Some(sheet) = by_type.remove(name) {
            sheets.push(sheet);
        }
    }
    sheets.push(summary_sheet(records));
    Workbook { sheets }
}

fn record_row(record: &TestCaseRecord, test_type: TestType) -> Vec<String> {
    vec![
        record.product_name.clone(),
        record.process_category.clone(),
        record.business_process_id.clone(),
        record.business_process.clone(),
        record.scenario_id.clone(),
        record.scenario_description.clone(),
        record.category.label().to_string(),
        record.importance.label().to_string(),
        record.test_case_id.clone(),
        record.tc_module.clone(),
        test_type.label().to_string(),
        record.test_condition.clone(),
        record.prerequisite.clone(),
        record.test_case_description.clone(),
        record.expected_result.clone(),
    ]
}

fn summary_sheet(records: &[TestCaseRecord]) -> Sheet {
    let mut sheet = Sheet::new(SUMMARY_SHEET, &["Metric", "Value"]);
    let types: Vec<TestType> = records.iter().map(TestCaseRecord::test_type).collect();
    let count_type = |wanted: TestType| types.iter().filter(|t| **t == wanted).count();
    let other = types.iter().filter(|t| !t.is_primary()).count();
    let category = |wanted: TestCaseCategory| {
        records.iter().filter(|r| r.category == wanted).count()
    };
    let importance = |wanted: Priority| records.iter().filter(|r| r.importance == wanted).count();
    let modules: HashSet<&str> = records.iter().map(|r| r.tc_module.as_str()).collect();
    let scenarios: HashSet<&str> = records
        .iter()
        .map(|r| r.scenario_description.as_str())
        .collect();

    let metrics: Vec<(&str, Option<usize>)> = vec![
        ("Total Test Cases", Some(records.len())),
        ("Field-Level Tests", Some(count_type(TestType::FieldLevel))),
        ("Functional/Workflow Tests", Some(count_type(TestType::Functional))),
        ("Negative Tests", Some(count_type(TestType::Negative))),
        ("Other Tests", Some(other)),
        ("", None),
        ("Functional Positive", Some(category(TestCaseCategory::Positive))),
        ("Functional Negative", Some(category(TestCaseCategory::Negative))),
        ("", None),
        ("Critical Priority", Some(importance(Priority::Critical))),
        ("High Priority", Some(importance(Priority::High))),
        ("Medium Priority", Some(importance(Priority::Medium))),
        ("Low Priority", Some(importance(Priority::Low))),
        ("", None),
        ("Unique Modules", Some(modules.len())),
        ("Unique Scenarios", Some(scenarios.len())),
    ];
    sheet.rows = metrics
        .into_iter()
        .map(|(metric, value)| {
            vec![
                metric.to_string(),
                value.map(|v| v.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    sheet
}
