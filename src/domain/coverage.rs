use crate::domain::lenient;
use crate::domain::priority::Priority;
use crate::domain::record_issue::{decode_serde, RecordIssue};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CoverageLevel {
    Full,
    Partial,
    None,
}

impl CoverageLevel {
    /// Weight used when folding levels into a percentage.
    pub fn weight(&self) -> f64 {
        match self {
            CoverageLevel::Full => 1.0,
            CoverageLevel::Partial => 0.5,
            CoverageLevel::None => 0.0,
        }
    }
}

impl FromStr for CoverageLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "full" | "fully covered" | "covered" | "complete" => Ok(CoverageLevel::Full),
            "partial" | "partially covered" => Ok(CoverageLevel::Partial),
            "none" | "not covered" | "uncovered" | "missing" => Ok(CoverageLevel::None),
            other => Err(format!("unknown coverage level '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for CoverageLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = lenient::string(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for CoverageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CoverageLevel::Full => "Full",
            CoverageLevel::Partial => "Partial",
            CoverageLevel::None => "None",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveredRequirement {
    #[serde(deserialize_with = "lenient::string")]
    pub requirement: String,
    #[serde(deserialize_with = "lenient::string")]
    pub requirement_id: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub covered_by: Vec<String>,
    pub coverage_level: CoverageLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingRequirement {
    #[serde(deserialize_with = "lenient::string")]
    pub requirement: String,
    #[serde(deserialize_with = "lenient::string")]
    pub requirement_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub reason: String,
    pub priority: Priority,
}

/// Requirements the oracle re-derived from the document, split into covered and missing.
///
/// The ids here come from a fresh enumeration and are not comparable with
/// the ids produced by requirement extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub total_requirements: usize,
    pub covered: Vec<CoveredRequirement>,
    pub missing: Vec<MissingRequirement>,
    pub coverage_percentage: f64,
    pub summary: String,
    /// Built from a cut-off response. The lists may be incomplete and the
    /// percentage is only what the response stated, or 0.
    #[serde(default)]
    pub partial: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCoverageReport {
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub total_requirements: Option<f64>,
    #[serde(default, alias = "covered")]
    pub covered_requirements: Vec<Value>,
    #[serde(default, alias = "missing")]
    pub missing_requirements: Vec<Value>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub coverage_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub summary: Option<String>,
}

impl CoverageReport {
    /// Builds a report, decoding entries one by one. Missing-list issue
    /// indices are offset by the covered-list length so they stay distinct.
    pub fn from_raw(raw: RawCoverageReport) -> (CoverageReport, Vec<RecordIssue>) {
        Self::build(raw, false)
    }

    /// Report for a truncated response. A missing percentage stays 0 rather
    /// than being derived from lists that may have lost entries.
    pub fn from_recovered(raw: RawCoverageReport) -> (CoverageReport, Vec<RecordIssue>) {
        Self::build(raw, true)
    }

    fn build(raw: RawCoverageReport, partial: bool) -> (CoverageReport, Vec<RecordIssue>) {
        let covered_len = raw.covered_requirements.len();
        let (covered, mut issues) = decode_serde::<CoveredRequirement>(raw.covered_requirements);
        let (missing, missing_issues) = decode_serde::<MissingRequirement>(raw.missing_requirements);
        issues.extend(missing_issues.into_iter().map(|issue| RecordIssue {
            index: issue.index + covered_len,
            reason: format!("missing_requirements: {}", issue.reason),
        }));

        let listed = covered.len() + missing.len();
        let total_requirements = raw
            .total_requirements
            .filter(|total| total.is_finite() && *total >= 0.0)
            .map(|total| total.round() as usize)
            .unwrap_or(listed);

        let coverage_percentage = match raw.coverage_percentage {
            Some(percentage) if percentage.is_finite() => percentage.clamp(0.0, 100.0),
            _ if partial || total_requirements == 0 => 0.0,
            _ => (covered.len() as f64 / total_requirements as f64 * 100.0).clamp(0.0, 100.0),
        };

        let report = CoverageReport {
            total_requirements,
            covered,
            missing,
            coverage_percentage,
            summary: raw.summary.unwrap_or_default(),
            partial,
        };
        (report, issues)
    }

    pub fn fully_covered(&self) -> usize {
        self.covered
            .iter()
            .filter(|item| item.coverage_level == CoverageLevel::Full)
            .count()
    }

    pub fn partially_covered(&self) -> usize {
        self.covered
            .iter()
            .filter(|item| item.coverage_level == CoverageLevel::Partial)
            .count()
    }

    pub fn missing_by_priority(&self, priority: Priority) -> usize {
        self.missing
            .iter()
            .filter(|item| item.priority == priority)
            .count()
    }
}
