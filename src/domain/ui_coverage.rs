use crate::domain::coverage::CoverageLevel;
use crate::domain::lenient;
use serde::{Deserialize, Deserializer, Serialize};

/// A visible control read off a screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiElement {
    #[serde(rename = "type", alias = "element_type", deserialize_with = "lenient::string")]
    pub element_type: String,
    #[serde(deserialize_with = "lenient::string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub required: bool,
    #[serde(default, deserialize_with = "optional_text")]
    pub placeholder: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMapping {
    #[serde(deserialize_with = "lenient::string")]
    pub element_type: String,
    #[serde(deserialize_with = "lenient::string")]
    pub element_label: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub covered_by: Vec<String>,
    pub coverage_level: CoverageLevel,
    #[serde(default, deserialize_with = "confidence")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub missing_scenarios: Vec<String>,
}

fn optional_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::optional_string(deserializer)?.unwrap_or_default())
}

fn confidence<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient::optional_number(deserializer)?
        .filter(|n| n.is_finite())
        .unwrap_or(0.0);
    Ok(value.clamp(0.0, 1.0))
}

/// Counts by coverage level for one screen or for a whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UiCoverageSummary {
    pub total_elements: usize,
    pub full: usize,
    pub partial: usize,
    pub none: usize,
    pub coverage_percentage: f64,
}

impl UiCoverageSummary {
    pub fn from_levels<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = CoverageLevel>,
    {
        let mut summary = UiCoverageSummary::default();
        for level in levels {
            summary.total_elements += 1;
            match level {
                CoverageLevel::Full => summary.full += 1,
                CoverageLevel::Partial => summary.partial += 1,
                CoverageLevel::None => summary.none += 1,
            }
        }
        summary.coverage_percentage = aggregate_percentage(
            summary.full,
            summary.partial,
            summary.total_elements,
        );
        summary
    }

    pub fn from_mappings(mappings: &[ElementMapping]) -> Self {
        Self::from_levels(mappings.iter().map(|mapping| mapping.coverage_level))
    }

    pub fn merge(summaries: impl IntoIterator<Item = UiCoverageSummary>) -> Self {
        let mut merged = UiCoverageSummary::default();
        for summary in summaries {
            merged.total_elements += summary.total_elements;
            merged.full += summary.full;
            merged.partial += summary.partial;
            merged.none += summary.none;
        }
        merged.coverage_percentage =
            aggregate_percentage(merged.full, merged.partial, merged.total_elements);
        merged
    }
}

/// `(full + 0.5 * partial) / total * 100`, zero when there is nothing to count.
pub fn aggregate_percentage(full: usize, partial: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (full as f64 + 0.5 * partial as f64) / total as f64 * 100.0
}

/// Everything produced for one screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenCoverage {
    pub screen_name: String,
    pub screen_type: String,
    pub elements: Vec<UiElement>,
    pub mappings: Vec<ElementMapping>,
    /// Oracle-reported percentage when it gave one; `summary` is always recomputed.
    pub reported_coverage: Option<f64>,
    pub notes: String,
    pub summary: UiCoverageSummary,
    pub error: Option<String>,
}

/// Derives a display name from a file name: extension dropped, underscores
/// to spaces, each word capitalised.
pub fn screen_name_from_file(file_name: &str) -> String {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    stem.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
