use serde::{Deserialize, Serialize};
use validator::Validate;

pub const AUTO_DETECT_DOMAIN: &str = "auto-detect";

/// User knobs for test-case synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationOptions {
    /// Share of negative cases, in percent.
    #[validate(range(min = 5, max = 25))]
    #[serde(default = "default_negative_ratio")]
    pub negative_ratio: u8,
    #[serde(default = "default_variations")]
    pub variations: Vec<String>,
    /// Empty means every module.
    #[serde(default)]
    pub focus_modules: Vec<String>,
    #[serde(default = "default_domain_context")]
    pub domain_context: String,
}

fn default_negative_ratio() -> u8 {
    15
}

fn default_variations() -> Vec<String> {
    vec![
        "Boundary Values".to_string(),
        "Invalid Formats".to_string(),
        "Empty Fields".to_string(),
    ]
}

fn default_domain_context() -> String {
    AUTO_DETECT_DOMAIN.to_string()
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            negative_ratio: default_negative_ratio(),
            variations: default_variations(),
            focus_modules: Vec::new(),
            domain_context: default_domain_context(),
        }
    }
}

impl GenerationOptions {
    pub fn is_auto_domain(&self) -> bool {
        let trimmed = self.domain_context.trim();
        trimmed.is_empty() || trimmed.eq_ignore_ascii_case(AUTO_DETECT_DOMAIN)
    }

    pub fn domain_instruction(&self) -> String {
        if self.is_auto_domain() {
            "Detect the business domain from the document and use its terminology.".to_string()
        } else {
            format!(
                "The business domain is {}. Use terminology from that domain.",
                self.domain_context.trim()
            )
        }
    }

    pub fn focus_instruction(&self) -> String {
        let modules: Vec<&str> = self
            .focus_modules
            .iter()
            .map(|module| module.trim())
            .filter(|module| !module.is_empty())
            .collect();
        if modules.is_empty() {
            "Cover every module described in the document.".to_string()
        } else {
            format!(
                "Only generate test cases for these modules: {}.",
                modules.join(", ")
            )
        }
    }
}
