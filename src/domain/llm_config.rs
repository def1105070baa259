use crate::domain::error::{AppError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LLMProvider {
    /// OpenAI-compatible server that needs no key (LM Studio, llama.cpp, vLLM).
    #[serde(alias = "local")]
    Local,
    #[serde(alias = "openai")]
    OpenAI,
    #[serde(alias = "gemini")]
    Gemini,
}

impl LLMProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LLMProvider::Local => "local",
            LLMProvider::OpenAI => "openai",
            LLMProvider::Gemini => "gemini",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LLMProvider::Local)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the provider for a strict JSON response body where it supports one.
    #[serde(default)]
    pub json_mode: bool,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            max_tokens: Some(4096),
            temperature: Some(0.2),
            json_mode: false,
        }
    }
}

/// Output budget and sampling settings for one kind of oracle call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallProfile {
    ElementExtraction,
    ElementMapping,
    RequirementExtraction,
    CoverageReconciliation,
    TestCaseSynthesis,
}

impl CallProfile {
    pub fn max_tokens(&self) -> u32 {
        match self {
            CallProfile::ElementExtraction => 2000,
            CallProfile::ElementMapping => 3000,
            CallProfile::RequirementExtraction | CallProfile::CoverageReconciliation => 8192,
            CallProfile::TestCaseSynthesis => 16384,
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            CallProfile::ElementExtraction => 0.1,
            CallProfile::ElementMapping
            | CallProfile::RequirementExtraction
            | CallProfile::CoverageReconciliation => 0.2,
            CallProfile::TestCaseSynthesis => 0.3,
        }
    }

    /// Vision requests are sent as free text; everything else asks for a JSON object.
    pub fn json_mode(&self) -> bool {
        !matches!(self, CallProfile::ElementExtraction)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallProfile::ElementExtraction => "element_extraction",
            CallProfile::ElementMapping => "element_mapping",
            CallProfile::RequirementExtraction => "requirement_extraction",
            CallProfile::CoverageReconciliation => "coverage_reconciliation",
            CallProfile::TestCaseSynthesis => "test_case_synthesis",
        }
    }
}

impl LLMConfig {
    pub fn for_call(&self, profile: CallProfile) -> LLMConfig {
        LLMConfig {
            max_tokens: Some(profile.max_tokens()),
            temperature: Some(profile.temperature()),
            json_mode: profile.json_mode(),
            ..self.clone()
        }
    }

    /// Checks everything that would make every oracle call fail, so it can be
    /// reported once instead of per stage.
    pub fn ensure_ready(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(AppError::LLMInit("Model name is empty".to_string()));
        }

        let parsed = url::Url::parse(self.base_url.trim()).map_err(|e| {
            AppError::LLMInit(format!("Invalid base_url '{}': {}", self.base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::LLMInit(format!(
                "Unsupported base_url scheme: {}",
                parsed.scheme()
            )));
        }

        if self.provider.requires_api_key()
            && self
                .api_key
                .as_deref()
                .map(|key| key.trim().is_empty())
                .unwrap_or(true)
        {
            return Err(AppError::LLMInit(format!(
                "Missing API key for {} provider",
                self.provider.as_str()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_config() -> LLMConfig {
        LLMConfig {
            api_key: Some("sk-test".to_string()),
            ..LLMConfig::default()
        }
    }

    #[test]
    fn test_for_call_applies_profile_budget() {
        let config = openai_config().for_call(CallProfile::TestCaseSynthesis);
        assert_eq!(config.max_tokens, Some(16384));
        assert_eq!(config.temperature, Some(0.3));
        assert!(config.json_mode);

        let vision = openai_config().for_call(CallProfile::ElementExtraction);
        assert_eq!(vision.max_tokens, Some(2000));
        assert_eq!(vision.temperature, Some(0.1));
        assert!(!vision.json_mode);
    }

    #[test]
    fn test_ensure_ready_requires_key_for_hosted_providers() {
        let mut config = openai_config();
        assert!(config.ensure_ready().is_ok());

        config.api_key = Some("   ".to_string());
        assert!(matches!(config.ensure_ready(), Err(AppError::LLMInit(_))));

        config.provider = LLMProvider::Local;
        config.base_url = "http://localhost:1234/v1".to_string();
        assert!(config.ensure_ready().is_ok());
    }

    #[test]
    fn test_ensure_ready_rejects_bad_endpoint() {
        let mut config = openai_config();
        config.base_url = "not a url".to_string();
        assert!(matches!(config.ensure_ready(), Err(AppError::LLMInit(_))));

        config.base_url = "ftp://example.com".to_string();
        assert!(matches!(config.ensure_ready(), Err(AppError::LLMInit(_))));
    }

    #[test]
    fn test_ensure_ready_rejects_empty_model() {
        let mut config = openai_config();
        config.model = "".to_string();
        assert!(matches!(config.ensure_ready(), Err(AppError::LLMInit(_))));
    }
}
