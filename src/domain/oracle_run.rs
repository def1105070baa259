use crate::domain::llm_config::{CallProfile, LLMConfig};
use serde::{Deserialize, Serialize};

/// Provenance of one oracle call, kept next to the stage output it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRun {
    pub id: String,
    pub stage: String,
    pub provider: String,
    pub model: String,
    pub prompt_version: String,
    pub input_digest: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub created_at: i64,
}

impl OracleRun {
    pub fn new(
        profile: CallProfile,
        config: &LLMConfig,
        prompt_version: &str,
        input_digest: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            stage: profile.as_str().to_string(),
            provider: config.provider.as_str().to_string(),
            model: config.model.clone(),
            prompt_version: prompt_version.to_string(),
            input_digest,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
