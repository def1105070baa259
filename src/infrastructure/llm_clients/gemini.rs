use super::{join_url, status_error, transport_error, ImageInput, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    Inline {
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiModelsResponse {
    models: Option<Vec<GeminiModelInfo>>,
}

#[derive(Deserialize)]
struct GeminiModelInfo {
    name: String,
}

pub struct GeminiClient {
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn normalize_model(model: &str) -> String {
        let trimmed = model.trim();
        if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{}", trimmed)
        }
    }

    fn api_key(config: &LLMConfig) -> Result<String> {
        config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::LLMInit("Missing API key for Gemini provider".to_string()))
    }

    fn request(config: &LLMConfig, system: &str, parts: Vec<GeminiPart>) -> GeminiRequest {
        let system_instruction = if system.trim().is_empty() {
            None
        } else {
            Some(GeminiContent {
                parts: vec![GeminiPart::Text {
                    text: system.to_string(),
                }],
                role: None,
            })
        };

        GeminiRequest {
            system_instruction,
            contents: vec![GeminiContent {
                parts,
                role: Some("user".to_string()),
            }],
            generation_config: Some(GenerationConfig {
                temperature: config.temperature.unwrap_or(0.2) as f64,
                max_output_tokens: config.max_tokens,
                response_mime_type: config
                    .json_mode
                    .then(|| "application/json".to_string()),
            }),
        }
    }

    async fn send(&self, config: &LLMConfig, body: &GeminiRequest) -> Result<String> {
        let api_key = Self::api_key(config)?;
        let model_id = Self::normalize_model(&config.model);
        let url = format!(
            "{}:generateContent?key={}",
            join_url(&config.base_url, &model_id),
            api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let json: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        let text: String = json
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect()
            })
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))?;

        Ok(text)
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let body = Self::request(
            config,
            system,
            vec![GeminiPart::Text {
                text: user.to_string(),
            }],
        );
        self.send(config, &body).await
    }

    async fn generate_with_image(
        &self,
        config: &LLMConfig,
        system: &str,
        user: &str,
        image: &ImageInput,
    ) -> Result<String> {
        let body = Self::request(
            config,
            system,
            vec![
                GeminiPart::Text {
                    text: user.to_string(),
                },
                GeminiPart::Inline {
                    inline_data: InlineData {
                        mime_type: image.mime_type.clone(),
                        data: image.to_base64(),
                    },
                },
            ],
        );
        self.send(config, &body).await
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        let api_key = Self::api_key(config)?;
        let url = format!("{}?key={}", join_url(&config.base_url, "models"), api_key);

        let response = self.client.get(&url).send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let json: GeminiModelsResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        let models = json
            .models
            .unwrap_or_default()
            .into_iter()
            .map(|model| {
                model
                    .name
                    .strip_prefix("models/")
                    .unwrap_or(model.name.as_str())
                    .to_string()
            })
            .collect();

        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::{CallProfile, LLMProvider};

    fn config(profile: CallProfile) -> LLMConfig {
        LLMConfig {
            provider: LLMProvider::Gemini,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-pro".to_string(),
            api_key: Some("key".to_string()),
            ..LLMConfig::default()
        }
        .for_call(profile)
    }

    #[test]
    fn test_model_prefix_added_once() {
        assert_eq!(GeminiClient::normalize_model("gemini-pro"), "models/gemini-pro");
        assert_eq!(GeminiClient::normalize_model("models/gemini-pro"), "models/gemini-pro");
    }

    #[test]
    fn test_json_mode_sets_mime_type() {
        let body = GeminiClient::request(
            &config(CallProfile::CoverageReconciliation),
            "sys",
            Vec::new(),
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
    }

    #[test]
    fn test_image_part_is_inline_data() {
        let part = GeminiPart::Inline {
            inline_data: InlineData {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            },
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["inline_data"]["mime_type"], "image/png");
        let vision = GeminiClient::request(&config(CallProfile::ElementExtraction), "", vec![part]);
        let json = serde_json::to_value(&vision).unwrap();
        assert!(json["generationConfig"].get("responseMimeType").is_none());
        assert!(json.get("systemInstruction").is_none());
    }
}
