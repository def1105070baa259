use super::{join_url, status_error, transport_error, ImageInput, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Chat-completions client for OpenAI and any server speaking the same protocol.
pub struct OpenAIClient {
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn request_body(config: &LLMConfig, system: &str, user_content: Value) -> Value {
        let mut body = json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user_content
                }
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        });
        if config.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    async fn complete(&self, config: &LLMConfig, body: &Value) -> Result<String> {
        let url = join_url(&config.base_url, "chat/completions");
        let mut request = self.client.post(&url).json(body);
        if let Some(api_key) = config.api_key.as_deref().filter(|key| !key.is_empty()) {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))
    }
}

impl Default for OpenAIClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let body = Self::request_body(config, system, Value::String(user.to_string()));
        self.complete(config, &body).await
    }

    async fn generate_with_image(
        &self,
        config: &LLMConfig,
        system: &str,
        user: &str,
        image: &ImageInput,
    ) -> Result<String> {
        let content = json!([
            { "type": "text", "text": user },
            { "type": "image_url", "image_url": { "url": image.data_url() } }
        ]);
        let body = Self::request_body(config, system, content);
        self.complete(config, &body).await
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        let url = join_url(&config.base_url, "models");
        let mut request = self.client.get(&url);
        if let Some(api_key) = config.api_key.as_deref().filter(|key| !key.is_empty()) {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        let models = json["data"]
            .as_array()
            .ok_or_else(|| {
                AppError::LLMError("Invalid response format: missing data array".to_string())
            })?
            .iter()
            .filter_map(|m| m["id"].as_str())
            .map(|id| id.to_string())
            .collect();

        Ok(models)
    }
}
