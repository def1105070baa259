pub mod gemini;
pub mod image;
pub mod openai;
pub mod retry;
#[cfg(test)]
pub(crate) mod scripted;

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::llm_config::LLMProvider;
use async_trait::async_trait;
use gemini::GeminiClient;
use openai::OpenAIClient;

pub use image::ImageInput;
pub use retry::{RetryPolicy, RetryingClient};

#[async_trait]
pub trait LLMClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String>;
    async fn generate_with_image(
        &self,
        config: &LLMConfig,
        system: &str,
        user: &str,
        image: &ImageInput,
    ) -> Result<String>;
    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>>;
}

pub struct RouterClient {
    openai: OpenAIClient,
    gemini: GeminiClient,
}

impl RouterClient {
    pub fn new() -> Self {
        Self {
            openai: OpenAIClient::new(),
            gemini: GeminiClient::new(),
        }
    }
}

impl Default for RouterClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for RouterClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        match config.provider {
            LLMProvider::Gemini => self.gemini.generate(config, system, user).await,
            _ => self.openai.generate(config, system, user).await,
        }
    }

    async fn generate_with_image(
        &self,
        config: &LLMConfig,
        system: &str,
        user: &str,
        image: &ImageInput,
    ) -> Result<String> {
        match config.provider {
            LLMProvider::Gemini => {
                self.gemini
                    .generate_with_image(config, system, user, image)
                    .await
            }
            _ => {
                self.openai
                    .generate_with_image(config, system, user, image)
                    .await
            }
        }
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        match config.provider {
            LLMProvider::Gemini => self.gemini.list_models(config).await,
            _ => self.openai.list_models(config).await,
        }
    }
}

/// Maps a non-success HTTP status to the error kind callers branch on.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> AppError {
    let message = format!("API error ({}): {}", status, body);
    match status.as_u16() {
        401 | 403 => AppError::LLMInit(message),
        429 | 500..=599 => AppError::LLMUnavailable(message),
        _ => AppError::LLMError(message),
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> AppError {
    AppError::LLMUnavailable(format!("Request failed: {}", err))
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            AppError::LLMInit(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, ""),
            AppError::LLMInit(_)
        ));
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(status_error(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "context length"),
            AppError::LLMError(_)
        ));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://api.openai.com/v1/", "chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(join_url("http://localhost:1234/v1", "models"), "http://localhost:1234/v1/models");
    }
}
