//! Test double that replays queued responses and records every request.

use super::{ImageInput, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub json_mode: bool,
    pub system: String,
    pub user: String,
    pub with_image: bool,
}

pub(crate) struct ScriptedClient {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(responses.into_iter().map(|text| Ok(text.into())))
    }

    pub fn with_results(results: impl IntoIterator<Item = Result<String>>) -> Self {
        Self {
            responses: Mutex::new(results.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, config: &LLMConfig, system: &str, user: &str, with_image: bool) -> Result<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            json_mode: config.json_mode,
            system: system.to_string(),
            user: user.to_string(),
            with_image,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::LLMError("No scripted response left".to_string())))
    }
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        self.next(config, system, user, false)
    }

    async fn generate_with_image(
        &self,
        config: &LLMConfig,
        system: &str,
        user: &str,
        _image: &ImageInput,
    ) -> Result<String> {
        self.next(config, system, user, true)
    }

    async fn list_models(&self, _config: &LLMConfig) -> Result<Vec<String>> {
        Ok(vec!["scripted-model".to_string()])
    }
}
