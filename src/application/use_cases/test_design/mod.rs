mod coverage;
mod hashing;
mod prompts;
mod requirements;
mod synthesis;
mod text;
mod ui_mapping;

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{CallProfile, LLMConfig};
use crate::domain::oracle_run::OracleRun;
use crate::infrastructure::config::PipelineSettings;
use crate::infrastructure::llm_clients::{ImageInput, LLMClient};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use hashing::input_digest;
use text::preview_text;

pub use requirements::target_count;
pub use ui_mapping::ScreenshotInput;

const PROMPT_VERSION: &str = "v1";

/// The four oracle-backed stages. Every stage degrades into its result type
/// instead of returning an error, so one bad response never aborts a run.
#[derive(Clone)]
pub struct TestDesignUseCase {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
    settings: PipelineSettings,
    synthesis_framework: Option<String>,
}

struct OracleReply {
    response: Result<String>,
    run: OracleRun,
}

impl TestDesignUseCase {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        config: LLMConfig,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            llm_client,
            config,
            settings,
            synthesis_framework: None,
        }
    }

    pub fn with_synthesis_framework(mut self, framework: impl Into<String>) -> Self {
        self.synthesis_framework = Some(framework.into());
        self
    }

    /// Reads the framework file named by `prompt_template_path`, if any.
    pub fn load_synthesis_framework(self) -> Result<Self> {
        let Some(path) = self.settings.prompt_template_path.clone() else {
            return Ok(self);
        };
        let framework = read_framework(&path)?;
        info!(path = %path.display(), chars = framework.len(), "Loaded synthesis framework");
        Ok(self.with_synthesis_framework(framework))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    fn framework(&self) -> &str {
        self.synthesis_framework
            .as_deref()
            .unwrap_or(prompts::DEFAULT_SYNTHESIS_FRAMEWORK)
    }

    async fn ask(
        &self,
        profile: CallProfile,
        system: &str,
        user: &str,
        image: Option<&ImageInput>,
    ) -> OracleReply {
        let config = self.config.for_call(profile);
        let run = OracleRun::new(
            profile,
            &config,
            PROMPT_VERSION,
            input_digest(&config.model, system, user),
        );

        let started = Instant::now();
        let response = match image {
            Some(image) => {
                self.llm_client
                    .generate_with_image(&config, system, user, image)
                    .await
            }
            None => self.llm_client.generate(&config, system, user).await,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &response {
            Ok(text) => info!(
                stage = profile.as_str(),
                run_id = %run.id,
                elapsed_ms,
                response_chars = text.len(),
                "Oracle call completed"
            ),
            Err(err) => warn!(
                stage = profile.as_str(),
                run_id = %run.id,
                elapsed_ms,
                error = %err,
                "Oracle call failed"
            ),
        }

        OracleReply { response, run }
    }
}

fn read_framework(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(format!(
            "Failed to read prompt template {}: {}",
            path.display(),
            e
        ))
    })?;
    if content.trim().is_empty() {
        return Err(AppError::ConfigError(format!(
            "Prompt template {} is empty",
            path.display()
        )));
    }
    Ok(content)
}

/// Log line for a response the parser could not use.
fn log_unusable(stage: CallProfile, raw: &str) {
    warn!(
        stage = stage.as_str(),
        preview = %preview_text(raw, 200),
        "Oracle response could not be parsed"
    );
}
