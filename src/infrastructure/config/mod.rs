use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::RetryPolicy;
use crate::infrastructure::security::keyring::KeyringManager;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "brd-testgen.toml";
pub const ENV_PREFIX: &str = "BRD_TESTGEN_";
pub const KEYRING_SERVICE: &str = "brd-testgen";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Knobs for the stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Reported requirement counts below this are not trusted.
    pub requirement_floor: usize,
    /// Synthesis target used when the reported count is under the floor.
    pub target_floor: usize,
    pub coverage_prefix_chars: usize,
    /// Test cases included in coverage and mapping prompts.
    pub summary_limit: usize,
    pub requirement_preview: usize,
    pub description_preview_chars: usize,
    pub ui_concurrency: usize,
    pub retry: RetryPolicy,
    pub prompt_template_path: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            requirement_floor: 30,
            target_floor: 35,
            coverage_prefix_chars: 15_000,
            summary_limit: 100,
            requirement_preview: 10,
            description_preview_chars: 150,
            ui_concurrency: 1,
            retry: RetryPolicy::default(),
            prompt_template_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub llm: LLMConfig,
    pub pipeline: PipelineSettings,
}

impl AppSettings {
    /// Defaults, then the TOML file if present, then `BRD_TESTGEN_*` variables
    /// (`BRD_TESTGEN_LLM__MODEL=gpt-4o-mini` sets `llm.model`).
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        Self::figment(&path).extract().map_err(AppError::from)
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppSettings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.target_floor < self.pipeline.requirement_floor {
            return Err(AppError::ConfigError(format!(
                "target_floor ({}) must not be below requirement_floor ({})",
                self.pipeline.target_floor, self.pipeline.requirement_floor
            )));
        }
        if self.pipeline.ui_concurrency == 0 {
            return Err(AppError::ConfigError(
                "ui_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ConfigService {
    keyring: KeyringManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self {
            keyring: KeyringManager::new(KEYRING_SERVICE),
        }
    }

    /// Loads settings and fills in the API key from the OS keyring when
    /// neither the file nor the environment supplied one.
    pub fn load(&self, config_path: Option<&Path>) -> Result<AppSettings> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }

        let mut settings = AppSettings::load(config_path)?;
        settings.validate()?;

        let has_key = settings
            .llm
            .api_key
            .as_deref()
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false);
        if !has_key && settings.llm.provider.requires_api_key() {
            match self.get_api_key(settings.llm.provider.as_str()) {
                Ok(key) => {
                    info!(provider = settings.llm.provider.as_str(), "Using API key from keyring");
                    settings.llm.api_key = Some(key);
                }
                Err(err) => debug!(error = %err, "No API key in keyring"),
            }
        }

        Ok(settings)
    }

    pub fn save_api_key(&self, provider: &str, key: &str) -> Result<()> {
        self.keyring.set_secret(provider, key)
    }

    pub fn get_api_key(&self, provider: &str) -> Result<String> {
        self.keyring.get_secret(provider)
    }

    pub fn delete_api_key(&self, provider: &str) -> Result<()> {
        self.keyring.delete_secret(provider)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm_config::LLMProvider;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings: AppSettings = AppSettings::figment(&dir.path().join("missing.toml"))
            .extract()
            .unwrap();
        assert_eq!(settings.pipeline, PipelineSettings::default());
        assert_eq!(settings.pipeline.retry.max_attempts, 1);
        assert_eq!(settings.llm.model, "gpt-4o");
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[llm]\nprovider = \"Gemini\"\nmodel = \"gemini-1.5-pro\"\n\n[pipeline]\nui_concurrency = 4\n\n[pipeline.retry]\nmax_attempts = 3"
        )
        .unwrap();

        let settings: AppSettings = AppSettings::figment(&path).extract().unwrap();
        assert_eq!(settings.llm.provider, LLMProvider::Gemini);
        assert_eq!(settings.llm.model, "gemini-1.5-pro");
        assert_eq!(settings.pipeline.ui_concurrency, 4);
        assert_eq!(settings.pipeline.retry.max_attempts, 3);
        assert_eq!(settings.pipeline.retry.base_delay_ms, 500);
        assert_eq!(settings.pipeline.target_floor, 35);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "[server]\nport = 9000\n")?;
            jail.set_env("BRD_TESTGEN_SERVER__PORT", "9100");
            jail.set_env("BRD_TESTGEN_PIPELINE__SUMMARY_LIMIT", "50");
            let settings: AppSettings = AppSettings::figment(Path::new(CONFIG_FILE)).extract()?;
            assert_eq!(settings.server.port, 9100);
            assert_eq!(settings.pipeline.summary_limit, 50);
            Ok(())
        });
    }

    #[test]
    fn test_floor_order_validated() {
        let mut settings = AppSettings::default();
        settings.pipeline.target_floor = 10;
        assert!(matches!(settings.validate(), Err(AppError::ConfigError(_))));
    }
}
