use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Oracle cannot be used at all (credentials, model, endpoint).
    #[error("LLM initialization error: {0}")]
    LLMInit(String),
    /// Oracle call failed and repeating it will not help.
    #[error("LLM error: {0}")]
    LLMError(String),
    /// Oracle call failed for a reason that may clear up (network, rate limit, 5xx).
    #[error("LLM unavailable: {0}")]
    LLMUnavailable(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("Security error: {0}")]
    SecurityError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl AppError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::LLMUnavailable(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
