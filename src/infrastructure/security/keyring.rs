use crate::domain::error::{AppError, Result};
use keyring::Entry;

/// API keys stored in the OS credential store, one entry per provider.
pub struct KeyringManager {
    service: String,
}

impl KeyringManager {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, provider: &str) -> Result<Entry> {
        Entry::new(&self.service, provider)
            .map_err(|e| AppError::SecurityError(format!("Failed to open keyring entry: {}", e)))
    }

    pub fn set_secret(&self, provider: &str, secret: &str) -> Result<()> {
        self.entry(provider)?
            .set_password(secret)
            .map_err(|e| AppError::SecurityError(format!("Failed to store API key: {}", e)))
    }

    pub fn get_secret(&self, provider: &str) -> Result<String> {
        self.entry(provider)?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => {
                AppError::NotFound(format!("No stored API key for {}", provider))
            }
            other => AppError::SecurityError(format!("Failed to read API key: {}", other)),
        })
    }

    pub fn delete_secret(&self, provider: &str) -> Result<()> {
        self.entry(provider)?
            .delete_credential()
            .map_err(|e| AppError::SecurityError(format!("Failed to delete API key: {}", e)))
    }
}
