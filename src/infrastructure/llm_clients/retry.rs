use super::{ImageInput, LLMClient};
use crate::domain::error::Result;
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retrying.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 500,
            max_delay_ms: 8000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base * 2^(retry-1), capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        let delay = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// Retries transient oracle failures. Anything other than
/// `AppError::LLMUnavailable` is returned on the first occurrence.
pub struct RetryingClient {
    inner: Arc<dyn LLMClient + Send + Sync>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn LLMClient + Send + Sync>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn run<F, Fut, T>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Err(err) if err.is_transient() && attempt < attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient oracle failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl LLMClient for RetryingClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        self.run("generate", || self.inner.generate(config, system, user))
            .await
    }

    async fn generate_with_image(
        &self,
        config: &LLMConfig,
        system: &str,
        user: &str,
        image: &ImageInput,
    ) -> Result<String> {
        self.run("generate_with_image", || {
            self.inner.generate_with_image(config, system, user, image)
        })
        .await
    }

    async fn list_models(&self, config: &LLMConfig) -> Result<Vec<String>> {
        self.run("list_models", || self.inner.list_models(config))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::AppError;
    use std::sync::Mutex;

    struct FlakyClient {
        failures: Mutex<Vec<AppError>>,
        calls: Mutex<u32>,
    }

    impl FlakyClient {
        fn new(failures: Vec<AppError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl LLMClient for FlakyClient {
        async fn generate(&self, _: &LLMConfig, _: &str, _: &str) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok("ok".to_string())
            } else {
                Err(failures.remove(0))
            }
        }

        async fn generate_with_image(
            &self,
            config: &LLMConfig,
            system: &str,
            user: &str,
            _: &ImageInput,
        ) -> Result<String> {
            self.generate(config, system, user).await
        }

        async fn list_models(&self, _: &LLMConfig) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[test]
    fn test_delay_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(10), Duration::from_millis(8000));
    }

    #[tokio::test]
    async fn test_default_policy_does_not_retry() {
        let inner = Arc::new(FlakyClient::new(vec![AppError::LLMUnavailable("503".into())]));
        let client = RetryingClient::new(inner.clone(), RetryPolicy::default());
        let result = client.generate(&LLMConfig::default(), "s", "u").await;
        assert!(matches!(result, Err(AppError::LLMUnavailable(_))));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let inner = Arc::new(FlakyClient::new(vec![
            AppError::LLMUnavailable("429".into()),
            AppError::LLMUnavailable("502".into()),
        ]));
        let client = RetryingClient::new(inner.clone(), fast_policy(3));
        let result = client.generate(&LLMConfig::default(), "s", "u").await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let inner = Arc::new(FlakyClient::new(vec![AppError::LLMError("400".into())]));
        let client = RetryingClient::new(inner.clone(), fast_policy(5));
        assert!(client.generate(&LLMConfig::default(), "s", "u").await.is_err());
        assert_eq!(inner.calls(), 1);
    }
}
