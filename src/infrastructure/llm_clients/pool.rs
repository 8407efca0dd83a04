//! Bounded worker pool for provider calls.
//!
//! Every completion runs on its own tokio task, gated by a semaphore sized
//! by `provider_workers` and cut off after `provider_timeout_secs`. Dropping
//! the returned [`ProviderTask`] aborts the call, so an abandoned request
//! never keeps a worker slot busy.

use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone)]
pub struct GenerationPool {
    client: Arc<dyn LLMClient>,
    config: LLMConfig,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl GenerationPool {
    pub fn new(
        client: Arc<dyn LLMClient>,
        config: LLMConfig,
        workers: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            config,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            timeout,
        }
    }

    pub fn submit(&self, request: CompletionRequest) -> ProviderTask {
        let client = Arc::clone(&self.client);
        let permits = Arc::clone(&self.permits);
        let config = self
            .config
            .with_sampling(request.temperature, request.max_tokens);
        let timeout = self.timeout;

        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(format!("Provider pool closed: {}", e)))?;

            match tokio::time::timeout(
                timeout,
                client.generate(&config, &request.system, &request.user),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout(format!(
                    "Provider did not respond within {}s",
                    timeout.as_secs()
                ))),
            }
        });

        ProviderTask { handle }
    }

    pub async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.submit(request).wait().await
    }

    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Handle to an in-flight provider call. Aborts the call when dropped.
pub struct ProviderTask {
    handle: JoinHandle<Result<String>>,
}

impl ProviderTask {
    pub async fn wait(mut self) -> Result<String> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => Err(AppError::Internal(format!("Provider task failed: {}", e))),
        }
    }
}

impl Drop for ProviderTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct SlowClient {
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
        finished: Arc<AtomicBool>,
    }

    impl SlowClient {
        fn new(delay_ms: u64) -> Self {
            Self {
                delay: Duration::from_millis(delay_ms),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                finished: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl LLMClient for SlowClient {
        async fn generate(&self, config: &LLMConfig, _system: &str, user: &str) -> Result<String> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.finished.store(true, Ordering::SeqCst);
            Ok(format!("{}@{}", user, config.temperature.unwrap_or_default()))
        }
    }

    fn request(user: &str) -> CompletionRequest {
        CompletionRequest {
            system: "sys".to_string(),
            user: user.to_string(),
            temperature: 0.3,
            max_tokens: 500,
        }
    }

    #[tokio::test]
    async fn test_complete_applies_sampling() {
        let pool = GenerationPool::new(
            Arc::new(SlowClient::new(1)),
            LLMConfig::default(),
            2,
            Duration::from_secs(5),
        );
        let out = pool.complete(request("hi")).await.unwrap();
        assert_eq!(out, "hi@0.3");
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let client = Arc::new(SlowClient::new(30));
        let pool = GenerationPool::new(
            client.clone(),
            LLMConfig::default(),
            2,
            Duration::from_secs(5),
        );

        let tasks: Vec<_> = (0..6).map(|i| pool.submit(request(&i.to_string()))).collect();
        for task in tasks {
            task.wait().await.unwrap();
        }

        assert!(client.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available_workers(), 2);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        let pool = GenerationPool::new(
            Arc::new(SlowClient::new(500)),
            LLMConfig::default(),
            1,
            Duration::from_millis(20),
        );
        let err = pool.complete(request("late")).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_dropping_task_aborts_call() {
        let client = Arc::new(SlowClient::new(50));
        let finished = Arc::clone(&client.finished);
        let pool = GenerationPool::new(client, LLMConfig::default(), 1, Duration::from_secs(5));

        let task = pool.submit(request("abandoned"));
        tokio::time::sleep(Duration::from_millis(5)).await;
        drop(task);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!finished.load(Ordering::SeqCst));
        assert_eq!(pool.available_workers(), 1);
    }
}
