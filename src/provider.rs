//! Generation Provider Abstraction
//!
//! One call to an external text-generation endpoint, classified into an
//! [`AttemptOutcome`]. Retryable conditions are outcomes; only failures that no
//! retry can fix (credentials, unknown model) come back as [`EnrichError`].

use crate::error::EnrichError;
use crate::types::{AttemptOutcome, GenerationRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

pub mod classify;
pub mod ollama;
pub mod openai;

pub use classify::{DefaultClassifier, OutcomeClassifier};
pub use ollama::OllamaClient;
pub use openai::OpenAiCompatibleClient;

/// Endpoint binding, resolved from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    /// Any `/chat/completions` endpoint (OpenAI, Hugging Face router, vLLM)
    OpenAI {
        model: String,
        api_key: String,
        base_url: Option<String>,
    },
    Ollama {
        model: String,
        base_url: Option<String>, // Default: http://localhost:11434
    },
}

impl ModelProvider {
    pub fn model(&self) -> &str {
        match self {
            ModelProvider::OpenAI { model, .. } | ModelProvider::Ollama { model, .. } => model,
        }
    }
}

/// Completion options sent with every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    /// Maximum reply length in tokens
    pub max_tokens: Option<u32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.3),
            max_tokens: Some(1024),
        }
    }
}

/// HTTP settings shared by the bindings
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Minimum spacing between calls across all workers
    pub min_request_interval: Option<Duration>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            min_request_interval: None,
        }
    }
}

/// Generation endpoint client
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Perform one bounded call and classify what happened.
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &CompletionOptions,
    ) -> Result<AttemptOutcome, EnrichError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

pub(crate) fn build_provider_http_client(settings: &ClientSettings) -> Result<Client, EnrichError> {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|e| EnrichError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

/// Spaces calls through a shared minimum interval.
pub struct PacedClient {
    inner: Arc<dyn GenerationClient>,
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl PacedClient {
    pub fn new(inner: Arc<dyn GenerationClient>, min_delay: Duration) -> Self {
        Self {
            inner,
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    /// Reserve the next call slot and return how long to wait for it.
    fn reserve_slot(&self) -> Duration {
        let mut last = self.last_request.lock();
        let now = Instant::now();
        let slot = match *last {
            Some(prev) if prev + self.min_delay > now => prev + self.min_delay,
            _ => now,
        };
        *last = Some(slot);
        slot.saturating_duration_since(now)
    }
}

#[async_trait]
impl GenerationClient for PacedClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &CompletionOptions,
    ) -> Result<AttemptOutcome, EnrichError> {
        let wait = self.reserve_slot();
        if !wait.is_zero() {
            sleep(wait).await;
        }
        self.inner.generate(request, options).await
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Provider factory
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        provider: &ModelProvider,
        settings: &ClientSettings,
        classifier: Arc<dyn OutcomeClassifier>,
    ) -> Result<Arc<dyn GenerationClient>, EnrichError> {
        let client: Arc<dyn GenerationClient> = match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => {
                if api_key.trim().is_empty() {
                    return Err(EnrichError::ProviderNotConfigured(
                        "API key is empty".to_string(),
                    ));
                }
                Arc::new(OpenAiCompatibleClient::new(
                    model.clone(),
                    api_key.clone(),
                    base_url.clone(),
                    settings,
                    classifier,
                )?)
            }
            ModelProvider::Ollama { model, base_url } => Arc::new(OllamaClient::new(
                model.clone(),
                base_url.clone(),
                settings,
                classifier,
            )?),
        };

        Ok(match settings.min_request_interval {
            Some(interval) if !interval.is_zero() => Arc::new(PacedClient::new(client, interval)),
            _ => client,
        })
    }
}

// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    outcomes: Vec<AttemptOutcome>,
    current: std::sync::Mutex<usize>,
    pub seen_excerpt_chars: std::sync::Mutex<Vec<usize>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(outcomes: Vec<AttemptOutcome>) -> Self {
        Self {
            outcomes,
            current: std::sync::Mutex::new(0),
            seen_excerpt_chars: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl GenerationClient for MockProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
        _options: &CompletionOptions,
    ) -> Result<AttemptOutcome, EnrichError> {
        self.seen_excerpt_chars
            .lock()
            .unwrap()
            .push(request.excerpt_chars());
        let mut idx = self.current.lock().unwrap();
        let outcome = self
            .outcomes
            .get(*idx)
            .cloned()
            .unwrap_or(AttemptOutcome::EmptyReply);
        *idx += 1;
        Ok(outcome)
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
