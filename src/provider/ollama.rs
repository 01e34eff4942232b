//! Ollama `/api/chat` binding.

use super::{build_provider_http_client, ClientSettings, CompletionOptions, GenerationClient};
use crate::error::EnrichError;
use crate::provider::classify::OutcomeClassifier;
use crate::types::{AttemptOutcome, GenerationRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessage>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Ollama provider client
pub struct OllamaClient {
    client: Client,
    model: String,
    base_url: String,
    classifier: Arc<dyn OutcomeClassifier>,
}

impl OllamaClient {
    pub fn new(
        model: String,
        base_url: Option<String>,
        settings: &ClientSettings,
        classifier: Arc<dyn OutcomeClassifier>,
    ) -> Result<Self, EnrichError> {
        let client = build_provider_http_client(settings)?;
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            model,
            base_url,
            classifier,
        })
    }

    fn parse_body(&self, body: &str) -> AttemptOutcome {
        match serde_json::from_str::<OllamaResponse>(body) {
            Ok(OllamaResponse {
                error: Some(error), ..
            }) => self.classifier.classify_transport(&error, false),
            Ok(OllamaResponse {
                message: Some(message),
                ..
            }) if !message.content.trim().is_empty() => AttemptOutcome::Success(message.content),
            Ok(_) => AttemptOutcome::EmptyReply,
            Err(e) => {
                AttemptOutcome::TransportError(format!("malformed response envelope: {}", e))
            }
        }
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &CompletionOptions,
    ) -> Result<AttemptOutcome, EnrichError> {
        let mut model_options = serde_json::Map::new();
        if let Some(temperature) = options.temperature {
            model_options.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = options.max_tokens {
            model_options.insert("num_predict".to_string(), json!(max_tokens));
        }
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt},
            ],
            "stream": false,
            "format": "json",
            "options": model_options,
        });

        let url = format!("{}/api/chat", self.base_url);
        let response = match self.client.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                return Ok(self
                    .classifier
                    .classify_transport(&e.to_string(), e.is_timeout()))
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                return Ok(self
                    .classifier
                    .classify_transport(&e.to_string(), e.is_timeout()))
            }
        };

        if !status.is_success() {
            return self.classifier.classify_status(status.as_u16(), &text);
        }

        Ok(self.parse_body(&text))
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
