//! OpenAI-compatible `/chat/completions` binding.

use super::{build_provider_http_client, ClientSettings, CompletionOptions, GenerationClient};
use crate::error::EnrichError;
use crate::provider::classify::OutcomeClassifier;
use crate::types::{AttemptOutcome, GenerationRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [OpenAIMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Client for any endpoint speaking the OpenAI chat-completions dialect
pub struct OpenAiCompatibleClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
    classifier: Arc<dyn OutcomeClassifier>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        model: String,
        api_key: String,
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
            api_key,
            base_url,
            classifier,
        })
    }
}

/// Pull the reply text out of a chat-completions response body.
pub(crate) fn parse_completion_body(body: &str) -> AttemptOutcome {
    match serde_json::from_str::<ChatCompletionResponse>(body) {
        Ok(completion) => match completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
        {
            Some(text) if !text.trim().is_empty() => AttemptOutcome::Success(text),
            _ => AttemptOutcome::EmptyReply,
        },
        Err(e) => AttemptOutcome::TransportError(format!("malformed response envelope: {}", e)),
    }
}

#[async_trait]
impl GenerationClient for OpenAiCompatibleClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
        options: &CompletionOptions,
    ) -> Result<AttemptOutcome, EnrichError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                OpenAIMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                OpenAIMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = match self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
        {
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

        Ok(parse_completion_body(&text))
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
