//! Shared fixtures: scripted generation clients and record builders.

use async_trait::async_trait;
use gist::content::NoFullText;
use gist::enrich::{Enricher, PipelineSettings};
use gist::error::EnrichError;
use gist::prompt::PromptBuilder;
use gist::provider::{CompletionOptions, GenerationClient};
use gist::record::PaperRecord;
use gist::types::{AttemptOutcome, GenerationRequest};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub const VALID_REPLY: &str =
    r#"{"tldr":"Short","motivation":"Why","method":"How","result":"What","conclusion":"So"}"#;

type Script = dyn Fn(&GenerationRequest, usize) -> Result<AttemptOutcome, EnrichError> + Send + Sync;

/// Client whose reply is computed from the request and the global call number.
pub struct ScriptedClient {
    script: Box<Script>,
    /// Excerpt length of every request, in call order
    pub seen: Mutex<Vec<usize>>,
    /// Delay derived from the excerpt, so completion order differs from input order
    pub jitter: bool,
}

impl ScriptedClient {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&GenerationRequest, usize) -> Result<AttemptOutcome, EnrichError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            script: Box::new(script),
            seen: Mutex::new(Vec::new()),
            jitter: false,
        }
    }

    pub fn always(outcome: AttemptOutcome) -> Self {
        Self::new(move |_, _| Ok(outcome.clone()))
    }

    /// Deterministic reply that echoes the first word of the excerpt.
    pub fn echo() -> Self {
        Self::new(|request, _| Ok(AttemptOutcome::Success(echo_reply(&request.excerpt))))
    }

    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }
}

pub fn echo_reply(excerpt: &str) -> String {
    let head = excerpt.split_whitespace().next().unwrap_or("none");
    serde_json::json!({
        "tldr": format!("About {}", head),
        "motivation": "m",
        "method": "x",
        "result": "r",
        "conclusion": "c",
    })
    .to_string()
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
        _options: &CompletionOptions,
    ) -> Result<AttemptOutcome, EnrichError> {
        let call = {
            let mut seen = self.seen.lock();
            seen.push(request.excerpt_chars());
            seen.len()
        };
        if self.jitter {
            let millis = (request.excerpt.bytes().map(u64::from).sum::<u64>() % 7) * 3;
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
        (self.script)(request, call)
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// Pipeline settings with zero backoff and a small shrink floor.
pub fn fast_settings() -> PipelineSettings {
    let mut settings = PipelineSettings::default();
    settings.retry.base_delay = Duration::ZERO;
    settings.retry.max_delay = Duration::ZERO;
    settings.retry.min_content_chars = 50;
    settings
}

pub fn enricher(client: Arc<dyn GenerationClient>, settings: PipelineSettings) -> Arc<Enricher> {
    Arc::new(Enricher::new(
        client,
        Arc::new(NoFullText),
        PromptBuilder::default(),
        settings,
    ))
}

pub fn records(n: usize) -> Vec<PaperRecord> {
    (0..n)
        .map(|i| {
            PaperRecord::new(
                format!("2401.{:05}", i),
                format!("Paper {}", i),
                format!("Topic{} studies something measurable in detail.", i),
            )
        })
        .collect()
}
