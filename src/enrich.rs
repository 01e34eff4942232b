//! Per-record enrichment: resolve, size, generate, validate, fall back.

use crate::budget::{estimate_tokens, excerpt_tokens, fit_excerpt};
use crate::content::{resolve_content, FullTextSource};
use crate::error::EnrichError;
use crate::fallback;
use crate::prompt::PromptBuilder;
use crate::provider::{CompletionOptions, GenerationClient};
use crate::record::PaperRecord;
use crate::retry::{AttemptRecord, RetryController, RetryPolicy};
use crate::types::{EnrichmentResult, SummarySource};
use crate::validate::ValidationStage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable per-run settings for the enrichment chain
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub language: String,
    /// Upper bound on excerpt length, in characters
    pub max_content_chars: usize,
    /// Token window used for the pre-send size check
    pub context_window_tokens: usize,
    pub options: CompletionOptions,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            language: "Chinese".to_string(),
            max_content_chars: 4000,
            context_window_tokens: 8192,
            options: CompletionOptions::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Everything known about one record after enrichment
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub summary: EnrichmentResult,
    pub source: SummarySource,
    pub stage: Option<ValidationStage>,
    pub attempts: Vec<AttemptRecord>,
}

impl RecordOutcome {
    /// Outcome for a record whose enrichment never completed.
    /// `full_text_available` is what content resolution found, if it ran.
    pub fn fallback_only(record: &PaperRecord, full_text_available: bool) -> Self {
        Self {
            summary: fallback::synthesize(record, full_text_available),
            source: SummarySource::Fallback,
            stage: None,
            attempts: Vec::new(),
        }
    }
}

/// Runs the enrichment chain for single records
pub struct Enricher {
    client: Arc<dyn GenerationClient>,
    full_text: Arc<dyn FullTextSource>,
    builder: PromptBuilder,
    settings: PipelineSettings,
}

impl Enricher {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        full_text: Arc<dyn FullTextSource>,
        builder: PromptBuilder,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            client,
            full_text,
            builder,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Enrich one record. `Err` only for run-level failures.
    pub async fn enrich(&self, record: &PaperRecord) -> Result<RecordOutcome, EnrichError> {
        self.enrich_tracked(record, &AtomicBool::new(false)).await
    }

    /// [`Enricher::enrich`], also setting `full_text_seen` as soon as content
    /// resolution picks the full text. Lets a caller that abandons the future
    /// still build an accurate fallback.
    pub async fn enrich_tracked(
        &self,
        record: &PaperRecord,
        full_text_seen: &AtomicBool,
    ) -> Result<RecordOutcome, EnrichError> {
        let content = resolve_content(self.full_text.as_ref(), record).await;
        full_text_seen.store(content.from_full_text, Ordering::Relaxed);
        let fallback_summary = fallback::synthesize(record, content.from_full_text);

        if content.text.trim().is_empty() {
            debug!(record_id = %record.id, "No content to summarize");
            return Ok(RecordOutcome {
                summary: fallback_summary,
                source: SummarySource::Fallback,
                stage: None,
                attempts: Vec::new(),
            });
        }

        let initial_chars = self.initial_budget(&content.text);
        let report = RetryController::new(
            self.client.as_ref(),
            &self.builder,
            &self.settings.options,
            &self.settings.retry,
        )
        .run(&record.id, &content.text, &self.settings.language, initial_chars)
        .await?;

        match report.reply {
            Some(reply) => {
                let mut summary = reply.summary;
                if !summary.is_complete() {
                    debug!(record_id = %record.id, "Filling blank fields from fallback");
                    summary.fill_blanks_from(&fallback_summary);
                }
                Ok(RecordOutcome {
                    summary,
                    source: SummarySource::Generated,
                    stage: Some(reply.stage),
                    attempts: report.attempts,
                })
            }
            None => {
                warn!(
                    record_id = %record.id,
                    attempts = report.attempts.len(),
                    "Attempts exhausted, using fallback summary"
                );
                Ok(RecordOutcome {
                    summary: fallback_summary,
                    source: SummarySource::Fallback,
                    stage: None,
                    attempts: report.attempts,
                })
            }
        }
    }

    /// Starting excerpt length: the configured maximum, cut further when the
    /// estimated prompt would not fit the context window.
    pub fn initial_budget(&self, content: &str) -> usize {
        let window = self.settings.context_window_tokens;
        let floor = self.settings.retry.min_content_chars;
        let reply_tokens = self.settings.options.max_tokens.unwrap_or(0) as usize;
        let mut chars = self.settings.max_content_chars;

        // Estimates are not linear in the excerpt (rounding, mixed scripts), so
        // re-check after every cut. Each pass is strictly shorter.
        for _ in 0..MAX_FIT_PASSES {
            let request = self.builder.build(content, &self.settings.language, chars);
            let current = request.excerpt_chars();
            let estimate = estimate_tokens(
                &format!("{}{}", request.system_prompt, request.user_prompt),
                reply_tokens,
            );
            if estimate <= window {
                return current;
            }
            let fitted = fit_excerpt(current, estimate, excerpt_tokens(&request.excerpt), window, floor);
            if fitted >= current {
                return current;
            }
            debug!(estimate, window, from = current, to = fitted, "Pre-shrinking excerpt to fit context window");
            chars = fitted;
        }
        chars
    }
}

const MAX_FIT_PASSES: usize = 16;
