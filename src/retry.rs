//! Retry controller: bounded attempts with backoff and capacity-driven shrinking.
//!
//! Each attempt renders a fresh request at the active excerpt length. A
//! capacity failure shrinks that length for the next attempt. Every other
//! failure (rate limit, transport, timeout, empty or invalid reply) sleeps
//! for a growing backoff interval first. The active length never grows.

use crate::error::EnrichError;
use crate::prompt::PromptBuilder;
use crate::provider::{CompletionOptions, GenerationClient};
use crate::types::{AttemptOutcome, OutcomeKind};
use crate::validate::{validate_reply, ValidatedReply};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Tunables for one record's retry sequence
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts before giving up (at least 1)
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Share of the current excerpt kept after a capacity failure
    pub shrink_factor: f64,
    /// Excerpts are never shrunk below this many characters
    pub min_content_chars: usize,
    /// When false, a capacity retry that actually shrank the excerpt is free
    pub shrink_counts_as_attempt: bool,
    /// Deadline for a single call, on top of the client's own timeout
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            shrink_factor: 0.65,
            min_content_chars: 500,
            shrink_counts_as_attempt: true,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Sleep before the attempt following failed attempt number `failed` (1-based).
    pub fn backoff(&self, failed: usize) -> Duration {
        let exp = failed.saturating_sub(1).min(32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exp);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Next excerpt length after a capacity failure at `current` characters.
    pub fn shrink(&self, current: usize) -> usize {
        let shrunk = (current as f64 * self.shrink_factor).floor() as usize;
        shrunk.max(self.min_content_chars).min(current)
    }
}

/// What happened on one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub attempt: usize,
    pub excerpt_chars: usize,
    pub outcome: OutcomeKind,
}

/// Result of a full retry sequence
#[derive(Debug, Clone)]
pub struct RetryReport {
    /// Validated reply, or `None` when attempts were exhausted
    pub reply: Option<ValidatedReply>,
    pub attempts: Vec<AttemptRecord>,
}

impl RetryReport {
    pub fn shrinks(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome == OutcomeKind::CapacityExceeded)
            .count()
    }
}

/// Drives one record through the generation client
pub struct RetryController<'a> {
    client: &'a dyn GenerationClient,
    builder: &'a PromptBuilder,
    options: &'a CompletionOptions,
    policy: &'a RetryPolicy,
}

impl<'a> RetryController<'a> {
    pub fn new(
        client: &'a dyn GenerationClient,
        builder: &'a PromptBuilder,
        options: &'a CompletionOptions,
        policy: &'a RetryPolicy,
    ) -> Self {
        Self {
            client,
            builder,
            options,
            policy,
        }
    }

    /// Run attempts until a reply validates or the budget is spent.
    ///
    /// Only fatal client errors are returned as `Err`.
    pub async fn run(
        &self,
        record_id: &str,
        content: &str,
        language: &str,
        initial_chars: usize,
    ) -> Result<RetryReport, EnrichError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut active = initial_chars;
        let mut counted = 0usize;
        let mut attempts = Vec::new();

        while counted < max_attempts {
            let request = self.builder.build(content, language, active);
            let excerpt_chars = request.excerpt_chars();
            let attempt = attempts.len() + 1;
            let start = Instant::now();

            debug!(record_id, attempt, excerpt_chars, "Provider request sent");
            let outcome = match self.policy.attempt_timeout {
                Some(limit) => match timeout(limit, self.client.generate(&request, self.options)).await {
                    Ok(result) => result?,
                    Err(_) => AttemptOutcome::Timeout,
                },
                None => self.client.generate(&request, self.options).await?,
            };

            let (kind, validated) = match outcome {
                AttemptOutcome::Success(reply) => match validate_reply(&reply) {
                    Some(v) => (OutcomeKind::Success, Some(v)),
                    None => (OutcomeKind::InvalidReply, None),
                },
                other => (other.kind(), None),
            };
            let duration_ms = start.elapsed().as_millis() as u64;
            attempts.push(AttemptRecord {
                attempt,
                excerpt_chars,
                outcome: kind,
            });

            if let Some(reply) = validated {
                info!(
                    record_id,
                    attempt,
                    excerpt_chars,
                    duration_ms,
                    stage = ?reply.stage,
                    "Provider response accepted"
                );
                return Ok(RetryReport {
                    reply: Some(reply),
                    attempts,
                });
            }

            warn!(
                record_id,
                attempt,
                excerpt_chars,
                duration_ms,
                outcome = %kind,
                "Provider attempt failed"
            );

            if kind == OutcomeKind::CapacityExceeded {
                let next = self.policy.shrink(active.min(excerpt_chars));
                let shrunk = next < excerpt_chars;
                if self.policy.shrink_counts_as_attempt || !shrunk {
                    counted += 1;
                }
                debug!(record_id, from = excerpt_chars, to = next, "Shrinking excerpt");
                active = next;
            } else {
                counted += 1;
                if counted < max_attempts {
                    let delay = self.policy.backoff(counted);
                    debug!(record_id, delay_ms = delay.as_millis() as u64, "Backing off");
                    sleep(delay).await;
                }
            }
        }

        Ok(RetryReport {
            reply: None,
            attempts,
        })
    }
}
