//! Core value types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the five summary fields, in output order.
pub const SUMMARY_FIELDS: [&str; 5] = ["tldr", "motivation", "method", "result", "conclusion"];

/// Structured AI summary attached to one paper record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub tldr: String,
    pub motivation: String,
    pub method: String,
    pub result: String,
    pub conclusion: String,
}

impl EnrichmentResult {
    /// Field values paired with their names, in output order.
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("tldr", &self.tldr),
            ("motivation", &self.motivation),
            ("method", &self.method),
            ("result", &self.result),
            ("conclusion", &self.conclusion),
        ]
    }

    /// True when every field carries non-whitespace text.
    pub fn is_complete(&self) -> bool {
        self.fields().iter().all(|(_, v)| !v.trim().is_empty())
    }

    /// Replace blank fields with the matching field of `other`.
    pub fn fill_blanks_from(&mut self, other: &EnrichmentResult) {
        fn fill(slot: &mut String, with: &str) {
            if slot.trim().is_empty() {
                *slot = with.to_string();
            }
        }
        fill(&mut self.tldr, &other.tldr);
        fill(&mut self.motivation, &other.motivation);
        fill(&mut self.method, &other.method);
        fill(&mut self.result, &other.result);
        fill(&mut self.conclusion, &other.conclusion);
    }
}

/// How a record's summary was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// Validated reply from the generation endpoint
    Generated,
    /// Locally synthesized from the record text
    Fallback,
}

/// One request to the generation endpoint, built fresh for every attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub language: String,
    /// Content excerpt, already cut to the active length budget
    pub excerpt: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

impl GenerationRequest {
    pub fn excerpt_chars(&self) -> usize {
        self.excerpt.chars().count()
    }
}

/// Classified result of a single generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    EmptyReply,
    CapacityExceeded,
    RateLimited,
    TransportError(String),
    Timeout,
}

impl AttemptOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            AttemptOutcome::Success(_) => OutcomeKind::Success,
            AttemptOutcome::EmptyReply => OutcomeKind::EmptyReply,
            AttemptOutcome::CapacityExceeded => OutcomeKind::CapacityExceeded,
            AttemptOutcome::RateLimited => OutcomeKind::RateLimited,
            AttemptOutcome::TransportError(_) => OutcomeKind::TransportError,
            AttemptOutcome::Timeout => OutcomeKind::Timeout,
        }
    }
}

/// Payload-free view of an [`AttemptOutcome`], plus the validator's verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    InvalidReply,
    EmptyReply,
    CapacityExceeded,
    RateLimited,
    TransportError,
    Timeout,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeKind::Success => "success",
            OutcomeKind::InvalidReply => "invalid_reply",
            OutcomeKind::EmptyReply => "empty_reply",
            OutcomeKind::CapacityExceeded => "capacity_exceeded",
            OutcomeKind::RateLimited => "rate_limited",
            OutcomeKind::TransportError => "transport_error",
            OutcomeKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}
