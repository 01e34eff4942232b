//! Outcome classification at the provider boundary.
//!
//! Vendors report capacity problems in different shapes (413, 400 with a
//! context-length message, 429 with a token message). All of that string
//! matching lives here, behind [`OutcomeClassifier`], so a deployment with a
//! different vendor can swap the rules without touching the retry logic.

use crate::error::EnrichError;
use crate::types::AttemptOutcome;

/// Body fragments (lowercase) that mark a request as too large for the endpoint
pub const DEFAULT_CAPACITY_SIGNATURES: &[&str] = &[
    "context length",
    "context_length",
    "maximum context",
    "too many tokens",
    "token limit",
    "tokens exceed",
    "input is too long",
    "reduce the length",
    "payload too large",
];

const BODY_SNIPPET_CHARS: usize = 300;

/// Maps raw endpoint failures to attempt outcomes or fatal errors
pub trait OutcomeClassifier: Send + Sync {
    /// Classify a non-2xx response.
    fn classify_status(&self, status: u16, body: &str) -> Result<AttemptOutcome, EnrichError>;

    /// Whether free-form error text describes a capacity problem.
    fn is_capacity_signal(&self, text: &str) -> bool;

    /// Classify a transport-level failure (no HTTP status available).
    fn classify_transport(&self, detail: &str, timed_out: bool) -> AttemptOutcome {
        if timed_out {
            AttemptOutcome::Timeout
        } else if self.is_capacity_signal(detail) {
            AttemptOutcome::CapacityExceeded
        } else {
            AttemptOutcome::TransportError(detail.to_string())
        }
    }
}

/// Status-code rules plus case-insensitive body signatures
#[derive(Debug, Clone)]
pub struct DefaultClassifier {
    capacity_signatures: Vec<String>,
}

impl Default for DefaultClassifier {
    fn default() -> Self {
        Self {
            capacity_signatures: DEFAULT_CAPACITY_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DefaultClassifier {
    /// Default rules plus extra signatures from configuration.
    pub fn with_extra_signatures<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classifier = Self::default();
        classifier.capacity_signatures.extend(
            extra
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty()),
        );
        classifier
    }
}

impl OutcomeClassifier for DefaultClassifier {
    fn classify_status(&self, status: u16, body: &str) -> Result<AttemptOutcome, EnrichError> {
        let snippet = body_snippet(body);
        match status {
            401 | 403 => Err(EnrichError::ProviderAuthFailed(format!(
                "status {}: {}",
                status, snippet
            ))),
            404 => Err(EnrichError::ProviderModelNotFound(format!(
                "status {}: {}",
                status, snippet
            ))),
            413 => Ok(AttemptOutcome::CapacityExceeded),
            _ if self.is_capacity_signal(body) => Ok(AttemptOutcome::CapacityExceeded),
            429 => Ok(AttemptOutcome::RateLimited),
            408 | 504 => Ok(AttemptOutcome::Timeout),
            _ => Ok(AttemptOutcome::TransportError(format!(
                "status {}: {}",
                status, snippet
            ))),
        }
    }

    fn is_capacity_signal(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.capacity_signatures
            .iter()
            .any(|sig| lower.contains(sig.as_str()))
    }
}

fn body_snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    crate::prompt::truncate_chars(trimmed, BODY_SNIPPET_CHARS).to_string()
}
