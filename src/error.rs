//! Error types for the enrichment pipeline.
//!
//! Only run-level failures travel as errors. Per-attempt conditions are
//! [`crate::types::AttemptOutcome`] values and per-record failures end in a
//! fallback summary, so neither shows up here.

use thiserror::Error;

/// Record file errors (JSONL input and output)
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Line {line}: invalid JSON: {source}")]
    InvalidJson {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line}: expected a JSON object")]
    NotAnObject { line: usize },

    #[error("Line {line}: missing required field '{field}'")]
    MissingField { line: usize, field: &'static str },

    #[error("Record I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cannot read input {path}: {source}")]
    InputUnreadable {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Record error: {0}")]
    RecordError(#[from] RecordError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl EnrichError {
    /// Whether this error must abort the whole run.
    ///
    /// No retry fixes bad credentials or a missing model, so those escalate
    /// straight out of the scheduler.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EnrichError::ProviderNotConfigured(_)
                | EnrichError::ProviderAuthFailed(_)
                | EnrichError::ProviderModelNotFound(_)
                | EnrichError::ConfigError(_)
                | EnrichError::InputUnreadable { .. }
        )
    }
}

impl From<config::ConfigError> for EnrichError {
    fn from(err: config::ConfigError) -> Self {
        EnrichError::ConfigError(err.to_string())
    }
}
