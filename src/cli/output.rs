//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::EnrichError;

/// Map pipeline errors to a string for CLI output, with a hint for setup problems.
pub fn map_error(e: &EnrichError) -> String {
    match e {
        EnrichError::ProviderNotConfigured(_) => format!(
            "{}\nSet the API key variable named by provider.api_key_env, or switch provider.kind to ollama.",
            e
        ),
        EnrichError::ProviderAuthFailed(_) => {
            format!("{}\nCheck that the API key is valid for this endpoint.", e)
        }
        EnrichError::ProviderModelNotFound(_) => {
            format!("{}\nCheck provider.model (or MODEL_NAME).", e)
        }
        _ => e.to_string(),
    }
}
