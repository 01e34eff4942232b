//! Configuration System
//!
//! Layered run configuration: built-in defaults, the global config file, a
//! run-local or explicit file, `GIST_*` environment variables, and finally
//! CLI flags applied by the caller. The loaded value is immutable for the
//! duration of a run and is handed to the pipeline by value.

use crate::enrich::PipelineSettings;
use crate::error::EnrichError;
use crate::logging::LoggingConfig;
use crate::provider::{ClientSettings, CompletionOptions, DefaultClassifier, ModelProvider};
use crate::retry::RetryPolicy;
use crate::scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

pub const DEFAULT_LANGUAGE: &str = "Chinese";
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.1-8B-Instruct";
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Output language of the summaries
    #[serde(default = "default_language")]
    pub language: String,

    /// Records processed concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub prompt: PromptSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Endpoint kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Ollama,
}

/// Generation endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_kind")]
    pub kind: ProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    /// Endpoint base URL; unset means the kind's default
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_reply_tokens")]
    pub max_reply_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_context_window_tokens")]
    pub context_window_tokens: usize,
    #[serde(default)]
    pub min_request_interval_ms: Option<u64>,
    /// Extra lowercase error fragments treated as capacity failures
    #[serde(default)]
    pub capacity_signatures: Vec<String>,
}

/// Prompt and excerpt settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSettings {
    /// Maximum excerpt length in characters
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    /// Floor for capacity-driven shrinking
    #[serde(default = "default_min_content_length")]
    pub min_content_length: usize,
    #[serde(default)]
    pub system_file: Option<PathBuf>,
    #[serde(default)]
    pub template_file: Option<PathBuf>,
}

/// Retry and deadline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_shrink_factor")]
    pub shrink_factor: f64,
    #[serde(default = "default_true")]
    pub shrink_counts_as_attempt: bool,
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,
    #[serde(default)]
    pub record_timeout_secs: Option<u64>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_workers() -> usize {
    1
}

fn default_kind() -> ProviderKind {
    ProviderKind::OpenAI
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_reply_tokens() -> u32 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_context_window_tokens() -> usize {
    8192
}

fn default_max_content_length() -> usize {
    4000
}

fn default_min_content_length() -> usize {
    500
}

fn default_max_attempts() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_shrink_factor() -> f64 {
    0.65
}

fn default_true() -> bool {
    true
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_reply_tokens: default_max_reply_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            context_window_tokens: default_context_window_tokens(),
            min_request_interval_ms: None,
            capacity_signatures: Vec::new(),
        }
    }
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            max_content_length: default_max_content_length(),
            min_content_length: default_min_content_length(),
            system_file: None,
            template_file: None,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            shrink_factor: default_shrink_factor(),
            shrink_counts_as_attempt: true,
            attempt_timeout_secs: None,
            record_timeout_secs: None,
        }
    }
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            workers: default_workers(),
            provider: ProviderSettings::default(),
            prompt: PromptSettings::default(),
            retry: RetrySettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Prompt(String),
    Retry(String),
    System(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Prompt(msg) => write!(f, "Prompt: {}", msg),
            ValidationError::Retry(msg) => write!(f, "Retry: {}", msg),
            ValidationError::System(msg) => write!(f, "System: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl EnrichConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.language.trim().is_empty() {
            errors.push(ValidationError::System("language cannot be empty".into()));
        }
        if self.workers == 0 {
            errors.push(ValidationError::System("workers must be at least 1".into()));
        }
        if self.provider.model.trim().is_empty() {
            errors.push(ValidationError::Provider("model cannot be empty".into()));
        }
        if let Some(url) = &self.provider.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(ValidationError::Provider(format!(
                    "base_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            errors.push(ValidationError::Provider(
                "temperature must be within 0.0-2.0".into(),
            ));
        }
        if self.provider.request_timeout_secs == 0 {
            errors.push(ValidationError::Provider(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.prompt.max_content_length == 0 {
            errors.push(ValidationError::Prompt(
                "max_content_length must be positive".into(),
            ));
        }
        if self.prompt.min_content_length > self.prompt.max_content_length {
            errors.push(ValidationError::Prompt(format!(
                "min_content_length ({}) exceeds max_content_length ({})",
                self.prompt.min_content_length, self.prompt.max_content_length
            )));
        }
        if self.retry.max_attempts == 0 {
            errors.push(ValidationError::Retry("max_attempts must be at least 1".into()));
        }
        if !(self.retry.shrink_factor > 0.0 && self.retry.shrink_factor < 1.0) {
            errors.push(ValidationError::Retry(
                "shrink_factor must be strictly between 0 and 1".into(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            errors.push(ValidationError::Retry("multiplier must be at least 1.0".into()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Resolve the endpoint binding, reading credentials from the environment.
    pub fn model_provider(&self) -> Result<ModelProvider, EnrichError> {
        let provider = &self.provider;
        match provider.kind {
            ProviderKind::OpenAI => {
                let api_key = std::env::var(&provider.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| {
                        EnrichError::ProviderNotConfigured(format!(
                            "environment variable {} is not set",
                            provider.api_key_env
                        ))
                    })?;
                Ok(ModelProvider::OpenAI {
                    model: provider.model.clone(),
                    api_key,
                    base_url: Some(
                        provider
                            .base_url
                            .clone()
                            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                    ),
                })
            }
            ProviderKind::Ollama => Ok(ModelProvider::Ollama {
                model: provider.model.clone(),
                base_url: provider.base_url.clone(),
            }),
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            connect_timeout: Duration::from_secs(self.provider.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.provider.request_timeout_secs),
            min_request_interval: self
                .provider
                .min_request_interval_ms
                .map(Duration::from_millis),
        }
    }

    pub fn classifier(&self) -> DefaultClassifier {
        DefaultClassifier::with_extra_signatures(&self.provider.capacity_signatures)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            multiplier: self.retry.multiplier,
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            shrink_factor: self.retry.shrink_factor,
            min_content_chars: self.prompt.min_content_length,
            shrink_counts_as_attempt: self.retry.shrink_counts_as_attempt,
            attempt_timeout: self.retry.attempt_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            language: self.language.clone(),
            max_content_chars: self.prompt.max_content_length,
            context_window_tokens: self.provider.context_window_tokens,
            options: CompletionOptions {
                temperature: Some(self.provider.temperature),
                max_tokens: Some(self.provider.max_reply_tokens),
            },
            retry: self.retry_policy(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            workers: self.workers.max(1),
            record_timeout: self.retry.record_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Loads [`EnrichConfig`] from all sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with the standard precedence. `explicit` replaces ./gist.toml.
    pub fn load(explicit: Option<&Path>) -> Result<EnrichConfig, EnrichError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, explicit)?;
        let builder = sources::environment::add_to_builder(builder)?;
        let config: EnrichConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load a single TOML file over the built-in defaults, ignoring other sources.
    pub fn load_from_file(path: &Path) -> Result<EnrichConfig, EnrichError> {
        let config: EnrichConfig = merge::merge_policy::builder_with_defaults()?
            .add_source(::config::File::from(path).format(::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

/// Join validation errors into one config error.
pub fn validation_failure(errors: &[ValidationError]) -> EnrichError {
    let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    EnrichError::ConfigError(format!(
        "Configuration validation failed:\n{}",
        msgs.join("\n")
    ))
}
