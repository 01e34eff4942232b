//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::cli::parse::{Commands, ConfigCommands};
use crate::cli::presentation::{format_dedup_status, format_run_report, format_validation_errors};
use crate::cli::map_error;
use crate::config::{global_config_path, validation_failure, ConfigLoader, EnrichConfig};
use crate::content::{FullTextSource, NoFullText, TextDirectory};
use crate::dedup::{day_file, deduplicate, DEDUP_ERROR_EXIT_CODE};
use crate::enrich::Enricher;
use crate::error::EnrichError;
use crate::prompt::PromptBuilder;
use crate::provider::{GenerationClient, ProviderFactory};
use crate::record::{enhanced_output_path, load_records, write_jsonl};
use crate::scheduler::{EnrichmentScheduler, RunReport};
use crate::stats::{collect_stats, format_stats_text};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a command printed and how the process should exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self { text, exit_code: 0 }
    }
}

/// Overrides an `enhance` invocation applies over the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct EnhanceOverrides {
    pub workers: Option<usize>,
    pub language: Option<String>,
    pub model: Option<String>,
}

/// Result of one enrichment run over a file
#[derive(Debug, Clone)]
pub struct EnhanceSummary {
    pub output: PathBuf,
    pub report: RunReport,
    pub skipped_lines: usize,
    pub duplicates: usize,
}

/// Runtime context for CLI execution: the merged configuration.
pub struct RunContext {
    config: EnrichConfig,
    config_path: Option<PathBuf>,
}

impl RunContext {
    /// Load configuration from every source; `config_path` replaces ./gist.toml.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, EnrichError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self::with_config(config, config_path))
    }

    pub fn with_config(config: EnrichConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, EnrichError> {
        match command {
            Commands::Enhance {
                data,
                output,
                workers,
                language,
                model,
                full_text_dir,
            } => {
                let overrides = EnhanceOverrides {
                    workers: *workers,
                    language: language.clone(),
                    model: model.clone(),
                };
                let config = self.effective_config(&overrides)?;
                let provider = config.model_provider()?;
                let client = ProviderFactory::create_client(
                    &provider,
                    &config.client_settings(),
                    Arc::new(config.classifier()),
                )?;
                info!(
                    provider = client.provider_name(),
                    model = client.model_name(),
                    "Generation client ready"
                );
                let runtime = tokio::runtime::Runtime::new().map_err(|e| {
                    EnrichError::ProviderError(format!("Failed to create runtime: {}", e))
                })?;
                let summary = runtime.block_on(enhance_file(
                    &config,
                    client,
                    data,
                    output.as_deref(),
                    full_text_dir.as_deref(),
                ))?;
                Ok(CommandOutput::ok(format_run_report(
                    &summary.output,
                    &summary.report,
                    summary.skipped_lines,
                    summary.duplicates,
                )))
            }
            Commands::Dedup {
                data_dir,
                date,
                history_days,
            } => {
                let date = date.unwrap_or_else(|| Local::now().date_naive());
                let target = day_file(data_dir, date);
                match deduplicate(data_dir, date, *history_days) {
                    Ok(status) => {
                        info!(status = status.label(), "Deduplication finished");
                        Ok(CommandOutput {
                            text: format_dedup_status(&target, &status),
                            exit_code: status.exit_code(),
                        })
                    }
                    Err(e) => {
                        error!(error = %e, "Deduplication failed");
                        Ok(CommandOutput {
                            text: format!("Deduplication failed: {}", map_error(&e)),
                            exit_code: DEDUP_ERROR_EXIT_CODE,
                        })
                    }
                }
            }
            Commands::Stats { data, format } => {
                let stats = collect_stats(data)?;
                let text = if format == "json" {
                    serde_json::to_string_pretty(&stats)?
                } else {
                    format_stats_text(data, &stats)
                };
                Ok(CommandOutput::ok(text))
            }
            Commands::Config { command } => self.execute_config(command),
        }
    }

    fn execute_config(&self, command: &ConfigCommands) -> Result<CommandOutput, EnrichError> {
        match command {
            ConfigCommands::Show => {
                let text = toml::to_string_pretty(&self.config)
                    .map_err(|e| EnrichError::ConfigError(format!("Failed to render config: {}", e)))?;
                Ok(CommandOutput::ok(text))
            }
            ConfigCommands::Validate => match self.config.validate() {
                Ok(()) => Ok(CommandOutput::ok("Configuration is valid".to_string())),
                Err(errors) => Ok(CommandOutput {
                    text: format_validation_errors(&errors),
                    exit_code: 1,
                }),
            },
            ConfigCommands::Path => {
                let mut lines = Vec::new();
                match global_config_path() {
                    Some(p) => lines.push(format!("global: {}", p.display())),
                    None => lines.push("global: (no home directory)".to_string()),
                }
                if let Some(p) = &self.config_path {
                    lines.push(format!("explicit: {}", p.display()));
                }
                Ok(CommandOutput::ok(lines.join("\n")))
            }
        }
    }

    /// Configuration with CLI overrides applied, validated.
    pub fn effective_config(&self, overrides: &EnhanceOverrides) -> Result<EnrichConfig, EnrichError> {
        let mut config = self.config.clone();
        if let Some(workers) = overrides.workers {
            config.workers = workers;
        }
        if let Some(language) = &overrides.language {
            config.language = language.clone();
        }
        if let Some(model) = &overrides.model {
            config.provider.model = model.clone();
        }
        config.validate().map_err(|errors| validation_failure(&errors))?;
        Ok(config)
    }
}

/// Enrich `data` with `client` and write the result file.
///
/// The output path defaults to `<stem>_AI_enhanced_<language>.jsonl` beside the
/// input. An existing target is replaced as a whole once the run has finished.
pub async fn enhance_file(
    config: &EnrichConfig,
    client: Arc<dyn GenerationClient>,
    data: &Path,
    output: Option<&Path>,
    full_text_dir: Option<&Path>,
) -> Result<EnhanceSummary, EnrichError> {
    let loaded = load_records(data)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| enhanced_output_path(data, &config.language));
    if output.exists() {
        warn!(path = %output.display(), "Target file exists and will be replaced");
    }

    let full_text: Arc<dyn FullTextSource> = match full_text_dir {
        Some(dir) => Arc::new(TextDirectory::new(dir)),
        None => Arc::new(NoFullText),
    };
    let builder = PromptBuilder::from_files(
        config.prompt.system_file.as_deref(),
        config.prompt.template_file.as_deref(),
    )?;
    let enricher = Arc::new(Enricher::new(
        client,
        full_text,
        builder,
        config.pipeline_settings(),
    ));
    let scheduler = EnrichmentScheduler::new(enricher, config.scheduler_config());

    let (rows, report) = scheduler.run(loaded.records).await?;
    write_jsonl(&output, &rows)?;
    info!(path = %output.display(), rows = rows.len(), "Wrote enriched records");

    Ok(EnhanceSummary {
        output,
        report,
        skipped_lines: loaded.skipped_lines,
        duplicates: loaded.duplicates,
    })
}
