//! CLI parse: clap types for gist. No behavior; definitions only.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gist CLI - structured summaries for paper metadata feeds
#[derive(Parser)]
#[command(name = "gist")]
#[command(about = "Enrich JSONL paper records with structured LLM summaries")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (replaces ./gist.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enrich every record of a JSONL file
    Enhance {
        /// Input JSONL file
        #[arg(long)]
        data: PathBuf,
        /// Output file (default: <stem>_AI_enhanced_<language>.jsonl)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Concurrent records in flight
        #[arg(long)]
        workers: Option<usize>,
        /// Output language
        #[arg(long)]
        language: Option<String>,
        /// Model name
        #[arg(long)]
        model: Option<String>,
        /// Directory of `<id>.txt` full texts
        #[arg(long)]
        full_text_dir: Option<PathBuf>,
    },
    /// Remove records already seen in the previous days' files
    Dedup {
        /// Directory of `<YYYY-MM-DD>.jsonl` files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// Day to deduplicate (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// How many previous days to compare against
        #[arg(long, default_value_t = crate::dedup::DEFAULT_HISTORY_DAYS)]
        history_days: u32,
    },
    /// Show record counts for a JSONL file
    Stats {
        #[arg(long)]
        data: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the merged configuration as TOML
    Show,
    /// Check the merged configuration and report every problem
    Validate,
    /// Print the global configuration file path
    Path,
}
