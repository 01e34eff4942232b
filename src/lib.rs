//! Gist: Concurrent Enrichment of Paper Records
//!
//! Turns line-delimited paper metadata into records carrying a structured
//! five-part summary produced by a text-generation endpoint. Every record gets
//! a summary: generation is retried, shrunk to fit the context window, and
//! repaired when the reply is malformed, and a deterministic fallback covers
//! whatever still fails.

pub mod budget;
pub mod cli;
pub mod config;
pub mod content;
pub mod dedup;
pub mod enrich;
pub mod error;
pub mod fallback;
pub mod logging;
pub mod prompt;
pub mod provider;
pub mod record;
pub mod retry;
pub mod scheduler;
pub mod stats;
pub mod types;
pub mod validate;
