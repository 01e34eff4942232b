//! Record file statistics (`gist stats`).

use crate::error::EnrichError;
use crate::fallback::is_fallback;
use crate::record::read_records;
use crate::types::EnrichmentResult;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

/// Counts for one JSONL file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    /// Non-blank lines
    pub lines: usize,
    /// Lines that parse into a usable record
    pub valid: usize,
    pub unique_ids: usize,
    pub duplicates: usize,
    /// Unique records that already carry an enrichment
    pub enriched: usize,
    /// Enriched records whose enrichment is the synthesized fallback
    pub fallback: usize,
}

pub fn collect_stats(path: &Path) -> Result<FileStats, EnrichError> {
    let file = File::open(path).map_err(|source| EnrichError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    stats_from_reader(BufReader::new(file))
}

pub fn stats_from_reader<R: BufRead>(reader: R) -> Result<FileStats, EnrichError> {
    let mut buf = Vec::new();
    let mut lines = 0;
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            lines += 1;
            buf.push(line);
        }
    }

    let loaded = read_records(Cursor::new(buf.join("\n")))?;
    let mut stats = FileStats {
        lines,
        valid: lines - loaded.skipped_lines,
        unique_ids: loaded.records.len(),
        duplicates: loaded.duplicates,
        ..FileStats::default()
    };

    for record in &loaded.records {
        if let Some(value) = &record.prior_enrichment {
            stats.enriched += 1;
            if let Ok(summary) = serde_json::from_value::<EnrichmentResult>(value.clone()) {
                if is_fallback(&summary) {
                    stats.fallback += 1;
                }
            }
        }
    }
    Ok(stats)
}

/// Render as a two-column table.
pub fn format_stats_text(path: &Path, stats: &FileStats) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Count"]);
    let rows = [
        ("Lines", stats.lines),
        ("Valid records", stats.valid),
        ("Unique ids", stats.unique_ids),
        ("Duplicates", stats.duplicates),
        ("Enriched", stats.enriched),
        ("Fallback summaries", stats.fallback),
    ];
    for (label, count) in rows {
        table.add_row(vec![label.to_string(), count.to_string()]);
    }
    format!("{}\n\n{}\n", path.display(), table)
}
