//! Historical deduplication of a dated record file.
//!
//! A data directory holds one `<YYYY-MM-DD>.jsonl` file per day. Records in the
//! target day's file whose id already appeared in any of the previous
//! `history_days` files are removed. Lines are handled as raw JSON objects so
//! every field survives the rewrite untouched.

use crate::error::EnrichError;
use crate::record::write_jsonl;
use chrono::{Duration, NaiveDate};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_HISTORY_DAYS: u32 = 7;

/// What a deduplication pass found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupStatus {
    /// Some records are new; the file was rewritten if `removed > 0`
    HasNewContent { kept: usize, removed: usize },
    /// Every record was seen before; the day's file was deleted
    NoNewContent { removed: usize },
    /// The day's file is missing or empty
    NoData,
}

impl DedupStatus {
    /// Process exit code for workflow gating: 0 continue, 1 stop.
    pub fn exit_code(&self) -> i32 {
        match self {
            DedupStatus::HasNewContent { .. } => 0,
            DedupStatus::NoNewContent { .. } | DedupStatus::NoData => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DedupStatus::HasNewContent { .. } => "has_new_content",
            DedupStatus::NoNewContent { .. } => "no_new_content",
            DedupStatus::NoData => "no_data",
        }
    }
}

/// Exit code for a pass that failed outright.
pub const DEDUP_ERROR_EXIT_CODE: i32 = 2;

pub fn day_file(data_dir: &Path, date: NaiveDate) -> PathBuf {
    data_dir.join(format!("{}.jsonl", date.format("%Y-%m-%d")))
}

/// Deduplicate `date`'s file against the preceding `history_days` days.
pub fn deduplicate(
    data_dir: &Path,
    date: NaiveDate,
    history_days: u32,
) -> Result<DedupStatus, EnrichError> {
    let target = day_file(data_dir, date);
    if !target.exists() {
        info!(path = %target.display(), "No data file for the day");
        return Ok(DedupStatus::NoData);
    }

    let today = read_rows(&target)?;
    if today.is_empty() {
        return Ok(DedupStatus::NoData);
    }

    let mut history: HashSet<String> = HashSet::new();
    for back in 1..=i64::from(history_days) {
        let path = day_file(data_dir, date - Duration::days(back));
        if path.exists() {
            match read_rows(&path) {
                Ok(rows) => history.extend(rows.iter().filter_map(row_id)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable history file"),
            }
        }
    }
    info!(
        records = today.len(),
        history_days,
        history_ids = history.len(),
        "Loaded deduplication history"
    );

    let total = today.len();
    let kept: Vec<Value> = today
        .into_iter()
        .filter(|row| row_id(row).map(|id| !history.contains(&id)).unwrap_or(true))
        .collect();
    let removed = total - kept.len();

    if removed == 0 {
        info!("All records are new");
        return Ok(DedupStatus::HasNewContent {
            kept: kept.len(),
            removed,
        });
    }

    if kept.is_empty() {
        fs::remove_file(&target)?;
        info!(path = %target.display(), removed, "Every record was already seen, removed day file");
        return Ok(DedupStatus::NoNewContent { removed });
    }

    write_jsonl(&target, &kept)?;
    info!(path = %target.display(), kept = kept.len(), removed, "Rewrote day file without duplicates");
    Ok(DedupStatus::HasNewContent {
        kept: kept.len(),
        removed,
    })
}

fn row_id(row: &Value) -> Option<String> {
    row.get("id")
        .and_then(Value::as_str)
        .map(|id| id.trim().to_string())
}

fn read_rows(path: &Path) -> Result<Vec<Value>, EnrichError> {
    let text = fs::read_to_string(path).map_err(|source| EnrichError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rows = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        rows.push(serde_json::from_str(line)?);
    }
    Ok(rows)
}
