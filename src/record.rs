//! Paper records and their line-delimited JSON files.
//!
//! Loading normalizes each line into a [`PaperRecord`], skips lines that are
//! not usable (with a diagnostic), and keeps only the first record for every
//! identifier. Writing goes through a temporary sibling so a crashed run never
//! leaves a half-written output file behind.

use crate::error::{EnrichError, RecordError};
use crate::types::EnrichmentResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Field the enrichment is written under
pub const ENRICHMENT_FIELD: &str = "AI";

const REQUIRED_FIELDS: [&str; 3] = ["id", "title", "summary"];

/// One paper's metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    /// Abstract text
    #[serde(rename = "summary")]
    pub abstract_text: String,
    /// Author names read from `authors`; the raw field stays in `extra`
    #[serde(skip)]
    pub authors: Vec<String>,
    /// Full-text reference read from `pdf_url`; the raw field stays in `extra`
    #[serde(skip)]
    pub full_text_ref: Option<String>,
    /// Category codes read from `categories`; the raw field stays in `extra`
    #[serde(skip)]
    pub categories: Vec<String>,
    /// Enrichment carried over from an earlier run; replaced on output
    #[serde(rename = "AI", default, skip_serializing)]
    pub prior_enrichment: Option<Value>,
    /// Remaining input fields, written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PaperRecord {
    /// Build a record with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            abstract_text: abstract_text.into(),
            full_text_ref: None,
            categories: Vec::new(),
            prior_enrichment: None,
            extra: Map::new(),
        }
    }

    /// Parse one JSONL line. `line` is 1-based and only used for diagnostics.
    pub fn from_json_line(text: &str, line: usize) -> Result<Self, RecordError> {
        let value: Value =
            serde_json::from_str(text).map_err(|source| RecordError::InvalidJson { line, source })?;
        let obj = value.as_object().ok_or(RecordError::NotAnObject { line })?;
        for field in REQUIRED_FIELDS {
            if !obj.get(field).map(Value::is_string).unwrap_or(false) {
                return Err(RecordError::MissingField { line, field });
            }
        }
        let mut record: PaperRecord =
            serde_json::from_value(value).map_err(|source| RecordError::InvalidJson { line, source })?;
        record.normalize();
        Ok(record)
    }

    fn normalize(&mut self) {
        self.id = self.id.trim().to_string();
        self.title = collapse_whitespace(&self.title);
        self.abstract_text = self.abstract_text.trim().to_string();
        self.authors = string_list(self.extra.get("authors"));
        self.categories = string_list(self.extra.get("categories"));
        self.full_text_ref = self
            .extra
            .get("pdf_url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
    }
}

/// A record with its enrichment attached, as written to the output file
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: PaperRecord,
    #[serde(rename = "AI")]
    pub enrichment: EnrichmentResult,
}

/// Result of reading one input file
#[derive(Debug, Default)]
pub struct LoadedRecords {
    /// Unique records in first-seen order
    pub records: Vec<PaperRecord>,
    /// Non-blank lines that could not be used
    pub skipped_lines: usize,
    /// Records dropped because their id was already seen
    pub duplicates: usize,
}

/// Read a JSONL file, skipping unusable lines and keeping the first record per id.
pub fn load_records(path: &Path) -> Result<LoadedRecords, EnrichError> {
    let file = File::open(path).map_err(|source| EnrichError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = read_records(BufReader::new(file))?;
    info!(
        path = %path.display(),
        records = loaded.records.len(),
        skipped_lines = loaded.skipped_lines,
        duplicates = loaded.duplicates,
        "Loaded input records"
    );
    Ok(loaded)
}

/// Reader-level variant of [`load_records`].
pub fn read_records<R: BufRead>(reader: R) -> Result<LoadedRecords, EnrichError> {
    let mut loaded = LoadedRecords::default();
    let mut seen = HashSet::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(RecordError::from)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = match PaperRecord::from_json_line(&line, idx + 1) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Skipping input line");
                loaded.skipped_lines += 1;
                continue;
            }
        };
        if !seen.insert(record.id.clone()) {
            debug!(record_id = %record.id, "Dropping duplicate record");
            loaded.duplicates += 1;
            continue;
        }
        loaded.records.push(record);
    }

    Ok(loaded)
}

/// Write any serializable rows as JSONL, replacing `path` atomically.
pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), EnrichError> {
    let tmp = temp_sibling(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Default output path: `<stem>_AI_enhanced_<language>.jsonl` next to the input.
pub fn enhanced_output_path(input: &Path, language: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    input.with_file_name(format!("{}_AI_enhanced_{}.jsonl", stem, language))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Names from whatever shape a list field arrived in: a list of strings, a
/// list of `{"name": ..}` objects, or one comma-separated string.
fn string_list(value: Option<&Value>) -> Vec<String> {
    let names: Vec<String> = match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
