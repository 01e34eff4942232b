//! Content resolution: decide which text of a record gets summarized.

use crate::record::PaperRecord;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Full text could not be obtained for a record
#[derive(Debug, Error)]
#[error("full text unavailable: {0}")]
pub struct FullTextUnavailable(pub String);

/// Best-effort provider of a record's full text
#[async_trait]
pub trait FullTextSource: Send + Sync {
    async fn fetch(&self, record: &PaperRecord) -> Result<String, FullTextUnavailable>;
}

/// Source that never has full text; every record resolves to its abstract.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFullText;

#[async_trait]
impl FullTextSource for NoFullText {
    async fn fetch(&self, _record: &PaperRecord) -> Result<String, FullTextUnavailable> {
        Err(FullTextUnavailable("no full-text source configured".to_string()))
    }
}

/// Pre-extracted plain text files, one `<id>.txt` per record.
#[derive(Debug, Clone)]
pub struct TextDirectory {
    root: PathBuf,
}

impl TextDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        // arXiv ids of the old style contain '/'
        self.root.join(format!("{}.txt", id.replace('/', "_")))
    }
}

#[async_trait]
impl FullTextSource for TextDirectory {
    async fn fetch(&self, record: &PaperRecord) -> Result<String, FullTextUnavailable> {
        let path = self.path_for(&record.id);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| FullTextUnavailable(format!("{}: {}", path.display(), e)))
    }
}

/// Text chosen for summarization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub text: String,
    pub from_full_text: bool,
}

/// Pick full text when the fetch produced non-blank text, else the abstract.
pub fn resolve(
    record: &PaperRecord,
    fetched: Option<Result<String, FullTextUnavailable>>,
) -> ResolvedContent {
    match fetched {
        Some(Ok(text)) if !text.trim().is_empty() => ResolvedContent {
            text,
            from_full_text: true,
        },
        other => {
            if let Some(Err(e)) = other {
                debug!(record_id = %record.id, error = %e, "Falling back to abstract");
            }
            ResolvedContent {
                text: record.abstract_text.clone(),
                from_full_text: false,
            }
        }
    }
}

/// Fetch from `source` and resolve. Never fails.
pub async fn resolve_content(source: &dyn FullTextSource, record: &PaperRecord) -> ResolvedContent {
    let fetched = source.fetch(record).await;
    resolve(record, Some(fetched))
}
