//! Deterministic fallback summaries built from the record itself.

use crate::record::PaperRecord;
use crate::types::EnrichmentResult;

/// Maximum `tldr` length, in characters, before the ellipsis
pub const FALLBACK_TLDR_MAX_CHARS: usize = 300;

pub const NO_ABSTRACT_PLACEHOLDER: &str = "No abstract available.";
pub const MOTIVATION_PLACEHOLDER: &str = "Motivation could not be derived automatically.";
pub const METHOD_PLACEHOLDER: &str = "Method could not be derived automatically.";
pub const RESULT_PLACEHOLDER: &str = "Result could not be derived automatically.";
const CONCLUSION_WITH_FULL_TEXT: &str =
    "Conclusion could not be derived automatically; see the full text.";
const CONCLUSION_ABSTRACT_ONLY: &str =
    "Conclusion could not be derived automatically; only the abstract was available.";

/// Build the fallback summary for `record`. Never fails.
pub fn synthesize(record: &PaperRecord, full_text_available: bool) -> EnrichmentResult {
    EnrichmentResult {
        tldr: fallback_tldr(&record.abstract_text),
        motivation: MOTIVATION_PLACEHOLDER.to_string(),
        method: METHOD_PLACEHOLDER.to_string(),
        result: RESULT_PLACEHOLDER.to_string(),
        conclusion: if full_text_available {
            CONCLUSION_WITH_FULL_TEXT
        } else {
            CONCLUSION_ABSTRACT_ONLY
        }
        .to_string(),
    }
}

/// Abstract with whitespace collapsed, cut at a word boundary.
pub fn fallback_tldr(abstract_text: &str) -> String {
    let collapsed = abstract_text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return NO_ABSTRACT_PLACEHOLDER.to_string();
    }
    if collapsed.chars().count() <= FALLBACK_TLDR_MAX_CHARS {
        return collapsed;
    }

    let hard_cut = crate::prompt::truncate_chars(&collapsed, FALLBACK_TLDR_MAX_CHARS);
    // Prefer the last space, unless it would throw away most of the text.
    let cut = match hard_cut.rfind(' ') {
        Some(idx) if idx >= hard_cut.len() / 2 => &hard_cut[..idx],
        _ => hard_cut,
    };
    format!("{}...", cut.trim_end_matches([',', ';', ':', ' ']))
}

/// Whether `summary` is exactly what [`synthesize`] produces for some record.
pub fn is_fallback(summary: &EnrichmentResult) -> bool {
    summary.motivation == MOTIVATION_PLACEHOLDER
        && summary.method == METHOD_PLACEHOLDER
        && summary.result == RESULT_PLACEHOLDER
}
