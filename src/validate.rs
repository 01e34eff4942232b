//! Reply validation and repair.
//!
//! Generation endpoints rarely return clean JSON every time. A reply is
//! accepted at the first stage that yields an object carrying all five
//! summary fields:
//!
//! 1. strict parse of the whole reply (code fences stripped)
//! 2. the largest balanced `{...}` span, scanned string-aware
//! 3. light syntactic repair of that span (or of the whole reply), then 1 and 2 again
//!
//! Field values are taken verbatim. Blank values pass here; the enrichment
//! step fills them from the fallback summary.

use crate::types::EnrichmentResult;
use serde_json::{Map, Value};

/// Stage at which a reply was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    Strict,
    Extracted,
    Repaired,
}

/// A reply that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReply {
    pub summary: EnrichmentResult,
    pub stage: ValidationStage,
}

/// Validate `raw`, returning `None` when no stage yields all five fields.
pub fn validate_reply(raw: &str) -> Option<ValidatedReply> {
    let text = strip_code_fence(raw.trim());

    if let Some(summary) = parse_candidate(text) {
        return Some(accepted(summary, ValidationStage::Strict));
    }

    let span = largest_balanced_object(text);
    if let Some(summary) = span.and_then(parse_candidate) {
        return Some(accepted(summary, ValidationStage::Extracted));
    }

    let repaired = repair_json(span.unwrap_or(text));
    parse_candidate(&repaired)
        .or_else(|| largest_balanced_object(&repaired).and_then(parse_candidate))
        .map(|summary| accepted(summary, ValidationStage::Repaired))
}

fn accepted(summary: EnrichmentResult, stage: ValidationStage) -> ValidatedReply {
    ValidatedReply { summary, stage }
}

fn parse_candidate(text: &str) -> Option<EnrichmentResult> {
    let value: Value = serde_json::from_str(text).ok()?;
    summary_from_object(value.as_object()?)
}

fn summary_from_object(obj: &Map<String, Value>) -> Option<EnrichmentResult> {
    let field = |name: &str| -> Option<String> {
        match obj.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    };
    Some(EnrichmentResult {
        tldr: field("tldr")?,
        motivation: field("motivation")?,
        method: field("method")?,
        result: field("result")?,
        conclusion: field("conclusion")?,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Longest top-level `{...}` span whose braces balance, ignoring braces in strings.
pub fn largest_balanced_object(text: &str) -> Option<&str> {
    let mut best: Option<(usize, usize)> = None;
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if depth > 0 && in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = idx;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let end = idx + 1;
                    if best.map_or(true, |(s, e)| end - start > e - s) {
                        best = Some((start, end));
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(s, e)| &text[s..e])
}

/// Conservative JSON repairs: ASCII double quotes, no trailing commas,
/// escaped stray quotes and raw control characters inside strings.
pub fn repair_json(text: &str) -> String {
    let chars: Vec<char> = text
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{FF02}' => '"',
            _ => c,
        })
        .collect();
    let next_significant =
        |from: usize| chars[from..].iter().copied().find(|c| !c.is_whitespace());

    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(&n) = chars.get(i + 1) {
                        out.push(n);
                        i += 1;
                    }
                }
                '"' => {
                    if matches!(next_significant(i + 1), None | Some(',' | '}' | ']' | ':')) {
                        in_string = false;
                        out.push('"');
                    } else {
                        out.push_str("\\\"");
                    }
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
        } else {
            match c {
                '"' => {
                    in_string = true;
                    out.push(c);
                }
                ',' if matches!(next_significant(i + 1), Some('}' | ']')) => {}
                _ => out.push(c),
            }
        }
        i += 1;
    }
    out
}
