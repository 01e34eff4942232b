//! Token budget estimation.
//!
//! A rough count used to shrink the excerpt before the first send. It is not
//! an accounting of the endpoint's tokenizer; capacity failures reported by the
//! endpoint still drive the retry controller.

/// Tokens added on top of every estimate for chat framing and tokenizer drift
pub const SAFETY_MARGIN_TOKENS: usize = 100;

/// Estimate prompt-plus-reply cost for `prompt` with room for `max_reply_tokens`.
pub fn estimate_tokens(prompt: &str, max_reply_tokens: usize) -> usize {
    let (cjk, other) = prompt.chars().fold((0usize, 0usize), |(cjk, other), c| {
        if is_cjk(c) {
            (cjk + 1, other)
        } else {
            (cjk, other + 1)
        }
    });
    other.div_ceil(4) + cjk.div_ceil(2) + SAFETY_MARGIN_TOKENS + max_reply_tokens
}

/// Tokens attributed to `excerpt` alone, without margin or reply allowance.
pub fn excerpt_tokens(excerpt: &str) -> usize {
    estimate_tokens(excerpt, 0) - SAFETY_MARGIN_TOKENS
}

/// Excerpt length that should fit `window` tokens.
///
/// `estimate` is the full prompt-plus-reply estimate and `excerpt_tokens` the
/// share of it that scales with the excerpt. The rest (templates, margin,
/// reply allowance) is fixed, so only `window - fixed` is left for the
/// excerpt. The result is strictly shorter than `current_chars` when the
/// estimate is over the window, never below `floor`, and never longer than
/// `current_chars`.
pub fn fit_excerpt(
    current_chars: usize,
    estimate: usize,
    excerpt_tokens: usize,
    window: usize,
    floor: usize,
) -> usize {
    if estimate <= window || current_chars == 0 {
        return current_chars;
    }
    let fixed = estimate.saturating_sub(excerpt_tokens);
    let available = window.saturating_sub(fixed);
    let scaled = (current_chars as u128 * available as u128 / excerpt_tokens.max(1) as u128) as usize;
    scaled
        .min(current_chars - 1)
        .max(floor)
        .min(current_chars)
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F     // CJK symbols and punctuation
        | 0x3040..=0x30FF   // Hiragana, Katakana
        | 0x3400..=0x4DBF   // Extension A
        | 0x4E00..=0x9FFF   // Unified ideographs
        | 0xAC00..=0xD7AF   // Hangul syllables
        | 0xF900..=0xFAFF   // Compatibility ideographs
        | 0xFF00..=0xFFEF   // Half/full-width forms
    )
}
