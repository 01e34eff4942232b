//! Prompt builder: renders the request document for one attempt.
//!
//! Templates use `{language}`, `{max_chars}` and `{content}` placeholders.
//! `{content}` is substituted last so braces inside paper text are never
//! treated as placeholders.

use crate::error::EnrichError;
use crate::types::GenerationRequest;
use std::path::Path;

pub const DEFAULT_SYSTEM_TEMPLATE: &str = "You are a professional paper analyst. \
You read academic papers and write precise, faithful summaries in {language}. \
You reply with a single JSON object and nothing else.";

pub const DEFAULT_USER_TEMPLATE: &str = r#"Summarize the paper content below in {language}.

Reply with exactly one JSON object with these five string fields and no text outside it:
{
  "tldr": "one or two sentence summary",
  "motivation": "the problem and why it matters",
  "method": "the approach the authors take",
  "result": "the main findings",
  "conclusion": "the takeaway"
}

Paper content (at most {max_chars} characters):
{content}"#;

/// Renders system and user prompts from templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    system_template: String,
    user_template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_TEMPLATE, DEFAULT_USER_TEMPLATE)
    }
}

impl PromptBuilder {
    pub fn new(system_template: impl Into<String>, user_template: impl Into<String>) -> Self {
        Self {
            system_template: system_template.into(),
            user_template: user_template.into(),
        }
    }

    /// Load templates from files, using the built-in text for any path not given.
    pub fn from_files(
        system_file: Option<&Path>,
        template_file: Option<&Path>,
    ) -> Result<Self, EnrichError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|e| {
                EnrichError::ConfigError(format!(
                    "Failed to read prompt template {}: {}",
                    path.display(),
                    e
                ))
            })
        };
        let system = match system_file {
            Some(p) => read(p)?,
            None => DEFAULT_SYSTEM_TEMPLATE.to_string(),
        };
        let user = match template_file {
            Some(p) => read(p)?,
            None => DEFAULT_USER_TEMPLATE.to_string(),
        };
        if !user.contains("{content}") {
            return Err(EnrichError::ConfigError(
                "Prompt template must contain a {content} placeholder".to_string(),
            ));
        }
        Ok(Self::new(system, user))
    }

    /// Build the request for `content` cut to `max_chars` characters.
    pub fn build(&self, content: &str, language: &str, max_chars: usize) -> GenerationRequest {
        let excerpt = truncate_chars(content.trim(), max_chars).to_string();
        let max_chars_text = max_chars.to_string();
        let system_prompt = self
            .system_template
            .replace("{language}", language)
            .replace("{max_chars}", &max_chars_text);
        let user_prompt = self
            .user_template
            .replace("{language}", language)
            .replace("{max_chars}", &max_chars_text)
            .replace("{content}", &excerpt);

        GenerationRequest {
            language: language.to_string(),
            excerpt,
            system_prompt,
            user_prompt,
        }
    }
}

/// Longest prefix of `s` with at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
