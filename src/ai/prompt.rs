use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use llmmit_include_zstd::include_zstd;
use tracing::trace;

use super::commit_message::CommitType;
use crate::{AppError, AppResult};

static COMMIT_MESSAGE_PROMPT: &[u8] = include_zstd!("src/ai/prompts/commit_message_prompt.md");

/// Output language used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "English";

/// A template for AI prompts that supports variable substitution.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new<S: Into<String>>(template: S) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Decode a template embedded with `include_zstd!`.
    pub fn from_zstd(compressed: &[u8]) -> AppResult<Self> {
        let bytes = zstd::decode_all(std::io::Cursor::new(compressed))
            .map_err(|e| AppError::Template(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| AppError::Template(e.to_string()))?;
        Ok(Self::new(text))
    }

    /// Render the template by replacing `{{key}}` with the corresponding value.
    ///
    /// Substitution happens in a single pass over the template, so inserted
    /// values are never scanned for placeholders themselves. Unknown
    /// placeholders are left as they are.
    pub fn render(&self, vars: &HashMap<&str, &str>) -> String {
        let mut output = String::with_capacity(
            self.template.len() + vars.values().map(|v| v.len()).sum::<usize>(),
        );
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find("{{") {
            output.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                output.push_str(&rest[open..]);
                return output;
            };
            let key = &after_open[..close];
            match vars.get(key) {
                Some(value) => output.push_str(value),
                None => {
                    output.push_str("{{");
                    output.push_str(key);
                    output.push_str("}}");
                }
            }
            rest = &after_open[close + 2..];
        }
        output.push_str(rest);
        output
    }
}

/// The fully substituted prompt sent as the single user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt(String);

impl RenderedPrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RenderedPrompt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the commit message prompt from the embedded template.
#[derive(Debug, Clone)]
pub struct CommitPrompt {
    template: PromptTemplate,
    types: String,
}

impl CommitPrompt {
    pub fn load() -> AppResult<Self> {
        Ok(Self::with_template(PromptTemplate::from_zstd(
            COMMIT_MESSAGE_PROMPT,
        )?))
    }

    pub fn with_template(template: PromptTemplate) -> Self {
        let types = CommitType::ALL
            .iter()
            .map(|t| format!("- {}: {}", t.as_str(), t.meaning()))
            .collect::<Vec<_>>()
            .join("\n");
        Self { template, types }
    }

    /// Substitute the diff and output language. The diff is inserted as
    /// given, empty or not; a blank language falls back to English.
    pub fn render(&self, changes: &str, language: &str) -> RenderedPrompt {
        let language = if language.trim().is_empty() {
            DEFAULT_LANGUAGE
        } else {
            language
        };
        let mut vars = HashMap::new();
        vars.insert("changes", changes);
        vars.insert("language", language);
        vars.insert("types", self.types.as_str());
        let rendered = self.template.render(&vars);
        trace!("Rendered prompt ({} bytes)", rendered.len());
        RenderedPrompt(rendered)
    }
}
