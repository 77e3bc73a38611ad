//! Prompt template loading and rendering.
//!
//! Prompt wording lives in `.tera` files rather than in code. The built-in
//! templates are compiled in from the crate's `prompts/` directory; a
//! directory on disk can be loaded instead to change wording without a
//! rebuild. Template names are file stems (`memory_relevance.tera` is
//! rendered as `memory_relevance`).

use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};
use tracing::debug;

use crate::constants::{MAX_REASONING_WORDS, MEMORY_RELEVANCE_TEMPLATE};
use crate::error::{RecallError, RecallResult};
use crate::types::{format_messages, Message};

const TEMPLATE_EXTENSION: &str = "tera";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[(
    MEMORY_RELEVANCE_TEMPLATE,
    include_str!("../../prompts/memory_relevance.tera"),
)];

/// Where a renderer's templates came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Templates compiled into the crate.
    Builtin,
    /// Templates loaded from a directory.
    Directory(PathBuf),
}

/// One conversation turn as seen by a template.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: &'static str,
    pub content: String,
}

impl From<&Message> for PromptMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.text(),
        }
    }
}

/// Substitution context for the relevance prompt.
///
/// Templates see `messages` (list of `{role, content}`), `memories` (list of
/// strings), `transcript` (the conversation as `role: text` lines) and
/// `max_reasoning_words`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptContext<'a> {
    pub messages: Vec<PromptMessage>,
    pub memories: Vec<&'a str>,
    pub transcript: String,
    pub max_reasoning_words: usize,
}

impl<'a> PromptContext<'a> {
    /// Build the context for a conversation and its candidate memories.
    pub fn new<S: AsRef<str>>(conversation: &[Message], memories: &'a [S]) -> Self {
        Self {
            messages: conversation.iter().map(PromptMessage::from).collect(),
            memories: memories.iter().map(|m| m.as_ref()).collect(),
            transcript: format_messages(conversation),
            max_reasoning_words: MAX_REASONING_WORDS,
        }
    }
}

/// Renders named prompt templates.
#[derive(Debug, Clone)]
pub struct PromptRenderer {
    tera: Tera,
    source: TemplateSource,
}

impl PromptRenderer {
    /// Renderer over the templates compiled into the crate.
    pub fn builtin() -> RecallResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN_TEMPLATES.iter().copied())?;
        tera.autoescape_on(vec![]);

        Ok(Self {
            tera,
            source: TemplateSource::Builtin,
        })
    }

    /// Renderer over every `*.tera` file in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> RecallResult<Self> {
        let dir = dir.as_ref();
        let mut templates = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            templates.push((name.to_string(), std::fs::read_to_string(&path)?));
        }

        if templates.is_empty() {
            return Err(RecallError::template(format!(
                "no .{} templates found in {}",
                TEMPLATE_EXTENSION,
                dir.display()
            )));
        }

        debug!(
            "Loaded {} prompt template(s) from {}",
            templates.len(),
            dir.display()
        );

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)?;
        tera.autoescape_on(vec![]);

        Ok(Self {
            tera,
            source: TemplateSource::Directory(dir.to_path_buf()),
        })
    }

    /// Where the templates were loaded from.
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Check whether a template is registered under `name`.
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render `name` with the given context.
    pub fn render(&self, name: &str, context: &PromptContext<'_>) -> RecallResult<String> {
        if !self.has_template(name) {
            return Err(RecallError::template(format!(
                "template '{}' not found ({:?})",
                name, self.source
            )));
        }
        let context = Context::from_serialize(context)?;
        Ok(self.tera.render(name, &context)?)
    }

    /// Render the memory relevance prompt.
    pub fn render_memory_relevance<S: AsRef<str>>(
        &self,
        conversation: &[Message],
        memories: &[S],
    ) -> RecallResult<String> {
        self.render(
            MEMORY_RELEVANCE_TEMPLATE,
            &PromptContext::new(conversation, memories),
        )
    }
}
