//! Configuration system for recallkit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{DEFAULT_COMPLETION_MODEL, MEMORY_RELEVANCE_TEMPLATE};
use crate::error::{RecallError, RecallResult};
use crate::traits::LlmConfig;

/// Completion backend provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(RecallError::UnsupportedProvider {
                provider: s.to_string(),
            }),
        }
    }
}

/// A completion model identifier split into provider and model name.
///
/// `openai/gpt-4o-mini` names the provider explicitly; a bare model name
/// such as `gpt-4o` is an OpenAI model. Only the first `/` separates the
/// provider, so `ollama/library/llama3` keeps `library/llama3` as the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId {
    pub provider: LlmProvider,
    pub model: String,
}

impl FromStr for ModelId {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RecallError::Configuration(
                "Completion model identifier is empty".to_string(),
            ));
        }

        match s.split_once('/') {
            Some((provider, model)) => {
                if model.is_empty() {
                    return Err(RecallError::Configuration(format!(
                        "Model name missing in '{}'",
                        s
                    )));
                }
                Ok(Self {
                    provider: provider.parse()?,
                    model: model.to_string(),
                })
            }
            None => Ok(Self {
                provider: LlmProvider::OpenAI,
                model: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Memory filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Model identifier, `provider/model` or a bare model name.
    pub completion_model: String,
    /// Backend settings (sampling, credentials, endpoint).
    pub llm: LlmConfig,
    /// Directory of `.tera` prompt templates; built-in templates when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_dir: Option<PathBuf>,
    /// Name of the relevance template.
    pub template: String,
    /// Return an empty mask for an empty memory list without calling the backend.
    pub skip_empty_memories: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            llm: LlmConfig::default(),
            prompt_dir: None,
            template: MEMORY_RELEVANCE_TEMPLATE.to_string(),
            skip_empty_memories: true,
        }
    }
}

impl FilterConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> RecallResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RecallError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RecallError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RecallError::Configuration(e.to_string())),
            _ => Err(RecallError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(model) = std::env::var("RECALLKIT_COMPLETION_MODEL") {
            config.completion_model = model;
        }
        if let Ok(dir) = std::env::var("RECALLKIT_PROMPT_DIR") {
            config.prompt_dir = Some(PathBuf::from(dir));
        }
        if let Ok(skip) = std::env::var("RECALLKIT_SKIP_EMPTY_MEMORIES") {
            config.skip_empty_memories = !matches!(
                skip.to_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        // Backends fall back to their own key variables when this is unset.
        if let Ok(api_key) = std::env::var("RECALLKIT_API_KEY") {
            config.llm.api_key = Some(api_key);
        }

        config
    }

    /// Parse `completion_model` into provider and model name.
    pub fn model_id(&self) -> RecallResult<ModelId> {
        self.completion_model.parse()
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }
}

/// Builder for FilterConfig.
#[derive(Default)]
pub struct FilterConfigBuilder {
    config: FilterConfig,
}

impl FilterConfigBuilder {
    /// Set the completion model identifier.
    pub fn completion_model(mut self, model: impl Into<String>) -> Self {
        self.config.completion_model = model.into();
        self
    }

    /// Set backend configuration.
    pub fn llm(mut self, config: LlmConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Load prompt templates from a directory.
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.prompt_dir = Some(dir.into());
        self
    }

    /// Set the relevance template name.
    pub fn template(mut self, name: impl Into<String>) -> Self {
        self.config.template = name.into();
        self
    }

    /// Choose whether an empty memory list skips the backend call.
    pub fn skip_empty_memories(mut self, skip: bool) -> Self {
        self.config.skip_empty_memories = skip;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> FilterConfig {
        self.config
    }
}
