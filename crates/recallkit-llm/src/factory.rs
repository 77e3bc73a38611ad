//! Factory for creating LLM providers.

use std::sync::Arc;

use tracing::debug;

use recallkit_core::config::{FilterConfig, LlmProvider, ModelId};
use recallkit_core::error::RecallResult;
use recallkit_core::traits::{Llm, LlmConfig};
use recallkit_core::MemoryFilter;

use crate::anthropic::AnthropicLlm;
use crate::ollama::OllamaLlm;
use crate::openai::OpenAIProvider;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> RecallResult<Arc<dyn Llm>> {
        match provider {
            LlmProvider::OpenAI => {
                let llm = OpenAIProvider::new(config)?;
                Ok(Arc::new(llm))
            }
            LlmProvider::Anthropic => {
                let llm = AnthropicLlm::new(config)?;
                Ok(Arc::new(llm))
            }
            LlmProvider::Ollama => {
                let llm = OllamaLlm::new(config)?;
                Ok(Arc::new(llm))
            }
        }
    }

    /// Create an LLM provider from a `provider/model` identifier.
    ///
    /// The model name in the identifier overrides `config.model`.
    pub fn from_model_id(model_id: &str, config: LlmConfig) -> RecallResult<Arc<dyn Llm>> {
        let ModelId { provider, model } = model_id.parse()?;
        debug!(%provider, %model, "Resolving completion model");
        Self::create(provider, LlmConfig { model, ..config })
    }

    /// Build a [`MemoryFilter`] backed by the configured completion model.
    pub fn memory_filter(config: &FilterConfig) -> RecallResult<MemoryFilter> {
        let llm = Self::from_model_id(&config.completion_model, config.llm.clone())?;
        MemoryFilter::with_config(llm, config)
    }

    /// Create an OpenAI LLM provider with a specific model.
    pub fn openai_with_model(model: impl Into<String>) -> RecallResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::OpenAI, config)
    }

    /// Create an Anthropic LLM provider with a specific model.
    pub fn anthropic_with_model(model: impl Into<String>) -> RecallResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::Anthropic, config)
    }

    /// Create an Ollama LLM provider with a specific model.
    pub fn ollama_with_model(model: impl Into<String>) -> RecallResult<Arc<dyn Llm>> {
        let config = LlmConfig {
            model: model.into(),
            ..Default::default()
        };
        Self::create(LlmProvider::Ollama, config)
    }
}
