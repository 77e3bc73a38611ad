//! recallkit-llm - Completion backends for recallkit.
//!
//! This crate provides [`Llm`] implementations that the memory filter uses
//! to judge relevance, plus a factory that resolves `provider/model`
//! identifiers.
//!
//! # Supported Providers
//!
//! - **OpenAI** (feature: `openai`) - native JSON schema output
//! - **Anthropic** (feature: `anthropic`) - Claude models over the Messages API
//! - **Ollama** (feature: `ollama`) - local models via Ollama
//!
//! # Example
//!
//! ```ignore
//! use recallkit_llm::{FilterConfig, LlmFactory};
//! use recallkit_core::Message;
//!
//! let filter = LlmFactory::memory_filter(&FilterConfig::default())?;
//! let mask = filter
//!     .filter_relevant_memories(&[Message::user("Tell me about Python")], &memories)
//!     .await?;
//! ```

mod anthropic;
mod factory;
mod ollama;
mod openai;

pub use anthropic::AnthropicLlm;
pub use factory::LlmFactory;
pub use ollama::OllamaLlm;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use recallkit_core::config::{FilterConfig, LlmProvider, ModelId};
pub use recallkit_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
