//! recallkit-core - Core library for recallkit.
//!
//! This crate provides the message types, the completion backend trait, the
//! prompt renderer and the [`MemoryFilter`] that asks an LLM which candidate
//! memories are relevant to a conversation.
//!
//! Concrete backends live in `recallkit-llm`.
//!
//! # Example
//!
//! ```ignore
//! use recallkit_core::{MemoryFilter, Message};
//!
//! let filter = MemoryFilter::new(llm)?;
//! let mask = filter
//!     .filter_relevant_memories(&[Message::user("Tell me about Python")], &memories)
//!     .await?;
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod prompt;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{FilterConfig, LlmProvider, ModelId};
pub use error::{ErrorCode, RecallError, RecallResult};
pub use filter::{BlockingMemoryFilter, MemoryFilter, RelevanceSchema};
pub use prompt::{PromptContext, PromptRenderer, TemplateSource};
pub use traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
pub use types::{
    format_messages, ContentBlock, FunctionCall, Message, MessageContent, MessageInput, MessageRole,
    RelevanceResponse, ToolCall,
};
