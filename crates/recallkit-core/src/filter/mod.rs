//! LLM-judged memory relevance filtering.
//!
//! [`MemoryFilter`] asks a completion backend which of a list of candidate
//! memories are relevant to a conversation and returns a boolean mask with
//! one entry per memory, in input order.
//!
//! # Example
//!
//! ```ignore
//! use recallkit_core::{Message, MemoryFilter};
//!
//! let filter = MemoryFilter::new(llm)?;
//! let mask = filter
//!     .filter_relevant_memories(
//!         &[Message::user("Tell me about Python programming")],
//!         &["Python is a high-level programming language.", "My dog is very friendly."],
//!     )
//!     .await?;
//! assert_eq!(mask, vec![true, false]);
//! ```

mod blocking;
mod schema;

pub use blocking::BlockingMemoryFilter;
pub use schema::{remove_code_blocks, RelevanceSchema};

use std::sync::Arc;

use tracing::debug;

use crate::config::FilterConfig;
use crate::constants::MEMORY_RELEVANCE_TEMPLATE;
use crate::error::{RecallError, RecallResult};
use crate::prompt::{PromptContext, PromptRenderer};
use crate::traits::{GenerationOptions, Llm, LlmResponse};
use crate::types::{Message, RelevanceResponse};

/// Judges memory relevance against a conversation through an LLM.
pub struct MemoryFilter {
    llm: Arc<dyn Llm>,
    renderer: PromptRenderer,
    template: String,
    skip_empty_memories: bool,
}

impl MemoryFilter {
    /// Create a filter over the built-in prompt templates.
    pub fn new(llm: Arc<dyn Llm>) -> RecallResult<Self> {
        Ok(Self::with_renderer(llm, PromptRenderer::builtin()?))
    }

    /// Create a filter with an explicit renderer.
    pub fn with_renderer(llm: Arc<dyn Llm>, renderer: PromptRenderer) -> Self {
        Self {
            llm,
            renderer,
            template: MEMORY_RELEVANCE_TEMPLATE.to_string(),
            skip_empty_memories: true,
        }
    }

    /// Create a filter from configuration.
    ///
    /// Fails if the configured template directory cannot be loaded or does
    /// not contain the configured template.
    pub fn with_config(llm: Arc<dyn Llm>, config: &FilterConfig) -> RecallResult<Self> {
        let renderer = match &config.prompt_dir {
            Some(dir) => PromptRenderer::from_dir(dir)?,
            None => PromptRenderer::builtin()?,
        };

        if !renderer.has_template(&config.template) {
            return Err(RecallError::template(format!(
                "template '{}' not found ({:?})",
                config.template,
                renderer.source()
            )));
        }

        Ok(Self {
            llm,
            renderer,
            template: config.template.clone(),
            skip_empty_memories: config.skip_empty_memories,
        })
    }

    /// Model identifier of the backend this filter calls.
    pub fn completion_model(&self) -> &str {
        self.llm.model_name()
    }

    /// Judge each memory's relevance to the conversation.
    ///
    /// Returns exactly one boolean per memory, `result[i]` answering for
    /// `memories[i]`. Transport failures, non-JSON content and responses that
    /// do not match the expected shape are returned as errors.
    pub async fn filter_relevant_memories<S: AsRef<str>>(
        &self,
        conversation: &[Message],
        memories: &[S],
    ) -> RecallResult<Vec<bool>> {
        Ok(self
            .filter_with_reasoning(conversation, memories)
            .await?
            .relevance_list)
    }

    /// Same as [`filter_relevant_memories`](Self::filter_relevant_memories),
    /// keeping the backend's rationale.
    pub async fn filter_with_reasoning<S: AsRef<str>>(
        &self,
        conversation: &[Message],
        memories: &[S],
    ) -> RecallResult<RelevanceResponse> {
        if memories.is_empty() && self.skip_empty_memories {
            debug!("No memories to judge, skipping completion call");
            return Ok(RelevanceResponse {
                relevance_list: vec![],
                reasoning: String::new(),
            });
        }

        let prompt = self
            .renderer
            .render(&self.template, &PromptContext::new(conversation, memories))?;

        let schema = RelevanceSchema::new(memories.len());

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(prompt));
        messages.extend_from_slice(conversation);

        debug!(
            model = self.llm.model_name(),
            memories = memories.len(),
            turns = conversation.len(),
            "Requesting relevance judgment"
        );

        let response = self
            .llm
            .generate(
                &messages,
                Some(GenerationOptions::with_response_format(schema.response_format())),
            )
            .await?;

        let LlmResponse { content, usage } = response;
        let content = content.ok_or_else(|| {
            RecallError::missing_content("Completion response carried no content")
        })?;

        let judgment = schema.parse(&content)?;

        debug!(
            relevant = ?judgment.relevant_indices(),
            total = judgment.relevance_list.len(),
            prompt_tokens = usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens = usage.as_ref().map(|u| u.completion_tokens),
            "Relevance judgment received"
        );

        Ok(judgment)
    }

    /// Keep only the memories judged relevant, in input order.
    pub async fn select_relevant<S: AsRef<str> + Clone>(
        &self,
        conversation: &[Message],
        memories: &[S],
    ) -> RecallResult<Vec<S>> {
        let judgment = self.filter_with_reasoning(conversation, memories).await?;
        Ok(judgment.select(memories))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::traits::{LlmResponse, MockLlm, ResponseFormat};
    use crate::types::MessageRole;

    fn python_memories() -> Vec<String> {
        vec![
            "Python is a high-level programming language.".to_string(),
            "My dog is very friendly.".to_string(),
            "Python has libraries like NumPy and Pandas for data analysis.".to_string(),
        ]
    }

    fn mock_returning(content: &'static str) -> MockLlm {
        let mut llm = MockLlm::new();
        llm.expect_model_name().return_const("openai/gpt-4o-mini".to_string());
        llm.expect_generate()
            .times(1)
            .returning(move |_, _| Ok(LlmResponse::text(content)));
        llm
    }

    #[tokio::test]
    async fn test_filter_returns_backend_mask() {
        let filter = MemoryFilter::new(Arc::new(mock_returning(
            r#"{"relevance_list": [true, false, true], "reasoning": "Two memories are about Python."}"#,
        )))
        .unwrap();

        let result = filter
            .filter_relevant_memories(
                &[Message::user("Tell me about Python programming")],
                &python_memories(),
            )
            .await
            .unwrap();

        assert_eq!(result, vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_usage_does_not_change_result() {
        use crate::traits::TokenUsage;

        let mut llm = MockLlm::new();
        llm.expect_model_name().return_const("openai/gpt-4o-mini".to_string());
        llm.expect_generate().times(1).returning(|_, _| {
            Ok(LlmResponse {
                content: Some(r#"{"relevance_list": [false, true], "reasoning": "dog"}"#.to_string()),
                usage: Some(TokenUsage {
                    prompt_tokens: 120,
                    completion_tokens: 18,
                    total_tokens: 138,
                }),
            })
        });
        let filter = MemoryFilter::new(Arc::new(llm)).unwrap();

        let result = filter
            .filter_relevant_memories(
                &[Message::user("How is my dog?")],
                &["Python is a high-level programming language.", "My dog is very friendly."],
            )
            .await
            .unwrap();

        assert_eq!(result, vec![false, true]);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let mut llm = MockLlm::new();
        llm.expect_model_name().return_const("openai/gpt-4o-mini".to_string());
        llm.expect_generate()
            .withf(|messages, options| {
                let Some(ResponseFormat::JsonSchema { name, schema }) =
                    options.as_ref().and_then(|o| o.response_format.as_ref())
                else {
                    return false;
                };
                messages.len() == 3
                    && messages[0].role == MessageRole::System
                    && messages[0].text().contains("[2] Python has libraries")
                    && messages[1] == Message::user("Tell me about Python programming")
                    && messages[2] == Message::assistant("Sure, what would you like to know?")
                    && name == "relevance_response"
                    && schema["properties"]["relevance_list"]["minItems"] == 3
                    && schema["properties"]["relevance_list"]["maxItems"] == 3
            })
            .times(1)
            .returning(|_, _| {
                Ok(LlmResponse::text(
                    r#"{"relevance_list": [true, false, true], "reasoning": "ok"}"#,
                ))
            });

        let filter = MemoryFilter::new(Arc::new(llm)).unwrap();
        let conversation = vec![
            Message::user("Tell me about Python programming"),
            Message::assistant("Sure, what would you like to know?"),
        ];

        let result = filter
            .filter_relevant_memories(&conversation, &python_memories())
            .await
            .unwrap();
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn test_order_follows_input() {
        let filter = MemoryFilter::new(Arc::new(mock_returning(
            r#"{"relevance_list": [false, false, true, true], "reasoning": "last two"}"#,
        )))
        .unwrap();
        let memories = ["a", "b", "c", "d"];

        let selected = filter
            .select_relevant(&[Message::user("c and d")], &memories)
            .await
            .unwrap();

        assert_eq!(selected, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_length_mismatch_is_an_error() {
        let filter = MemoryFilter::new(Arc::new(mock_returning(
            r#"{"relevance_list": [true, false], "reasoning": "short"}"#,
        )))
        .unwrap();

        let err = filter
            .filter_relevant_memories(&[Message::user("python")], &python_memories())
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::SchemaLengthMismatch);
    }

    #[tokio::test]
    async fn test_non_json_is_an_error() {
        let filter = MemoryFilter::new(Arc::new(mock_returning(
            "The first and third memories are relevant.",
        )))
        .unwrap();

        let err = filter
            .filter_relevant_memories(&[Message::user("python")], &python_memories())
            .await
            .unwrap_err();

        assert!(matches!(err, RecallError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_missing_content_is_an_error() {
        let mut llm = MockLlm::new();
        llm.expect_model_name().return_const("openai/gpt-4o-mini".to_string());
        llm.expect_generate()
            .returning(|_, _| Ok(LlmResponse::default()));
        let filter = MemoryFilter::new(Arc::new(llm)).unwrap();

        let err = filter
            .filter_relevant_memories(&[Message::user("python")], &python_memories())
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ParseMissingContent);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let mut llm = MockLlm::new();
        llm.expect_model_name().return_const("openai/gpt-4o-mini".to_string());
        llm.expect_generate()
            .times(1)
            .returning(|_, _| Err(RecallError::from_http_status(503, "unavailable")));
        let filter = MemoryFilter::new(Arc::new(llm)).unwrap();

        let err = filter
            .filter_relevant_memories(&[Message::user("python")], &python_memories())
            .await
            .unwrap_err();

        assert!(matches!(err, RecallError::Llm { .. }));
        assert!(!err.is_response_error());
    }

    #[tokio::test]
    async fn test_empty_memories_skip_backend() {
        let mut llm = MockLlm::new();
        llm.expect_generate().never();
        let filter = MemoryFilter::new(Arc::new(llm)).unwrap();
        let memories: Vec<String> = vec![];

        let result = filter
            .filter_relevant_memories(&[Message::user("python")], &memories)
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_empty_memories_call_backend_when_configured() {
        let config = FilterConfig::builder().skip_empty_memories(false).build();
        let filter = MemoryFilter::with_config(
            Arc::new(mock_returning(r#"{"relevance_list": [], "reasoning": "nothing to judge"}"#)),
            &config,
        )
        .unwrap();
        let memories: Vec<String> = vec![];

        let result = filter
            .filter_relevant_memories(&[Message::user("python")], &memories)
            .await
            .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_empty_conversation_sends_prompt_only() {
        let mut llm = MockLlm::new();
        llm.expect_model_name().return_const("openai/gpt-4o-mini".to_string());
        llm.expect_generate()
            .withf(|messages, _| {
                messages.len() == 1
                    && messages[0].role == MessageRole::System
                    && messages[0].text().contains("(the conversation is empty)")
            })
            .times(1)
            .returning(|_, _| {
                Ok(LlmResponse::text(r#"{"relevance_list": [false], "reasoning": "no context"}"#))
            });
        let filter = MemoryFilter::new(Arc::new(llm)).unwrap();

        let judgment = filter
            .filter_with_reasoning(&[], &["My dog is very friendly."])
            .await
            .unwrap();

        assert_eq!(judgment.relevance_list, vec![false]);
        assert_eq!(judgment.reasoning, "no context");
    }

    #[test]
    fn test_with_config_rejects_unknown_template() {
        let config = FilterConfig::builder().template("nope").build();
        let result = MemoryFilter::with_config(Arc::new(MockLlm::new()), &config);
        assert!(matches!(result, Err(RecallError::Template(_))));
    }

    #[test]
    fn test_completion_model_comes_from_backend() {
        let mut llm = MockLlm::new();
        llm.expect_model_name().return_const("gpt-4o-mini".to_string());
        let filter = MemoryFilter::new(Arc::new(llm)).unwrap();
        assert_eq!(filter.completion_model(), "gpt-4o-mini");
    }
}
