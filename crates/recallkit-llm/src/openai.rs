//! OpenAI LLM provider implementation.

use async_trait::async_trait;
use tracing::{debug, info};

use recallkit_core::error::{RecallError, RecallResult};
use recallkit_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage};
use recallkit_core::types::Message;

#[cfg(feature = "openai")]
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
        ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestFunctionMessage,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestToolMessage,
        ChatCompletionRequestToolMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, ChatCompletionToolType,
        CreateChatCompletionRequest, FunctionCall, ResponseFormat as OpenAIResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// OpenAI LLM provider.
pub struct OpenAIProvider {
    #[cfg(feature = "openai")]
    client: Client<OpenAIConfig>,
    config: LlmConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI LLM provider.
    pub fn new(config: LlmConfig) -> RecallResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                RecallError::Configuration("OpenAI API key not found. Set OPENAI_API_KEY environment variable or provide api_key in config.".to_string())
            })?;

        #[cfg(feature = "openai")]
        let client = {
            let openai_config = if let Some(ref base_url) = config.base_url {
                OpenAIConfig::new()
                    .with_api_key(api_key)
                    .with_api_base(base_url)
            } else {
                OpenAIConfig::new().with_api_key(api_key)
            };

            // async-openai retries 429 and 5xx with backoff by default;
            // failures must reach the caller on the first attempt.
            let no_retry = backoff::ExponentialBackoffBuilder::new()
                .with_max_elapsed_time(Some(std::time::Duration::ZERO))
                .build();

            let client = match config.timeout_secs {
                Some(secs) => {
                    let http_client = reqwest::Client::builder()
                        .timeout(std::time::Duration::from_secs(secs))
                        .build()
                        .map_err(|e| {
                            RecallError::Configuration(format!(
                                "Failed to create HTTP client: {}",
                                e
                            ))
                        })?;
                    Client::with_config(openai_config).with_http_client(http_client)
                }
                None => Client::with_config(openai_config),
            };
            client.with_backoff(no_retry)
        };

        #[cfg(not(feature = "openai"))]
        let _ = api_key;

        let mut config = config;
        if config.model.is_empty() {
            config.model = DEFAULT_OPENAI_MODEL.to_string();
        }

        info!("OpenAI provider initialized (model={})", config.model);

        Ok(Self {
            #[cfg(feature = "openai")]
            client,
            config,
        })
    }

    /// Check if this is a reasoning model that doesn't support certain params.
    fn is_reasoning_model_internal(&self) -> bool {
        let model_lower = self.config.model.to_lowercase();
        ["o1", "o3", "o4", "gpt-5"]
            .iter()
            .any(|m| model_lower.starts_with(m))
    }

    #[cfg(feature = "openai")]
    fn message_to_openai(msg: &Message) -> ChatCompletionRequestMessage {
        use recallkit_core::types::MessageRole;

        let text = msg.text();
        match msg.role {
            // Developer messages are sent as system messages, which every
            // chat model accepts.
            MessageRole::System | MessageRole::Developer => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(text),
                    name: msg.name.clone(),
                })
            }
            MessageRole::User => {
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(text),
                    name: msg.name.clone(),
                })
            }
            MessageRole::Assistant => {
                let tool_calls = msg.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|call| ChatCompletionMessageToolCall {
                            id: call.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: call.function.name.clone(),
                                arguments: call.function.arguments.clone(),
                            },
                        })
                        .collect()
                });

                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: msg
                        .content
                        .as_ref()
                        .map(|_| ChatCompletionRequestAssistantMessageContent::Text(text)),
                    name: msg.name.clone(),
                    tool_calls,
                    ..Default::default()
                })
            }
            MessageRole::Tool => {
                ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                    content: ChatCompletionRequestToolMessageContent::Text(text),
                    tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
                })
            }
            MessageRole::Function => {
                ChatCompletionRequestMessage::Function(ChatCompletionRequestFunctionMessage {
                    content: msg.content.as_ref().map(|_| text),
                    name: msg.name.clone().unwrap_or_default(),
                })
            }
        }
    }

    #[cfg(feature = "openai")]
    fn response_format_to_openai(
        format: &recallkit_core::traits::ResponseFormat,
    ) -> OpenAIResponseFormat {
        use recallkit_core::traits::ResponseFormat;

        match format {
            ResponseFormat::Text => OpenAIResponseFormat::Text,
            ResponseFormat::Json => OpenAIResponseFormat::JsonObject,
            ResponseFormat::JsonSchema { name, schema } => OpenAIResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: name.clone(),
                    schema: Some(schema.clone()),
                    strict: Some(true),
                },
            },
        }
    }

    #[cfg(feature = "openai")]
    fn map_error(err: OpenAIError) -> RecallError {
        match err {
            OpenAIError::Reqwest(e) => RecallError::llm_with_source("OpenAI request failed", e),
            OpenAIError::ApiError(api) => {
                let code = api.code.as_ref().map(|c| c.to_string()).unwrap_or_default();
                if code.contains("rate_limit") {
                    RecallError::rate_limit(format!("OpenAI rate limit: {}", api.message))
                } else {
                    RecallError::llm(format!("OpenAI API error: {}", api.message))
                }
            }
            other => RecallError::llm(format!("OpenAI API error: {}", other)),
        }
    }
}

#[async_trait]
impl Llm for OpenAIProvider {
    #[cfg(feature = "openai")]
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> RecallResult<LlmResponse> {
        let chat_messages: Vec<ChatCompletionRequestMessage> =
            messages.iter().map(Self::message_to_openai).collect();

        let options = options.unwrap_or_default();

        let mut request = CreateChatCompletionRequest {
            model: self.config.model.clone(),
            messages: chat_messages,
            response_format: options
                .response_format
                .as_ref()
                .map(Self::response_format_to_openai),
            ..Default::default()
        };

        // Only add temperature/top_p for non-reasoning models
        if !self.is_reasoning_model_internal() {
            request.temperature = Some(options.temperature.unwrap_or(self.config.temperature));
            request.top_p = Some(options.top_p.unwrap_or(self.config.top_p));
            request.max_tokens = Some(options.max_tokens.unwrap_or(self.config.max_tokens));
        }

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "Sending OpenAI chat completion"
        );

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(Self::map_error)?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| RecallError::llm("No response choices returned"))?;

        let content = choice.message.content.clone();

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse { content, usage })
    }

    #[cfg(not(feature = "openai"))]
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> RecallResult<LlmResponse> {
        Err(RecallError::Configuration(
            "OpenAI feature not enabled. Enable the 'openai' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_json_mode(&self) -> bool {
        true
    }

    fn is_reasoning_model(&self) -> bool {
        self.is_reasoning_model_internal()
    }
}
