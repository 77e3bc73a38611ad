//! Anthropic (Claude) LLM provider implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use recallkit_core::error::{RecallError, RecallResult};
use recallkit_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, TokenUsage};
use recallkit_core::types::{Message, MessageRole};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20240620";
const CLOSING_USER_TURN: &str = "Respond according to the instructions.";

/// Anthropic LLM provider.
pub struct AnthropicLlm {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

impl AnthropicLlm {
    /// Create a new Anthropic LLM provider.
    pub fn new(config: LlmConfig) -> RecallResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                RecallError::Configuration("Anthropic API key not found. Set ANTHROPIC_API_KEY environment variable or provide api_key in config.".to_string())
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            api_key
                .parse()
                .map_err(|_| RecallError::Configuration("Invalid API key format".to_string()))?,
        );
        headers.insert(
            "anthropic-version",
            ANTHROPIC_VERSION
                .parse()
                .map_err(|_| RecallError::Configuration("Invalid version header".to_string()))?,
        );
        headers.insert(
            "content-type",
            "application/json"
                .parse()
                .map_err(|_| RecallError::Configuration("Invalid content type".to_string()))?,
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            RecallError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| ANTHROPIC_API_URL.to_string());

        let mut config = config;
        if config.model.is_empty() {
            config.model = DEFAULT_ANTHROPIC_MODEL.to_string();
        }

        info!("Anthropic provider initialized (model={})", config.model);

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Split a conversation into Anthropic's top-level system prompt and turns.
    ///
    /// All system and developer messages are joined into the system prompt;
    /// tool and function results are sent as user turns. Turns without text
    /// are dropped, and the request always ends on a user turn so a trailing
    /// assistant answer is not continued as a prefill.
    fn build_request(&self, messages: &[Message], options: &GenerationOptions) -> AnthropicRequest {
        let mut system_parts: Vec<String> = messages
            .iter()
            .filter(|m| matches!(m.role, MessageRole::System | MessageRole::Developer))
            .map(Message::text)
            .collect();

        if let Some(instruction) = options
            .response_format
            .as_ref()
            .and_then(|f| f.as_instruction())
        {
            system_parts.push(instruction);
        }

        let mut conversation_msgs: Vec<AnthropicMessage> = messages
            .iter()
            .filter(|m| !matches!(m.role, MessageRole::System | MessageRole::Developer))
            .map(|m| AnthropicMessage {
                role: match m.role {
                    MessageRole::Assistant => "assistant",
                    _ => "user",
                },
                content: m.text(),
            })
            .filter(|m| !m.content.trim().is_empty())
            .collect();

        // The Messages API rejects a request without turns.
        if conversation_msgs.last().map_or(true, |m| m.role == "assistant") {
            conversation_msgs.push(AnthropicMessage {
                role: "user",
                content: CLOSING_USER_TURN.to_string(),
            });
        }

        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: Some(options.temperature.unwrap_or(self.config.temperature)),
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
            messages: conversation_msgs,
        }
    }
}

#[async_trait]
impl Llm for AnthropicLlm {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> RecallResult<LlmResponse> {
        let options = options.unwrap_or_default();
        let request = self.build_request(messages, &options);

        debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            "Sending Anthropic messages request"
        );

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| RecallError::llm_with_source("Anthropic API request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecallError::llm_with_source("Failed to read response body", e))?;

        if !status.is_success() {
            let error: Result<AnthropicError, _> = serde_json::from_str(&body);
            let message = error
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.clone());
            return Err(RecallError::from_http_status(
                status.as_u16(),
                &format!("Anthropic API error: {}", message),
            ));
        }

        let response: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| RecallError::llm(format!("Failed to parse response: {}", e)))?;

        let content = response
            .content
            .iter()
            .find(|c| c.content_type == "text")
            .and_then(|c| c.text.clone());

        let usage = response.usage.map(|u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        Ok(LlmResponse { content, usage })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_json_mode(&self) -> bool {
        false // schema is passed as an instruction
    }
}
