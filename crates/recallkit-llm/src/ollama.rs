//! Ollama LLM provider implementation.

use async_trait::async_trait;
use tracing::info;

use recallkit_core::error::{RecallError, RecallResult};
use recallkit_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
use recallkit_core::types::Message;

#[cfg(feature = "ollama")]
use ollama_rs::{
    generation::chat::{ChatMessage, ChatMessageRequest, MessageRole as OllamaRole},
    generation::parameters::FormatType,
    Ollama,
};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3.1";

/// Ollama LLM provider.
pub struct OllamaLlm {
    #[cfg(feature = "ollama")]
    client: Ollama,
    config: LlmConfig,
}

impl OllamaLlm {
    /// Create a new Ollama LLM provider.
    pub fn new(config: LlmConfig) -> RecallResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        let url = url::Url::parse(&base_url)
            .map_err(|e| RecallError::Configuration(format!("Invalid Ollama URL: {}", e)))?;

        let host = url.host_str().unwrap_or("localhost").to_string();
        let port = url.port().unwrap_or(11434);

        #[cfg(feature = "ollama")]
        let client = Ollama::new(format!("{}://{}", url.scheme(), host), port);

        #[cfg(not(feature = "ollama"))]
        let _ = (host, port);

        let mut config = config;
        if config.model.is_empty() {
            config.model = DEFAULT_OLLAMA_MODEL.to_string();
        }

        info!("Ollama provider initialized (model={}, url={})", config.model, base_url);

        Ok(Self {
            #[cfg(feature = "ollama")]
            client,
            config,
        })
    }

    /// Whether the request should use Ollama's JSON output mode.
    #[cfg_attr(not(feature = "ollama"), allow(dead_code))]
    fn wants_json(format: Option<&ResponseFormat>) -> bool {
        matches!(
            format,
            Some(ResponseFormat::Json | ResponseFormat::JsonSchema { .. })
        )
    }

    #[cfg(feature = "ollama")]
    fn message_to_ollama(msg: &Message) -> ChatMessage {
        use recallkit_core::types::MessageRole;

        ChatMessage {
            role: match msg.role {
                MessageRole::System | MessageRole::Developer => OllamaRole::System,
                MessageRole::Assistant => OllamaRole::Assistant,
                MessageRole::User | MessageRole::Tool | MessageRole::Function => OllamaRole::User,
            },
            content: msg.text(),
            images: None,
        }
    }
}

#[async_trait]
impl Llm for OllamaLlm {
    #[cfg(feature = "ollama")]
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> RecallResult<LlmResponse> {
        let options = options.unwrap_or_default();

        let mut ollama_messages: Vec<ChatMessage> =
            messages.iter().map(Self::message_to_ollama).collect();

        if let Some(instruction) = options
            .response_format
            .as_ref()
            .and_then(|f| f.as_instruction())
        {
            ollama_messages.push(ChatMessage {
                role: OllamaRole::System,
                content: instruction,
                images: None,
            });
        }

        tracing::debug!(
            model = %self.config.model,
            messages = ollama_messages.len(),
            "Sending Ollama chat request"
        );

        let mut request = ChatMessageRequest::new(self.config.model.clone(), ollama_messages);
        if Self::wants_json(options.response_format.as_ref()) {
            request = request.format(FormatType::Json);
        }

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| RecallError::llm(format!("Ollama API error: {}", e)))?;

        let content = response.message.map(|m| m.content);

        Ok(LlmResponse {
            content,
            usage: None,
        })
    }

    #[cfg(not(feature = "ollama"))]
    async fn generate(
        &self,
        _messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> RecallResult<LlmResponse> {
        Err(RecallError::Configuration(
            "Ollama feature not enabled. Enable the 'ollama' feature.".to_string(),
        ))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn supports_json_mode(&self) -> bool {
        false // schema is passed as an instruction
    }
}
