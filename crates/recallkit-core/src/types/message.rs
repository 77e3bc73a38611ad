//! Message types for LLM interactions.
//!
//! The serialized form follows the chat-completions wire shape: a lowercase
//! `role`, a `content` that is either a string or a list of typed blocks, and
//! optional keys that are only emitted when set.

use serde::{Deserialize, Serialize};

use crate::constants::{ASSISTANT, DEVELOPER, FUNCTION, SYSTEM, TOOL, USER};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    #[default]
    User,
    Assistant,
    Tool,
    Function,
    Developer,
}

impl MessageRole {
    /// Get the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => SYSTEM,
            MessageRole::User => USER,
            MessageRole::Assistant => ASSISTANT,
            MessageRole::Tool => TOOL,
            MessageRole::Function => FUNCTION,
            MessageRole::Developer => DEVELOPER,
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// Model reasoning, as returned by thinking-capable models.
    Thinking {
        thinking: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a thinking block.
    pub fn thinking(thinking: impl Into<String>, signature: Option<String>) -> Self {
        Self::Thinking {
            thinking: thinking.into(),
            signature,
        }
    }
}

/// Message content: a plain string or a list of content blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Flatten the content to plain text.
    ///
    /// Text blocks are joined with newlines; thinking blocks are not part of
    /// the visible conversation and are skipped.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Thinking { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<Vec<ContentBlock>> for MessageContent {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        MessageContent::Blocks(blocks)
    }
}

/// Function invocation requested by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, exactly as produced by the model.
    pub arguments: String,
}

/// Tool call attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    pub function: FunctionCall,
}

fn default_tool_type() -> String {
    FUNCTION.to_string()
}

impl ToolCall {
    /// Create a function tool call.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: default_tool_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_blocks: Option<Vec<ContentBlock>>,
}

impl Message {
    fn with_role(role: MessageRole, content: Option<MessageContent>) -> Self {
        Self {
            role,
            content,
            name: None,
            tool_call_id: None,
            tool_calls: None,
            function_call: None,
            reasoning_content: None,
            thinking_blocks: None,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::with_role(MessageRole::User, Some(content.into()))
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self::with_role(MessageRole::Assistant, Some(content.into()))
    }

    /// Create an assistant message without content, e.g. a pure tool-call turn.
    pub fn assistant_empty() -> Self {
        Self::with_role(MessageRole::Assistant, None)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self::with_role(MessageRole::System, Some(content.into()))
    }

    /// Create a new developer message.
    pub fn developer(content: impl Into<MessageContent>) -> Self {
        Self::with_role(MessageRole::Developer, Some(content.into()))
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool(content: impl Into<MessageContent>, tool_call_id: impl Into<String>) -> Self {
        let mut message = Self::with_role(MessageRole::Tool, Some(content.into()));
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Create a legacy function result message.
    pub fn function(
        name: impl Into<String>,
        tool_call_id: impl Into<String>,
        content: Option<MessageContent>,
    ) -> Self {
        let mut message = Self::with_role(MessageRole::Function, content);
        message.name = Some(name.into());
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Set the name field.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach tool calls (assistant messages).
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    /// Attach a legacy function call (assistant messages).
    pub fn with_function_call(mut self, function_call: FunctionCall) -> Self {
        self.function_call = Some(function_call);
        self
    }

    /// Attach reasoning text (assistant messages).
    pub fn with_reasoning_content(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning_content = Some(reasoning.into());
        self
    }

    /// Attach thinking blocks (assistant messages).
    pub fn with_thinking_blocks(mut self, blocks: Vec<ContentBlock>) -> Self {
        self.thinking_blocks = Some(blocks);
        self
    }

    /// Plain-text view of the content, empty when there is none.
    pub fn text(&self) -> String {
        self.content
            .as_ref()
            .map(MessageContent::as_text)
            .unwrap_or_default()
    }
}

/// Conversation input as callers tend to hold it.
///
/// A bare string is a single user turn. Deserializes untagged, so JSON input
/// may be a string, one message object or an array of messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageInput {
    Text(String),
    Single(Message),
    Many(Vec<Message>),
}

impl MessageInput {
    /// Normalize into a list of messages.
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Self::Text(text) => vec![Message::user(text)],
            Self::Single(message) => vec![message],
            Self::Many(messages) => messages,
        }
    }
}

impl From<&str> for MessageInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MessageInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Message> for MessageInput {
    fn from(message: Message) -> Self {
        Self::Single(message)
    }
}

impl From<Vec<Message>> for MessageInput {
    fn from(messages: Vec<Message>) -> Self {
        Self::Many(messages)
    }
}

impl From<&[Message]> for MessageInput {
    fn from(messages: &[Message]) -> Self {
        Self::Many(messages.to_vec())
    }
}

/// Render messages as `role: text` lines for LLM prompts.
pub fn format_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| format!("{}: {}", msg.role, msg.text()))
        .collect::<Vec<_>>()
        .join("\n")
}
