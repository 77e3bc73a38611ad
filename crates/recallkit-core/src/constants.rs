//! Shared string constants for message records and completion requests.

// Roles
pub const USER: &str = "user";
pub const ASSISTANT: &str = "assistant";
pub const TOOL: &str = "tool";
pub const SYSTEM: &str = "system";
pub const FUNCTION: &str = "function";
pub const DEVELOPER: &str = "developer";

// Wire keys
pub const ROLE: &str = "role";
pub const CONTENT: &str = "content";
pub const MESSAGES: &str = "messages";
pub const MODEL: &str = "model";
pub const TEMPERATURE: &str = "temperature";
pub const MAX_TOKENS: &str = "max_tokens";

pub const DEFAULT: &str = "default";
pub const DEFAULT_USER_TOKEN: &str = "default_user";

/// Model used when no completion model is configured.
pub const DEFAULT_COMPLETION_MODEL: &str = "openai/gpt-4o-mini";

/// Name of the relevance prompt template.
pub const MEMORY_RELEVANCE_TEMPLATE: &str = "memory_relevance";

/// Name attached to the relevance response schema sent to the backend.
pub const RELEVANCE_SCHEMA_NAME: &str = "relevance_response";

/// Upper bound on the length of the backend's rationale, in words.
pub const MAX_REASONING_WORDS: usize = 50;
