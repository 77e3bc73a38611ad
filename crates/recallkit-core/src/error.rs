//! Error types for recallkit operations.
//!
//! Every failure carries a structured error code so callers can branch on the
//! kind of failure without matching on message text.

use std::error::Error as _;

use thiserror::Error;

/// Result type alias for recallkit operations.
pub type RecallResult<T> = Result<T, RecallError>;

/// Main error type for all recallkit operations.
#[derive(Error, Debug)]
pub enum RecallError {
    /// Authentication with the completion backend failed.
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Completion backend returned an error or could not be reached.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rate limit exceeded at the completion backend.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        code: ErrorCode,
        retry_after: Option<u64>,
    },

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Response content could not be parsed.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// Parsed response does not match the relevance schema.
    #[error("Schema validation error: {message}")]
    SchemaValidation {
        message: String,
        expected_len: usize,
        actual_len: Option<usize>,
    },

    /// Prompt template could not be loaded or rendered.
    #[error("Template error: {0}")]
    Template(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (AUTH_xxx)
    AuthInvalidKey,
    AuthMissingCredentials,

    // Rate Limit (RATE_xxx)
    RateLimitExceeded,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingContent,

    // Schema (SCHEMA_xxx)
    SchemaLengthMismatch,
    SchemaInvalidShape,

    // Template (TPL_xxx)
    TemplateRenderFailed,

    // Configuration (CFG_xxx)
    ConfigInvalid,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthInvalidKey => "AUTH_001",
            ErrorCode::AuthMissingCredentials => "AUTH_002",
            ErrorCode::RateLimitExceeded => "RATE_001",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingContent => "PARSE_002",
            ErrorCode::SchemaLengthMismatch => "SCHEMA_001",
            ErrorCode::SchemaInvalidShape => "SCHEMA_002",
            ErrorCode::TemplateRenderFailed => "TPL_001",
            ErrorCode::ConfigInvalid => "CFG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl RecallError {
    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create an LLM error that keeps the underlying cause.
    pub fn llm_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmConnectionFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a parse error for a response that carried no content at all.
    pub fn missing_content(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseMissingContent,
        }
    }

    /// Create a schema validation error for a wrong-length relevance list.
    pub fn length_mismatch(expected_len: usize, actual_len: usize) -> Self {
        Self::SchemaValidation {
            message: format!(
                "relevance_list has {} entries, expected {}",
                actual_len, expected_len
            ),
            expected_len,
            actual_len: Some(actual_len),
        }
    }

    /// Create a schema validation error for a malformed response shape.
    pub fn schema(message: impl Into<String>, expected_len: usize) -> Self {
        Self::SchemaValidation {
            message: message.into(),
            expected_len,
            actual_len: None,
        }
    }

    /// Create a template error.
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template(message.into())
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            code: ErrorCode::AuthInvalidKey,
            source: None,
        }
    }

    /// Create a rate limit error.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit {
            message: message.into(),
            code: ErrorCode::RateLimitExceeded,
            retry_after: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::RateLimit { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::SchemaValidation { actual_len, .. } => match actual_len {
                Some(_) => ErrorCode::SchemaLengthMismatch,
                None => ErrorCode::SchemaInvalidShape,
            },
            Self::Template(_) => ErrorCode::TemplateRenderFailed,
            Self::Configuration(_) | Self::UnsupportedProvider { .. } => ErrorCode::ConfigInvalid,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error came from the shape of the backend's answer rather
    /// than from reaching the backend.
    pub fn is_response_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::SchemaValidation { .. } | Self::Serialization(_)
        )
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Authentication { .. } => Some("Please check your API key and authentication credentials"),
            Self::RateLimit { .. } => Some("Please wait before making more requests"),
            Self::Llm { .. } => Some("Please check your LLM provider configuration"),
            Self::SchemaValidation { .. } => {
                Some("The model ignored the response schema; try a model with structured output support")
            }
            Self::Template(_) => Some("Please check the prompt template directory and template names"),
            _ => None,
        }
    }

    /// Convert from an HTTP status returned by a completion backend.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Authentication {
                message: body.to_string(),
                code: ErrorCode::AuthInvalidKey,
                source: None,
            },
            408 | 504 => Self::Network {
                message: body.to_string(),
                code: ErrorCode::NetTimeout,
                source: None,
            },
            429 => Self::RateLimit {
                message: body.to_string(),
                code: ErrorCode::RateLimitExceeded,
                retry_after: None,
            },
            _ => Self::Llm {
                message: format!("HTTP {}: {}", status, body),
                code: ErrorCode::LlmGenerationFailed,
                source: None,
            },
        }
    }
}

impl From<tera::Error> for RecallError {
    fn from(err: tera::Error) -> Self {
        // tera keeps the useful detail in the source chain
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Template(message)
    }
}
