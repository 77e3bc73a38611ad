//! Response schema for relevance judgments.
//!
//! The expected array length is only known at call time, so the schema is
//! built per call from the number of memories and the decoded JSON is checked
//! against it imperatively.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::constants::{MAX_REASONING_WORDS, RELEVANCE_SCHEMA_NAME};
use crate::error::{RecallError, RecallResult};
use crate::traits::ResponseFormat;
use crate::types::RelevanceResponse;

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^```[a-zA-Z0-9]*\s*([\s\S]*?)\s*```$").expect("code fence pattern is valid")
});

static THINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think tag pattern is valid"));

/// Remove a surrounding markdown code fence and `<think>` tags from a response.
pub fn remove_code_blocks(content: &str) -> String {
    let content = THINK_RE.replace_all(content, "");
    let content = content.trim();

    CODE_FENCE_RE
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or(content)
        .to_string()
}

/// Shape constraint for a relevance response over `expected_len` memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevanceSchema {
    expected_len: usize,
}

impl RelevanceSchema {
    pub fn new(expected_len: usize) -> Self {
        Self { expected_len }
    }

    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// JSON Schema handed to the backend.
    pub fn json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "relevance_list": {
                    "type": "array",
                    "items": { "type": "boolean" },
                    "minItems": self.expected_len,
                    "maxItems": self.expected_len,
                    "description": "List of booleans, indicating whether each memory is relevant to the conversation. \
                        A memory is relevant if it: \
                        1. Contains information that could help answer questions or provide context for the conversation \
                        2. Relates to topics, entities, or concepts mentioned in the conversation \
                        3. Provides background information that would be useful for understanding the conversation"
                },
                "reasoning": {
                    "type": "string",
                    "description": format!(
                        "A brief explanation (<{} words) of your relevance determinations",
                        MAX_REASONING_WORDS
                    )
                }
            },
            "required": ["relevance_list", "reasoning"],
            "additionalProperties": false
        })
    }

    /// Response format carrying this schema.
    pub fn response_format(&self) -> ResponseFormat {
        ResponseFormat::JsonSchema {
            name: RELEVANCE_SCHEMA_NAME.to_string(),
            schema: self.json_schema(),
        }
    }

    /// Decode response content and validate it.
    ///
    /// Content that is not JSON after fence stripping is a parse error; it is
    /// never treated as an empty judgment.
    pub fn parse(&self, content: &str) -> RecallResult<RelevanceResponse> {
        let cleaned = remove_code_blocks(content);
        let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
            RecallError::parse(format!("Failed to parse relevance JSON: {}", e))
        })?;
        self.validate(&value)
    }

    /// Validate an already decoded JSON value.
    pub fn validate(&self, value: &Value) -> RecallResult<RelevanceResponse> {
        let object = value.as_object().ok_or_else(|| {
            RecallError::schema("response is not a JSON object", self.expected_len)
        })?;

        let list = object
            .get("relevance_list")
            .ok_or_else(|| RecallError::schema("missing field 'relevance_list'", self.expected_len))?
            .as_array()
            .ok_or_else(|| {
                RecallError::schema("'relevance_list' is not an array", self.expected_len)
            })?;

        let relevance_list = list
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_bool().ok_or_else(|| {
                    RecallError::schema(
                        format!("relevance_list[{}] is not a boolean: {}", i, item),
                        self.expected_len,
                    )
                })
            })
            .collect::<RecallResult<Vec<bool>>>()?;

        if relevance_list.len() != self.expected_len {
            warn!(
                expected = self.expected_len,
                actual = relevance_list.len(),
                "Relevance list length does not match memory count"
            );
            return Err(RecallError::length_mismatch(
                self.expected_len,
                relevance_list.len(),
            ));
        }

        let reasoning = object
            .get("reasoning")
            .ok_or_else(|| RecallError::schema("missing field 'reasoning'", self.expected_len))?
            .as_str()
            .ok_or_else(|| RecallError::schema("'reasoning' is not a string", self.expected_len))?
            .to_string();

        let words = reasoning.split_whitespace().count();
        if words > MAX_REASONING_WORDS {
            debug!("Relevance reasoning is {} words, longer than requested", words);
        }

        Ok(RelevanceResponse {
            relevance_list,
            reasoning,
        })
    }
}
