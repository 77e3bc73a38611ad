// Backend wire tests against a local HTTP mock.
// Each test points a provider at mockito and checks the request it sends and
// how the response flows back through the memory filter.

use mockito::Matcher;
use serde_json::json;

use recallkit_core::{FilterConfig, Message, RecallError};
use recallkit_llm::{AnthropicLlm, Llm, LlmConfig, LlmFactory};

fn python_memories() -> Vec<&'static str> {
    vec![
        "Python is a high-level programming language.",
        "My dog is very friendly.",
        "Python has libraries like NumPy and Pandas for data analysis.",
    ]
}

fn anthropic_body(text: &str) -> String {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-haiku-20240307",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 120, "output_tokens": 18}
    })
    .to_string()
}

#[cfg(feature = "openai")]
fn openai_body(text: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 120, "completion_tokens": 18, "total_tokens": 138}
    })
    .to_string()
}

fn anthropic_config(url: String) -> FilterConfig {
    FilterConfig::builder()
        .completion_model("anthropic/claude-3-haiku-20240307")
        .llm(LlmConfig {
            api_key: Some("test-key".to_string()),
            base_url: Some(url),
            ..Default::default()
        })
        .build()
}

#[tokio::test]
async fn test_anthropic_filter_end_to_end() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/messages")
        .match_header("x-api-key", "test-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"model": "claude-3-haiku-20240307"})),
            Matcher::Regex("relevance_list".to_string()),
            Matcher::Regex("My dog is very friendly".to_string()),
            Matcher::Regex("Tell me about Python programming".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(anthropic_body(
            r#"{"relevance_list": [true, false, true], "reasoning": "Both Python facts apply."}"#,
        ))
        .expect(1)
        .create_async()
        .await;

    let filter = LlmFactory::memory_filter(&anthropic_config(server.url())).unwrap();
    let result = filter
        .filter_relevant_memories(
            &[Message::user("Tell me about Python programming")],
            &python_memories(),
        )
        .await
        .unwrap();

    assert_eq!(result, vec![true, false, true]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_anthropic_fenced_response_is_accepted() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/messages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(anthropic_body(
            "```json\n{\"relevance_list\": [false, true, false], \"reasoning\": \"dog\"}\n```",
        ))
        .create_async()
        .await;

    let filter = LlmFactory::memory_filter(&anthropic_config(server.url())).unwrap();
    let response = filter
        .filter_with_reasoning(&[Message::user("How is my dog?")], &python_memories())
        .await
        .unwrap();

    assert_eq!(response.relevance_list, vec![false, true, false]);
    assert_eq!(response.reasoning, "dog");
}

#[tokio::test]
async fn test_anthropic_wrong_length_is_rejected() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/messages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(anthropic_body(
            r#"{"relevance_list": [true, false], "reasoning": "short"}"#,
        ))
        .create_async()
        .await;

    let filter = LlmFactory::memory_filter(&anthropic_config(server.url())).unwrap();
    let result = filter
        .filter_relevant_memories(&[Message::user("Python?")], &python_memories())
        .await;

    match result {
        Err(RecallError::SchemaValidation {
            expected_len,
            actual_len,
            ..
        }) => {
            assert_eq!(expected_len, 3);
            assert_eq!(actual_len, Some(2));
        }
        other => panic!("expected schema validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_anthropic_unauthorized() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/messages")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}})
                .to_string(),
        )
        .create_async()
        .await;

    let llm = AnthropicLlm::new(LlmConfig {
        api_key: Some("bad-key".to_string()),
        base_url: Some(server.url()),
        ..Default::default()
    })
    .unwrap();

    let result = llm.generate(&[Message::user("hi")], None).await;
    match result {
        Err(RecallError::Authentication { message, .. }) => {
            assert!(message.contains("invalid x-api-key"));
        }
        other => panic!("expected authentication error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_anthropic_bad_request_is_llm_error() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/messages")
        .with_status(400)
        .with_body("not json")
        .create_async()
        .await;

    let filter = LlmFactory::memory_filter(&anthropic_config(server.url())).unwrap();
    let result = filter
        .filter_relevant_memories(&[Message::user("Python?")], &python_memories())
        .await;

    assert!(matches!(result, Err(RecallError::Llm { .. })));
}

#[cfg(feature = "openai")]
#[tokio::test]
async fn test_openai_sends_strict_schema() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o-mini",
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "relevance_response", "strict": true}
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_body(
            r#"{"relevance_list": [true, false, true], "reasoning": "Python related"}"#,
        ))
        .expect(1)
        .create_async()
        .await;

    let config = FilterConfig::builder()
        .completion_model("openai/gpt-4o-mini")
        .llm(LlmConfig {
            api_key: Some("test-key".to_string()),
            base_url: Some(server.url()),
            ..Default::default()
        })
        .build();

    let filter = LlmFactory::memory_filter(&config).unwrap();
    let result = filter
        .filter_relevant_memories(
            &[Message::user("Tell me about Python programming")],
            &python_memories(),
        )
        .await
        .unwrap();

    assert_eq!(result, vec![true, false, true]);
    mock.assert_async().await;
}

#[cfg(feature = "openai")]
#[tokio::test]
async fn test_openai_api_error_propagates() {
    use recallkit_llm::OpenAIProvider;

    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"error": {"message": "model not found", "type": "invalid_request_error", "param": null, "code": null}})
                .to_string(),
        )
        .create_async()
        .await;

    let llm = OpenAIProvider::new(LlmConfig {
        model: "gpt-4o-mini".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(server.url()),
        ..Default::default()
    })
    .unwrap();

    let result = llm.generate(&[Message::user("hi")], None).await;
    match result {
        Err(RecallError::Llm { message, .. }) => assert!(message.contains("model not found")),
        other => panic!("expected LLM error, got {:?}", other),
    }
}

#[cfg(feature = "openai")]
#[tokio::test]
async fn test_openai_rate_limit_is_not_retried() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"error": {
                "message": "Rate limit reached for gpt-4o-mini",
                "type": "requests",
                "param": null,
                "code": "rate_limit_exceeded"
            }})
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let config = FilterConfig::builder()
        .completion_model("openai/gpt-4o-mini")
        .llm(LlmConfig {
            api_key: Some("test-key".to_string()),
            base_url: Some(server.url()),
            ..Default::default()
        })
        .build();
    let filter = LlmFactory::memory_filter(&config).unwrap();

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        filter.filter_relevant_memories(&[Message::user("Python?")], &python_memories()),
    )
    .await
    .expect("rate limited call should fail without waiting on retries");

    assert!(matches!(result, Err(RecallError::RateLimit { .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_anthropic_reports_token_usage() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/messages")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(anthropic_body(r#"{"relevance_list": [], "reasoning": "none"}"#))
        .create_async()
        .await;

    let llm = AnthropicLlm::new(LlmConfig {
        api_key: Some("test-key".to_string()),
        base_url: Some(server.url()),
        ..Default::default()
    })
    .unwrap();

    let response = llm.generate(&[Message::user("hi")], None).await.unwrap();
    let usage = response.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 120);
    assert_eq!(usage.completion_tokens, 18);
    assert_eq!(usage.total_tokens, 138);
    assert_eq!(
        response.content.as_deref(),
        Some(r#"{"relevance_list": [], "reasoning": "none"}"#)
    );
}
