//! Integration tests for the Anthropic connector using wiremock
//!
//! These tests mock the Messages API to verify the connector's HTTP behavior.

use assay_core::{
    Error,
    normalized::{CompletionRequest, ConversationMessage, ToolDefinition},
    provider::Provider,
};
use assay_egress::anthropic::{AnthropicConfig, AnthropicConnector};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn connector(server: &MockServer) -> AnthropicConnector {
    AnthropicConnector::new(AnthropicConfig::new("test-key").with_base_url(server.uri())).unwrap()
}

fn request() -> CompletionRequest {
    CompletionRequest::new(vec![
        ConversationMessage::system("Cite your sources."),
        ConversationMessage::user("How many paid invoices?"),
    ])
}

#[tokio::test]
async fn test_anthropic_complete_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-20241022",
            "system": "Cite your sources.",
            "max_tokens": 4096,
            "messages": [{"role": "user", "content": "How many paid invoices?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                {"type": "text", "text": "There are "},
                {"type": "text", "text": "3 paid invoices."}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 20, "output_tokens": 7}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = connector(&mock_server).complete(request()).await.unwrap();

    assert_eq!(response.text, "There are 3 paid invoices.");
    assert!(response.tool_calls.is_none());
    assert_eq!(response.usage.input_tokens, 20);
    assert_eq!(response.usage.output_tokens, 7);
}

#[tokio::test]
async fn test_anthropic_tool_use_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({
            "tools": [{"name": "list_invoices", "description": "List invoices"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_456",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "list_invoices", "input": {"status": "paid"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 30, "output_tokens": 12}
        })))
        .mount(&mock_server)
        .await;

    let tool = ToolDefinition::new(
        "list_invoices",
        "List invoices",
        json!({"type": "object", "properties": {"status": {"type": "string"}}}),
    );
    let response = connector(&mock_server)
        .complete(request().with_tools(vec![tool]))
        .await
        .unwrap();

    assert_eq!(response.text, "Let me check.");
    let calls = response.tool_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "toolu_1");
    assert_eq!(calls[0].input["status"], "paid");
}

#[tokio::test]
async fn test_anthropic_rate_limit_with_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "17")
                .set_body_json(json!({"type": "error", "error": {"type": "rate_limit_error"}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = connector(&mock_server).complete(request()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::RateLimitExceeded {
            retry_after_secs: Some(17)
        }
    ));
}

#[tokio::test]
async fn test_anthropic_server_error_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = connector(&mock_server).complete(request()).await.unwrap_err();

    assert!(err.to_string().contains("529"));
    assert!(err.to_string().contains("overloaded"));
}

#[tokio::test]
async fn test_anthropic_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let err = connector(&mock_server).complete(request()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse Anthropic response"));
}

#[tokio::test]
async fn test_anthropic_invalid_tool_never_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let tool = ToolDefinition::new("bad", "d", json!({"type": "object"})).with_required_fields(["x"]);
    let err = connector(&mock_server)
        .complete(request().with_tools(vec![tool]))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidToolSchema { .. }));
}
