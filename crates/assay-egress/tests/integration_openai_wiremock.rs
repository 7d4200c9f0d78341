//! Integration tests for the OpenAI connector using wiremock

use assay_core::{
    normalized::{CompletionRequest, ConversationMessage, ToolDefinition},
    provider::Provider,
};
use assay_egress::openai::{OpenAIConfig, OpenAIConnector};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn request() -> CompletionRequest {
    CompletionRequest::new(vec![ConversationMessage::user("Who is our biggest client?")])
        .with_system_instruction("Only use tool data.")
}

#[tokio::test]
async fn test_openai_complete_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("openai-organization", "org-42"))
        .and(body_partial_json(json!({
            "model": "gpt-4-turbo",
            "max_tokens": 4096,
            "messages": [
                {"role": "system", "content": "Only use tool data."},
                {"role": "user", "content": "Who is our biggest client?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4-turbo",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Acme Corp."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 15, "completion_tokens": 3, "total_tokens": 18}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = OpenAIConfig::new("test-key")
        .with_base_url(mock_server.uri())
        .with_organization("org-42");
    let connector = OpenAIConnector::new(config).unwrap();

    let response = connector.complete(request()).await.unwrap();

    assert_eq!(response.text, "Acme Corp.");
    assert_eq!(response.usage.input_tokens, 15);
    assert_eq!(response.usage.output_tokens, 3);
}

#[tokio::test]
async fn test_openai_tool_calls_parsed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "tools": [{"type": "function", "function": {"name": "top_clients"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_a",
                        "type": "function",
                        "function": {"name": "top_clients", "arguments": "{\"limit\": 1}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&mock_server)
        .await;

    let connector =
        OpenAIConnector::new(OpenAIConfig::new("test-key").with_base_url(mock_server.uri())).unwrap();
    let tool = ToolDefinition::new(
        "top_clients",
        "Rank clients by revenue",
        json!({"type": "object", "properties": {"limit": {"type": "integer"}}}),
    );

    let response = connector
        .complete(request().with_tools(vec![tool]))
        .await
        .unwrap();

    assert_eq!(response.text, "");
    assert_eq!(response.tool_calls()[0].name, "top_clients");
    assert_eq!(response.tool_calls()[0].input["limit"], 1);
    assert_eq!(response.usage.total(), 0);
}

#[tokio::test]
async fn test_openai_reasoning_model_token_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "o3-mini", "max_completion_tokens": 512})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let connector = OpenAIConnector::new(
        OpenAIConfig::new("test-key")
            .with_base_url(mock_server.uri())
            .with_model("o3-mini"),
    )
    .unwrap();

    let response = connector
        .complete(request().with_max_output_tokens(512))
        .await
        .unwrap();
    assert_eq!(response.text, "ok");
}

#[tokio::test]
async fn test_openai_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let connector =
        OpenAIConnector::new(OpenAIConfig::new("bad-key").with_base_url(mock_server.uri())).unwrap();
    let err = connector.complete(request()).await.unwrap_err();

    assert!(err.to_string().contains("401"));
    assert!(err.is_fallback_eligible());
}
