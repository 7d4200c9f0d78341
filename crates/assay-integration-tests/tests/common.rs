//! Common test utilities for integration tests

use assay_server::{AppContext, ServerConfig, config::ProviderSettings};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

/// Settings pointing a backend at a mock server
#[allow(dead_code)]
pub fn mocked_backend(api_key: &str, server: &MockServer) -> Option<ProviderSettings> {
    Some(ProviderSettings {
        api_key: Some(api_key.to_string()),
        base_url: Some(server.uri()),
        timeout_secs: 5,
        ..ProviderSettings::default()
    })
}

/// Config with both backends mocked and chunk pacing disabled
#[allow(dead_code)]
pub fn config_with(
    anthropic: Option<&MockServer>,
    openai: Option<&MockServer>,
    tools: Option<&MockServer>,
) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.providers.anthropic = anthropic.and_then(|s| mocked_backend("sk-ant-e2e", s));
    config.providers.openai = openai.and_then(|s| mocked_backend("sk-e2e", s));
    config.tools.endpoint = tools.map(|s| format!("{}/tools", s.uri()));
    config.streaming.chunk_delay_ms = 0;
    config
}

#[allow(dead_code)]
pub fn app(config: ServerConfig) -> (AppContext, Router) {
    let ctx = AppContext::from_config(config).unwrap();
    let router = ctx.router();
    (ctx, router)
}

#[allow(dead_code)]
pub fn anthropic_text(text: &str) -> Value {
    json!({
        "id": "msg_e2e",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 20, "output_tokens": 10}
    })
}

#[allow(dead_code)]
pub fn openai_text(text: &str) -> Value {
    json!({
        "id": "chatcmpl-e2e",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 20, "completion_tokens": 10, "total_tokens": 30}
    })
}

/// Anthropic answers with a tool call first, then with `answer` once tool results come back
#[allow(dead_code)]
pub async fn mount_anthropic_tool_round(server: &MockServer, tool: &str, answer: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("Tool results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_text(answer)))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_tool",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": tool, "input": {"status": "open"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 30, "output_tokens": 12}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub fn assistant_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "messages": [{"role": "user", "content": "What is the total of open invoices?"}],
                "system_instruction": "Answer only from tool data.",
                "tools": [{
                    "name": "list_invoices",
                    "description": "List invoices by status",
                    "input_schema": {
                        "type": "object",
                        "properties": {"status": {"type": "string"}}
                    }
                }]
            })
            .to_string(),
        ))
        .unwrap()
}

/// Send a streaming request and decode every `data:` frame
#[allow(dead_code)]
pub async fn collect_stream(app: Router) -> (String, Vec<Value>) {
    let response = app
        .oneshot(assistant_request("/v1/assistant/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    let events = body
        .split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();
    (body, events)
}

#[allow(dead_code)]
pub fn event_types(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .map(|e| e["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn counter_total(ctx: &AppContext, name: &str) -> f64 {
    ctx.metrics
        .registry()
        .gather()
        .iter()
        .filter(|family| family.name() == name)
        .flat_map(|family| family.metric.iter())
        .filter_map(|metric| metric.counter.as_ref().and_then(|c| c.value))
        .sum()
}
