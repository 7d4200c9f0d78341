//! OpenAI egress connector

use crate::{
    DEFAULT_SYSTEM_INSTRUCTION, EgressError,
    client::{
        HttpClientConfig, create_client, error_from_response, log_response_headers,
        map_send_error,
    },
};
use assay_core::{
    normalized::{CompletionRequest, CompletionResponse, Role, ToolCall, Usage},
    provider::{Provider, ProviderCapabilities},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Default model for the Chat Completions API
pub const DEFAULT_MODEL: &str = "gpt-4-turbo";

/// OpenAI connector configuration
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for OpenAI API (default: https://api.openai.com/v1)
    pub base_url: String,

    /// Organization ID (optional)
    pub organization: Option<String>,

    /// Model used for every request
    pub model: String,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl OpenAIConfig {
    /// Create a new OpenAI configuration
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            organization: None,
            model: DEFAULT_MODEL.to_string(),
            client_config: HttpClientConfig::default(),
        }
    }

    /// Set the base URL (for custom endpoints)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the organization ID
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_client_config(mut self, client_config: HttpClientConfig) -> Self {
        self.client_config = client_config;
        self
    }
}

/// OpenAI connector
pub struct OpenAIConnector {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIConnector {
    /// Create a new OpenAI connector
    pub fn new(config: OpenAIConfig) -> crate::Result<Self> {
        let client = create_client(&config.client_config)?;
        Ok(Self { config, client })
    }

    async fn post_chat_completions(
        &self,
        body: &OpenAIChatRequest,
    ) -> crate::Result<OpenAIChatResponse> {
        debug!("┌─────────────────────────────────────────────────────────");
        debug!("│ OpenAI Request Headers");
        debug!("├─────────────────────────────────────────────────────────");
        debug!("│ Authorization: Bearer <api_key>");
        debug!("│ Content-Type: application/json");
        if let Some(ref org) = self.config.organization {
            debug!("│ OpenAI-Organization: {}", org);
        }
        debug!("└─────────────────────────────────────────────────────────");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .apply_organization_header(&self.config)
            .json(body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.config.client_config.timeout_secs))?;

        log_response_headers("OpenAI", &response);

        response.handle_openai_response().await
    }
}

#[async_trait]
impl Provider for OpenAIConnector {
    #[instrument(skip(self, request), fields(backend = "openai", model = %self.config.model))]
    async fn complete(&self, request: CompletionRequest) -> assay_core::Result<CompletionResponse> {
        debug!("Sending completion request to OpenAI");

        let openai_req = to_openai_request(&request, &self.config.model)?;
        let response = self.post_chat_completions(&openai_req).await?;
        from_openai_response(response)
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_tools: true,
            supports_system_instruction: true,
        }
    }
}

// OpenAI API types

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    /// Reasoning model families take max_completion_tokens instead of max_tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default)]
    tool_type: Option<String>,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    id: String,
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// Conversion functions

fn uses_max_completion_tokens(model: &str) -> bool {
    model.starts_with("gpt-5") || model.starts_with("o1") || model.starts_with("o3")
}

fn to_openai_request(req: &CompletionRequest, model: &str) -> assay_core::Result<OpenAIChatRequest> {
    req.validate_tools()?;

    let instruction = req
        .instruction()
        .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string());

    let mut messages = vec![OpenAIMessage {
        role: "system".to_string(),
        content: Some(instruction),
        tool_calls: None,
    }];
    messages.extend(req.conversation().map(|m| OpenAIMessage {
        role: match m.role {
            Role::Assistant => "assistant",
            _ => "user",
        }
        .to_string(),
        content: Some(m.content.clone()),
        tool_calls: None,
    }));

    let tools = if req.tools.is_empty() {
        None
    } else {
        Some(
            req.tools
                .iter()
                .map(|t| OpenAITool {
                    tool_type: "function".to_string(),
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters_schema(),
                    },
                })
                .collect(),
        )
    };

    let (max_tokens, max_completion_tokens) = if uses_max_completion_tokens(model) {
        (None, Some(req.max_output_tokens))
    } else {
        (Some(req.max_output_tokens), None)
    };

    Ok(OpenAIChatRequest {
        model: model.to_string(),
        messages,
        temperature: req.temperature,
        max_tokens,
        max_completion_tokens,
        tools,
    })
}

fn parse_arguments(
    call: &OpenAIToolCall,
) -> crate::Result<serde_json::Map<String, serde_json::Value>> {
    if call.function.arguments.trim().is_empty() {
        return Ok(serde_json::Map::new());
    }

    match serde_json::from_str::<serde_json::Value>(&call.function.arguments) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(EgressError::ParseError(format!(
            "tool call '{}' arguments are not an object: {}",
            call.function.name, other
        ))),
        Err(e) => Err(EgressError::ParseError(format!(
            "tool call '{}' has unparsable arguments: {}",
            call.function.name, e
        ))),
    }
}

fn from_openai_response(resp: OpenAIChatResponse) -> assay_core::Result<CompletionResponse> {
    let choice = resp.choices.into_iter().next().ok_or_else(|| {
        EgressError::ParseError("OpenAI response contained no choices".to_string())
    })?;

    let mut tool_calls = Vec::new();
    for call in choice.message.tool_calls.unwrap_or_default() {
        let input = parse_arguments(&call)?;
        tool_calls.push(ToolCall {
            id: call.id,
            name: call.function.name,
            input,
        });
    }

    debug!(
        completion_id = %resp.id,
        finish_reason = ?choice.finish_reason,
        tool_calls = tool_calls.len(),
        "OpenAI response translated"
    );

    let usage = resp.usage.unwrap_or_default();
    let response = CompletionResponse::new(
        choice.message.content.unwrap_or_default(),
        tool_calls,
        Usage::new(usage.prompt_tokens, usage.completion_tokens),
    );
    response.ensure_unique_tool_call_ids()?;
    Ok(response)
}

// Helper trait for adding organization header
trait OrganizationHeader {
    fn apply_organization_header(self, config: &OpenAIConfig) -> Self;
}

impl OrganizationHeader for reqwest::RequestBuilder {
    fn apply_organization_header(self, config: &OpenAIConfig) -> Self {
        if let Some(ref org) = config.organization {
            self.header("OpenAI-Organization", org)
        } else {
            self
        }
    }
}

// Helper trait for handling responses
#[async_trait]
trait OpenAIResponseHandler {
    async fn handle_openai_response(self) -> crate::Result<OpenAIChatResponse>;
}

#[async_trait]
impl OpenAIResponseHandler for reqwest::Response {
    async fn handle_openai_response(self) -> crate::Result<OpenAIChatResponse> {
        if !self.status().is_success() {
            return Err(error_from_response(self).await);
        }

        self.json::<OpenAIChatResponse>()
            .await
            .map_err(|e| EgressError::ParseError(format!("Failed to parse OpenAI response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::normalized::{ConversationMessage, ToolDefinition};
    use serde_json::json;

    #[test]
    fn test_openai_config_builder() {
        let config = OpenAIConfig::new("test-key")
            .with_base_url("https://custom.api.com")
            .with_organization("org-123")
            .with_model("gpt-4o");

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, "https://custom.api.com");
        assert_eq!(config.organization, Some("org-123".to_string()));
        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn test_default_model() {
        assert_eq!(OpenAIConfig::new("k").model, "gpt-4-turbo");
    }

    #[test]
    fn test_to_openai_request_leading_system() {
        let req = CompletionRequest::new(vec![
            ConversationMessage::user("Hello"),
            ConversationMessage::system("Answer in French."),
        ]);

        let openai_req = to_openai_request(&req, DEFAULT_MODEL).unwrap();
        assert_eq!(openai_req.messages.len(), 2);
        assert_eq!(openai_req.messages[0].role, "system");
        assert_eq!(
            openai_req.messages[0].content.as_deref(),
            Some("Answer in French.")
        );
        assert_eq!(openai_req.messages[1].role, "user");
        assert_eq!(openai_req.max_tokens, Some(4096));
        assert!(openai_req.max_completion_tokens.is_none());
    }

    #[test]
    fn test_to_openai_request_reasoning_models() {
        let req = CompletionRequest::new(vec![ConversationMessage::user("hi")])
            .with_max_output_tokens(256);

        for model in ["gpt-5-mini", "o1-preview", "o3"] {
            let openai_req = to_openai_request(&req, model).unwrap();
            assert!(openai_req.max_tokens.is_none(), "{}", model);
            assert_eq!(openai_req.max_completion_tokens, Some(256));
        }
    }

    #[test]
    fn test_to_openai_request_with_tools() {
        let tool = ToolDefinition::new(
            "get_client",
            "Fetch a client",
            json!({"type": "object", "properties": {"id": {"type": "string"}}}),
        )
        .with_required_fields(["id"]);
        let req = CompletionRequest::new(vec![ConversationMessage::user("hi")])
            .with_tools(vec![tool]);

        let serialized = serde_json::to_value(to_openai_request(&req, DEFAULT_MODEL).unwrap()).unwrap();
        let tool = &serialized["tools"][0];
        assert_eq!(tool["type"], "function");
        assert_eq!(tool["function"]["name"], "get_client");
        assert_eq!(tool["function"]["description"], "Fetch a client");
        assert_eq!(tool["function"]["parameters"]["required"], json!(["id"]));
    }

    #[test]
    fn test_from_openai_response() {
        let resp: OpenAIChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hi there"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 9, "completion_tokens": 2, "total_tokens": 11}
        }))
        .unwrap();

        let response = from_openai_response(resp).unwrap();
        assert_eq!(response.text, "Hi there");
        assert!(response.tool_calls.is_none());
        assert_eq!(response.usage, Usage::new(9, 2));
    }

    #[test]
    fn test_from_openai_response_missing_usage() {
        let resp: OpenAIChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();

        let response = from_openai_response(resp).unwrap();
        assert_eq!(response.text, "");
        assert_eq!(response.usage, Usage::default());
    }

    #[test]
    fn test_from_openai_response_with_tool_calls() {
        let resp: OpenAIChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_client", "arguments": "{\"id\":\"c-7\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let response = from_openai_response(resp).unwrap();
        assert_eq!(response.tool_calls().len(), 1);
        assert_eq!(response.tool_calls()[0].input["id"], "c-7");
    }

    #[test]
    fn test_from_openai_response_bad_arguments() {
        let resp: OpenAIChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_client", "arguments": "{not json"}
                    }]
                }
            }]
        }))
        .unwrap();

        let err = from_openai_response(resp).unwrap_err();
        assert!(err.to_string().contains("unparsable arguments"));
    }

    #[test]
    fn test_from_openai_response_no_choices() {
        let resp: OpenAIChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(from_openai_response(resp).is_err());
    }
}
