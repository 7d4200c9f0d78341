//! Anthropic egress connector

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

/// Default model for the Messages API
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Anthropic connector configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for Anthropic API (default: https://api.anthropic.com)
    pub base_url: String,

    /// Anthropic API version (default: 2023-06-01)
    pub api_version: String,

    /// Model used for every request
    pub model: String,

    /// HTTP client configuration
    pub client_config: HttpClientConfig,
}

impl AnthropicConfig {
    /// Create a new Anthropic configuration
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
            api_version: "2023-06-01".to_string(),
            model: DEFAULT_MODEL.to_string(),
            client_config: HttpClientConfig::default(),
        }
    }

    /// Set the base URL (for custom endpoints)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
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

/// Anthropic connector
pub struct AnthropicConnector {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicConnector {
    /// Create a new Anthropic connector
    pub fn new(config: AnthropicConfig) -> crate::Result<Self> {
        let client = create_client(&config.client_config)?;
        Ok(Self { config, client })
    }

    async fn post_messages(&self, body: &AnthropicRequest) -> crate::Result<AnthropicResponse> {
        debug!("┌─────────────────────────────────────────────────────────");
        debug!("│ Anthropic Request Headers");
        debug!("├─────────────────────────────────────────────────────────");
        debug!("│ x-api-key: <api_key>");
        debug!("│ anthropic-version: {}", self.config.api_version);
        debug!("│ Content-Type: application/json");
        debug!("└─────────────────────────────────────────────────────────");

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.config.client_config.timeout_secs))?;

        log_response_headers("Anthropic", &response);

        response.handle_anthropic_response().await
    }
}

#[async_trait]
impl Provider for AnthropicConnector {
    #[instrument(skip(self, request), fields(backend = "anthropic", model = %self.config.model))]
    async fn complete(&self, request: CompletionRequest) -> assay_core::Result<CompletionResponse> {
        debug!("Sending completion request to Anthropic");

        let anthropic_req = to_anthropic_request(&request, &self.config.model)?;
        let response = self.post_messages(&anthropic_req).await?;
        from_anthropic_response(response)
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_tools: true,
            supports_system_instruction: true,
        }
    }
}

// Anthropic API types

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    system: String,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    id: String,
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

// Conversion functions

fn to_anthropic_request(req: &CompletionRequest, model: &str) -> assay_core::Result<AnthropicRequest> {
    req.validate_tools()?;

    let messages = req
        .conversation()
        .map(|m| AnthropicMessage {
            role: match m.role {
                Role::Assistant => "assistant",
                _ => "user",
            }
            .to_string(),
            content: m.content.clone(),
        })
        .collect();

    let tools = if req.tools.is_empty() {
        None
    } else {
        Some(
            req.tools
                .iter()
                .map(|t| AnthropicTool {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.parameters_schema(),
                })
                .collect(),
        )
    };

    Ok(AnthropicRequest {
        model: model.to_string(),
        messages,
        max_tokens: req.max_output_tokens,
        system: req
            .instruction()
            .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()),
        temperature: req.temperature,
        tools,
    })
}

fn from_anthropic_response(resp: AnthropicResponse) -> assay_core::Result<CompletionResponse> {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in resp.content {
        match block {
            AnthropicContentBlock::Text { text: part } => text.push_str(&part),
            AnthropicContentBlock::ToolUse { id, name, input } => {
                let input = match input {
                    serde_json::Value::Object(map) => map,
                    serde_json::Value::Null => serde_json::Map::new(),
                    other => {
                        return Err(EgressError::ParseError(format!(
                            "tool_use '{}' input is not an object: {}",
                            name, other
                        ))
                        .into());
                    }
                };
                tool_calls.push(ToolCall { id, name, input });
            }
            AnthropicContentBlock::Other => {
                debug!("Skipping unsupported content block in Anthropic response");
            }
        }
    }

    debug!(
        message_id = %resp.id,
        stop_reason = ?resp.stop_reason,
        tool_calls = tool_calls.len(),
        "Anthropic response translated"
    );

    let response = CompletionResponse::new(
        text,
        tool_calls,
        Usage::new(resp.usage.input_tokens, resp.usage.output_tokens),
    );
    response.ensure_unique_tool_call_ids()?;
    Ok(response)
}

// Response handling trait extension

trait AnthropicResponseExt {
    async fn handle_anthropic_response(self) -> crate::Result<AnthropicResponse>;
}

impl AnthropicResponseExt for reqwest::Response {
    async fn handle_anthropic_response(self) -> crate::Result<AnthropicResponse> {
        if !self.status().is_success() {
            return Err(error_from_response(self).await);
        }

        self.json::<AnthropicResponse>().await.map_err(|e| {
            EgressError::ParseError(format!("Failed to parse Anthropic response: {}", e))
        })
    }
}
