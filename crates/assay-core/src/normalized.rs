//! Unified request and response types
//!
//! Both completion backends are translated to and from these shapes, so the
//! gateway, the validator and the streamer never see a backend-native type.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default output token budget
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single turn in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Completion request accepted by every backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Ordered conversation
    pub messages: Vec<ConversationMessage>,

    /// Instruction string supplied outside the message list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum number of tokens to generate
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Tools the model may call
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_output_tokens() -> u32 {
    DEFAULT_MAX_OUTPUT_TOKENS
}

impl CompletionRequest {
    /// Create a request with default sampling settings and no tools
    pub fn new(messages: Vec<ConversationMessage>) -> Self {
        Self {
            messages,
            system_instruction: None,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            tools: Vec::new(),
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Messages handed to a backend as its native message list (system turns removed)
    pub fn conversation(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    /// Effective instruction: the explicit one, else the system turns joined by newlines
    pub fn instruction(&self) -> Option<String> {
        if let Some(instruction) = &self.system_instruction {
            return Some(instruction.clone());
        }

        let system_texts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        if system_texts.is_empty() {
            None
        } else {
            Some(system_texts.join("\n"))
        }
    }

    /// Reject requests no backend could answer
    pub fn validate(&self) -> Result<()> {
        if self.conversation().next().is_none() {
            return Err(Error::InvalidRequest(
                "at least one user or assistant message is required".to_string(),
            ));
        }
        self.validate_tools()
    }

    /// Check that every tool definition can be translated to a backend format
    pub fn validate_tools(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for tool in &self.tools {
            tool.validate()?;
            if !seen.insert(tool.name.as_str()) {
                return Err(Error::InvalidToolSchema {
                    tool: tool.name.clone(),
                    reason: "duplicate tool name".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Tool/function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,

    /// What the tool does, shown to the model
    pub description: String,

    /// JSON schema describing accepted arguments
    pub input_schema: serde_json::Value,

    /// Names of arguments the model must supply
    #[serde(default)]
    pub required_fields: Vec<String>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            required_fields: Vec::new(),
        }
    }

    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Validate that the schema is an object schema and required fields are declared
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidToolSchema {
            tool: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("tool name must not be empty"));
        }

        let schema = self
            .input_schema
            .as_object()
            .ok_or_else(|| invalid("input_schema must be a JSON object"))?;

        match schema.get("type").and_then(|t| t.as_str()) {
            Some("object") => {}
            _ => return Err(invalid("input_schema type must be 'object'")),
        }

        let properties = match schema.get("properties") {
            None => None,
            Some(serde_json::Value::Object(props)) => Some(props),
            Some(_) => return Err(invalid("input_schema properties must be an object")),
        };

        for field in &self.required_fields {
            let declared = properties.is_some_and(|props| props.contains_key(field));
            if !declared {
                return Err(Error::InvalidToolSchema {
                    tool: self.name.clone(),
                    reason: format!("required field '{}' is not declared in properties", field),
                });
            }
        }

        Ok(())
    }

    /// Schema with `required_fields` merged into its `required` array
    pub fn parameters_schema(&self) -> serde_json::Value {
        let mut schema = self.input_schema.clone();
        if self.required_fields.is_empty() {
            return schema;
        }

        if let Some(object) = schema.as_object_mut() {
            let mut required: Vec<serde_json::Value> = object
                .get("required")
                .and_then(|r| r.as_array())
                .cloned()
                .unwrap_or_default();

            for field in &self.required_fields {
                let value = serde_json::Value::String(field.clone());
                if !required.contains(&value) {
                    required.push(value);
                }
            }

            object.insert("required".to_string(), serde_json::Value::Array(required));
        }

        schema
    }
}

/// A tool invocation issued by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier unique within one response
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Arguments keyed by field name
    #[serde(default)]
    pub input: serde_json::Map<String, serde_json::Value>,
}

/// Opaque value produced by executing a tool call
pub type ToolResult = serde_json::Value;

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// Unified completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text (empty when the model only called tools)
    pub text: String,

    /// Tool invocations; absent rather than empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    pub usage: Usage,
}

impl CompletionResponse {
    /// Build a response, collapsing an empty tool call list to `None`
    pub fn new(text: impl Into<String>, tool_calls: Vec<ToolCall>, usage: Usage) -> Self {
        Self {
            text: text.into(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            usage,
        }
    }

    /// Tool calls as a slice (empty when absent)
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    /// Reject responses whose tool call ids collide
    pub fn ensure_unique_tool_call_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for call in self.tool_calls() {
            if !seen.insert(call.id.as_str()) {
                return Err(Error::Provider(format!(
                    "Malformed response: duplicate tool call id '{}'",
                    call.id
                )));
            }
        }
        Ok(())
    }
}
