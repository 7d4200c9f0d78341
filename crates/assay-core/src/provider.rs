//! Provider trait definitions

use crate::{
    Result,
    normalized::{CompletionRequest, CompletionResponse},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Send a completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get provider capabilities
    fn capabilities(&self) -> ProviderCapabilities;
}

#[derive(Debug, Clone)]
pub struct ProviderCapabilities {
    pub supports_tools: bool,
    pub supports_system_instruction: bool,
}

/// Completion backends known to the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
}

impl ProviderKind {
    /// All backends, primary first
    pub const PRIORITY: [ProviderKind; 2] = [ProviderKind::Anthropic, ProviderKind::OpenAI];

    /// Lower is tried first
    pub fn priority(&self) -> usize {
        match self {
            ProviderKind::Anthropic => 0,
            ProviderKind::OpenAI => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAI => "openai",
        }
    }

    /// Environment variable holding the credential
    pub fn credential_env_var(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
        }
    }

    /// Value shipped in sample env files; treated as "not configured"
    pub fn placeholder_credential(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "sk-ant-REDACTED",
            ProviderKind::OpenAI => "sk-placeholder-replace-me",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests;
