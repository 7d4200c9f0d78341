//! Error types for Assay Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Provider errors
    #[error("No LLM provider configured: set ANTHROPIC_API_KEY or OPENAI_API_KEY")]
    NoProviderConfigured,

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Rate limit exceeded{}", retry_after_secs.map(|s| format!(": retry after {}s", s)).unwrap_or_default())]
    RateLimitExceeded { retry_after_secs: Option<u64> },

    #[error("Provider call failed (tried {attempted}): {message}")]
    ProviderCallFailed { attempted: String, message: String },

    #[error("Invalid tool schema for '{tool}': {reason}")]
    InvalidToolSchema { tool: String, reason: String },

    #[error("Request cancelled")]
    Cancelled,

    // Tool execution errors
    #[error("Tool execution failed for '{tool}': {message}")]
    ToolExecution { tool: String, message: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the gateway may hand this failure to a fallback backend.
    ///
    /// Caller mistakes and cancellations are surfaced as-is.
    pub fn is_fallback_eligible(&self) -> bool {
        !matches!(
            self,
            Error::InvalidToolSchema { .. } | Error::InvalidRequest(_) | Error::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
