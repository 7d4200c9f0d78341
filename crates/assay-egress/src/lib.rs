//! Assay Egress Connectors
//!
//! This crate provides connectors to the completion backends:
//! - Anthropic connector (Messages API)
//! - OpenAI connector (Chat Completions API)
//!
//! and the HTTP tool executor used to reach the business layer.

pub mod anthropic;
pub mod client;
pub mod openai;
pub mod retry_after;
pub mod tool_endpoint;

pub use retry_after::parse_retry_after;

use thiserror::Error;

/// Instruction sent when the request carries none
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant.";

#[derive(Debug, Error)]
pub enum EgressError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status_code}: {message}")]
    ProviderError { status_code: u16, message: String },

    #[error("Rate limit exceeded{}", retry_after_secs.map(|s| format!(": retry after {}s", s)).unwrap_or_default())]
    RateLimitExceeded { retry_after_secs: Option<u64> },

    #[error("Failed to parse provider response: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Request timeout after {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, EgressError>;

impl From<EgressError> for assay_core::Error {
    fn from(err: EgressError) -> Self {
        match err {
            EgressError::RateLimitExceeded { retry_after_secs } => {
                assay_core::Error::RateLimitExceeded { retry_after_secs }
            }
            EgressError::ConfigError(msg) => assay_core::Error::Config(msg),
            other => assay_core::Error::Provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = EgressError::ConfigError("bad config".to_string());
        assert!(err.to_string().contains("Invalid configuration"));

        let err = EgressError::Timeout(30);
        assert_eq!(err.to_string(), "Request timeout after 30s");

        let err = EgressError::ProviderError {
            status_code: 500,
            message: "Internal error".to_string(),
        };
        assert!(err.to_string().contains("500"));

        let err = EgressError::RateLimitExceeded {
            retry_after_secs: Some(60),
        };
        assert!(err.to_string().contains("60s"));
    }

    #[test]
    fn test_into_core_error() {
        let err: assay_core::Error = EgressError::RateLimitExceeded {
            retry_after_secs: Some(5),
        }
        .into();
        assert!(matches!(
            err,
            assay_core::Error::RateLimitExceeded {
                retry_after_secs: Some(5)
            }
        ));

        let err: assay_core::Error = EgressError::ParseError("oops".to_string()).into();
        assert!(matches!(err, assay_core::Error::Provider(ref m) if m.contains("oops")));
        assert!(err.is_fallback_eligible());

        let err: assay_core::Error = EgressError::ConfigError("x".to_string()).into();
        assert!(matches!(err, assay_core::Error::Config(_)));
    }
}
