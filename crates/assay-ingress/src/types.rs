//! Shared ingress types and utilities

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request ID for tracing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new request ID
    pub fn generate() -> Self {
        Self(format!("req_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ingress error types
#[derive(Debug, Error)]
pub enum IngressError {
    /// Malformed request or tool definition
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Backends failed after the fallback attempt
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// No backend can take the request
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<assay_core::Error> for IngressError {
    fn from(err: assay_core::Error) -> Self {
        use assay_core::Error;

        match err {
            Error::InvalidRequest(_) | Error::InvalidToolSchema { .. } => {
                IngressError::InvalidRequest(err.to_string())
            }
            Error::RateLimitExceeded { .. } => IngressError::RateLimited(err.to_string()),
            Error::NoProviderConfigured | Error::ProviderUnavailable(_) => {
                IngressError::Unavailable(err.to_string())
            }
            Error::ProviderCallFailed { .. } | Error::Provider(_) => {
                IngressError::ProviderError(err.to_string())
            }
            Error::Cancelled => IngressError::Cancelled,
            Error::Serialization(e) => IngressError::Serialization(e),
            other => IngressError::Internal(other.to_string()),
        }
    }
}

impl IngressError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            IngressError::InvalidRequest(_) | IngressError::Serialization(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            IngressError::ProviderError(_) => (StatusCode::BAD_GATEWAY, "api_error"),
            IngressError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error"),
            IngressError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "overloaded_error"),
            IngressError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "cancelled"),
            IngressError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "api_error"),
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        let body = serde_json::json!({
            "error": {
                "message": self.to_string(),
                "type": error_type,
                "code": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Ingress result type
pub type IngressResult<T> = Result<T, IngressError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::generate();
        let id2 = RequestId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("req_"));
    }

    #[test]
    fn test_core_error_mapping() {
        let err: IngressError = assay_core::Error::InvalidToolSchema {
            tool: "search".to_string(),
            reason: "bad".to_string(),
        }
        .into();
        assert!(matches!(err, IngressError::InvalidRequest(_)));

        let err: IngressError = assay_core::Error::ProviderCallFailed {
            attempted: "anthropic, openai".to_string(),
            message: "down".to_string(),
        }
        .into();
        assert!(matches!(err, IngressError::ProviderError(_)));

        let err: IngressError = assay_core::Error::NoProviderConfigured.into();
        assert!(matches!(err, IngressError::Unavailable(_)));

        let err: IngressError = assay_core::Error::Cancelled.into();
        assert!(matches!(err, IngressError::Cancelled));
    }

    #[tokio::test]
    async fn test_error_response_body() {
        let response = IngressError::ProviderError("both backends down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["type"], "api_error");
        assert_eq!(body["error"]["code"], 502);
        assert_eq!(
            body["error"]["message"],
            "Provider error: both backends down"
        );
    }
}
