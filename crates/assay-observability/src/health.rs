//! Health endpoints
//!
//! - `/healthz` - Liveness probe (always 200 while the process runs)
//! - `/readyz` - Readiness probe (a primary backend is configured)
//! - `/metrics` - Prometheus metrics endpoint

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::TextEncoder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::metrics::Metrics;

/// Liveness body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// `ready` or `not_ready`
    pub status: String,
    /// Configured backends and their role
    pub providers: Vec<ProviderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A backend as seen by the readiness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    /// `primary` or `fallback`
    pub role: String,
}

impl ProviderStatus {
    pub fn primary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: "primary".to_string(),
        }
    }

    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: "fallback".to_string(),
        }
    }
}

/// Implemented by whatever decides if traffic can be served
pub trait ReadinessChecker: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Backends currently wired in
    fn provider_statuses(&self) -> Vec<ProviderStatus>;
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub metrics: Arc<Metrics>,
    pub readiness_checker: Option<Arc<dyn ReadinessChecker>>,
}

impl HealthState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            readiness_checker: None,
        }
    }

    pub fn with_readiness_checker(
        metrics: Arc<Metrics>,
        readiness_checker: Arc<dyn ReadinessChecker>,
    ) -> Self {
        Self {
            metrics,
            readiness_checker: Some(readiness_checker),
        }
    }
}

/// Create health check router
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn readyz(State(state): State<HealthState>) -> Response {
    let (ready, providers, message) = match &state.readiness_checker {
        Some(checker) if checker.is_ready() => (true, checker.provider_statuses(), None),
        Some(checker) => (
            false,
            checker.provider_statuses(),
            Some("No primary backend configured"),
        ),
        None => (false, Vec::new(), Some("No completion backend wired in")),
    };

    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = ReadinessResponse {
        status: if ready { "ready" } else { "not_ready" }.to_string(),
        providers,
        message: message.map(str::to_string),
    };
    (code, Json(body)).into_response()
}

async fn metrics_handler(State(state): State<HealthState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", err),
            )
                .into_response()
        }
    }
}
