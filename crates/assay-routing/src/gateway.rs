//! Provider gateway that implements the Provider trait
//!
//! The gateway owns exactly one primary backend and at most one fallback.
//! A failed primary call is retried once against the fallback; nothing else
//! is ever retried.

use assay_core::{
    Error, ProviderKind, Result,
    normalized::{CompletionRequest, CompletionResponse},
    provider::{Provider, ProviderCapabilities},
};
use assay_observability::{Metrics, ProviderStatus, ReadinessChecker};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct Backend {
    kind: ProviderKind,
    provider: Arc<dyn Provider>,
}

/// Collects available backends and picks primary and fallback by priority
#[derive(Default)]
pub struct GatewayBuilder {
    backends: Vec<Backend>,
    metrics: Option<Arc<Metrics>>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an available backend; a second registration of the same kind replaces the first
    pub fn with_backend(mut self, kind: ProviderKind, provider: Arc<dyn Provider>) -> Self {
        self.backends.retain(|b| b.kind != kind);
        self.backends.push(Backend { kind, provider });
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fails with `NoProviderConfigured` when no backend was registered
    pub fn build(mut self) -> Result<ProviderGateway> {
        self.backends.sort_by_key(|b| b.kind.priority());
        let mut backends = self.backends.into_iter();

        let primary = backends.next().ok_or(Error::NoProviderConfigured)?;
        let fallback = backends.next();

        tracing::info!(
            primary = %primary.kind,
            fallback = ?fallback.as_ref().map(|b| b.kind),
            "Provider gateway initialized"
        );

        Ok(ProviderGateway {
            primary,
            fallback,
            metrics: self.metrics,
        })
    }
}

/// Routes completions to the primary backend with a single fallback attempt
pub struct ProviderGateway {
    primary: Backend,
    fallback: Option<Backend>,
    metrics: Option<Arc<Metrics>>,
}

impl ProviderGateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    pub fn primary_kind(&self) -> ProviderKind {
        self.primary.kind
    }

    pub fn fallback_kind(&self) -> Option<ProviderKind> {
        self.fallback.as_ref().map(|b| b.kind)
    }

    /// Like `complete`, but gives up with `Error::Cancelled` as soon as `cancel` fires
    pub async fn complete_cancellable(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Completion cancelled by caller");
                Err(Error::Cancelled)
            }
            result = self.complete(request) => result,
        }
    }

    async fn try_backend(
        &self,
        backend: &Backend,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse> {
        tracing::debug!(backend = %backend.kind, "Attempting request to backend");

        let started = Instant::now();
        let result = backend.provider.complete(request.clone()).await;
        let elapsed = started.elapsed().as_secs_f64();

        if let Some(metrics) = &self.metrics {
            metrics.record_backend_call(backend.kind.as_str(), result.is_ok(), elapsed);
        }

        match &result {
            Ok(response) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_tokens(
                        backend.kind.as_str(),
                        response.usage.input_tokens,
                        response.usage.output_tokens,
                    );
                }
                tracing::info!(
                    backend = %backend.kind,
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    tool_calls = response.tool_calls().len(),
                    elapsed_ms = (elapsed * 1000.0) as u64,
                    "Request succeeded"
                );
            }
            Err(err) => {
                tracing::warn!(backend = %backend.kind, error = %err, "Request failed");
            }
        }

        result
    }
}

fn failure_reason(err: &Error) -> &'static str {
    match err {
        Error::RateLimitExceeded { .. } => "rate_limited",
        Error::ProviderUnavailable(_) => "unavailable",
        Error::Provider(_) => "provider_error",
        _ => "other",
    }
}

#[async_trait]
impl Provider for ProviderGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        request.validate()?;

        let primary_err = match self.try_backend(&self.primary, &request).await {
            Ok(response) => return Ok(response),
            Err(err) if !err.is_fallback_eligible() => return Err(err),
            Err(err) => err,
        };

        let Some(fallback) = &self.fallback else {
            return Err(Error::ProviderCallFailed {
                attempted: self.primary.kind.to_string(),
                message: primary_err.to_string(),
            });
        };

        tracing::warn!(
            primary = %self.primary.kind,
            fallback = %fallback.kind,
            error = %primary_err,
            "Primary backend failed, trying fallback"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_fallback(
                self.primary.kind.as_str(),
                fallback.kind.as_str(),
                failure_reason(&primary_err),
            );
        }

        match self.try_backend(fallback, &request).await {
            Ok(response) => {
                tracing::info!(fallback = %fallback.kind, "Fallback backend succeeded");
                Ok(response)
            }
            Err(err) if !err.is_fallback_eligible() => Err(err),
            Err(err) => Err(Error::ProviderCallFailed {
                attempted: format!("{}, {}", self.primary.kind, fallback.kind),
                message: format!(
                    "{}: {}; {}: {}",
                    self.primary.kind, primary_err, fallback.kind, err
                ),
            }),
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.primary.provider.capabilities()
    }
}

impl ReadinessChecker for ProviderGateway {
    fn is_ready(&self) -> bool {
        true
    }

    fn provider_statuses(&self) -> Vec<ProviderStatus> {
        let mut statuses = vec![ProviderStatus::primary(self.primary.kind.as_str())];
        if let Some(fallback) = &self.fallback {
            statuses.push(ProviderStatus::fallback(fallback.kind.as_str()));
        }
        statuses
    }
}
