//! Application context
//!
//! Built once at start-up and shared by `Arc` with every handler. Building it
//! fails before anything binds when no backend is usable.

use crate::{
    config::{ProviderSettings, ServerConfig},
    logging_provider::LoggingProvider,
};
use assay_core::{Error, Provider, ProviderKind, Result, ToolExecutor};
use assay_egress::{
    anthropic::{AnthropicConfig, AnthropicConnector},
    client::HttpClientConfig,
    openai::{OpenAIConfig, OpenAIConnector},
    tool_endpoint::{HttpToolExecutor, UnconfiguredToolExecutor},
};
use assay_grounding::GroundednessValidator;
use assay_ingress::AssistantPipeline;
use assay_observability::{HealthState, Metrics, health_router};
use assay_routing::{CredentialState, ProviderGateway};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct AppContext {
    pub config: ServerConfig,
    pub metrics: Arc<Metrics>,
    pub gateway: Arc<ProviderGateway>,
    pub validator: Arc<GroundednessValidator>,
    pub tools: Arc<dyn ToolExecutor>,
    pub pipeline: Arc<AssistantPipeline>,
}

impl AppContext {
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let metrics = Arc::new(
            Metrics::new().map_err(|e| Error::Internal(format!("metrics registry: {}", e)))?,
        );

        let gateway = Arc::new(build_gateway(&config, metrics.clone())?);

        let validator = Arc::new(
            GroundednessValidator::new(config.grounding.clone())
                .map_err(|e| Error::Config(e.to_string()))?,
        );

        let tools = build_tool_executor(&config)?;

        let pipeline = Arc::new(
            AssistantPipeline::new(gateway.clone(), tools.clone(), validator.clone())
                .with_settings(config.streaming.clone())
                .with_metrics(metrics.clone()),
        );

        Ok(Self {
            config,
            metrics,
            gateway,
            validator,
            tools,
            pipeline,
        })
    }

    /// Assistant routes plus health and metrics
    pub fn router(&self) -> Router {
        let health =
            HealthState::with_readiness_checker(self.metrics.clone(), self.gateway.clone());

        assay_ingress::router(self.pipeline.clone())
            .merge(health_router(health))
            .layer(TraceLayer::new_for_http())
    }
}

fn settings_for(config: &ServerConfig, kind: ProviderKind) -> Option<&ProviderSettings> {
    match kind {
        ProviderKind::Anthropic => config.providers.anthropic.as_ref(),
        ProviderKind::OpenAI => config.providers.openai.as_ref(),
    }
}

fn build_gateway(config: &ServerConfig, metrics: Arc<Metrics>) -> Result<ProviderGateway> {
    let mut builder = ProviderGateway::builder().with_metrics(metrics);

    for kind in ProviderKind::PRIORITY {
        let Some(settings) = settings_for(config, kind) else {
            info!(backend = %kind, "Backend not configured");
            continue;
        };
        if !settings.enabled {
            info!(backend = %kind, "Backend disabled in config");
            continue;
        }

        let credential = CredentialState::classify(kind, settings.api_key.as_deref());
        let Some(api_key) = credential.api_key() else {
            match credential {
                CredentialState::Placeholder => warn!(
                    backend = %kind,
                    "{} is still the placeholder value; backend treated as not configured",
                    kind.credential_env_var()
                ),
                _ => info!(backend = %kind, "No credential set; backend skipped"),
            }
            continue;
        };

        let provider = build_connector(kind, api_key, settings)?;
        let provider: Arc<dyn Provider> = if config.logging.log_requests {
            Arc::new(LoggingProvider::new(provider, kind.as_str()))
        } else {
            provider
        };

        info!(backend = %kind, credential = credential.describe(), "Backend available");
        builder = builder.with_backend(kind, provider);
    }

    builder.build()
}

fn build_connector(
    kind: ProviderKind,
    api_key: &str,
    settings: &ProviderSettings,
) -> Result<Arc<dyn Provider>> {
    let client_config = HttpClientConfig::default().with_timeout_secs(settings.timeout_secs);

    let provider: Arc<dyn Provider> = match kind {
        ProviderKind::Anthropic => {
            let mut anthropic = AnthropicConfig::new(api_key).with_client_config(client_config);
            if let Some(base_url) = &settings.base_url {
                anthropic = anthropic.with_base_url(base_url.clone());
            }
            if let Some(model) = &settings.model {
                anthropic = anthropic.with_model(model.clone());
            }
            Arc::new(AnthropicConnector::new(anthropic)?)
        }
        ProviderKind::OpenAI => {
            let mut openai = OpenAIConfig::new(api_key).with_client_config(client_config);
            if let Some(base_url) = &settings.base_url {
                openai = openai.with_base_url(base_url.clone());
            }
            if let Some(model) = &settings.model {
                openai = openai.with_model(model.clone());
            }
            if let Some(organization) = &settings.organization {
                openai = openai.with_organization(organization.clone());
            }
            Arc::new(OpenAIConnector::new(openai)?)
        }
    };

    Ok(provider)
}

fn build_tool_executor(config: &ServerConfig) -> Result<Arc<dyn ToolExecutor>> {
    match &config.tools.endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "Tool calls forwarded to business layer");
            let client_config =
                HttpClientConfig::default().with_timeout_secs(config.tools.timeout_secs);
            Ok(Arc::new(HttpToolExecutor::new(endpoint.clone(), client_config)?))
        }
        None => {
            warn!("No tool endpoint configured; tool calls will return errors");
            Ok(Arc::new(UnconfiguredToolExecutor))
        }
    }
}
