//! Provider decorator that logs every exchange

use assay_core::{
    Provider, Result,
    normalized::{CompletionRequest, CompletionResponse},
    provider::ProviderCapabilities,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Logs requests and responses of the wrapped backend
pub struct LoggingProvider {
    inner: Arc<dyn Provider>,
    provider_name: String,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn Provider>, provider_name: impl Into<String>) -> Self {
        Self {
            inner,
            provider_name: provider_name.into(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for LoggingProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        info!("┌─────────────────────────────────────────────────────────");
        info!("│ REQUEST to {}", self.provider_name);
        info!("├─────────────────────────────────────────────────────────");
        info!("│ Messages: {}", request.messages.len());
        info!("│ Tools: {}", request.tools.len());
        debug!(
            "│ Full request:\n{}",
            serde_json::to_string_pretty(&request)
                .unwrap_or_else(|e| format!("Serialization error: {}", e))
        );
        info!("└─────────────────────────────────────────────────────────");

        let response = match self.inner.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("│ ❌ {} failed: {}", self.provider_name, e);
                return Err(e);
            }
        };

        info!("┌─────────────────────────────────────────────────────────");
        info!("│ RESPONSE from {}", self.provider_name);
        info!("├─────────────────────────────────────────────────────────");
        if !response.text.is_empty() {
            info!("│ Content: {}", response.text);
        }
        for call in response.tool_calls() {
            info!("│ 🔧 Tool call: {} ({})", call.name, call.id);
        }
        info!(
            "│ Tokens: input={}, output={}, total={}",
            response.usage.input_tokens,
            response.usage.output_tokens,
            response.usage.total()
        );
        info!("└─────────────────────────────────────────────────────────");

        Ok(response)
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.inner.capabilities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::normalized::{ConversationMessage, Usage};

    struct Echo;

    #[async_trait::async_trait]
    impl Provider for Echo {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(CompletionResponse::new(last, vec![], Usage::new(1, 1)))
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                supports_tools: false,
                supports_system_instruction: true,
            }
        }
    }

    #[tokio::test]
    async fn test_passes_through() {
        let provider = LoggingProvider::new(Arc::new(Echo), "echo");
        let response = provider
            .complete(CompletionRequest::new(vec![ConversationMessage::user("ping")]))
            .await
            .unwrap();

        assert_eq!(response.text, "ping");
        assert!(!provider.capabilities().supports_tools);
    }
}
