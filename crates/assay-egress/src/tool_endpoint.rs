//! Tool executors backed by the business layer

use crate::client::{HttpClientConfig, create_client, map_send_error};
use assay_core::{
    Error, ToolExecutor,
    normalized::{ToolCall, ToolResult},
};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

/// Posts each tool call to a single HTTP endpoint and returns its JSON body
pub struct HttpToolExecutor {
    endpoint: String,
    client: Client,
    timeout_secs: u64,
}

impl HttpToolExecutor {
    pub fn new(endpoint: impl Into<String>, client_config: HttpClientConfig) -> crate::Result<Self> {
        let client = create_client(&client_config)?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            timeout_secs: client_config.timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ToolExecutor for HttpToolExecutor {
    #[instrument(skip(self, call), fields(tool = %call.name, tool_call_id = %call.id))]
    async fn execute(&self, call: &ToolCall) -> assay_core::Result<ToolResult> {
        let failed = |message: String| Error::ToolExecution {
            tool: call.name.clone(),
            message,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(call)
            .send()
            .await
            .map_err(|e| failed(map_send_error(e, self.timeout_secs).to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let result = response
            .json::<ToolResult>()
            .await
            .map_err(|e| failed(format!("invalid JSON result: {}", e)))?;

        debug!("Tool call executed");
        Ok(result)
    }
}

/// Used when no tool endpoint is configured; every call fails
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredToolExecutor;

#[async_trait]
impl ToolExecutor for UnconfiguredToolExecutor {
    async fn execute(&self, call: &ToolCall) -> assay_core::Result<ToolResult> {
        Err(Error::ToolExecution {
            tool: call.name.clone(),
            message: "no tool endpoint configured".to_string(),
        })
    }
}
