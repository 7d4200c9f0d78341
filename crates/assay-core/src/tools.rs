//! Tool execution seam

use crate::{
    Result,
    normalized::{ToolCall, ToolResult},
};

/// Executes tool calls issued by the model
///
/// Implementations decide where tools live (an HTTP endpoint, an in-process
/// registry, a test double). Errors are reported per call; the assistant
/// pipeline keeps going and hands the error text back to the model.
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;
}
