//! Assistant turn pipeline
//!
//! completion with tools -> one tool round -> follow-up completion ->
//! groundedness report. The streaming variant relays each step through a
//! `ResponseStreamer` and re-chunks the final text into word groups.

use crate::{
    chunker::chunk_words,
    events::{CompletePayload, SseFrame},
    streamer::ResponseStreamer,
};
use assay_core::{
    ToolExecutor,
    normalized::{
        CompletionRequest, ConversationMessage, ToolCall, ToolResult, Usage,
    },
};
use assay_grounding::{GroundednessReport, GroundednessValidator};
use assay_observability::Metrics;
use assay_routing::ProviderGateway;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const THINKING_MESSAGE: &str = "Analyzing your question...";

/// Delivery knobs for streamed turns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    #[serde(default = "default_words_per_chunk")]
    pub words_per_chunk: usize,

    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

fn default_words_per_chunk() -> usize {
    10
}

fn default_chunk_delay_ms() -> u64 {
    50
}

fn default_channel_capacity() -> usize {
    64
}

fn default_keepalive_secs() -> u64 {
    15
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            words_per_chunk: default_words_per_chunk(),
            chunk_delay_ms: default_chunk_delay_ms(),
            channel_capacity: default_channel_capacity(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

impl StreamSettings {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }
}

/// Outcome of one assistant turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantTurn {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    /// One entry per tool call; failed calls hold `{"error": ...}`
    pub tool_results: Vec<ToolResult>,
    pub usage: Usage,
}

/// Non-streaming response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub grounding: GroundednessReport,
}

pub struct AssistantPipeline {
    gateway: Arc<ProviderGateway>,
    tools: Arc<dyn ToolExecutor>,
    validator: Arc<GroundednessValidator>,
    settings: StreamSettings,
    metrics: Option<Arc<Metrics>>,
}

impl AssistantPipeline {
    pub fn new(
        gateway: Arc<ProviderGateway>,
        tools: Arc<dyn ToolExecutor>,
        validator: Arc<GroundednessValidator>,
    ) -> Self {
        Self {
            gateway,
            tools,
            validator,
            settings: StreamSettings::default(),
            metrics: None,
        }
    }

    pub fn with_settings(mut self, settings: StreamSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn validator(&self) -> &GroundednessValidator {
        &self.validator
    }

    /// Score an answer and record the outcome
    pub fn ground(&self, turn: &AssistantTurn) -> GroundednessReport {
        let report = self
            .validator
            .validate(&turn.text, &turn.tool_calls, &turn.tool_results);

        if let Some(metrics) = &self.metrics {
            metrics.record_grounding(report.confidence, report.has_hallucination);
        }
        if report.has_hallucination {
            warn!(
                confidence = report.confidence,
                issues = ?report.issues,
                "Answer flagged by grounding check"
            );
        }
        report
    }

    /// Run a turn without streaming
    pub async fn respond(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> assay_core::Result<AssistantReply> {
        let turn = self.run_turn(request, cancel, None).await?;
        let grounding = self.ground(&turn);

        Ok(AssistantReply {
            text: turn.text,
            tool_calls: turn.tool_calls,
            usage: turn.usage,
            grounding,
        })
    }

    /// Start a streamed turn in a background task and hand back the frame receiver
    ///
    /// Dropping the receiver cancels the turn.
    pub fn spawn_stream(self: Arc<Self>, request: CompletionRequest) -> mpsc::Receiver<SseFrame> {
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity.max(1));
        let watcher = tx.clone();
        let cancel = CancellationToken::new();

        tokio::spawn(async move {
            let streamer = ResponseStreamer::new(tx);
            let run = self.stream_turn(streamer, request, cancel.clone());
            tokio::pin!(run);

            tokio::select! {
                _ = &mut run => {}
                _ = watcher.closed() => {
                    info!("Client disconnected, cancelling turn");
                    cancel.cancel();
                    run.await;
                }
            }
        });

        rx
    }

    /// Drive one streamed turn to its terminal event
    pub async fn stream_turn(
        &self,
        mut streamer: ResponseStreamer,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) {
        if let Some(metrics) = &self.metrics {
            metrics.record_stream_started();
        }
        streamer.start().await;

        let completed = match self.deliver(&mut streamer, request, &cancel).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "Streamed turn failed");
                streamer.error(&err).await;
                false
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_stream_finished(completed, streamer.chunks_sent());
        }
    }

    async fn deliver(
        &self,
        streamer: &mut ResponseStreamer,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> assay_core::Result<()> {
        let turn = self.run_turn(request, cancel, Some(&mut *streamer)).await?;
        let grounding = self.ground(&turn);

        let chunks = chunk_words(&turn.text, self.settings.words_per_chunk);
        let delay = self.settings.chunk_delay();
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.into_iter().enumerate() {
            streamer.send_chunk(chunk).await;

            if i < last && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(assay_core::Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        streamer
            .complete(CompletePayload {
                usage: turn.usage,
                tool_calls: turn.tool_calls.len(),
                grounding: Some(grounding),
            })
            .await;
        Ok(())
    }

    /// Initial completion, one tool round, and the follow-up completion
    pub async fn run_turn(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
        mut streamer: Option<&mut ResponseStreamer>,
    ) -> assay_core::Result<AssistantTurn> {
        if let Some(s) = streamer.as_deref_mut() {
            s.send_thinking(THINKING_MESSAGE).await;
        }

        let first = self
            .gateway
            .complete_cancellable(request.clone(), cancel)
            .await?;

        if !first.has_tool_calls() {
            return Ok(AssistantTurn {
                text: first.text,
                tool_calls: Vec::new(),
                tool_results: Vec::new(),
                usage: first.usage,
            });
        }

        let calls = first.tool_calls().to_vec();
        debug!(count = calls.len(), "Executing tool calls");

        let mut results = Vec::with_capacity(calls.len());
        let mut report_entries = Vec::with_capacity(calls.len());

        for call in &calls {
            if cancel.is_cancelled() {
                return Err(assay_core::Error::Cancelled);
            }
            if let Some(s) = streamer.as_deref_mut() {
                s.send_tool_call(&call.name, Value::Object(call.input.clone()))
                    .await;
            }

            let started = Instant::now();
            let outcome = self.tools.execute(call).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            if let Some(metrics) = &self.metrics {
                metrics.record_tool_call(&call.name, outcome.is_ok());
            }

            let (result, entry) = match outcome {
                Ok(result) => {
                    let entry = json!({
                        "tool_use_id": call.id,
                        "name": call.name,
                        "result": result,
                    });
                    (result, entry)
                }
                Err(err) => {
                    warn!(tool = %call.name, error = %err, "Tool execution failed");
                    let message = err.to_string();
                    let entry = json!({
                        "tool_use_id": call.id,
                        "name": call.name,
                        "error": message,
                    });
                    (json!({ "error": message }), entry)
                }
            };

            if let Some(s) = streamer.as_deref_mut() {
                s.send_tool_result(&call.name, result.clone(), duration_ms)
                    .await;
            }
            results.push(result);
            report_entries.push(entry);
        }

        let follow_up = follow_up_request(&request, &first.text, &report_entries)?;
        let second = self
            .gateway
            .complete_cancellable(follow_up, cancel)
            .await?;

        let mut usage = first.usage;
        usage += second.usage;

        Ok(AssistantTurn {
            text: second.text,
            tool_calls: calls,
            tool_results: results,
            usage,
        })
    }
}

/// The original conversation, the assistant's interim text, and the tool results
/// as a user message; no tools are offered the second time
fn follow_up_request(
    request: &CompletionRequest,
    assistant_text: &str,
    entries: &[Value],
) -> assay_core::Result<CompletionRequest> {
    let mut messages = request.messages.clone();
    if !assistant_text.trim().is_empty() {
        messages.push(ConversationMessage::assistant(assistant_text));
    }
    messages.push(ConversationMessage::user(format!(
        "Tool results: {}",
        serde_json::to_string(entries)?
    )));

    let mut follow_up = CompletionRequest::new(messages)
        .with_temperature(request.temperature)
        .with_max_output_tokens(request.max_output_tokens);
    if let Some(instruction) = &request.system_instruction {
        follow_up = follow_up.with_system_instruction(instruction.clone());
    }
    Ok(follow_up)
}
