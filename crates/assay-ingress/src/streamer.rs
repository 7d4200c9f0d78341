//! ResponseStreamer
//!
//! One streamer per client request. It writes frames into a bounded channel
//! whose receiving end is the HTTP response body, and moves through
//! `Idle -> Open -> Closed`. Anything emitted outside `Open` is dropped.

use crate::events::{
    ChunkPayload, CompletePayload, ErrorPayload, SseFrame, StreamEvent, StreamEventKind,
    ThinkingPayload, ToolCallPayload, ToolResultPayload,
};
use axum::{
    http::{HeaderName, HeaderValue, header},
    response::{
        IntoResponse, Response,
        sse::{KeepAlive, Sse},
    },
};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::{convert::Infallible, time::Duration};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Open,
    Closed,
}

pub struct ResponseStreamer {
    tx: mpsc::Sender<SseFrame>,
    state: StreamState,
    chunks_sent: usize,
}

impl ResponseStreamer {
    pub fn new(tx: mpsc::Sender<SseFrame>) -> Self {
        Self {
            tx,
            state: StreamState::Idle,
            chunks_sent: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == StreamState::Open
    }

    pub fn chunks_sent(&self) -> usize {
        self.chunks_sent
    }

    /// Write the connection comment and the `start` event
    pub async fn start(&mut self) {
        if self.state != StreamState::Idle {
            return;
        }
        self.state = StreamState::Open;

        if self.write(SseFrame::Comment("connected".to_string())).await {
            self.emit(StreamEvent::new(StreamEventKind::Start, None)).await;
        }
    }

    /// Write one event; returns false when nothing was written
    pub async fn emit(&mut self, event: StreamEvent) -> bool {
        if self.state != StreamState::Open {
            return false;
        }

        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!(kind = ?event.kind, error = %e, "Failed to serialize stream event");
                return false;
            }
        };

        self.write(SseFrame::Data(json)).await
    }

    pub async fn send_thinking(&mut self, message: impl Into<String>) -> bool {
        let payload = ThinkingPayload {
            message: message.into(),
        };
        self.emit_payload(StreamEventKind::Thinking, &payload).await
    }

    pub async fn send_tool_call(&mut self, tool: &str, params: Value) -> bool {
        let payload = ToolCallPayload {
            tool: tool.to_string(),
            params,
        };
        self.emit_payload(StreamEventKind::ToolCall, &payload).await
    }

    pub async fn send_tool_result(&mut self, tool: &str, result: Value, duration_ms: u64) -> bool {
        let payload = ToolResultPayload {
            tool: tool.to_string(),
            result,
            duration: duration_ms,
        };
        self.emit_payload(StreamEventKind::ToolResult, &payload).await
    }

    pub async fn send_chunk(&mut self, text: impl Into<String>) -> bool {
        let payload = ChunkPayload { text: text.into() };
        let sent = self.emit_payload(StreamEventKind::Chunk, &payload).await;
        if sent {
            self.chunks_sent += 1;
        }
        sent
    }

    /// Emit the terminal `complete` event and close
    pub async fn complete(&mut self, payload: CompletePayload) -> bool {
        let sent = self.emit_payload(StreamEventKind::Complete, &payload).await;
        self.close();
        sent
    }

    /// Emit the terminal `error` event and close
    pub async fn error(
        &mut self,
        err: &(dyn std::error::Error + Send + Sync + 'static),
    ) -> bool {
        let mut trace = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            trace.push(cause.to_string());
            source = cause.source();
        }

        let payload = ErrorPayload {
            message: err.to_string(),
            trace,
        };
        let sent = self.emit_payload(StreamEventKind::Error, &payload).await;
        self.close();
        sent
    }

    fn close(&mut self) {
        if self.state != StreamState::Closed {
            debug!(chunks = self.chunks_sent, "Stream closed");
        }
        self.state = StreamState::Closed;
    }

    async fn emit_payload<T: Serialize>(&mut self, kind: StreamEventKind, payload: &T) -> bool {
        match serde_json::to_value(payload) {
            Ok(data) => self.emit(StreamEvent::new(kind, Some(data))).await,
            Err(e) => {
                warn!(?kind, error = %e, "Failed to serialize stream payload");
                false
            }
        }
    }

    async fn write(&mut self, frame: SseFrame) -> bool {
        if self.tx.send(frame).await.is_err() {
            // Client went away; later writes become no-ops
            debug!("Stream receiver dropped");
            self.state = StreamState::Closed;
            return false;
        }
        true
    }
}

/// Turn the receiving end of a streamer channel into an SSE response
pub fn sse_response(rx: mpsc::Receiver<SseFrame>, keepalive: Duration) -> Response {
    let stream = ReceiverStream::new(rx).map(|frame| Ok::<_, Infallible>(frame.into_event()));

    let mut response = Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(keepalive))
        .into_response();

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}
