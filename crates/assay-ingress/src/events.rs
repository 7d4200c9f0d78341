//! Stream events and their SSE framing
//!
//! Every event is one `data: <json>\n\n` frame holding
//! `{"type": ..., "data": ..., "timestamp": ...}`.

use assay_core::normalized::Usage;
use assay_grounding::GroundednessReport;
use axum::response::sse::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a stream event; unknown kinds from newer producers map to `Unknown`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    Start,
    Thinking,
    ToolCall,
    ToolResult,
    Chunk,
    Complete,
    Error,
    #[serde(other)]
    Unknown,
}

impl StreamEventKind {
    /// `complete` and `error` end the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEventKind::Complete | StreamEventKind::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: StreamEventKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub timestamp: DateTime<Utc>,
}

impl StreamEvent {
    pub fn new(kind: StreamEventKind, data: Option<Value>) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Format as one SSE frame
    pub fn to_sse(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingPayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub tool: String,
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultPayload {
    pub tool: String,
    pub result: Value,
    /// Milliseconds
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletePayload {
    pub usage: Usage,

    /// Number of tool calls made during the turn
    pub tool_calls: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding: Option<GroundednessReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,

    /// The error followed by its sources
    pub trace: Vec<String>,
}

/// One frame on the wire, already serialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Comment(String),
    Data(String),
}

impl SseFrame {
    pub fn to_sse(&self) -> String {
        match self {
            SseFrame::Comment(text) => format!(": {}\n\n", text),
            SseFrame::Data(json) => format!("data: {}\n\n", json),
        }
    }

    pub fn into_event(self) -> Event {
        match self {
            SseFrame::Comment(text) => Event::default().comment(text),
            SseFrame::Data(json) => Event::default().data(json),
        }
    }
}
