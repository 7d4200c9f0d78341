//! Assay Ingress
//!
//! The client-facing side of the assistant:
//! - `ResponseStreamer` and its SSE framing
//! - the assistant pipeline (completion, one tool round, grounding)
//! - HTTP handlers for streaming and non-streaming turns and for
//!   standalone grounding checks

pub mod chunker;
pub mod events;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod streamer;
pub mod types;

pub use events::{SseFrame, StreamEvent, StreamEventKind};
pub use handlers::router;
pub use pipeline::{AssistantPipeline, AssistantTurn, StreamSettings};
pub use streamer::{ResponseStreamer, StreamState, sse_response};
pub use types::{IngressError, IngressResult, RequestId};
