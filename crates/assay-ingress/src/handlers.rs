//! HTTP handlers for the assistant and grounding endpoints

use crate::{
    middleware::request_id_middleware,
    pipeline::{AssistantPipeline, AssistantReply},
    streamer::sse_response,
    types::IngressResult,
};
use assay_core::normalized::CompletionRequest;
use assay_grounding::{GroundednessReport, ValidationInput};
use axum::{
    Json, Router,
    extract::State,
    response::Response,
    routing::post,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Streamed assistant turn
pub async fn stream(
    State(pipeline): State<Arc<AssistantPipeline>>,
    Json(request): Json<CompletionRequest>,
) -> IngressResult<Response> {
    // Caller mistakes get a plain JSON error instead of an event stream
    request.validate()?;

    tracing::debug!(
        messages = request.messages.len(),
        tools = request.tools.len(),
        "Streaming assistant request"
    );

    let keepalive = pipeline.settings().keepalive();
    let rx = pipeline.spawn_stream(request);
    Ok(sse_response(rx, keepalive))
}

/// Assistant turn answered as one JSON document
pub async fn complete(
    State(pipeline): State<Arc<AssistantPipeline>>,
    Json(request): Json<CompletionRequest>,
) -> IngressResult<Json<AssistantReply>> {
    let cancel = CancellationToken::new();
    // Dropped with the handler future when the client disconnects
    let _guard = cancel.clone().drop_guard();

    let reply = pipeline.respond(request, &cancel).await?;
    Ok(Json(reply))
}

/// Advisory groundedness check of an existing answer
pub async fn validate_grounding(
    State(pipeline): State<Arc<AssistantPipeline>>,
    Json(input): Json<ValidationInput>,
) -> Json<GroundednessReport> {
    Json(pipeline.validator().validate_input(&input))
}

/// Create the assistant router
pub fn router(pipeline: Arc<AssistantPipeline>) -> Router {
    Router::new()
        .route("/v1/assistant/stream", post(stream))
        .route("/v1/assistant/complete", post(complete))
        .route("/v1/grounding/validate", post(validate_grounding))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(pipeline)
}
