//! A2A network handlers
//!
//! Explicit exchanges over the endpoint network. Every delivered message also
//! lands in the communication log.

use crate::api::utils::AppContext;
use crate::error::AppError;
use crate::protocol::{A2AMessage, EndpointStats};
use axum::{extract::State, response::Json};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Conversation produced by one exchange
#[derive(Serialize)]
pub struct TranscriptResponse {
    /// Delivered messages, in delivery order
    pub transcript: Vec<A2AMessage>,
    /// Number of delivered messages
    pub count: usize,
    /// Per-node counters after the exchange
    pub stats: BTreeMap<String, EndpointStats>,
}

/// GET /api/a2a/status - Orchestrator polls every agent node
pub async fn network_status(
    State(ctx): State<AppContext>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let mut network = ctx.network.lock().await;
    let transcript = network.request_status().await?;
    Ok(Json(TranscriptResponse {
        count: transcript.len(),
        stats: network.stats(),
        transcript,
    }))
}

/// POST /api/a2a/dispatch - Deliver a caller-supplied envelope
pub async fn dispatch_message(
    State(ctx): State<AppContext>,
    Json(body): Json<Value>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let message = A2AMessage::from_json(&body.to_string())?;
    tracing::info!(
        message_id = %message.id(),
        from = %message.header.from_agent,
        to = %message.header.to_agent,
        action = %message.action(),
        "Dispatching A2A message"
    );

    let mut network = ctx.network.lock().await;
    let transcript = network.dispatch(message).await?;
    Ok(Json(TranscriptResponse {
        count: transcript.len(),
        stats: network.stats(),
        transcript,
    }))
}
