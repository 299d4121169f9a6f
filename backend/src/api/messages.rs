//! Communication log handler

use crate::api::utils::AppContext;
use crate::protocol::{A2AMessage, DEFAULT_RECENT_LIMIT};
use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

/// Query parameters for the message log
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    /// Maximum number of messages, default 50
    pub limit: Option<usize>,
}

/// Message log response
#[derive(Serialize)]
pub struct MessagesResponse {
    /// Messages, newest first
    pub messages: Vec<A2AMessage>,
    /// Number of messages returned
    pub count: usize,
}

/// GET /api/messages?limit= - Recent A2A messages
pub async fn list_messages(
    State(ctx): State<AppContext>,
    Query(query): Query<MessagesQuery>,
) -> Json<MessagesResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let messages = ctx.pipeline.bus().recent(limit).await;
    Json(MessagesResponse {
        count: messages.len(),
        messages,
    })
}
