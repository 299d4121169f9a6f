//! WebSocket handlers for real-time updates
//!
//! Each connection receives the current agents and jobs, then every pipeline
//! event as `{"type": ..., "data": ...}`. Supports ping/pong for connection keepalive.

use crate::api::AppContext;
use crate::pipeline::PipelineEvent;
use crate::state::{Agent, ProcessingJob};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{error, info, warn};

/// Interval between server pings
const PING_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);

/// Messages a client may send
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Application-level keepalive
    Ping,
    /// Reply to a ping
    Pong,
    /// Ask for a fresh `initial_state`
    RefreshState,
}

/// Snapshot sent when a client connects
#[derive(Serialize, Debug, Clone)]
pub struct InitialState {
    /// Agents in processing order
    pub agents: Vec<Agent>,
    /// Jobs, newest first
    pub jobs: Vec<ProcessingJob>,
}

async fn initial_state_message(ctx: &AppContext) -> String {
    let snapshot = {
        let state = ctx.state.read().await;
        InitialState {
            agents: state.agents_list().into_iter().cloned().collect(),
            jobs: state.jobs_list().into_iter().cloned().collect(),
        }
    };
    serde_json::json!({ "type": "initial_state", "data": snapshot }).to_string()
}

/// What to do about a client text frame: `Pong` to answer a ping,
/// `RefreshState` to resend the snapshot
fn handle_client_text(text: &str) -> Option<ClientMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => Some(ClientMessage::Pong),
        Ok(ClientMessage::RefreshState) => Some(ClientMessage::RefreshState),
        Ok(ClientMessage::Pong) => None,
        Err(e) => {
            warn!("Ignoring unparseable WebSocket message: {}", e);
            None
        }
    }
}

/// WebSocket upgrade handler
///
/// # Arguments
/// * `ws` - WebSocket upgrade request
/// * `ctx` - Application context
///
/// # Returns
/// * `Response` - HTTP response initiating WebSocket connection
pub async fn websocket_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, ctx))
}

// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, ctx: AppContext) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(ctx.pipeline.subscribe());

    info!("WebSocket client connected");

    if let Err(e) = sender
        .send(Message::Text(initial_state_message(&ctx).await))
        .await
    {
        error!("Failed to send initial state: {}", e);
        return;
    }

    // Use a channel to send messages from every task to the sender
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    });

    // Forward pipeline events
    let event_tx = tx.clone();
    let mut event_task = tokio::spawn(async move {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => match event_frame(&event) {
                    Ok(text) => {
                        if event_tx.send(Message::Text(text)).is_err() {
                            break;
                        }
                    }
                    Err(e) => error!(event = event.event_type(), "Failed to encode event: {}", e),
                },
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "WebSocket subscriber lagged, skipping events");
                }
            }
        }
    });

    // Periodic pings
    let ping_tx = tx.clone();
    let mut ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(PING_INTERVAL).await;
            if ping_tx.send(Message::Ping(vec![])).is_err() {
                break;
            }
        }
    });

    // Receive messages
    let recv_ctx = ctx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match handle_client_text(&text) {
                    Some(ClientMessage::Pong) => {
                        if let Ok(pong) = serde_json::to_string(&ClientMessage::Pong) {
                            if tx.send(Message::Text(pong)).is_err() {
                                break;
                            }
                        }
                    }
                    Some(ClientMessage::RefreshState) => {
                        if tx
                            .send(Message::Text(initial_state_message(&recv_ctx).await))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(ClientMessage::Ping) | None => {}
                },
                Ok(Message::Close(_)) => {
                    info!("WebSocket client disconnected");
                    break;
                }
                Ok(Message::Pong(_)) => {
                    // Client responded to ping
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for any task to complete
    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut event_task => {}
        _ = &mut ping_task => {}
        _ = &mut recv_task => {}
    }
    send_task.abort();
    event_task.abort();
    ping_task.abort();
    recv_task.abort();

    info!("WebSocket connection closed");
}

/// Wire form of an event, as sent to WebSocket clients
pub fn event_frame(event: &PipelineEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}
