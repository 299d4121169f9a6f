//! Per-agent A2A endpoint
//!
//! An endpoint owns an agent's handler table, its message history and the set
//! of sent messages still waiting for an acknowledgement. `receive` never
//! performs I/O itself: it returns the messages the endpoint wants to send and
//! leaves delivery to the caller (usually `A2ANetwork`).

use super::message::{A2AMessage, MessagePriority, Transport};
use super::ProtocolError;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Action and data for a reply; the endpoint fills in routing and correlation
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Reply action, e.g. `status_response`
    pub action: String,
    /// Reply data
    pub data: Value,
}

impl Reply {
    /// Reply with `action` and `data`
    pub fn new(action: impl Into<String>, data: Value) -> Self {
        Self {
            action: action.into(),
            data,
        }
    }
}

/// Handler for one action
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle a delivered message, optionally producing a reply to its sender
    async fn handle(&self, message: &A2AMessage) -> Result<Option<Reply>, ProtocolError>;
}

/// Messages kept in an endpoint's history unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Message counters for an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointStats {
    /// Messages sent or received since the endpoint was created
    pub total_messages: usize,
    /// Sent messages still waiting for an ack
    pub pending_acks: usize,
    /// Actions with a handler
    pub registered_handlers: usize,
    /// Distinct peers this endpoint has talked to
    pub connected_agents: usize,
}

/// One agent's side of the protocol
pub struct A2AEndpoint {
    agent_id: String,
    transport: Transport,
    handlers: BTreeMap<String, Arc<dyn MessageHandler>>,
    /// Oldest first; at most `history_limit` entries
    pending_acks: VecDeque<A2AMessage>,
    /// Oldest first; at most `history_limit` entries
    history: VecDeque<A2AMessage>,
    history_limit: usize,
    message_count: usize,
    connected_agents: BTreeSet<String>,
}

impl A2AEndpoint {
    /// Endpoint with no handlers, labelled `A2A`
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            transport: Transport::A2A,
            handlers: BTreeMap::new(),
            pending_acks: VecDeque::new(),
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            message_count: 0,
            connected_agents: BTreeSet::new(),
        }
    }

    /// Keep at most `limit` messages of history and unacknowledged sends
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Label outgoing messages with a different transport
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Register (or replace) the handler for an action
    pub fn register_handler(&mut self, action: impl Into<String>, handler: Arc<dyn MessageHandler>) {
        let action = action.into();
        debug!(agent_id = %self.agent_id, action = %action, "Registered A2A handler");
        self.handlers.insert(action, handler);
    }

    /// Actions this endpoint can handle, sorted
    pub fn capabilities(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Build a message from this endpoint
    ///
    /// # Arguments
    /// * `to_agent` - Recipient id
    /// * `action` - Action name
    /// * `data` - Action data
    /// * `priority` - Delivery priority
    /// * `requires_ack` - Whether the recipient must acknowledge
    /// * `correlation_id` - Message this one answers, if any
    pub fn create_message(
        &self,
        to_agent: &str,
        action: &str,
        data: Value,
        priority: MessagePriority,
        requires_ack: bool,
        correlation_id: Option<&str>,
    ) -> A2AMessage {
        let mut message = A2AMessage::new(
            &self.agent_id,
            to_agent,
            action,
            data,
            priority,
            self.transport,
        )
        .with_ack(requires_ack)
        .with_metadata(json!({
            "created_at": Utc::now().to_rfc3339(),
            "agent_capabilities": self.capabilities(),
        }));
        if let Some(id) = correlation_id {
            message = message.correlated_to(id);
        }
        message
    }

    /// Record a message this endpoint sends
    pub fn record_sent(&mut self, message: &A2AMessage) {
        debug!(
            agent_id = %self.agent_id,
            to = %message.header.to_agent,
            action = %message.payload.action,
            priority = message.header.priority.name(),
            message_id = %message.header.message_id,
            "Sending A2A message"
        );
        self.connected_agents.insert(message.header.to_agent.clone());
        if message.header.requires_ack {
            self.pending_acks.push_back(message.clone());
            if self.pending_acks.len() > self.history_limit {
                if let Some(dropped) = self.pending_acks.pop_front() {
                    warn!(
                        agent_id = %self.agent_id,
                        message_id = %dropped.header.message_id,
                        "Dropping oldest unacknowledged message"
                    );
                }
            }
        }
        self.remember(message);
    }

    fn remember(&mut self, message: &A2AMessage) {
        self.message_count += 1;
        self.history.push_back(message.clone());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// Receive a message and return the messages to send in response
    ///
    /// The ack (when requested) comes first, then the handler's reply or an
    /// `error` message if the handler failed. Outgoing messages are already
    /// recorded as sent.
    pub async fn receive(&mut self, message: &A2AMessage) -> Vec<A2AMessage> {
        debug!(
            agent_id = %self.agent_id,
            from = %message.header.from_agent,
            action = %message.payload.action,
            message_id = %message.header.message_id,
            "Received A2A message"
        );
        self.remember(message);
        self.connected_agents
            .insert(message.header.from_agent.clone());

        if message.payload.action == "ack" {
            if let Some(ack_for) = message.payload.data.get("ack_for").and_then(Value::as_str) {
                self.pending_acks
                    .retain(|pending| pending.header.message_id != ack_for);
            }
        }

        let mut outgoing = Vec::new();
        let sender = message.header.from_agent.as_str();
        let message_id = message.header.message_id.as_str();

        if message.header.requires_ack {
            outgoing.push(self.create_message(
                sender,
                "ack",
                json!({ "ack_for": message_id }),
                MessagePriority::Normal,
                false,
                Some(message_id),
            ));
        }

        match self.handlers.get(&message.payload.action).cloned() {
            Some(handler) => match handler.handle(message).await {
                Ok(Some(reply)) => outgoing.push(self.create_message(
                    sender,
                    &reply.action,
                    reply.data,
                    MessagePriority::Normal,
                    false,
                    Some(message_id),
                )),
                Ok(None) => {}
                Err(e) => {
                    warn!(agent_id = %self.agent_id, error = %e, "A2A handler failed");
                    // Errors about errors would bounce forever
                    if message.payload.action != "error" {
                        outgoing.push(self.create_message(
                            sender,
                            "error",
                            json!({
                                "error": e.to_string(),
                                "original_message_id": message_id,
                            }),
                            MessagePriority::High,
                            false,
                            Some(message_id),
                        ));
                    }
                }
            },
            None => {
                warn!(
                    agent_id = %self.agent_id,
                    action = %message.payload.action,
                    "No handler registered for action"
                );
            }
        }

        for sent in &outgoing {
            self.record_sent(sent);
        }
        outgoing
    }

    /// Messages sent while waiting for an acknowledgement
    pub fn pending_acks(&self) -> impl Iterator<Item = &A2AMessage> {
        self.pending_acks.iter()
    }

    /// The most recent messages sent or received, oldest first
    pub fn history(&self) -> impl Iterator<Item = &A2AMessage> {
        self.history.iter()
    }

    /// Current counters
    pub fn stats(&self) -> EndpointStats {
        EndpointStats {
            total_messages: self.message_count,
            pending_acks: self.pending_acks.len(),
            registered_handlers: self.handlers.len(),
            connected_agents: self.connected_agents.len(),
        }
    }
}
