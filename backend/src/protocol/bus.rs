//! Communication log
//!
//! Every A2A message the system sends passes through the bus. The bus keeps a
//! capped, ordered log for the dashboard, fans messages out to live
//! subscribers, and (when configured) writes them through to SQLite.

use super::message::{A2AMessage, MessagePriority, Transport};
use crate::state::{PipelineDb, PROCESSING_ORDER};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;

/// Number of messages returned when the caller gives no limit
pub const DEFAULT_RECENT_LIMIT: usize = 50;

const CHANNEL_CAPACITY: usize = 256;

/// Shared communication log; clones share the same log
#[derive(Clone)]
pub struct MessageBus {
    log: Arc<RwLock<VecDeque<A2AMessage>>>,
    capacity: usize,
    sender: broadcast::Sender<A2AMessage>,
    db: Option<PipelineDb>,
}

impl MessageBus {
    /// Create a bus that keeps at most `capacity` messages
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            log: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
            sender,
            db: None,
        }
    }

    /// Also write every published message to the database
    pub fn with_persistence(mut self, db: PipelineDb) -> Self {
        self.db = Some(db);
        self
    }

    /// Append a message to the log and notify subscribers
    pub async fn publish(&self, message: A2AMessage) {
        {
            let mut log = self.log.write().await;
            log.push_back(message.clone());
            while log.len() > self.capacity {
                log.pop_front();
            }
        }

        if let Some(db) = &self.db {
            if let Err(e) = db.insert_message(&message).await {
                warn!(error = %e, message_id = %message.header.message_id, "Failed to persist message");
            }
        }

        // No subscribers is fine
        let _ = self.sender.send(message);
    }

    /// Load messages from an earlier run, oldest first
    ///
    /// Restored messages are neither written back to the database nor sent to
    /// subscribers. Returns the number now in the log.
    pub async fn restore(&self, messages: impl IntoIterator<Item = A2AMessage>) -> usize {
        let mut log = self.log.write().await;
        log.extend(messages);
        while log.len() > self.capacity {
            log.pop_front();
        }
        log.len()
    }

    /// Send one notification to every processing agent except the sender
    pub async fn broadcast_to_agents(&self, from: &str, action: &str, data: Value) -> Vec<A2AMessage> {
        let mut sent = Vec::new();
        for kind in PROCESSING_ORDER {
            if kind.id() == from {
                continue;
            }
            let message = A2AMessage::new(
                from,
                kind.id(),
                action,
                data.clone(),
                MessagePriority::Normal,
                Transport::A2A,
            );
            self.publish(message.clone()).await;
            sent.push(message);
        }
        sent
    }

    /// Most recent messages, newest first
    pub async fn recent(&self, limit: usize) -> Vec<A2AMessage> {
        let log = self.log.read().await;
        log.iter().rev().take(limit).cloned().collect()
    }

    /// Messages currently in the log
    pub async fn len(&self) -> usize {
        self.log.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.log.read().await.is_empty()
    }

    /// Most messages the log keeps
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Receive every message published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<A2AMessage> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(action: &str) -> A2AMessage {
        A2AMessage::new(
            "orchestrator",
            "video-agent",
            action,
            json!({}),
            MessagePriority::Normal,
            Transport::A2A,
        )
    }

    #[tokio::test]
    async fn test_log_is_capped() {
        let bus = MessageBus::new(3);
        for i in 0..5 {
            bus.publish(message(&format!("step_{}", i))).await;
        }
        assert_eq!(bus.len().await, 3);
        let recent = bus.recent(10).await;
        let actions: Vec<_> = recent.iter().map(|m| m.payload.action.as_str()).collect();
        assert_eq!(actions, vec!["step_4", "step_3", "step_2"]);
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let bus = MessageBus::new(100);
        for i in 0..10 {
            bus.publish(message(&format!("step_{}", i))).await;
        }
        let recent = bus.recent(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].payload.action, "step_9");
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender() {
        let bus = MessageBus::new(100);
        let sent = bus
            .broadcast_to_agents("video-agent", "job_queued", json!({ "jobId": "j-1" }))
            .await;
        let targets: Vec<_> = sent.iter().map(|m| m.header.to_agent.as_str()).collect();
        assert_eq!(targets, vec!["metadata-agent", "audio-agent", "storyboard-agent"]);
        assert!(sent
            .iter()
            .all(|m| m.kind() == crate::protocol::MessageKind::Notification));
    }

    #[tokio::test]
    async fn test_subscribers_receive_published() {
        let bus = MessageBus::new(10);
        let mut rx = bus.subscribe();
        bus.publish(message("status")).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.payload.action, "status");
    }

    #[tokio::test]
    async fn test_restore_is_silent_and_capped() {
        let bus = MessageBus::new(3);
        let mut rx = bus.subscribe();
        let restored = bus
            .restore((0..5).map(|i| message(&format!("step_{}", i))))
            .await;
        assert_eq!(restored, 3);

        let actions: Vec<_> = bus
            .recent(10)
            .await
            .into_iter()
            .map(|m| m.payload.action)
            .collect();
        assert_eq!(actions, vec!["step_4", "step_3", "step_2"]);
        assert!(rx.try_recv().is_err());
    }
}
