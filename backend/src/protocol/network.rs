//! In-process A2A delivery between agent nodes

use super::bus::MessageBus;
use super::endpoint::EndpointStats;
use super::message::{A2AMessage, MessagePriority};
use super::node::{AgentNode, ORCHESTRATOR_ID};
use super::ProtocolError;
use crate::agents::AgentRegistry;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, warn};

/// Upper bound on deliveries for a single dispatch
const MAX_DELIVERIES: usize = 512;

/// Registry of nodes that delivers messages and their replies
pub struct A2ANetwork {
    nodes: BTreeMap<String, AgentNode>,
    bus: MessageBus,
}

impl A2ANetwork {
    /// Empty network publishing on `bus`
    pub fn new(bus: MessageBus) -> Self {
        Self {
            nodes: BTreeMap::new(),
            bus,
        }
    }

    /// Orchestrator plus one node per registered stage
    ///
    /// Each node keeps as much history as the bus keeps messages.
    pub fn with_registry(registry: &AgentRegistry, bus: MessageBus) -> Self {
        let limit = bus.capacity();
        let mut network = Self::new(bus);
        network.register(AgentNode::orchestrator().with_history_limit(limit));
        for agent in registry.order() {
            network.register(AgentNode::for_agent(agent.clone()).with_history_limit(limit));
        }
        network
    }

    /// Add or replace a node
    pub fn register(&mut self, node: AgentNode) {
        self.nodes.insert(node.id().to_string(), node);
    }

    pub fn node(&self, id: &str) -> Option<&AgentNode> {
        self.nodes.get(id)
    }

    /// Registered node ids, sorted
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Deliver a message and every reply it causes
    ///
    /// Messages are delivered in FIFO order. Each delivered message is
    /// published on the bus, then received by its target; the target's
    /// outgoing messages join the queue. Replies to an unregistered sender are
    /// logged but not delivered further.
    ///
    /// # Returns
    /// * `Ok(transcript)` - every delivered message, in delivery order
    /// * `Err(ProtocolError::UnknownRecipient)` if the first target is unknown
    pub async fn dispatch(&mut self, message: A2AMessage) -> Result<Vec<A2AMessage>, ProtocolError> {
        message.validate()?;
        if !self.nodes.contains_key(&message.header.to_agent) {
            return Err(ProtocolError::UnknownRecipient(message.header.to_agent.clone()));
        }
        if let Some(sender) = self.nodes.get_mut(&message.header.from_agent) {
            sender.endpoint_mut().record_sent(&message);
        }

        let mut transcript = Vec::new();
        let mut queue = VecDeque::from([message]);

        while let Some(next) = queue.pop_front() {
            if transcript.len() >= MAX_DELIVERIES {
                warn!(pending = queue.len() + 1, "A2A delivery limit reached, dropping remaining messages");
                break;
            }
            self.bus.publish(next.clone()).await;
            transcript.push(next.clone());

            match self.nodes.get_mut(&next.header.to_agent) {
                Some(node) => queue.extend(node.receive(&next).await),
                None => debug!(to = %next.header.to_agent, action = %next.payload.action, "No endpoint for recipient"),
            }
        }

        Ok(transcript)
    }

    /// Send a message from a registered node and deliver the conversation
    pub async fn send(
        &mut self,
        from: &str,
        to: &str,
        action: &str,
        data: Value,
        priority: MessagePriority,
        requires_ack: bool,
    ) -> Result<Vec<A2AMessage>, ProtocolError> {
        let message = self
            .nodes
            .get(from)
            .ok_or_else(|| ProtocolError::UnknownRecipient(from.to_string()))?
            .create_message(to, action, data, priority, requires_ack);
        self.dispatch(message).await
    }

    /// Orchestrator asks every other node for its status (with acks)
    pub async fn request_status(&mut self) -> Result<Vec<A2AMessage>, ProtocolError> {
        let targets: Vec<String> = self
            .nodes
            .keys()
            .filter(|id| id.as_str() != ORCHESTRATOR_ID)
            .cloned()
            .collect();

        let mut transcript = Vec::new();
        for target in targets {
            transcript.extend(
                self.send(
                    ORCHESTRATOR_ID,
                    &target,
                    "status",
                    json!({ "request_type": "full_status" }),
                    MessagePriority::Normal,
                    true,
                )
                .await?,
            );
        }
        Ok(transcript)
    }

    /// Message counters per node
    pub fn stats(&self) -> BTreeMap<String, EndpointStats> {
        self.nodes
            .iter()
            .map(|(id, node)| (id.clone(), node.stats()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> A2ANetwork {
        A2ANetwork::with_registry(&AgentRegistry::default(), MessageBus::new(100))
    }

    #[tokio::test]
    async fn test_unknown_recipient_is_error() {
        let mut net = network();
        let err = net
            .send(ORCHESTRATOR_ID, "ghost-agent", "status", json!({}), MessagePriority::Low, false)
            .await
            .unwrap_err();
        assert_eq!(err, ProtocolError::UnknownRecipient("ghost-agent".to_string()));
    }

    #[tokio::test]
    async fn test_status_round_trip_with_ack() {
        let mut net = network();
        let transcript = net
            .send(ORCHESTRATOR_ID, "video-agent", "status", json!({}), MessagePriority::Normal, true)
            .await
            .unwrap();

        let actions: Vec<_> = transcript.iter().map(|m| m.payload.action.as_str()).collect();
        assert_eq!(actions, vec!["status", "ack", "status_response"]);

        let stats = net.stats();
        assert_eq!(stats["orchestrator"].pending_acks, 0);
        assert_eq!(stats["video-agent"].total_messages, 3);
    }

    #[tokio::test]
    async fn test_request_status_reaches_every_agent() {
        let mut net = network();
        let transcript = net.request_status().await.unwrap();
        let responders: Vec<_> = transcript
            .iter()
            .filter(|m| m.payload.action == "status_response")
            .map(|m| m.header.from_agent.as_str())
            .collect();
        assert_eq!(responders.len(), 4);
        assert!(responders.contains(&"storyboard-agent"));
    }

    #[tokio::test]
    async fn test_dispatch_publishes_on_bus() {
        let bus = MessageBus::new(100);
        let mut net = A2ANetwork::with_registry(&AgentRegistry::default(), bus.clone());
        net.send(ORCHESTRATOR_ID, "audio-agent", "status", json!({}), MessagePriority::Normal, false)
            .await
            .unwrap();
        assert_eq!(bus.len().await, 2);
    }

    #[tokio::test]
    async fn test_reply_to_unregistered_sender_stops() {
        let mut net = network();
        let message = A2AMessage::new(
            "external-client",
            "metadata-agent",
            "status",
            json!({}),
            MessagePriority::Normal,
            crate::protocol::Transport::Rest,
        );
        let transcript = net.dispatch(message).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].header.to_agent, "external-client");
    }

    #[tokio::test]
    async fn test_repeated_status_requests_keep_history_bounded() {
        let mut net = A2ANetwork::with_registry(&AgentRegistry::default(), MessageBus::new(20));
        for _ in 0..5 {
            net.request_status().await.unwrap();
        }

        let orchestrator = net.node(ORCHESTRATOR_ID).unwrap().endpoint();
        assert_eq!(orchestrator.history().count(), 20);
        assert_eq!(orchestrator.pending_acks().count(), 0);
        // Four requests, four acks and four responses per round
        assert_eq!(orchestrator.stats().total_messages, 60);
    }
}
