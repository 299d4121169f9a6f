//! A2A message envelope

use super::ProtocolError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Pseudo-recipient for notifications addressed to every agent
pub const BROADCAST_TARGET: &str = "all-agents";

/// Envelope format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Legacy envelope, accepted on input
    #[serde(rename = "1.0")]
    V1_0,
    /// Current envelope
    #[serde(rename = "2.0")]
    #[default]
    V2_0,
}

/// Delivery priority, serialized as its numeric level (1..=4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MessagePriority {
    /// Background traffic
    Low = 1,
    /// Notifications, acks and replies
    #[default]
    Normal = 2,
    /// Stage requests
    High = 3,
    /// Failure reports
    Critical = 4,
}

impl From<MessagePriority> for u8 {
    fn from(priority: MessagePriority) -> Self {
        priority as u8
    }
}

impl TryFrom<u8> for MessagePriority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessagePriority::Low),
            2 => Ok(MessagePriority::Normal),
            3 => Ok(MessagePriority::High),
            4 => Ok(MessagePriority::Critical),
            other => Err(format!("invalid priority level {}", other)),
        }
    }
}

impl MessagePriority {
    /// Uppercase label used in logs
    pub fn name(&self) -> &'static str {
        match self {
            MessagePriority::Low => "LOW",
            MessagePriority::Normal => "NORMAL",
            MessagePriority::High => "HIGH",
            MessagePriority::Critical => "CRITICAL",
        }
    }
}

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Asks the recipient to act
    Request,
    /// Answers an earlier message
    Response,
    /// Informs without expecting a reply
    Notification,
}

impl MessageKind {
    /// Infer the kind from an action name
    ///
    /// Completions, responses, errors and acks are responses; `job_*` and
    /// `pipeline_*` are notifications; everything else is a request.
    pub fn infer(action: &str) -> Self {
        if action == "ack"
            || action == "error"
            || action.ends_with("_complete")
            || action.ends_with("_response")
            || action.ends_with("_error")
        {
            MessageKind::Response
        } else if action.starts_with("job_") || action.starts_with("pipeline_") {
            MessageKind::Notification
        } else {
            MessageKind::Request
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Request => "request",
            MessageKind::Response => "response",
            MessageKind::Notification => "notification",
        }
    }
}

/// Transport label shown on the communication log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Transport {
    /// In-process agent-to-agent delivery
    #[default]
    #[serde(rename = "A2A")]
    A2A,
    /// gRPC bridge
    #[serde(rename = "gRPC")]
    Grpc,
    /// Messages injected over the HTTP API
    #[serde(rename = "REST")]
    Rest,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::A2A => "A2A",
            Transport::Grpc => "gRPC",
            Transport::Rest => "REST",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing and bookkeeping fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2AHeader {
    /// Envelope version
    #[serde(default)]
    pub version: ProtocolVersion,
    /// Unique id (UUID v4)
    pub message_id: String,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Sender id
    pub from_agent: String,
    /// Recipient id
    pub to_agent: String,
    /// Delivery priority
    #[serde(default)]
    pub priority: MessagePriority,
    /// Whether the recipient must reply with an `ack`
    #[serde(default)]
    pub requires_ack: bool,
    /// Id of the message this one answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Explicit kind; inferred from the action when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    /// Transport label
    #[serde(default)]
    pub transport: Transport,
}

/// Action name plus free-form data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2APayload {
    /// Action name, e.g. `process` or `status_response`
    pub action: String,
    /// Action arguments or results
    #[serde(default)]
    pub data: Value,
    /// Sender details such as `created_at` and `agent_capabilities`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A complete A2A envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2AMessage {
    /// Routing fields
    pub header: A2AHeader,
    /// Action and data
    pub payload: A2APayload,
}

impl A2AMessage {
    /// Create a message with a fresh id and the current timestamp
    pub fn new(
        from_agent: &str,
        to_agent: &str,
        action: &str,
        data: Value,
        priority: MessagePriority,
        transport: Transport,
    ) -> Self {
        Self {
            header: A2AHeader {
                version: ProtocolVersion::default(),
                message_id: Uuid::new_v4().to_string(),
                timestamp: Utc::now(),
                from_agent: from_agent.to_string(),
                to_agent: to_agent.to_string(),
                priority,
                requires_ack: false,
                correlation_id: None,
                kind: Some(MessageKind::infer(action)),
                transport,
            },
            payload: A2APayload {
                action: action.to_string(),
                data,
                metadata: None,
            },
        }
    }

    /// Ask the recipient to acknowledge delivery
    pub fn with_ack(mut self, requires_ack: bool) -> Self {
        self.header.requires_ack = requires_ack;
        self
    }

    /// Link this message to an earlier one
    pub fn correlated_to(mut self, message_id: impl Into<String>) -> Self {
        self.header.correlation_id = Some(message_id.into());
        self
    }

    /// Set the kind instead of inferring it
    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.header.kind = Some(kind);
        self
    }

    /// Attach sender metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.payload.metadata = Some(metadata);
        self
    }

    /// Message kind, explicit or inferred from the action
    pub fn kind(&self) -> MessageKind {
        self.header
            .kind
            .unwrap_or_else(|| MessageKind::infer(&self.payload.action))
    }

    /// Message id
    pub fn id(&self) -> &str {
        &self.header.message_id
    }

    pub fn action(&self) -> &str {
        &self.payload.action
    }

    /// Job id carried in the data, under `jobId` or `job_id`
    pub fn job_id(&self) -> Option<&str> {
        self.payload
            .data
            .get("jobId")
            .or_else(|| self.payload.data.get("job_id"))
            .and_then(Value::as_str)
    }

    /// Serialize the envelope
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Parse an envelope, filling an absent kind from the action
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let mut message: Self =
            serde_json::from_str(json).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        message.validate()?;
        if message.header.kind.is_none() {
            message.header.kind = Some(MessageKind::infer(&message.payload.action));
        }
        Ok(message)
    }

    /// Reject envelopes with empty routing fields
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.header.message_id.trim().is_empty() {
            return Err(ProtocolError::Malformed("empty message_id".to_string()));
        }
        if self.header.from_agent.trim().is_empty() || self.header.to_agent.trim().is_empty() {
            return Err(ProtocolError::Malformed("missing sender or recipient".to_string()));
        }
        if self.payload.action.trim().is_empty() {
            return Err(ProtocolError::Malformed("empty action".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_inference() {
        assert_eq!(MessageKind::infer("process"), MessageKind::Request);
        assert_eq!(MessageKind::infer("status"), MessageKind::Request);
        assert_eq!(MessageKind::infer("process_complete"), MessageKind::Response);
        assert_eq!(MessageKind::infer("status_response"), MessageKind::Response);
        assert_eq!(MessageKind::infer("process_error"), MessageKind::Response);
        assert_eq!(MessageKind::infer("ack"), MessageKind::Response);
        assert_eq!(MessageKind::infer("job_queued"), MessageKind::Notification);
        assert_eq!(
            MessageKind::infer("pipeline_complete"),
            MessageKind::Notification
        );
    }

    #[test]
    fn test_priority_serializes_as_number() {
        let msg = A2AMessage::new(
            "orchestrator",
            "video-agent",
            "process",
            json!({}),
            MessagePriority::High,
            Transport::Grpc,
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["header"]["priority"], 3);
        assert_eq!(value["header"]["version"], "2.0");
        assert_eq!(value["header"]["transport"], "gRPC");
        assert_eq!(value["header"]["kind"], "request");
    }

    #[test]
    fn test_from_json_infers_missing_kind() {
        let raw = r#"{
            "header": {
                "message_id": "m-1",
                "timestamp": "2024-05-01T10:00:00Z",
                "from_agent": "video-agent",
                "to_agent": "orchestrator",
                "priority": 2
            },
            "payload": { "action": "process_complete", "data": { "job_id": "j-1" } }
        }"#;
        let msg = A2AMessage::from_json(raw).unwrap();
        assert_eq!(msg.kind(), MessageKind::Response);
        assert_eq!(msg.header.version, ProtocolVersion::V2_0);
        assert_eq!(msg.header.transport, Transport::A2A);
        assert!(!msg.header.requires_ack);
        assert_eq!(msg.job_id(), Some("j-1"));
    }

    #[test]
    fn test_from_json_rejects_bad_priority() {
        let raw = r#"{
            "header": {
                "message_id": "m-1",
                "timestamp": "2024-05-01T10:00:00Z",
                "from_agent": "a",
                "to_agent": "b",
                "priority": 9
            },
            "payload": { "action": "status" }
        }"#;
        assert!(matches!(
            A2AMessage::from_json(raw),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_empty_action() {
        let msg = A2AMessage::new(
            "a",
            "b",
            "",
            Value::Null,
            MessagePriority::Low,
            Transport::Rest,
        );
        let json = msg.to_json().unwrap();
        assert!(A2AMessage::from_json(&json).is_err());
    }

    #[test]
    fn test_builders() {
        let msg = A2AMessage::new(
            "orchestrator",
            "audio-agent",
            "status",
            json!({}),
            MessagePriority::Normal,
            Transport::A2A,
        )
        .with_ack(true)
        .correlated_to("m-0")
        .with_kind(MessageKind::Notification);

        assert!(msg.header.requires_ack);
        assert_eq!(msg.header.correlation_id.as_deref(), Some("m-0"));
        assert_eq!(msg.kind(), MessageKind::Notification);
    }
}
