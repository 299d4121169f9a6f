//! Tests for the A2A envelope and the endpoint network

use media_suite_backend::agents::AgentRegistry;
use media_suite_backend::protocol::{
    A2AMessage, A2ANetwork, MessageBus, MessageKind, MessagePriority, ProtocolError,
    ProtocolVersion, Transport, BROADCAST_TARGET, ORCHESTRATOR_ID,
};
use serde_json::json;

fn network() -> (A2ANetwork, MessageBus) {
    let bus = MessageBus::new(1000);
    (
        A2ANetwork::with_registry(&AgentRegistry::default(), bus.clone()),
        bus,
    )
}

#[test]
fn test_envelope_parses_from_wire_json() {
    // Envelope without `kind`, `transport` or `correlation_id`
    let json = r#"{
        "header": {
            "version": "1.0",
            "message_id": "msg-1",
            "timestamp": "2024-03-01T12:00:00Z",
            "from_agent": "orchestrator",
            "to_agent": "video-agent",
            "priority": 3,
            "requires_ack": true
        },
        "payload": {
            "action": "process",
            "data": { "job_id": "job-1", "file_path": "/tmp/clip.mp4" }
        }
    }"#;

    let message = A2AMessage::from_json(json).unwrap();
    assert_eq!(message.header.version, ProtocolVersion::V1_0);
    assert_eq!(message.header.priority, MessagePriority::High);
    assert_eq!(message.kind(), MessageKind::Request);
    assert_eq!(message.job_id(), Some("job-1"));
    assert!(message.payload.metadata.is_none());

    let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
    assert_eq!(value["header"]["priority"], 3);
}

#[test]
fn test_envelope_rejects_missing_routing() {
    let message = A2AMessage::new(
        "orchestrator",
        "",
        "status",
        json!({}),
        MessagePriority::Low,
        Transport::A2A,
    );
    assert!(matches!(message.validate(), Err(ProtocolError::Malformed(_))));
    assert!(A2AMessage::from_json("{not json").is_err());
}

#[test]
fn test_kind_inference() {
    assert_eq!(MessageKind::infer("process_complete"), MessageKind::Response);
    assert_eq!(MessageKind::infer("status_response"), MessageKind::Response);
    assert_eq!(MessageKind::infer("ack"), MessageKind::Response);
    assert_eq!(MessageKind::infer("job_queued"), MessageKind::Notification);
    assert_eq!(MessageKind::infer("process"), MessageKind::Request);
}

#[tokio::test]
async fn test_process_over_network_returns_results() {
    let (mut net, bus) = network();
    let transcript = net
        .send(
            ORCHESTRATOR_ID,
            "storyboard-agent",
            "process",
            json!({ "job_id": "job-7", "file_name": "clip.mp4", "file_type": "video/mp4" }),
            MessagePriority::High,
            true,
        )
        .await
        .unwrap();

    let actions: Vec<&str> = transcript.iter().map(|m| m.action()).collect();
    assert_eq!(actions, vec!["process", "ack", "process_complete"]);

    let reply = &transcript[2];
    assert_eq!(reply.header.correlation_id.as_deref(), Some(transcript[0].id()));
    assert!(reply.payload.data["results"]["key_frames"].is_u64());
    assert_eq!(bus.len().await, 3);

    let status = net.stats();
    assert_eq!(status[ORCHESTRATOR_ID].pending_acks, 0);
}

#[tokio::test]
async fn test_cancelled_job_is_refused() {
    let (mut net, _bus) = network();
    let cancel = net
        .send(
            ORCHESTRATOR_ID,
            "audio-agent",
            "cancel",
            json!({ "job_id": "job-9" }),
            MessagePriority::Normal,
            false,
        )
        .await
        .unwrap();
    assert_eq!(cancel[1].action(), "cancel_response");

    let process = net
        .send(
            ORCHESTRATOR_ID,
            "audio-agent",
            "process",
            json!({ "job_id": "job-9", "file_name": "song.wav", "file_type": "audio/wav" }),
            MessagePriority::Normal,
            false,
        )
        .await
        .unwrap();
    let error = process.last().unwrap();
    assert_eq!(error.action(), "error");
    assert_eq!(
        error.payload.data["original_message_id"],
        process[0].id()
    );
}

#[tokio::test]
async fn test_missing_job_id_produces_error_reply() {
    let (mut net, _bus) = network();
    let transcript = net
        .send(
            ORCHESTRATOR_ID,
            "metadata-agent",
            "process",
            json!({ "file_name": "clip.mp4" }),
            MessagePriority::Normal,
            false,
        )
        .await
        .unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].action(), "error");
}

#[tokio::test]
async fn test_unknown_actions_are_ignored() {
    let (mut net, _bus) = network();
    let transcript = net
        .send(
            ORCHESTRATOR_ID,
            "video-agent",
            "teleport",
            json!({}),
            MessagePriority::Low,
            false,
        )
        .await
        .unwrap();
    assert_eq!(transcript.len(), 1);
}

#[tokio::test]
async fn test_bus_broadcast_and_capacity() {
    let bus = MessageBus::new(5);
    let sent = bus
        .broadcast_to_agents("video-agent", "pipeline_paused", json!({}))
        .await;
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|m| m.header.to_agent != "video-agent"));
    assert!(sent.iter().all(|m| m.header.to_agent != BROADCAST_TARGET));

    for _ in 0..4 {
        bus.broadcast_to_agents(ORCHESTRATOR_ID, "job_queued", json!({}))
            .await;
    }
    assert_eq!(bus.len().await, 5);
    let recent = bus.recent(2).await;
    assert_eq!(recent.len(), 2);
    assert!(recent[0].header.timestamp >= recent[1].header.timestamp);
}
