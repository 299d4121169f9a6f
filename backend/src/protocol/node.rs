//! Agent nodes: an A2A endpoint wired to a processing stage

use super::endpoint::{A2AEndpoint, EndpointStats, MessageHandler, Reply};
use super::message::{A2AMessage, MessagePriority};
use super::ProtocolError;
use crate::agents::{JobContext, MediaAgent};
use crate::state::AgentKind;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Identifier of the coordinating node
pub const ORCHESTRATOR_ID: &str = "orchestrator";

/// Cancelled job ids a node remembers
const CANCELLED_JOB_LIMIT: usize = 256;

/// Job bookkeeping for one node
///
/// Finished jobs are only counted; cancelled ids are kept (newest last) so a
/// late `process` for them is refused.
#[derive(Debug, Default)]
struct NodeJobs {
    active: HashSet<String>,
    cancelled: VecDeque<String>,
    finished: usize,
}

/// State shared by a node's handlers
struct NodeShared {
    agent_id: String,
    agent_type: String,
    capabilities: Vec<String>,
    agent: Option<Arc<dyn MediaAgent>>,
    jobs: Mutex<NodeJobs>,
}

impl NodeShared {
    fn start_job(&self, job_id: &str) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.active.insert(job_id.to_string());
        }
    }

    fn finish_job(&self, job_id: &str) {
        if let Ok(mut jobs) = self.jobs.lock() {
            if jobs.active.remove(job_id) {
                jobs.finished += 1;
            }
        }
    }

    fn cancel_job(&self, job_id: &str) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.active.remove(job_id);
            if !jobs.cancelled.iter().any(|id| id == job_id) {
                jobs.cancelled.push_back(job_id.to_string());
                while jobs.cancelled.len() > CANCELLED_JOB_LIMIT {
                    jobs.cancelled.pop_front();
                }
            }
        }
    }

    fn is_cancelled(&self, job_id: &str) -> bool {
        self.jobs
            .lock()
            .map(|jobs| jobs.cancelled.iter().any(|id| id == job_id))
            .unwrap_or(false)
    }

    /// Active and total (active plus finished) job counts
    fn job_counts(&self) -> (usize, usize) {
        match self.jobs.lock() {
            Ok(jobs) => (jobs.active.len(), jobs.active.len() + jobs.finished),
            Err(_) => (0, 0),
        }
    }
}

fn job_id_of(message: &A2AMessage) -> Result<String, ProtocolError> {
    message
        .job_id()
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::Malformed("missing job_id".to_string()))
}

struct ProcessHandler(Arc<NodeShared>);

#[async_trait]
impl MessageHandler for ProcessHandler {
    async fn handle(&self, message: &A2AMessage) -> Result<Option<Reply>, ProtocolError> {
        let shared = &self.0;
        let job_id = job_id_of(message)?;
        let agent = shared.agent.clone().ok_or_else(|| ProtocolError::HandlerFailed {
            action: "process".to_string(),
            message: format!("{} has no processing stage", shared.agent_id),
        })?;

        if shared.is_cancelled(&job_id) {
            return Err(ProtocolError::HandlerFailed {
                action: "process".to_string(),
                message: format!("job {} was cancelled", job_id),
            });
        }

        let data = &message.payload.data;
        let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
        let file_path = text("file_path");
        let ctx = JobContext {
            job_id: job_id.clone(),
            file_name: text("file_name")
                .or_else(|| text("fileName"))
                .or_else(|| file_path.clone())
                .unwrap_or_default(),
            file_type: text("file_type")
                .or_else(|| text("fileType"))
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            file_path: file_path.map(Into::into),
        };

        info!(agent_id = %shared.agent_id, job_id = %job_id, "Starting processing");
        shared.start_job(&job_id);
        let outcome = agent.process(&ctx).await;
        shared.finish_job(&job_id);

        let results = outcome.map_err(|e| ProtocolError::HandlerFailed {
            action: "process".to_string(),
            message: e.to_string(),
        })?;

        Ok(Some(Reply::new(
            "process_complete",
            json!({
                "job_id": job_id,
                "status": "completed",
                "results": results,
            }),
        )))
    }
}

struct StatusHandler(Arc<NodeShared>);

#[async_trait]
impl MessageHandler for StatusHandler {
    async fn handle(&self, _message: &A2AMessage) -> Result<Option<Reply>, ProtocolError> {
        let shared = &self.0;
        let (active, total) = shared.job_counts();
        Ok(Some(Reply::new(
            "status_response",
            json!({
                "agent_id": shared.agent_id,
                "agent_type": shared.agent_type,
                "capabilities": shared.capabilities,
                "active_jobs": active,
                "total_jobs": total,
            }),
        )))
    }
}

struct CancelHandler(Arc<NodeShared>);

#[async_trait]
impl MessageHandler for CancelHandler {
    async fn handle(&self, message: &A2AMessage) -> Result<Option<Reply>, ProtocolError> {
        let job_id = job_id_of(message)?;
        self.0.cancel_job(&job_id);
        info!(agent_id = %self.0.agent_id, job_id = %job_id, "Cancelled job");
        Ok(Some(Reply::new(
            "cancel_response",
            json!({ "job_id": job_id, "status": "cancelled" }),
        )))
    }
}

/// Pending entries are cleared by the endpoint; this only logs
struct AckHandler(Arc<NodeShared>);

#[async_trait]
impl MessageHandler for AckHandler {
    async fn handle(&self, message: &A2AMessage) -> Result<Option<Reply>, ProtocolError> {
        if let Some(ack_for) = message.payload.data.get("ack_for").and_then(Value::as_str) {
            info!(agent_id = %self.0.agent_id, ack_for, "Received ACK");
        }
        Ok(None)
    }
}

struct ErrorHandler(Arc<NodeShared>);

#[async_trait]
impl MessageHandler for ErrorHandler {
    async fn handle(&self, message: &A2AMessage) -> Result<Option<Reply>, ProtocolError> {
        let data = &message.payload.data;
        warn!(
            agent_id = %self.0.agent_id,
            original_message_id = data.get("original_message_id").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
            error = data.get("error").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
            "Received error"
        );
        Ok(None)
    }
}

/// A protocol participant: endpoint plus (for stages) the agent that does the work
pub struct AgentNode {
    endpoint: A2AEndpoint,
    shared: Arc<NodeShared>,
}

impl AgentNode {
    fn build(
        agent_id: &str,
        agent_type: &str,
        capabilities: Vec<String>,
        agent: Option<Arc<dyn MediaAgent>>,
    ) -> Self {
        let shared = Arc::new(NodeShared {
            agent_id: agent_id.to_string(),
            agent_type: agent_type.to_string(),
            capabilities,
            agent,
            jobs: Mutex::new(NodeJobs::default()),
        });

        let mut endpoint = A2AEndpoint::new(agent_id);
        if shared.agent.is_some() {
            endpoint.register_handler("process", Arc::new(ProcessHandler(shared.clone())));
        }
        endpoint.register_handler("status", Arc::new(StatusHandler(shared.clone())));
        endpoint.register_handler("cancel", Arc::new(CancelHandler(shared.clone())));
        endpoint.register_handler("ack", Arc::new(AckHandler(shared.clone())));
        endpoint.register_handler("error", Arc::new(ErrorHandler(shared.clone())));

        Self { endpoint, shared }
    }

    /// Node for a processing stage
    pub fn for_agent(agent: Arc<dyn MediaAgent>) -> Self {
        let kind: AgentKind = agent.kind();
        let capabilities = kind
            .profile()
            .capabilities
            .iter()
            .map(|c| c.to_string())
            .collect();
        Self::build(kind.id(), kind.as_str(), capabilities, Some(agent))
    }

    /// Coordinating node without a processing stage
    pub fn orchestrator() -> Self {
        Self::build(
            ORCHESTRATOR_ID,
            "orchestrator",
            vec!["coordination".to_string(), "scheduling".to_string()],
            None,
        )
    }

    /// Cap the endpoint's history (see `A2AEndpoint::with_history_limit`)
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.endpoint = self.endpoint.with_history_limit(limit);
        self
    }

    pub fn id(&self) -> &str {
        &self.shared.agent_id
    }

    /// Agent type label, `orchestrator` for the coordinator
    pub fn agent_type(&self) -> &str {
        &self.shared.agent_type
    }

    pub fn endpoint(&self) -> &A2AEndpoint {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut A2AEndpoint {
        &mut self.endpoint
    }

    /// Build a message from this node
    pub fn create_message(
        &self,
        to_agent: &str,
        action: &str,
        data: Value,
        priority: MessagePriority,
        requires_ack: bool,
    ) -> A2AMessage {
        self.endpoint
            .create_message(to_agent, action, data, priority, requires_ack, None)
    }

    /// Receive a message (see `A2AEndpoint::receive`)
    pub async fn receive(&mut self, message: &A2AMessage) -> Vec<A2AMessage> {
        self.endpoint.receive(message).await
    }

    pub fn stats(&self) -> EndpointStats {
        self.endpoint.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentError, VideoAgent};

    struct Exploding;

    #[async_trait]
    impl MediaAgent for Exploding {
        fn kind(&self) -> AgentKind {
            AgentKind::Audio
        }

        async fn process(&self, _ctx: &JobContext) -> Result<Value, AgentError> {
            Err(AgentError::Failed("codec missing".to_string()))
        }
    }

    fn process_request(to: &str) -> A2AMessage {
        AgentNode::orchestrator().create_message(
            to,
            "process",
            json!({
                "job_id": "job-7",
                "file_path": "/uploads/sample_video.mp4",
                "file_type": "video/mp4",
            }),
            MessagePriority::High,
            true,
        )
    }

    #[tokio::test]
    async fn test_process_replies_with_results() {
        let mut node = AgentNode::for_agent(Arc::new(VideoAgent));
        let out = node.receive(&process_request("video-agent")).await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].payload.action, "ack");
        let reply = &out[1];
        assert_eq!(reply.payload.action, "process_complete");
        assert_eq!(reply.payload.data["job_id"], "job-7");
        assert_eq!(reply.payload.data["results"]["resolution"], "4K Enhanced");
    }

    #[tokio::test]
    async fn test_status_counts_jobs() {
        let mut node = AgentNode::for_agent(Arc::new(VideoAgent));
        node.receive(&process_request("video-agent")).await;

        let status = AgentNode::orchestrator().create_message(
            "video-agent",
            "status",
            json!({ "request_type": "full_status" }),
            MessagePriority::Normal,
            false,
        );
        let out = node.receive(&status).await;
        let data = &out[0].payload.data;
        assert_eq!(out[0].payload.action, "status_response");
        assert_eq!(data["agent_type"], "video");
        assert_eq!(data["active_jobs"], 0);
        assert_eq!(data["total_jobs"], 1);
    }

    #[tokio::test]
    async fn test_cancel_then_process_fails() {
        let mut node = AgentNode::for_agent(Arc::new(VideoAgent));
        let cancel = AgentNode::orchestrator().create_message(
            "video-agent",
            "cancel",
            json!({ "job_id": "job-7" }),
            MessagePriority::Normal,
            false,
        );
        let out = node.receive(&cancel).await;
        assert_eq!(out[0].payload.action, "cancel_response");

        let out = node.receive(&process_request("video-agent")).await;
        assert_eq!(out.last().unwrap().payload.action, "error");
    }

    #[tokio::test]
    async fn test_agent_failure_becomes_error() {
        let mut node = AgentNode::for_agent(Arc::new(Exploding));
        let out = node.receive(&process_request("audio-agent")).await;
        let error = out.last().unwrap();
        assert_eq!(error.payload.action, "error");
        assert!(error.payload.data["error"]
            .as_str()
            .unwrap()
            .contains("codec missing"));
    }

    #[test]
    fn test_orchestrator_has_no_process_handler() {
        let node = AgentNode::orchestrator();
        assert!(!node
            .endpoint()
            .capabilities()
            .contains(&"process".to_string()));
        assert_eq!(node.stats().registered_handlers, 4);
    }

    #[tokio::test]
    async fn test_job_tracking_stays_bounded() {
        let mut node = AgentNode::for_agent(Arc::new(Exploding));
        let orchestrator = AgentNode::orchestrator();

        for i in 0..CANCELLED_JOB_LIMIT + 10 {
            let cancel = orchestrator.create_message(
                "audio-agent",
                "cancel",
                json!({ "job_id": format!("job-{}", i) }),
                MessagePriority::Normal,
                false,
            );
            node.receive(&cancel).await;
        }
        // A failed stage is no longer active
        node.receive(&process_request("audio-agent")).await;

        let jobs = node.shared.jobs.lock().unwrap();
        assert_eq!(jobs.cancelled.len(), CANCELLED_JOB_LIMIT);
        assert_eq!(jobs.cancelled.front().map(String::as_str), Some("job-10"));
        assert!(jobs.active.is_empty());
        assert_eq!(jobs.finished, 1);
    }
}
