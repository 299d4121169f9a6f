//! Pipeline events
//!
//! Everything observable about a job's progress is emitted as a `PipelineEvent`.
//! The WebSocket, the SSE stream and the desktop dashboard all consume the same
//! events; on the wire each one is `{"type": <name>, "data": <payload>}`.

use crate::protocol::A2AMessage;
use crate::state::{Agent, AgentStatus, ProcessingJob};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum PipelineEvent {
    /// A job entered the queue
    JobSubmitted(ProcessingJob),
    /// The drain loop picked up a job
    JobStarted(ProcessingJob),
    /// An agent card changed (status, progress or message)
    AgentProgress {
        job_id: String,
        agent_id: String,
        status: AgentStatus,
        progress: u8,
        job_progress: f32,
        message: String,
    },
    /// An agent stored its result on the job
    AgentCompleted {
        job_id: String,
        agent_id: String,
        results: Value,
    },
    /// Every stage finished
    JobCompleted(ProcessingJob),
    /// A stage failed; the job is in `error`
    JobError {
        job_id: String,
        agent_id: Option<String>,
        error: String,
    },
    /// A client cancelled the job
    JobCancelled { job_id: String },
    /// A message passed through the communication log
    #[serde(rename = "a2a_message")]
    A2aMessage(A2AMessage),
    /// Agents returned to idle after a job
    AgentsReset { agents: Vec<Agent> },
}

impl PipelineEvent {
    /// Wire name of the event
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::JobSubmitted(_) => "job_submitted",
            PipelineEvent::JobStarted(_) => "job_started",
            PipelineEvent::AgentProgress { .. } => "agent_progress",
            PipelineEvent::AgentCompleted { .. } => "agent_completed",
            PipelineEvent::JobCompleted(_) => "job_completed",
            PipelineEvent::JobError { .. } => "job_error",
            PipelineEvent::JobCancelled { .. } => "job_cancelled",
            PipelineEvent::A2aMessage(_) => "a2a_message",
            PipelineEvent::AgentsReset { .. } => "agents_reset",
        }
    }

    /// Job this event concerns, if any
    pub fn job_id(&self) -> Option<&str> {
        match self {
            PipelineEvent::JobSubmitted(job)
            | PipelineEvent::JobStarted(job)
            | PipelineEvent::JobCompleted(job) => Some(&job.id),
            PipelineEvent::AgentProgress { job_id, .. }
            | PipelineEvent::AgentCompleted { job_id, .. }
            | PipelineEvent::JobError { job_id, .. }
            | PipelineEvent::JobCancelled { job_id } => Some(job_id),
            PipelineEvent::A2aMessage(message) => message.job_id(),
            PipelineEvent::AgentsReset { .. } => None,
        }
    }

    /// Whether this is the last event a job produces
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::JobCompleted(_)
                | PipelineEvent::JobError { .. }
                | PipelineEvent::JobCancelled { .. }
        )
    }
}
