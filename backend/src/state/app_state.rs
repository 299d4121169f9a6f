// Application state management
// Contains the agent registry view, the job store and job ordering

use crate::state::config::{AgentKind, PROCESSING_ORDER};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for an agent
pub type AgentId = String;

/// Unique identifier for a job
pub type JobId = String;

/// Agent status enumeration
/// Represents the current lifecycle state of an agent card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Agent is waiting for work
    Idle,
    /// Agent is processing a job stage
    Processing,
    /// Agent finished its stage of the current job
    Completed,
    /// Agent stage failed
    Error,
}

/// Agent structure
/// Represents one simulated processing stage and its live state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Unique identifier for the agent
    pub id: AgentId,
    /// Display name of the agent
    pub name: String,
    /// Kind of processing stage
    #[serde(rename = "type")]
    pub kind: AgentKind,
    /// Current status of the agent
    pub status: AgentStatus,
    /// Stage progress (0..=100)
    pub progress: u8,
    /// Last status line shown on the dashboard
    pub last_message: String,
    /// Capability labels
    pub capabilities: Vec<String>,
    /// Job currently being processed, if any
    pub current_job: Option<JobId>,
}

impl Agent {
    /// Create an idle agent for the given kind using its static profile
    pub fn new(kind: AgentKind) -> Self {
        let profile = kind.profile();
        Self {
            id: profile.id.to_string(),
            name: profile.name.to_string(),
            kind,
            status: AgentStatus::Idle,
            progress: 0,
            last_message: profile.ready_message.to_string(),
            capabilities: profile.capabilities.iter().map(|c| c.to_string()).collect(),
            current_job: None,
        }
    }
}

/// Job status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting in the FIFO queue
    Queued,
    /// Being processed by the agent chain
    Processing,
    /// All stages finished
    Completed,
    /// A stage failed
    Error,
    /// Cancelled by a client
    Cancelled,
}

impl JobStatus {
    /// Whether the job can no longer change status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }

    /// Lowercase label, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the lowercase label
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "error" => Some(JobStatus::Error),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

/// A file handed to the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileSubmission {
    /// Original file name
    pub file_name: String,
    /// MIME type (e.g. `video/mp4`)
    pub file_type: String,
    /// Size in bytes, when known
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Stored location of the uploaded bytes, when uploaded
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

/// One uploaded file's progress through the agent chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingJob {
    /// Unique identifier for the job
    pub id: JobId,
    /// Original file name
    pub file_name: String,
    /// MIME type of the input
    pub file_type: String,
    /// Size in bytes, when known
    pub file_size: Option<u64>,
    /// Stored location of the uploaded bytes
    pub file_path: Option<PathBuf>,
    /// Current status
    pub status: JobStatus,
    /// Overall progress (0..=100)
    pub progress: f32,
    /// Agent identifiers in processing order
    pub agents: Vec<AgentId>,
    /// Per-agent result payloads, in processing order
    pub results: Map<String, Value>,
    /// When the job was submitted
    pub created_at: DateTime<Utc>,
    /// When processing started
    pub started_at: Option<DateTime<Utc>>,
    /// When processing finished
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure description for jobs in `error`
    pub error_message: Option<String>,
}

impl ProcessingJob {
    /// Create a queued job for a submission
    pub fn new(submission: FileSubmission) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: submission.file_name,
            file_type: submission.file_type,
            file_size: submission.file_size,
            file_path: submission.file_path,
            status: JobStatus::Queued,
            progress: 0.0,
            agents: PROCESSING_ORDER.iter().map(|k| k.id().to_string()).collect(),
            results: Map::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// File name without its final extension
    pub fn file_stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file_name,
        }
    }
}

/// Main application state
/// Holds the live agent cards and every job known to this process
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live agent cards (id -> Agent)
    pub agents: HashMap<AgentId, Agent>,
    /// Job store (id -> job)
    jobs: HashMap<JobId, ProcessingJob>,
    /// Job ids in submission order
    job_order: Vec<JobId>,
}

impl Default for AppState {
    fn default() -> Self {
        let agents = PROCESSING_ORDER
            .iter()
            .map(|kind| (kind.id().to_string(), Agent::new(*kind)))
            .collect();
        Self {
            agents,
            jobs: HashMap::new(),
            job_order: Vec::new(),
        }
    }
}

impl AppState {
    /// Create a new application state seeded with the four default agents
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all agents in processing order
    pub fn agents_list(&self) -> Vec<&Agent> {
        PROCESSING_ORDER
            .iter()
            .filter_map(|kind| self.agents.get(kind.id()))
            .collect()
    }

    /// Get an agent by ID
    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Update an agent's live status
    /// Returns true if the agent was found and updated
    pub fn update_agent(
        &mut self,
        id: &str,
        status: AgentStatus,
        progress: u8,
        message: impl Into<String>,
        current_job: Option<JobId>,
    ) -> bool {
        if let Some(agent) = self.agents.get_mut(id) {
            agent.status = status;
            agent.progress = progress.min(100);
            agent.last_message = message.into();
            agent.current_job = current_job;
            true
        } else {
            false
        }
    }

    /// Return every agent to idle
    pub fn reset_agents(&mut self) {
        for agent in self.agents.values_mut() {
            agent.status = AgentStatus::Idle;
            agent.progress = 0;
            agent.last_message = "Ready for next task".to_string();
            agent.current_job = None;
        }
    }

    /// Return to idle only the agents still attached to `job_id`
    /// Returns the number of agents reset
    pub fn reset_agents_for_job(&mut self, job_id: &str) -> usize {
        let mut reset = 0;
        for agent in self.agents.values_mut() {
            if agent.current_job.as_deref() == Some(job_id) {
                agent.status = AgentStatus::Idle;
                agent.progress = 0;
                agent.last_message = "Ready for next task".to_string();
                agent.current_job = None;
                reset += 1;
            }
        }
        reset
    }

    /// Create and store a queued job
    pub fn create_job(&mut self, submission: FileSubmission) -> ProcessingJob {
        let job = ProcessingJob::new(submission);
        self.insert_job(job.clone());
        job
    }

    /// Store an existing job (e.g. loaded from the database)
    /// Returns false if a job with the same ID already exists
    pub fn insert_job(&mut self, job: ProcessingJob) -> bool {
        if self.jobs.contains_key(&job.id) {
            return false;
        }
        self.job_order.push(job.id.clone());
        self.jobs.insert(job.id.clone(), job);
        true
    }

    /// Get a job by ID
    pub fn job(&self, id: &str) -> Option<&ProcessingJob> {
        self.jobs.get(id)
    }

    /// Get all jobs, newest first
    pub fn jobs_list(&self) -> Vec<&ProcessingJob> {
        self.job_order
            .iter()
            .rev()
            .filter_map(|id| self.jobs.get(id))
            .collect()
    }

    /// Get the number of jobs in the store
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Move a job to a new status
    ///
    /// Terminal jobs never change status again. Entering `processing` stamps
    /// `started_at`; entering `completed` stamps `completed_at` and pins progress to 100.
    /// Returns true if the transition was applied.
    pub fn set_job_status(&mut self, id: &str, status: JobStatus) -> bool {
        let Some(job) = self.jobs.get_mut(id) else {
            return false;
        };
        if job.status.is_terminal() {
            return false;
        }
        job.status = status;
        let now = Utc::now();
        match status {
            JobStatus::Processing => job.started_at = Some(now),
            JobStatus::Completed => {
                job.progress = 100.0;
                job.completed_at = Some(now);
            }
            JobStatus::Error | JobStatus::Cancelled => job.completed_at = Some(now),
            JobStatus::Queued => {}
        }
        true
    }

    /// Mark a job as failed with a message
    pub fn fail_job(&mut self, id: &str, message: impl Into<String>) -> bool {
        if self.set_job_status(id, JobStatus::Error) {
            if let Some(job) = self.jobs.get_mut(id) {
                job.error_message = Some(message.into());
            }
            true
        } else {
            false
        }
    }

    /// Raise a processing job's progress; lower values are ignored
    pub fn update_job_progress(&mut self, id: &str, progress: f32) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if job.status == JobStatus::Processing && progress > job.progress => {
                job.progress = progress.min(100.0);
                true
            }
            _ => false,
        }
    }

    /// Store an agent's result payload on a job
    ///
    /// Finished jobs are left untouched; returns false for them and for
    /// unknown ids.
    pub fn record_result(&mut self, id: &str, agent_id: &str, result: Value) -> bool {
        match self.jobs.get_mut(id) {
            Some(job) if !job.status.is_terminal() => {
                job.results.insert(agent_id.to_string(), result);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(name: &str) -> FileSubmission {
        FileSubmission {
            file_name: name.to_string(),
            file_type: "video/mp4".to_string(),
            file_size: Some(1024),
            file_path: None,
        }
    }

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new();
        assert_eq!(state.agents.len(), 4);
        assert_eq!(state.job_count(), 0);
        assert!(state
            .agents_list()
            .iter()
            .all(|a| a.status == AgentStatus::Idle));
    }

    #[test]
    fn test_agents_list_in_processing_order() {
        let state = AppState::new();
        let ids: Vec<_> = state.agents_list().iter().map(|a| a.id.clone()).collect();
        assert_eq!(
            ids,
            vec!["metadata-agent", "video-agent", "audio-agent", "storyboard-agent"]
        );
    }

    #[test]
    fn test_create_job_is_queued() {
        let mut state = AppState::new();
        let job = state.create_job(submission("clip.mp4"));
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0.0);
        assert_eq!(job.agents.len(), 4);
        assert_eq!(state.job(&job.id), Some(&job));
    }

    #[test]
    fn test_jobs_list_newest_first() {
        let mut state = AppState::new();
        let first = state.create_job(submission("a.mp4"));
        let second = state.create_job(submission("b.mp4"));
        let listed: Vec<_> = state.jobs_list().iter().map(|j| j.id.clone()).collect();
        assert_eq!(listed, vec![second.id, first.id]);
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut state = AppState::new();
        let job = state.create_job(submission("clip.mp4"));
        assert!(state.set_job_status(&job.id, JobStatus::Processing));
        assert!(state.set_job_status(&job.id, JobStatus::Completed));
        assert!(!state.set_job_status(&job.id, JobStatus::Error));
        let stored = state.job(&job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.progress, 100.0);
        assert!(stored.completed_at.is_some());
    }

    #[test]
    fn test_record_result_refuses_finished_jobs() {
        let mut state = AppState::new();
        let job = state.create_job(submission("clip.mp4"));
        state.set_job_status(&job.id, JobStatus::Processing);
        assert!(state.record_result(&job.id, "metadata-agent", json!({ "tags": [] })));

        state.set_job_status(&job.id, JobStatus::Cancelled);
        assert!(!state.record_result(&job.id, "video-agent", json!({ "scenes_detected": 9 })));
        assert!(!state.record_result("missing", "video-agent", json!({})));

        let stored = state.job(&job.id).unwrap();
        let keys: Vec<_> = stored.results.keys().cloned().collect();
        assert_eq!(keys, vec!["metadata-agent"]);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut state = AppState::new();
        let job = state.create_job(submission("clip.mp4"));
        // Not processing yet
        assert!(!state.update_job_progress(&job.id, 10.0));
        state.set_job_status(&job.id, JobStatus::Processing);
        assert!(state.update_job_progress(&job.id, 30.0));
        assert!(!state.update_job_progress(&job.id, 20.0));
        assert_eq!(state.job(&job.id).unwrap().progress, 30.0);
    }

    #[test]
    fn test_fail_job_records_message() {
        let mut state = AppState::new();
        let job = state.create_job(submission("clip.mp4"));
        state.set_job_status(&job.id, JobStatus::Processing);
        assert!(state.fail_job(&job.id, "video stage timed out"));
        let stored = state.job(&job.id).unwrap();
        assert_eq!(stored.status, JobStatus::Error);
        assert_eq!(stored.error_message.as_deref(), Some("video stage timed out"));
    }

    #[test]
    fn test_record_result_keeps_order() {
        let mut state = AppState::new();
        let job = state.create_job(submission("clip.mp4"));
        state.record_result(&job.id, "metadata-agent", json!({"tags": []}));
        state.record_result(&job.id, "video-agent", json!({"scenes_detected": 9}));
        let keys: Vec<_> = state.job(&job.id).unwrap().results.keys().cloned().collect();
        assert_eq!(keys, vec!["metadata-agent", "video-agent"]);
    }

    #[test]
    fn test_update_and_reset_agents() {
        let mut state = AppState::new();
        assert!(state.update_agent(
            "video-agent",
            AgentStatus::Processing,
            140,
            "Processing clip.mp4",
            Some("job-1".to_string()),
        ));
        let agent = state.agent("video-agent").unwrap();
        assert_eq!(agent.progress, 100);
        assert_eq!(agent.current_job.as_deref(), Some("job-1"));
        assert!(!state.update_agent("ghost", AgentStatus::Idle, 0, "", None));

        state.reset_agents();
        let agent = state.agent("video-agent").unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
        assert_eq!(agent.last_message, "Ready for next task");
    }

    #[test]
    fn test_reset_agents_for_job_leaves_other_jobs() {
        let mut state = AppState::new();
        state.update_agent(
            "metadata-agent",
            AgentStatus::Completed,
            100,
            "done",
            Some("old".to_string()),
        );
        state.update_agent(
            "video-agent",
            AgentStatus::Processing,
            40,
            "busy",
            Some("new".to_string()),
        );

        assert_eq!(state.reset_agents_for_job("old"), 1);
        assert_eq!(state.agent("metadata-agent").unwrap().status, AgentStatus::Idle);
        assert_eq!(
            state.agent("video-agent").unwrap().status,
            AgentStatus::Processing
        );
    }

    #[test]
    fn test_file_stem() {
        let mut job = ProcessingJob::new(submission("holiday.final.mp4"));
        assert_eq!(job.file_stem(), "holiday.final");
        job.file_name = "README".to_string();
        assert_eq!(job.file_stem(), "README");
    }

    #[test]
    fn test_job_serializes_camel_case() {
        let job = ProcessingJob::new(submission("clip.mp4"));
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["fileName"], "clip.mp4");
        assert_eq!(value["status"], "queued");
    }
}
