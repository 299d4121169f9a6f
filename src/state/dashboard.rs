// Dashboard view state
// Agents, jobs, the communication log and generated downloads, as the UI sees them

use media_suite_backend::downloads::DownloadItem;
use media_suite_backend::pipeline::PipelineEvent;
use media_suite_backend::protocol::A2AMessage;
use media_suite_backend::state::{Agent, AgentStatus, JobId, JobStatus, ProcessingJob};
use std::collections::VecDeque;

/// Number of messages kept in the communication log
pub const MESSAGE_LOG_LIMIT: usize = 50;

/// Dashboard tabs, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Dashboard,
    Upload,
    Pipeline,
    Communication,
    Results,
    Downloads,
}

impl Tab {
    /// Every tab, in display order
    pub const ALL: [Tab; 6] = [
        Tab::Dashboard,
        Tab::Upload,
        Tab::Pipeline,
        Tab::Communication,
        Tab::Results,
        Tab::Downloads,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Upload => "Upload & Process",
            Tab::Pipeline => "Pipeline",
            Tab::Communication => "Communication",
            Tab::Results => "Results",
            Tab::Downloads => "Downloads",
        }
    }
}

/// Main view state
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    /// Agent cards in processing order
    pub agents: Vec<Agent>,
    /// Jobs, newest first
    pub jobs: Vec<ProcessingJob>,
    /// Communication log, newest first
    pub messages: VecDeque<A2AMessage>,
    /// Downloads generated in this session, newest first
    pub downloads: Vec<DownloadItem>,
    /// Job shown on the Results and Downloads tabs
    pub selected_job_id: Option<JobId>,
    /// Active tab
    pub active_tab: Tab,
    /// Path typed into the Upload tab
    pub upload_path: String,
    /// Last error to show in the footer
    pub last_error: Option<String>,
}

impl DashboardState {
    /// Create state from a snapshot of the pipeline
    pub fn new(agents: Vec<Agent>, jobs: Vec<ProcessingJob>) -> Self {
        let selected_job_id = jobs.first().map(|job| job.id.clone());
        Self {
            agents,
            jobs,
            selected_job_id,
            ..Self::default()
        }
    }

    /// Seed the communication log, newest first
    pub fn with_messages(mut self, messages: Vec<A2AMessage>) -> Self {
        self.messages = messages.into_iter().take(MESSAGE_LOG_LIMIT).collect();
        self
    }

    /// Fold one pipeline event into the view
    pub fn apply_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::JobSubmitted(job) => {
                if self.selected_job_id.is_none() {
                    self.selected_job_id = Some(job.id.clone());
                }
                self.upsert_job(job);
            }
            PipelineEvent::JobStarted(job) | PipelineEvent::JobCompleted(job) => {
                self.upsert_job(job)
            }
            PipelineEvent::AgentProgress {
                job_id,
                agent_id,
                status,
                progress,
                job_progress,
                message,
            } => {
                if let Some(agent) = self.agents.iter_mut().find(|a| a.id == agent_id) {
                    agent.status = status;
                    agent.progress = progress;
                    agent.last_message = message;
                    agent.current_job = Some(job_id.clone());
                }
                if let Some(job) = self.job_mut(&job_id) {
                    job.progress = job_progress;
                }
            }
            PipelineEvent::AgentCompleted {
                job_id,
                agent_id,
                results,
            } => {
                if let Some(job) = self.job_mut(&job_id) {
                    job.results.insert(agent_id, results);
                }
            }
            PipelineEvent::JobError {
                job_id,
                agent_id,
                error,
            } => {
                if let Some(agent_id) = agent_id {
                    if let Some(agent) = self.agents.iter_mut().find(|a| a.id == agent_id) {
                        agent.status = AgentStatus::Error;
                        agent.last_message = error.clone();
                    }
                }
                if let Some(job) = self.job_mut(&job_id) {
                    job.status = JobStatus::Error;
                    job.error_message = Some(error);
                }
            }
            PipelineEvent::JobCancelled { job_id } => {
                if let Some(job) = self.job_mut(&job_id) {
                    job.status = JobStatus::Cancelled;
                }
            }
            PipelineEvent::A2aMessage(message) => self.push_message(message),
            PipelineEvent::AgentsReset { agents } => self.agents = agents,
        }
    }

    /// Add a message to the front of the log, dropping the oldest past the limit
    pub fn push_message(&mut self, message: A2AMessage) {
        self.messages.push_front(message);
        self.messages.truncate(MESSAGE_LOG_LIMIT);
    }

    /// Record a generated download
    pub fn add_download(&mut self, item: DownloadItem) {
        self.downloads.retain(|d| d.id != item.id);
        self.downloads.insert(0, item);
    }

    fn upsert_job(&mut self, job: ProcessingJob) {
        match self.job_mut(&job.id) {
            Some(existing) => *existing = job,
            None => self.jobs.insert(0, job),
        }
    }

    fn job_mut(&mut self, id: &str) -> Option<&mut ProcessingJob> {
        self.jobs.iter_mut().find(|job| job.id == id)
    }

    pub fn job(&self, id: &str) -> Option<&ProcessingJob> {
        self.jobs.iter().find(|job| job.id == id)
    }

    /// The job selected for Results and Downloads
    pub fn selected_job(&self) -> Option<&ProcessingJob> {
        self.selected_job_id.as_deref().and_then(|id| self.job(id))
    }

    /// The job currently being processed, if any
    pub fn active_job(&self) -> Option<&ProcessingJob> {
        self.jobs
            .iter()
            .find(|job| job.status == JobStatus::Processing)
    }

    /// Number of jobs in the given status
    pub fn count_jobs(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }
}
