// State management module
// Agent profiles, the in-memory job store and the optional SQLite store

pub mod app_state;
pub mod config;
pub mod persistence;

pub use app_state::{
    Agent, AgentId, AgentStatus, AppState, FileSubmission, JobId, JobStatus, ProcessingJob,
};
pub use config::{agent_display_name, AgentKind, AgentProfile, PROCESSING_ORDER};
pub use persistence::{PersistenceError, PipelineDb};
