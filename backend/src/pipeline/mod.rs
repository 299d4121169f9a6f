//! Processing pipeline
//!
//! `PipelineManager` queues jobs and runs them through the agent chain one at a
//! time; `PipelineEvent` is what it reports while doing so.

pub mod events;
pub mod manager;

pub use events::PipelineEvent;
pub use manager::PipelineManager;
