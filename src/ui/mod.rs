// UI module
// Layout, tabs and reusable components

pub mod components;
pub mod layout;
pub mod tabs;

pub use components::ActivityLog;
pub use layout::render_app_layout;

use media_suite_backend::downloads::DownloadFormat;
use media_suite_backend::state::JobId;

/// Requests the UI makes of the pipeline, handled after the frame is drawn
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    /// Submit the file at this path
    SubmitPath(String),
    /// Cancel a queued or processing job
    CancelJob(JobId),
    /// Generate a download for a job
    GenerateDownload { job_id: JobId, format: DownloadFormat },
    /// Reload agents and jobs from the pipeline
    Refresh,
}
