//! Simulated processing agents
//!
//! Each agent turns a job into a randomized result payload. Nothing here touches
//! the media itself; the payloads only look like the output of real processing.
//!
//! - `MediaAgent`: the async trait every stage implements
//! - `AgentRegistry`: the ordered set of stages the pipeline runs
//! - `SummaryProvider`: pluggable text summary for the metadata stage

pub mod audio;
pub mod metadata;
pub mod registry;
pub mod storyboard;
pub mod summary;
pub mod video;

pub use audio::AudioAgent;
pub use metadata::MetadataAgent;
pub use registry::AgentRegistry;
pub use storyboard::StoryboardAgent;
pub use summary::{SummaryProvider, TemplateSummary};
pub use video::VideoAgent;

use crate::state::{AgentKind, ProcessingJob};
use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while an agent processes a job
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// The stage exceeded its time budget
    #[error("Agent stage timed out after {0} seconds")]
    Timeout(u64),

    /// The job was cancelled while the stage was pending
    #[error("Job was cancelled")]
    Cancelled,

    /// The stage failed
    #[error("Agent failed: {0}")]
    Failed(String),
}

/// Coarse media category derived from a MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaClass {
    /// `video/*`
    Video,
    /// `audio/*`
    Audio,
    /// Images and anything unrecognised
    Image,
}

impl MediaClass {
    /// Classify a MIME type; anything that is neither video nor audio counts as image
    pub fn from_mime(mime: &str) -> Self {
        if mime.contains("video") {
            MediaClass::Video
        } else if mime.contains("audio") {
            MediaClass::Audio
        } else {
            MediaClass::Image
        }
    }

    /// Lowercase label used in tags
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaClass::Video => "video",
            MediaClass::Audio => "audio",
            MediaClass::Image => "image",
        }
    }

    /// Whether the input carries an audio track
    pub fn has_audio(&self) -> bool {
        matches!(self, MediaClass::Video | MediaClass::Audio)
    }
}

/// Guess a MIME type from a file extension
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// What an agent is told about the job it processes
#[derive(Debug, Clone, PartialEq)]
pub struct JobContext {
    /// Job being processed
    pub job_id: String,
    /// Original file name
    pub file_name: String,
    /// MIME type of the input
    pub file_type: String,
    /// Stored upload, when the bytes are on disk
    pub file_path: Option<PathBuf>,
}

impl JobContext {
    /// Build a context from a stored job
    pub fn from_job(job: &ProcessingJob) -> Self {
        Self {
            job_id: job.id.clone(),
            file_name: job.file_name.clone(),
            file_type: job.file_type.clone(),
            file_path: job.file_path.clone(),
        }
    }

    /// Media category of the input
    pub fn media_class(&self) -> MediaClass {
        MediaClass::from_mime(&self.file_type)
    }
}

/// A simulated processing stage
#[async_trait]
pub trait MediaAgent: Send + Sync {
    /// Which stage this agent implements
    fn kind(&self) -> AgentKind;

    /// Stable identifier, e.g. `video-agent`
    fn id(&self) -> &'static str {
        self.kind().id()
    }

    /// Produce this stage's result payload for a job
    async fn process(&self, ctx: &JobContext) -> Result<Value, AgentError>;
}

/// Random duration label like `2.41s`, drawn from `base..base + span`
pub(crate) fn seconds_label<R: Rng + ?Sized>(rng: &mut R, base: f64, span: f64) -> String {
    format!("{:.2}s", rng.gen_range(base..base + span))
}
