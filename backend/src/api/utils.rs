//! Shared handler state and small helpers
//!
//! `AppContext` bundles everything a handler can touch. It is cheap to clone
//! and is the router's state.

use crate::agents::{media_type_for_path, AgentRegistry};
use crate::config::Config;
use crate::downloads::DownloadService;
use crate::error::AppError;
use crate::pipeline::PipelineManager;
use crate::protocol::{A2ANetwork, MessageBus};
use crate::state::{AppState, PipelineDb, ProcessingJob};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Longest accepted file name
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// State shared by every handler
#[derive(Clone)]
pub struct AppContext {
    /// Agents and jobs
    pub state: Arc<RwLock<AppState>>,
    /// Job queue and drain loop
    pub pipeline: PipelineManager,
    /// Endpoint network used for explicit A2A exchanges
    pub network: Arc<Mutex<A2ANetwork>>,
    /// Generated downloads
    pub downloads: DownloadService,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppContext {
    /// Wire up state, bus, pipeline, network and downloads
    ///
    /// Must be called inside a tokio runtime (see `PipelineManager::new`).
    pub fn new(config: Config, db: Option<PipelineDb>) -> Self {
        let state = Arc::new(RwLock::new(AppState::new()));
        let registry = AgentRegistry::default();

        let mut bus = MessageBus::new(config.pipeline.message_log_capacity);
        if let Some(db) = &db {
            bus = bus.with_persistence(db.clone());
        }

        let network = A2ANetwork::with_registry(&registry, bus.clone());
        let pipeline = PipelineManager::new(
            state.clone(),
            registry,
            bus,
            config.pipeline.clone(),
            db,
        );
        let downloads = DownloadService::new(
            config.persistence.downloads_dir(),
            config.downloads.clone(),
        );

        Self {
            state,
            pipeline,
            network: Arc::new(Mutex::new(network)),
            downloads,
            config: Arc::new(config),
        }
    }

    /// Reload jobs and the communication log saved by an earlier run
    pub async fn restore(&self, db: &PipelineDb) {
        match db.load_jobs().await {
            Ok(jobs) => {
                let count = self.pipeline.restore_jobs(jobs).await;
                info!("Loaded {} jobs from database", count);
            }
            Err(e) => warn!("Failed to load jobs: {}", e),
        }

        let bus = self.pipeline.bus();
        match db.recent_messages(bus.capacity()).await {
            Ok(mut messages) => {
                messages.reverse();
                let count = bus.restore(messages).await;
                info!("Loaded {} messages from database", count);
            }
            Err(e) => warn!("Failed to load messages: {}", e),
        }

        match db.config_value("demo_mode").await {
            Ok(Some(mode)) => info!(demo_mode = %mode, "System config loaded"),
            Ok(None) => {}
            Err(e) => warn!("Failed to read system config: {}", e),
        }
    }

    /// Clone of a job, or `JobNotFound`
    pub async fn job(&self, id: &str) -> Result<ProcessingJob, AppError> {
        self.state
            .read()
            .await
            .job(id)
            .cloned()
            .ok_or_else(|| AppError::JobNotFound(id.to_string()))
    }
}

/// Validate a submitted file name
///
/// # Returns
/// * `Ok(&str)` - The trimmed name
/// * `Err(AppError)` - Name is empty or too long
pub fn validate_file_name(name: &str) -> Result<&str, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(
            "File name cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(AppError::InvalidRequest(format!(
            "File name exceeds maximum length of {} characters",
            MAX_FILE_NAME_LENGTH
        )));
    }
    Ok(trimmed)
}

/// Use the given MIME type, or infer one from the file extension
pub fn resolve_file_type(file_name: &str, file_type: Option<&str>) -> String {
    match file_type.map(str::trim) {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => media_type_for_path(Path::new(file_name)).to_string(),
    }
}

/// Strip any directory components from a client-supplied file name
pub fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_name() {
        assert_eq!(validate_file_name("  clip.mp4 ").unwrap(), "clip.mp4");
        assert!(matches!(
            validate_file_name("   "),
            Err(AppError::InvalidRequest(_))
        ));
        assert!(validate_file_name(&"a".repeat(MAX_FILE_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_resolve_file_type() {
        assert_eq!(resolve_file_type("clip.mp4", Some("video/webm")), "video/webm");
        assert_eq!(resolve_file_type("clip.mp4", Some(" ")), "video/mp4");
        assert_eq!(resolve_file_type("song.mp3", None), "audio/mpeg");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name(r"C:\media\clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("clip.mp4"), "clip.mp4");
    }
}
