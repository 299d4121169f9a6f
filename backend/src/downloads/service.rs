//! Download lifecycle service
//!
//! Generates files into the downloads directory, tracks their progress and
//! download counts, and sweeps them once they expire.

use super::formats::{self, ExportContext};
use super::media;
use super::validate::{validate_file_exists, OutputValidator};
use super::{download_options, DownloadFormat, DownloadRequest, ExportError};
use crate::config::DownloadConfig;
use crate::error::AppError;
use crate::state::ProcessingJob;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// Lifecycle of a generated download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    /// Being generated
    Preparing,
    /// On disk and never fetched
    Ready,
    /// Being streamed to a client
    Downloading,
    /// Fetched at least once
    Completed,
    /// Generation failed
    Error,
    /// Past its expiry time; the file is gone
    Expired,
}

/// A generated (or generating) download
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadItem {
    /// Unique identifier, also the on-disk file stem
    pub id: String,
    /// Job the download was generated from
    pub job_id: String,
    /// Name offered to the client
    pub file_name: String,
    /// Generated format
    pub format: DownloadFormat,
    /// Lifecycle state
    pub status: DownloadStatus,
    /// Generation progress (0..=100)
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    /// After this the file is swept
    pub expires_at: DateTime<Utc>,
    /// Location in the downloads directory once written
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
    /// Size in bytes
    pub file_size: u64,
    /// Human readable size, e.g. "1.5 KB"
    pub file_size_label: String,
    /// Number of completed fetches
    pub download_count: u32,
    /// Failure description for items in `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DownloadItem {
    fn new(job: &ProcessingJob, format: DownloadFormat, expiry: chrono::Duration) -> Self {
        let created_at = Utc::now();
        let suffix = if format.is_media() {
            format.as_str()
        } else {
            "results"
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job_id: job.id.clone(),
            file_name: format!("{}_{}.{}", job.file_stem(), suffix, format.extension()),
            format,
            status: DownloadStatus::Preparing,
            progress: 0,
            created_at,
            // An expiry past the end of the calendar never expires
            expires_at: created_at
                .checked_add_signed(expiry)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            file_path: None,
            file_size: 0,
            file_size_label: format_file_size(0),
            download_count: 0,
            error_message: None,
        }
    }

    /// True once `now` has passed the expiry time
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == DownloadStatus::Expired || now > self.expires_at
    }

    fn is_available(&self) -> bool {
        matches!(
            self.status,
            DownloadStatus::Ready | DownloadStatus::Downloading | DownloadStatus::Completed
        )
    }
}

/// Human-readable size: `512 B`, `1.5 KB`, `2.0 MB`, `1.1 GB`
pub fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = bytes as f64;
    if size < KB {
        format!("{} B", bytes)
    } else if size < MB {
        format!("{:.1} KB", size / KB)
    } else if size < GB {
        format!("{:.1} MB", size / MB)
    } else {
        format!("{:.1} GB", size / GB)
    }
}

/// Render the bytes of a download
fn render(format: DownloadFormat, ctx: &ExportContext<'_>) -> Result<Vec<u8>, ExportError> {
    Ok(match format {
        DownloadFormat::Json => formats::to_json(ctx)?.into_bytes(),
        DownloadFormat::Csv => formats::to_csv(ctx)?.into_bytes(),
        DownloadFormat::Xml => formats::to_xml(ctx)?.into_bytes(),
        DownloadFormat::Report => formats::to_report(ctx).into_bytes(),
        DownloadFormat::Zip => formats::to_zip(ctx)?,
        DownloadFormat::EnhancedVideo => media::placeholder_mp4(),
        DownloadFormat::EnhancedAudio => media::sine_wav(media::DEFAULT_AUDIO_SECONDS)?,
        DownloadFormat::EnhancedImage => media::gradient_png()?,
        DownloadFormat::Storyboard => media::storyboard_png()?,
    })
}

/// Generates and tracks downloads
#[derive(Clone)]
pub struct DownloadService {
    dir: PathBuf,
    config: DownloadConfig,
    validator: OutputValidator,
    items: Arc<RwLock<HashMap<String, DownloadItem>>>,
}

impl DownloadService {
    pub fn new(dir: impl Into<PathBuf>, config: DownloadConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
            validator: OutputValidator::default(),
            items: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_validator(mut self, validator: OutputValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Directory generated files are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn set_progress(&self, id: &str, progress: u8) {
        if let Some(item) = self.items.write().await.get_mut(id) {
            item.progress = progress;
        }
        tracing::debug!(download_id = %id, progress, "Download progress");
        if !self.config.stage_delay.is_zero() {
            tokio::time::sleep(self.config.stage_delay).await;
        }
    }

    /// Generate a download for a job
    ///
    /// # Arguments
    /// * `job` - Job whose results are exported
    /// * `request` - Format, metadata flag and optional agent filter
    ///
    /// # Returns
    /// * `Ok(DownloadItem)` - The ready download
    /// * `Err(AppError)` - The format is not offered for this job, or generation failed
    pub async fn generate(
        &self,
        job: &ProcessingJob,
        request: &DownloadRequest,
    ) -> Result<DownloadItem, AppError> {
        let offered = download_options(job)
            .iter()
            .any(|option| option.format == request.format);
        if !offered {
            return Err(AppError::UnsupportedFormat(format!(
                "{} is not available for {}",
                request.format, job.file_name
            )));
        }

        let item = DownloadItem::new(job, request.format, self.config.expiry);
        let id = item.id.clone();
        self.items.write().await.insert(id.clone(), item.clone());

        match self.write_download(job, request, &item).await {
            Ok((path, size)) => {
                let mut items = self.items.write().await;
                let entry = items
                    .get_mut(&id)
                    .ok_or_else(|| AppError::DownloadNotFound(id.clone()))?;
                entry.file_path = Some(path);
                entry.file_size = size;
                entry.file_size_label = format_file_size(size);
                entry.status = DownloadStatus::Ready;
                entry.progress = 100;
                tracing::info!(
                    download_id = %id,
                    job_id = %job.id,
                    format = %request.format,
                    size = %entry.file_size_label,
                    "Download ready"
                );
                Ok(entry.clone())
            }
            Err(error) => {
                tracing::error!(download_id = %id, job_id = %job.id, error = %error, "Download generation failed");
                if let Some(entry) = self.items.write().await.get_mut(&id) {
                    entry.status = DownloadStatus::Error;
                    entry.error_message = Some(error.to_string());
                }
                Err(error.into())
            }
        }
    }

    async fn write_download(
        &self,
        job: &ProcessingJob,
        request: &DownloadRequest,
        item: &DownloadItem,
    ) -> Result<(PathBuf, u64), ExportError> {
        self.set_progress(&item.id, 10).await;
        let ctx = ExportContext::new(
            job,
            request.include_metadata,
            request.selected_agents.as_deref(),
            item.created_at,
        );

        self.set_progress(&item.id, 30).await;
        let bytes = render(request.format, &ctx)?;

        self.set_progress(&item.id, 70).await;
        fs::create_dir_all(&self.dir).await?;
        let path = self
            .dir
            .join(format!("{}.{}", item.id, request.format.extension()));
        fs::write(&path, &bytes).await?;

        let valid = match request.format {
            DownloadFormat::EnhancedVideo => self.validator.validate_video_output(&path),
            DownloadFormat::EnhancedImage | DownloadFormat::Storyboard => {
                self.validator.validate_storyboard_image(&path)
            }
            _ => validate_file_exists(&path, 0),
        };
        if !valid {
            return Err(ExportError::Validation(format!(
                "{} output failed validation",
                request.format
            )));
        }

        Ok((path, bytes.len() as u64))
    }

    /// All downloads, newest first
    pub async fn list(&self) -> Vec<DownloadItem> {
        let mut items: Vec<DownloadItem> = self.items.read().await.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub async fn get(&self, id: &str) -> Option<DownloadItem> {
        self.items.read().await.get(id).cloned()
    }

    /// Record a completed download
    pub async fn mark_downloaded(&self, id: &str) -> Result<DownloadItem, AppError> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(id)
            .ok_or_else(|| AppError::DownloadNotFound(id.to_string()))?;
        item.status = DownloadStatus::Completed;
        item.download_count += 1;
        tracing::info!(download_id = %id, count = item.download_count, "Download completed");
        Ok(item.clone())
    }

    /// Read a download's bytes
    ///
    /// Fails when the download is unknown, not yet ready, or expired.
    pub async fn read_file(&self, id: &str) -> Result<(DownloadItem, Vec<u8>), AppError> {
        let item = {
            let mut items = self.items.write().await;
            let item = items
                .get_mut(id)
                .ok_or_else(|| AppError::DownloadNotFound(id.to_string()))?;
            if item.is_expired(Utc::now()) {
                item.status = DownloadStatus::Expired;
                return Err(AppError::DownloadExpired(id.to_string()));
            }
            if !item.is_available() {
                return Err(AppError::InvalidRequest(format!(
                    "Download {} is not ready",
                    id
                )));
            }
            item.status = DownloadStatus::Downloading;
            item.clone()
        };

        let path = item
            .file_path
            .clone()
            .ok_or_else(|| AppError::DownloadNotFound(id.to_string()))?;
        let bytes = fs::read(&path)
            .await
            .map_err(|e| AppError::Export(ExportError::Io(e)))?;
        Ok((item, bytes))
    }

    /// Delete every download that expired before `now`
    ///
    /// # Returns
    /// Number of downloads removed
    pub async fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<DownloadItem> = {
            let mut items = self.items.write().await;
            let ids: Vec<String> = items
                .values()
                .filter(|item| item.is_expired(now))
                .map(|item| item.id.clone())
                .collect();
            ids.iter().filter_map(|id| items.remove(id)).collect()
        };

        for item in &expired {
            if let Some(path) = &item.file_path {
                match fs::remove_file(path).await {
                    Ok(()) => {
                        tracing::debug!(download_id = %item.id, file = %item.file_name, "Deleted expired download")
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        tracing::warn!(download_id = %item.id, error = %e, "Failed to delete expired download")
                    }
                }
            }
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Cleaned up expired downloads");
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FileSubmission, JobStatus};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn immediate_config() -> DownloadConfig {
        DownloadConfig {
            stage_delay: Duration::ZERO,
            ..DownloadConfig::default()
        }
    }

    fn completed_job(file_name: &str, file_type: &str) -> ProcessingJob {
        let mut job = ProcessingJob::new(FileSubmission {
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
            file_size: Some(2048),
            file_path: None,
        });
        job.status = JobStatus::Completed;
        job.progress = 100.0;
        job.results
            .insert("video-agent".to_string(), json!({ "scenes_detected": 12 }));
        job.results
            .insert("storyboard-agent".to_string(), json!({ "key_frames": 24 }));
        job
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[tokio::test]
    async fn test_generate_data_download() {
        let dir = TempDir::new().unwrap();
        let service = DownloadService::new(dir.path(), immediate_config());
        let job = completed_job("holiday.clip.mp4", "video/mp4");

        let item = service
            .generate(&job, &DownloadRequest::new(DownloadFormat::Csv))
            .await
            .unwrap();

        assert_eq!(item.status, DownloadStatus::Ready);
        assert_eq!(item.progress, 100);
        assert_eq!(item.file_name, "holiday.clip_results.csv");
        assert_eq!(item.expires_at - item.created_at, chrono::Duration::hours(24));

        let path = item.file_path.clone().unwrap();
        assert_eq!(path, dir.path().join(format!("{}.csv", item.id)));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), item.file_size);
    }

    #[tokio::test]
    async fn test_generate_with_huge_expiry() {
        let dir = TempDir::new().unwrap();
        let config = DownloadConfig {
            expiry: chrono::Duration::hours(10_000_000_000),
            ..immediate_config()
        };
        let service = DownloadService::new(dir.path(), config);
        let job = completed_job("clip.mp4", "video/mp4");

        let item = service
            .generate(&job, &DownloadRequest::new(DownloadFormat::Json))
            .await
            .unwrap();
        assert_eq!(item.status, DownloadStatus::Ready);
        assert_eq!(item.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!item.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_generate_media_download() {
        let dir = TempDir::new().unwrap();
        let service = DownloadService::new(dir.path(), immediate_config());
        let job = completed_job("clip.mp4", "video/mp4");

        let storyboard = service
            .generate(&job, &DownloadRequest::new(DownloadFormat::Storyboard))
            .await
            .unwrap();
        assert_eq!(storyboard.file_name, "clip_storyboard.png");

        let video = service
            .generate(&job, &DownloadRequest::new(DownloadFormat::EnhancedVideo))
            .await
            .unwrap();
        assert_eq!(video.file_name, "clip_enhanced_video.mp4");
        assert_eq!(video.file_size, 40);
    }

    #[tokio::test]
    async fn test_unsupported_format_for_job() {
        let dir = TempDir::new().unwrap();
        let service = DownloadService::new(dir.path(), immediate_config());
        let job = completed_job("song.mp3", "audio/mpeg");

        let err = service
            .generate(&job, &DownloadRequest::new(DownloadFormat::EnhancedVideo))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
        assert!(service.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_validation_marks_error() {
        let dir = TempDir::new().unwrap();
        let service = DownloadService::new(dir.path(), immediate_config())
            .with_validator(OutputValidator::strict());
        let job = completed_job("clip.mp4", "video/mp4");

        let err = service
            .generate(&job, &DownloadRequest::new(DownloadFormat::EnhancedVideo))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Export(ExportError::Validation(_))));

        let items = service.list().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, DownloadStatus::Error);
        assert!(items[0].error_message.is_some());
    }

    #[tokio::test]
    async fn test_read_and_mark_downloaded() {
        let dir = TempDir::new().unwrap();
        let service = DownloadService::new(dir.path(), immediate_config());
        let job = completed_job("clip.mp4", "video/mp4");
        let item = service
            .generate(&job, &DownloadRequest::new(DownloadFormat::Json))
            .await
            .unwrap();

        let (info, bytes) = service.read_file(&item.id).await.unwrap();
        assert_eq!(info.status, DownloadStatus::Downloading);
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["job"]["fileName"], "clip.mp4");

        service.mark_downloaded(&item.id).await.unwrap();
        let marked = service.mark_downloaded(&item.id).await.unwrap();
        assert_eq!(marked.status, DownloadStatus::Completed);
        assert_eq!(marked.download_count, 2);

        assert!(matches!(
            service.read_file("missing").await,
            Err(AppError::DownloadNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_download() {
        let dir = TempDir::new().unwrap();
        let config = DownloadConfig {
            expiry: chrono::Duration::zero(),
            ..immediate_config()
        };
        let service = DownloadService::new(dir.path(), config);
        let job = completed_job("clip.mp4", "video/mp4");
        let item = service
            .generate(&job, &DownloadRequest::new(DownloadFormat::Report))
            .await
            .unwrap();

        let later = item.expires_at + chrono::Duration::seconds(1);
        assert!(item.is_expired(later));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(matches!(
            service.read_file(&item.id).await,
            Err(AppError::DownloadExpired(_))
        ));

        let path = item.file_path.clone().unwrap();
        assert_eq!(service.cleanup_expired(later).await, 1);
        assert!(!path.exists());
        assert!(service.get(&item.id).await.is_none());
        assert_eq!(service.cleanup_expired(later).await, 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_live_downloads() {
        let dir = TempDir::new().unwrap();
        let service = DownloadService::new(dir.path(), immediate_config());
        let job = completed_job("clip.mp4", "video/mp4");
        service
            .generate(&job, &DownloadRequest::new(DownloadFormat::Xml))
            .await
            .unwrap();

        assert_eq!(service.cleanup_expired(Utc::now()).await, 0);
        assert_eq!(service.list().await.len(), 1);
    }
}
