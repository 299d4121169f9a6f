//! Download API handlers

use crate::api::utils::AppContext;
use crate::downloads::{download_options, DownloadItem, DownloadOption, DownloadRequest};
use crate::error::AppError;
use crate::state::JobId;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Json, Response},
};
use serde::Serialize;

/// Download options response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOptionsResponse {
    /// Job the options apply to
    pub job_id: String,
    /// Offered formats, media first
    pub options: Vec<DownloadOption>,
}

/// Downloads list response
#[derive(Serialize)]
pub struct DownloadsListResponse {
    /// Downloads, newest first
    pub downloads: Vec<DownloadItem>,
    /// Total number of downloads
    pub count: usize,
}

/// GET /api/jobs/:id/downloads/options - Formats offered for a job
pub async fn get_download_options(
    State(ctx): State<AppContext>,
    Path(id): Path<JobId>,
) -> Result<Json<DownloadOptionsResponse>, AppError> {
    let job = ctx.job(&id).await?;
    Ok(Json(DownloadOptionsResponse {
        options: download_options(&job),
        job_id: job.id,
    }))
}

/// POST /api/jobs/:id/downloads - Generate a download
pub async fn create_download(
    State(ctx): State<AppContext>,
    Path(id): Path<JobId>,
    Json(request): Json<DownloadRequest>,
) -> Result<(StatusCode, Json<DownloadItem>), AppError> {
    let job = ctx.job(&id).await?;
    let item = ctx.downloads.generate(&job, &request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/downloads - List downloads
pub async fn list_downloads(State(ctx): State<AppContext>) -> Json<DownloadsListResponse> {
    let downloads = ctx.downloads.list().await;
    Json(DownloadsListResponse {
        count: downloads.len(),
        downloads,
    })
}

/// GET /api/downloads/:id - Download info
pub async fn get_download(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<DownloadItem>, AppError> {
    ctx.downloads
        .get(&id)
        .await
        .map(Json)
        .ok_or(AppError::DownloadNotFound(id))
}

/// GET /api/downloads/:id/file - Download bytes
///
/// Marks the download as completed once the body is prepared.
pub async fn download_file(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (item, bytes) = ctx.downloads.read_file(&id).await?;
    ctx.downloads.mark_downloaded(&id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, item.format.mime_type())
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", item.file_name.replace('"', "")),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build download response: {}", e)))
}
