//! Job API handlers

use crate::api::utils::{resolve_file_type, validate_file_name, AppContext};
use crate::error::AppError;
use crate::state::{FileSubmission, JobId, ProcessingJob};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

/// Jobs list response
#[derive(Serialize)]
pub struct JobsListResponse {
    /// Jobs, newest first
    pub jobs: Vec<ProcessingJob>,
    /// Total number of jobs
    pub count: usize,
}

/// Single job response
#[derive(Serialize)]
pub struct JobResponse {
    /// The job
    pub job: ProcessingJob,
}

/// Submit job request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    /// Name of the submitted file
    pub file_name: String,
    /// MIME type; inferred from the extension when absent
    pub file_type: Option<String>,
    /// Size in bytes, if known
    pub file_size: Option<u64>,
}

/// GET /api/jobs - List all jobs
pub async fn list_jobs(State(ctx): State<AppContext>) -> Json<JobsListResponse> {
    let state = ctx.state.read().await;
    let jobs: Vec<ProcessingJob> = state.jobs_list().into_iter().cloned().collect();
    Json(JobsListResponse {
        count: jobs.len(),
        jobs,
    })
}

/// POST /api/jobs - Submit a file for processing
pub async fn create_job(
    State(ctx): State<AppContext>,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    let file_name = validate_file_name(&request.file_name)?.to_string();
    let file_type = resolve_file_type(&file_name, request.file_type.as_deref());

    let job = ctx
        .pipeline
        .submit_job(FileSubmission {
            file_name,
            file_type,
            file_size: request.file_size,
            file_path: None,
        })
        .await;

    Ok((StatusCode::CREATED, Json(JobResponse { job })))
}

/// GET /api/jobs/:id - Get a specific job
pub async fn get_job(
    State(ctx): State<AppContext>,
    Path(id): Path<JobId>,
) -> Result<Json<JobResponse>, AppError> {
    let job = ctx.job(&id).await?;
    Ok(Json(JobResponse { job }))
}

/// POST /api/jobs/:id/cancel - Cancel a queued or processing job
///
/// A job that already finished is returned unchanged.
pub async fn cancel_job(
    State(ctx): State<AppContext>,
    Path(id): Path<JobId>,
) -> Result<Json<JobResponse>, AppError> {
    let job = ctx
        .pipeline
        .cancel_job(&id)
        .await
        .ok_or_else(|| AppError::JobNotFound(id.clone()))?;
    Ok(Json(JobResponse { job }))
}
