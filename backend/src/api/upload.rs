//! Multipart upload handler
//!
//! Stores the uploaded file under the uploads directory and submits a job for it.

use crate::api::jobs::JobResponse;
use crate::api::utils::{resolve_file_type, sanitize_file_name, validate_file_name, AppContext};
use crate::error::AppError;
use crate::state::FileSubmission;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

fn multipart_error(e: MultipartError, limit: usize) -> AppError {
    error!("Failed to read multipart upload: {}", e);
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(limit)
    } else {
        AppError::InvalidRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// POST /api/upload - Upload a file (field `file`) and submit it for processing
pub async fn upload_file(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<JobResponse>), AppError> {
    let limit = ctx.config.server.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            warn!("Unknown multipart field: {:?}", field.name());
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if data.len() > limit {
            return Err(AppError::PayloadTooLarge(data.len()));
        }

        let file_name = sanitize_file_name(validate_file_name(&original_name)?);
        // Browsers send octet-stream for unknown types
        let declared = content_type.filter(|mime| mime != "application/octet-stream");
        let file_type = resolve_file_type(&file_name, declared.as_deref());

        let uploads_dir = ctx.config.persistence.uploads_dir();
        tokio::fs::create_dir_all(&uploads_dir)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create uploads dir: {}", e)))?;
        let stored_path = uploads_dir.join(format!("{}_{}", uuid::Uuid::new_v4(), file_name));
        tokio::fs::write(&stored_path, &data)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to store upload: {}", e)))?;

        info!(
            file_name = %file_name,
            file_type = %file_type,
            size = data.len(),
            path = %stored_path.display(),
            "Stored upload"
        );

        let job = ctx
            .pipeline
            .submit_job(FileSubmission {
                file_name,
                file_type,
                file_size: Some(data.len() as u64),
                file_path: Some(stored_path),
            })
            .await;

        return Ok((StatusCode::CREATED, Json(JobResponse { job })));
    }

    Err(AppError::InvalidRequest(
        "Multipart body has no `file` field".to_string(),
    ))
}
