//! Server-Sent Events for a single job
//!
//! Streams every pipeline event that concerns one job, then `[DONE]` once the
//! job reaches a terminal state.

use crate::api::utils::AppContext;
use crate::error::AppError;
use crate::pipeline::PipelineEvent;
use crate::state::{AppState, JobId, JobStatus, ProcessingJob};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use futures_util::{stream::Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;

/// Final SSE payload of a stream
pub const SSE_DONE_SIGNAL: &str = "[DONE]";

/// Payload prefix for stream errors
pub const SSE_ERROR_PREFIX: &str = "[ERROR]";

/// GET /api/jobs/:id/events - SSE stream of a job's events
pub async fn job_events(
    State(ctx): State<AppContext>,
    Path(id): Path<JobId>,
) -> Result<Response, AppError> {
    // Subscribe before reading the job so no event falls in between
    let rx = ctx.pipeline.subscribe();
    let job = ctx.job(&id).await?;

    // A finished job only replays its final state
    let snapshot = terminal_event(job);

    let sse_stream = create_stream(id, rx, snapshot, ctx.state.clone()).map(|data| {
        Ok::<_, std::io::Error>(format!("data: {}\n\n", data))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(sse_stream))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build SSE response: {}", e)))
}

/// The event that ended a finished job, `None` while it is still queued or processing
fn terminal_event(job: ProcessingJob) -> Option<PipelineEvent> {
    match job.status {
        JobStatus::Completed => Some(PipelineEvent::JobCompleted(job)),
        JobStatus::Cancelled => Some(PipelineEvent::JobCancelled { job_id: job.id }),
        JobStatus::Error => Some(PipelineEvent::JobError {
            job_id: job.id,
            agent_id: None,
            error: job.error_message.unwrap_or_default(),
        }),
        JobStatus::Queued | JobStatus::Processing => None,
    }
}

fn encode(event: &PipelineEvent) -> String {
    serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{} Failed to encode event: {}", SSE_ERROR_PREFIX, e))
}

/// Stream of SSE payloads for one job
///
/// A lagging receiver may have dropped the job's terminal event, so after a
/// lag the job is re-read from `state` and the stream ends if it has finished.
fn create_stream(
    job_id: JobId,
    mut rx: broadcast::Receiver<PipelineEvent>,
    snapshot: Option<PipelineEvent>,
    state: Arc<RwLock<AppState>>,
) -> impl Stream<Item = String> {
    use async_stream::stream;

    stream! {
        if let Some(event) = snapshot {
            yield encode(&event);
            yield SSE_DONE_SIGNAL.to_string();
            return;
        }

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if event.job_id() != Some(job_id.as_str()) {
                        continue;
                    }
                    let terminal = event.is_terminal();
                    yield encode(&event);
                    if terminal {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(job_id = %job_id, skipped, "SSE subscriber lagged");
                    let job = state.read().await.job(&job_id).cloned();
                    match job {
                        Some(job) => {
                            if let Some(event) = terminal_event(job) {
                                yield encode(&event);
                                break;
                            }
                        }
                        None => {
                            yield format!("{} job {} no longer exists", SSE_ERROR_PREFIX, job_id);
                            break;
                        }
                    }
                }
                Err(RecvError::Closed) => {
                    yield format!("{} pipeline closed", SSE_ERROR_PREFIX);
                    break;
                }
            }
        }

        yield SSE_DONE_SIGNAL.to_string();
    }
}
