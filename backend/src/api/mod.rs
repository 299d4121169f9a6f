//! API module
//!
//! HTTP request handlers and the router that ties them together

pub mod a2a;
pub mod agents;
pub mod downloads;
pub mod jobs;
pub mod messages;
pub mod streaming;
pub mod upload;
pub mod utils;

pub use utils::AppContext;

use crate::websocket;
use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::Next,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Multipart framing on top of the file itself
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    service: &'static str,
    version: &'static str,
}

/// GET /api/health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        service: "AI Multimedia Production Suite",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Request ID middleware - adds unique ID to each request for tracing
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let response = next.run(request).instrument(span).await;

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

/// Build the application router
pub fn router(ctx: AppContext) -> Router {
    let upload_limit = ctx.config.server.max_upload_bytes + UPLOAD_OVERHEAD_BYTES;

    Router::new()
        .route("/api/health", get(health_check))
        // Agents
        .route("/api/agents", get(agents::list_agents))
        .route("/api/agents/:id", get(agents::get_agent))
        // Jobs
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/:id", get(jobs::get_job))
        .route("/api/jobs/:id/cancel", post(jobs::cancel_job))
        .route("/api/jobs/:id/events", get(streaming::job_events))
        .route(
            "/api/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Communication log and A2A network
        .route("/api/messages", get(messages::list_messages))
        .route("/api/a2a/status", get(a2a::network_status))
        .route("/api/a2a/dispatch", post(a2a::dispatch_message))
        // Downloads
        .route(
            "/api/jobs/:id/downloads/options",
            get(downloads::get_download_options),
        )
        .route("/api/jobs/:id/downloads", post(downloads::create_download))
        .route("/api/downloads", get(downloads::list_downloads))
        .route("/api/downloads/:id", get(downloads::get_download))
        .route("/api/downloads/:id/file", get(downloads::download_file))
        // WebSocket for real-time updates
        .route("/ws", get(websocket::websocket_handler))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
