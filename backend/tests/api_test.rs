//! Router tests driven through `tower::ServiceExt::oneshot`

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use media_suite_backend::api::{self, AppContext};
use media_suite_backend::config::{
    Config, DownloadConfig, PersistenceConfig, PipelineConfig, ServerConfig,
};
use media_suite_backend::state::PipelineDb;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_config(dir: &TempDir) -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            max_upload_bytes: 1024,
        },
        persistence: PersistenceConfig {
            data_dir: dir.path().to_path_buf(),
            database_path: None,
        },
        pipeline: PipelineConfig::immediate(),
        downloads: DownloadConfig {
            stage_delay: Duration::ZERO,
            ..DownloadConfig::default()
        },
    }
}

fn app(dir: &TempDir) -> (Router, AppContext) {
    let ctx = AppContext::new(test_config(dir), None);
    (api::router(ctx.clone()), ctx)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for_status(app: &Router, job_id: &str, status: &str) -> Value {
    for _ in 0..200 {
        let (_, body) = send(app, get(&format!("/api/jobs/{}", job_id))).await;
        if body["job"]["status"] == status {
            return body["job"].clone();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never reached {}", job_id, status);
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);
    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_agents_endpoints() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let (status, body) = send(&app, get("/api/agents")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
    assert_eq!(body["agents"][0]["id"], "metadata-agent");
    assert_eq!(body["agents"][0]["status"], "idle");

    let (status, body) = send(&app, get("/api/agents/video-agent")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Video Enhancement Agent");

    let (status, body) = send(&app, get("/api/agents/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_job_lifecycle() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let (status, body) = send(
        &app,
        post_json("/api/jobs", json!({ "fileName": "sample_video.mp4" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["job"]["status"], "queued");
    assert_eq!(body["job"]["fileType"], "video/mp4");
    let job_id = body["job"]["id"].as_str().unwrap().to_string();

    let job = wait_for_status(&app, &job_id, "completed").await;
    assert_eq!(job["progress"], 100.0);
    let agents: Vec<&String> = job["results"].as_object().unwrap().keys().collect();
    assert_eq!(
        agents,
        vec!["metadata-agent", "video-agent", "audio-agent", "storyboard-agent"]
    );

    let (status, body) = send(&app, get("/api/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    // Cancelling a finished job leaves it alone
    let cancel = Request::builder()
        .method("POST")
        .uri(format!("/api/jobs/{}/cancel", job_id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, cancel).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["status"], "completed");
}

#[tokio::test]
async fn test_invalid_job_requests() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let (status, _) = send(&app, post_json("/api/jobs", json!({ "fileName": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/jobs/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api/jobs/does-not-exist/events")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_job_events_stream_replays_finished_job() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let (_, body) = send(
        &app,
        post_json("/api/jobs", json!({ "fileName": "song.mp3" })),
    )
    .await;
    let job_id = body["job"]["id"].as_str().unwrap().to_string();
    wait_for_status(&app, &job_id, "completed").await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/jobs/{}/events", job_id)))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#""type":"job_completed""#));
    assert!(text.trim_end().ends_with("data: [DONE]"));
}

#[tokio::test]
async fn test_upload_submits_job() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"../clip.wav\"\r\nContent-Type: audio/wav\r\n\r\nRIFFDATA\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["job"]["fileName"], "clip.wav");
    assert_eq!(body["job"]["fileType"], "audio/wav");
    assert_eq!(body["job"]["fileSize"], 8);

    let stored = std::fs::read_dir(dir.path().join("uploads")).unwrap().count();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn test_upload_too_large() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.mp4\"\r\n\r\n{data}\r\n--{b}--\r\n",
        b = boundary,
        data = "x".repeat(2048)
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_messages_endpoint() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let (_, body) = send(
        &app,
        post_json("/api/jobs", json!({ "fileName": "clip.mp4" })),
    )
    .await;
    let job_id = body["job"]["id"].as_str().unwrap().to_string();
    wait_for_status(&app, &job_id, "completed").await;

    let (status, body) = send(&app, get("/api/messages?limit=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (_, body) = send(&app, get("/api/messages")).await;
    let messages = body["messages"].as_array().unwrap();
    assert!(messages.len() <= 50);
    assert!(messages
        .iter()
        .any(|m| m["payload"]["action"] == "process_complete"));
}

/// App backed by a database under `dir`, restored the way the server starts
async fn persistent_app(dir: &TempDir) -> Router {
    let mut config = test_config(dir);
    let path = dir.path().join("suite.db");
    config.persistence.database_path = Some(path.clone());
    let db = PipelineDb::new(&path).await.unwrap();
    let ctx = AppContext::new(config, Some(db.clone()));
    ctx.restore(&db).await;
    api::router(ctx)
}

#[tokio::test]
async fn test_messages_survive_restart() {
    let dir = TempDir::new().unwrap();

    let job_id = {
        let app = persistent_app(&dir).await;
        let (_, body) = send(
            &app,
            post_json("/api/jobs", json!({ "fileName": "clip.mp4", "fileType": "video/mp4" })),
        )
        .await;
        let job_id = body["job"]["id"].as_str().unwrap().to_string();
        wait_for_status(&app, &job_id, "completed").await;
        job_id
    };

    let app = persistent_app(&dir).await;
    let (status, body) = send(&app, get("/api/messages?limit=500")).await;
    assert_eq!(status, StatusCode::OK);
    let responders: Vec<_> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["payload"]["action"] == "process_complete")
        .map(|m| m["header"]["from_agent"].as_str().unwrap().to_string())
        .collect();
    // Newest first
    assert_eq!(
        responders,
        vec!["storyboard-agent", "audio-agent", "video-agent", "metadata-agent"]
    );

    let (_, body) = send(&app, get(&format!("/api/jobs/{}", job_id))).await;
    assert_eq!(body["job"]["status"], "completed");
}

#[tokio::test]
async fn test_download_flow() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let (_, body) = send(
        &app,
        post_json("/api/jobs", json!({ "fileName": "clip.mp4", "fileType": "video/mp4" })),
    )
    .await;
    let job_id = body["job"]["id"].as_str().unwrap().to_string();
    wait_for_status(&app, &job_id, "completed").await;

    let (status, body) = send(&app, get(&format!("/api/jobs/{}/downloads/options", job_id))).await;
    assert_eq!(status, StatusCode::OK);
    let formats: Vec<&str> = body["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["format"].as_str().unwrap())
        .collect();
    assert_eq!(
        formats,
        vec![
            "enhanced_video",
            "enhanced_audio",
            "storyboard",
            "json",
            "csv",
            "xml",
            "report",
            "zip"
        ]
    );

    let (status, item) = send(
        &app,
        post_json(
            &format!("/api/jobs/{}/downloads", job_id),
            json!({ "format": "csv", "selectedAgents": ["video-agent"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["status"], "ready");
    assert_eq!(item["fileName"], "clip_results.csv");
    let download_id = item["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get(&format!("/api/downloads/{}/file", download_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"clip_results.csv\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.starts_with("Agent,Metric,Value"));
    assert!(csv.contains("Video Enhancement Agent"));
    assert!(!csv.contains("Audio Optimization Agent"));

    let (_, info) = send(&app, get(&format!("/api/downloads/{}", download_id))).await;
    assert_eq!(info["status"], "completed");
    assert_eq!(info["downloadCount"], 1);

    let (_, list) = send(&app, get("/api/downloads")).await;
    assert_eq!(list["count"], 1);
}

#[tokio::test]
async fn test_download_errors() {
    let dir = TempDir::new().unwrap();
    let (app, _) = app(&dir);

    let (_, body) = send(
        &app,
        post_json("/api/jobs", json!({ "fileName": "song.mp3" })),
    )
    .await;
    let job_id = body["job"]["id"].as_str().unwrap().to_string();

    // Video is not offered for audio input
    let (status, _) = send(
        &app,
        post_json(
            &format!("/api/jobs/{}/downloads", job_id),
            json!({ "format": "enhanced_video" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/downloads/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get("/api/downloads/missing/file")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_a2a_status_and_dispatch() {
    let dir = TempDir::new().unwrap();
    let (app, ctx) = app(&dir);

    let (status, body) = send(&app, get("/api/a2a/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 12);
    assert_eq!(body["stats"]["orchestrator"]["pending_acks"], 0);

    let envelope = json!({
        "header": {
            "message_id": "m-1",
            "timestamp": "2024-03-01T12:00:00Z",
            "from_agent": "orchestrator",
            "to_agent": "metadata-agent",
            "priority": 2
        },
        "payload": {
            "action": "process",
            "data": { "job_id": "job-1", "file_name": "clip.mp4", "file_type": "video/mp4" }
        }
    });
    let (status, body) = send(&app, post_json("/api/a2a/dispatch", envelope)).await;
    assert_eq!(status, StatusCode::OK);
    let complete = body["transcript"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["payload"]["action"] == "process_complete")
        .cloned()
        .unwrap();
    assert_eq!(complete["header"]["to_agent"], "orchestrator");
    assert!(complete["payload"]["data"]["results"]["llm_summary"].is_string());

    let recent = ctx.pipeline.bus().recent(1).await;
    assert_eq!(recent[0].header.to_agent, "orchestrator");

    let (status, _) = send(
        &app,
        post_json(
            "/api/a2a/dispatch",
            json!({ "header": { "message_id": "m-2" }, "payload": {} }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let ghost = json!({
        "header": {
            "message_id": "m-3",
            "timestamp": "2024-03-01T12:00:00Z",
            "from_agent": "orchestrator",
            "to_agent": "ghost-agent",
            "priority": 2
        },
        "payload": { "action": "status", "data": {} }
    });
    let (status, _) = send(&app, post_json("/api/a2a/dispatch", ghost)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
