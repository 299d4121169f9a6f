//! Download service walkthrough
//!
//! Runs a sample video through the pipeline, generates every download format
//! offered for it, lists the results, marks two of them as downloaded and
//! finally sweeps expired downloads.
//!
//! Run with: `cargo run --bin download_demo`

use media_suite_backend::agents::AgentRegistry;
use media_suite_backend::config::{DownloadConfig, PipelineConfig};
use media_suite_backend::downloads::{
    download_options, format_file_size, DownloadRequest, DownloadService,
};
use media_suite_backend::pipeline::{PipelineEvent, PipelineManager};
use media_suite_backend::protocol::MessageBus;
use media_suite_backend::state::{AppState, FileSubmission};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("📦 AI Multimedia Production Suite - Download Service Demo");
    println!("{}", "=".repeat(60));

    let pipeline = PipelineManager::new(
        Arc::new(RwLock::new(AppState::new())),
        AgentRegistry::default(),
        MessageBus::new(1000),
        PipelineConfig::immediate(),
        None,
    );
    let mut events = pipeline.subscribe();

    let submitted = pipeline
        .submit_job(FileSubmission {
            file_name: "sample_video.mp4".to_string(),
            file_type: "video/mp4".to_string(),
            file_size: Some(52_428_800),
            file_path: None,
        })
        .await;
    println!("🎬 Submitted job {}", submitted.id);

    loop {
        let event = tokio::time::timeout(Duration::from_secs(30), events.recv()).await??;
        if event.job_id() == Some(submitted.id.as_str()) && event.is_terminal() {
            if let PipelineEvent::JobError { error, .. } = &event {
                anyhow::bail!("Job failed: {}", error);
            }
            break;
        }
    }

    let job = pipeline
        .state()
        .read()
        .await
        .job(&submitted.id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("job {} disappeared", submitted.id))?;
    println!("✅ Job completed with {} agent results\n", job.results.len());

    let dir = std::env::temp_dir().join("media-suite-download-demo");
    let service = DownloadService::new(
        &dir,
        DownloadConfig {
            stage_delay: Duration::ZERO,
            ..DownloadConfig::default()
        },
    );

    for option in download_options(&job) {
        let item = service
            .generate(&job, &DownloadRequest::new(option.format))
            .await?;
        println!(
            "  {:<18} {:<40} {:>10}",
            option.label,
            item.file_name,
            format_file_size(item.file_size)
        );
    }

    let downloads = service.list().await;
    println!("\n📋 {} downloads in {}", downloads.len(), dir.display());

    for item in downloads.iter().take(2) {
        let marked = service.mark_downloaded(&item.id).await?;
        println!(
            "📥 Downloaded {} (#{})",
            marked.file_name, marked.download_count
        );
    }

    let now = chrono::Utc::now();
    println!(
        "\n🧹 Expired now: {}",
        service.cleanup_expired(now).await
    );
    let later = now + chrono::Duration::hours(25);
    println!(
        "🧹 Expired after 25 hours: {}",
        service.cleanup_expired(later).await
    );

    Ok(())
}
