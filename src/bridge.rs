// Pipeline bridge
// Runs the backend pipeline on a background tokio runtime and hands updates to the UI thread

use media_suite_backend::agents::media_type_for_path;
use media_suite_backend::api::AppContext;
use media_suite_backend::config::Config;
use media_suite_backend::downloads::{DownloadFormat, DownloadItem, DownloadRequest};
use media_suite_backend::pipeline::PipelineEvent;
use media_suite_backend::protocol::{A2AMessage, DEFAULT_RECENT_LIMIT};
use media_suite_backend::state::{Agent, FileSubmission, JobId, PipelineDb, ProcessingJob};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, warn};

/// Something the UI should fold into its state
#[derive(Debug)]
pub enum BridgeUpdate {
    /// A pipeline event
    Event(PipelineEvent),
    /// A download finished generating
    DownloadReady(DownloadItem),
    /// A background request failed
    Failed(String),
}

/// Owns the runtime and the backend context used by the dashboard
pub struct PipelineBridge {
    runtime: tokio::runtime::Runtime,
    ctx: AppContext,
    events: Option<broadcast::Receiver<PipelineEvent>>,
    tx: mpsc::Sender<BridgeUpdate>,
    rx: mpsc::Receiver<BridgeUpdate>,
}

impl PipelineBridge {
    /// Start the runtime, open the database if configured and restore saved jobs and messages
    pub fn start(config: Config) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("media-suite-pipeline")
            .build()?;

        let ctx = runtime.block_on(async {
            let db = match &config.persistence.database_path {
                Some(path) => match PipelineDb::new(path).await {
                    Ok(db) => Some(db),
                    Err(e) => {
                        warn!("Failed to open database at {}: {}", path.display(), e);
                        None
                    }
                },
                None => None,
            };

            let ctx = AppContext::new(config, db.clone());
            if let Some(db) = &db {
                ctx.restore(db).await;
            }
            ctx
        });

        // Subscribe now so nothing is missed before the UI attaches
        let events = Some(ctx.pipeline.subscribe());
        let (tx, rx) = mpsc::channel();

        Ok(Self {
            runtime,
            ctx,
            events,
            tx,
            rx,
        })
    }

    /// Start forwarding pipeline events; each one wakes the UI
    pub fn attach(&mut self, repaint: egui::Context) {
        let Some(mut events) = self.events.take() else {
            return;
        };
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if tx.send(BridgeUpdate::Event(event)).is_err() {
                            break;
                        }
                        repaint.request_repaint();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Dashboard lagged behind pipeline events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    /// Current agents and jobs
    pub fn snapshot(&self) -> (Vec<Agent>, Vec<ProcessingJob>) {
        self.runtime.block_on(async {
            let state = self.ctx.state.read().await;
            (
                state.agents_list().into_iter().cloned().collect(),
                state.jobs_list().into_iter().cloned().collect(),
            )
        })
    }

    /// Latest communication log entries, newest first
    pub fn recent_messages(&self) -> Vec<A2AMessage> {
        self.runtime
            .block_on(self.ctx.pipeline.bus().recent(DEFAULT_RECENT_LIMIT))
    }

    /// Submit a file on disk for processing
    pub fn submit_path(&self, path: &Path) -> std::io::Result<()> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let submission = FileSubmission {
            file_name,
            file_type: media_type_for_path(path).to_string(),
            file_size: Some(metadata.len()),
            file_path: Some(PathBuf::from(path)),
        };
        let pipeline = self.ctx.pipeline.clone();
        self.runtime.spawn(async move {
            pipeline.submit_job(submission).await;
        });
        Ok(())
    }

    pub fn cancel(&self, job_id: JobId) {
        let pipeline = self.ctx.pipeline.clone();
        self.runtime.spawn(async move {
            if pipeline.cancel_job(&job_id).await.is_none() {
                warn!(job_id = %job_id, "Cancel requested for unknown job");
            }
        });
    }

    /// Generate a download for a job in the background
    pub fn generate_download(&self, job: ProcessingJob, format: DownloadFormat) {
        let downloads = self.ctx.downloads.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let update = match downloads.generate(&job, &DownloadRequest::new(format)).await {
                Ok(item) => BridgeUpdate::DownloadReady(item),
                Err(e) => {
                    error!(job_id = %job.id, format = %format, "Download failed: {}", e);
                    BridgeUpdate::Failed(format!("{} download failed: {}", format.label(), e))
                }
            };
            let _ = tx.send(update);
        });
    }

    /// Where downloads are written
    pub fn downloads_dir(&self) -> &Path {
        self.ctx.downloads.dir()
    }

    /// Updates received since the last call
    pub fn poll(&self) -> Vec<BridgeUpdate> {
        self.rx.try_iter().collect()
    }
}
