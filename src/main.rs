// Media Suite GUI - Main Entry Point
// Native dashboard for the multimedia processing pipeline

mod bridge;
mod state;
mod ui;

use bridge::{BridgeUpdate, PipelineBridge};
use eframe::egui;
use media_suite_backend::config::Config;
use media_suite_backend::pipeline::PipelineEvent;
use state::DashboardState;
use std::path::Path;
use tracing::{info, warn};
use ui::{render_app_layout, ActivityLog, UiAction};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bridge = PipelineBridge::start(Config::from_env())?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("AI Multimedia Production Suite")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "AI Multimedia Production Suite",
        options,
        Box::new(|cc| {
            let mut app = MediaSuiteApp::new(bridge);
            app.bridge.attach(cc.egui_ctx.clone());
            Box::new(app)
        }),
    )?;
    Ok(())
}

/// Main application struct
/// Owns the pipeline bridge and the view state
struct MediaSuiteApp {
    bridge: PipelineBridge,
    state: DashboardState,
    activity: ActivityLog,
}

impl MediaSuiteApp {
    fn new(bridge: PipelineBridge) -> Self {
        let (agents, jobs) = bridge.snapshot();
        let messages = bridge.recent_messages();
        let mut activity = ActivityLog::new(500);
        activity.add_line(format!(
            "Dashboard ready: {} agents, {} jobs, {} messages",
            agents.len(),
            jobs.len(),
            messages.len()
        ));
        Self {
            bridge,
            state: DashboardState::new(agents, jobs).with_messages(messages),
            activity,
        }
    }

    fn apply_update(&mut self, update: BridgeUpdate) {
        match update {
            BridgeUpdate::Event(event) => {
                if let Some(line) = activity_line(&event) {
                    self.activity.add_line(line);
                }
                self.state.apply_event(event);
            }
            BridgeUpdate::DownloadReady(item) => {
                self.activity.add_line(format!(
                    "Download ready: {} ({})",
                    item.file_name, item.file_size_label
                ));
                self.state.add_download(item);
            }
            BridgeUpdate::Failed(message) => {
                self.activity.add_line(message.clone());
                self.state.last_error = Some(message);
            }
        }
    }

    fn handle_action(&mut self, action: UiAction) {
        match action {
            UiAction::SubmitPath(path) => {
                if let Err(e) = self.bridge.submit_path(Path::new(&path)) {
                    warn!("Failed to submit {}: {}", path, e);
                    self.state.last_error = Some(format!("Cannot submit {}: {}", path, e));
                }
            }
            UiAction::CancelJob(job_id) => self.bridge.cancel(job_id),
            UiAction::GenerateDownload { job_id, format } => {
                match self.state.job(&job_id).cloned() {
                    Some(job) => self.bridge.generate_download(job, format),
                    None => self.state.last_error = Some(format!("Unknown job {}", job_id)),
                }
            }
            UiAction::Refresh => {
                let (agents, jobs) = self.bridge.snapshot();
                info!(agents = agents.len(), jobs = jobs.len(), "Refreshed dashboard");
                self.state.agents = agents;
                self.state.jobs = jobs;
            }
        }
    }
}

/// One-line summary of an event for the activity log
fn activity_line(event: &PipelineEvent) -> Option<String> {
    let line = match event {
        PipelineEvent::JobSubmitted(job) => format!("Queued {}", job.file_name),
        PipelineEvent::JobStarted(job) => format!("Started {}", job.file_name),
        PipelineEvent::AgentCompleted { agent_id, .. } => format!("{} completed", agent_id),
        PipelineEvent::JobCompleted(job) => format!("Completed {}", job.file_name),
        PipelineEvent::JobError { error, .. } => format!("Job failed: {}", error),
        PipelineEvent::JobCancelled { job_id } => format!("Cancelled job {}", job_id),
        PipelineEvent::AgentsReset { .. } => "Agents ready for next task".to_string(),
        PipelineEvent::AgentProgress { .. } | PipelineEvent::A2aMessage(_) => return None,
    };
    Some(line)
}

impl eframe::App for MediaSuiteApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for update in self.bridge.poll() {
            self.apply_update(update);
        }

        let downloads_dir = self.bridge.downloads_dir().to_path_buf();
        let actions = render_app_layout(ctx, &mut self.state, &mut self.activity, &downloads_dir);
        for action in actions {
            self.handle_action(action);
        }
    }
}
