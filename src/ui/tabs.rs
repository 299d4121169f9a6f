// Tab contents
// One render function per dashboard tab; requests go into the action list

use crate::state::DashboardState;
use crate::ui::components::*;
use crate::ui::UiAction;
use eframe::egui;
use media_suite_backend::downloads::download_options;
use media_suite_backend::state::{agent_display_name, JobStatus, ProcessingJob};
use std::path::Path;

fn stat(ui: &mut egui::Ui, label: &str, value: usize) {
    ui.group(|ui| {
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(value.to_string()).size(22.0).strong());
            ui.label(egui::RichText::new(label).weak());
        });
    });
}

fn job_progress(ui: &mut egui::Ui, job: &ProcessingJob) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(&job.file_name).strong());
        job_status_badge(ui, job.status);
    });
    ui.add(
        egui::ProgressBar::new(job.progress / 100.0)
            .text(format!("{:.0}%", job.progress))
            .animate(job.status == JobStatus::Processing),
    );
}

/// Combo box choosing the job shown on Results and Downloads
fn job_selector(ui: &mut egui::Ui, state: &mut DashboardState) {
    let selected_text = state
        .selected_job()
        .map(|job| format!("{} ({})", job.file_name, job.status.as_str()))
        .unwrap_or_else(|| "Select a job".to_string());
    let choices: Vec<(String, String)> = state
        .jobs
        .iter()
        .map(|job| (job.id.clone(), format!("{} ({})", job.file_name, job.status.as_str())))
        .collect();

    egui::ComboBox::from_id_source("job_selector")
        .selected_text(selected_text)
        .width(320.0)
        .show_ui(ui, |ui| {
            for (id, label) in choices {
                ui.selectable_value(&mut state.selected_job_id, Some(id), label);
            }
        });
}

fn empty_view(ui: &mut egui::Ui, title: &str, hint: &str) {
    ui.vertical_centered(|ui| {
        ui.add_space(60.0);
        ui.label(egui::RichText::new(title).italics().weak().size(14.0));
        ui.add_space(8.0);
        ui.label(egui::RichText::new(hint).weak().size(12.0));
    });
}

/// Overview: counters, agent cards and recent activity
pub fn render_dashboard(ui: &mut egui::Ui, state: &DashboardState, activity: &mut ActivityLog) {
    ui.heading("Overview");
    ui.add_space(8.0);
    ui.horizontal(|ui| {
        stat(ui, "Jobs", state.jobs.len());
        stat(ui, "Processing", state.count_jobs(JobStatus::Processing));
        stat(ui, "Completed", state.count_jobs(JobStatus::Completed));
        stat(ui, "Failed", state.count_jobs(JobStatus::Error));
        stat(ui, "Messages", state.messages.len());
    });

    ui.add_space(12.0);
    ui.heading("Agents");
    ui.add_space(4.0);
    ui.horizontal_wrapped(|ui| {
        for agent in &state.agents {
            agent_card(ui, agent);
        }
    });

    if let Some(job) = state.active_job() {
        ui.add_space(12.0);
        job_progress(ui, job);
    }

    ui.add_space(12.0);
    activity.render(ui);
}

/// File submission by path, plus the job queue
pub fn render_upload(ui: &mut egui::Ui, state: &mut DashboardState, actions: &mut Vec<UiAction>) {
    ui.heading("Upload & Process");
    ui.add_space(8.0);
    ui.label("Enter the path of a video, audio or image file.");
    ui.add_space(4.0);

    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(&mut state.upload_path)
                .hint_text("/path/to/video.mp4")
                .desired_width(420.0),
        );
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if (primary_button(ui, "Process").clicked() || submitted)
            && !state.upload_path.trim().is_empty()
        {
            actions.push(UiAction::SubmitPath(state.upload_path.trim().to_string()));
            state.upload_path.clear();
        }
    });

    ui.add_space(16.0);
    ui.separator();
    ui.heading("Jobs");
    ui.add_space(4.0);

    if state.jobs.is_empty() {
        empty_view(ui, "No jobs yet", "Submitted files are processed one at a time");
        return;
    }

    egui::ScrollArea::vertical()
        .id_source("upload_jobs_scroll")
        .auto_shrink([false; 2])
        .show(ui, |ui| {
            egui::Grid::new("upload_jobs_grid")
                .striped(true)
                .num_columns(5)
                .show(ui, |ui| {
                    ui.label(egui::RichText::new("File").strong());
                    ui.label(egui::RichText::new("Type").strong());
                    ui.label(egui::RichText::new("Status").strong());
                    ui.label(egui::RichText::new("Progress").strong());
                    ui.label("");
                    ui.end_row();

                    for job in &state.jobs {
                        ui.label(&job.file_name);
                        ui.label(egui::RichText::new(&job.file_type).weak());
                        job_status_badge(ui, job.status);
                        ui.label(format!("{:.0}%", job.progress));
                        if job.status.is_terminal() {
                            ui.label("");
                        } else if cancel_button(ui).clicked() {
                            actions.push(UiAction::CancelJob(job.id.clone()));
                        }
                        ui.end_row();
                    }
                });
        });
}

/// Agent chain for the active (or most recent) job
pub fn render_pipeline(ui: &mut egui::Ui, state: &DashboardState) {
    ui.heading("Processing Pipeline");
    ui.add_space(8.0);

    match state.active_job().or_else(|| state.jobs.first()) {
        Some(job) => {
            job_progress(ui, job);
            if let Some(error) = &job.error_message {
                ui.colored_label(egui::Color32::from_rgb(220, 0, 0), error);
            }
        }
        None => {
            ui.label(egui::RichText::new("No job has been submitted").weak());
        }
    }

    ui.add_space(12.0);
    for (i, agent) in state.agents.iter().enumerate() {
        if i > 0 {
            ui.vertical_centered(|ui| ui.label(egui::RichText::new("↓").size(18.0).weak()));
        }
        agent_card(ui, agent);
    }
}

/// Communication log, newest first
pub fn render_communication(ui: &mut egui::Ui, state: &DashboardState) {
    ui.heading("Agent Communication");
    ui.label(
        egui::RichText::new(format!("Last {} A2A messages", state.messages.len())).weak(),
    );
    ui.add_space(8.0);

    if state.messages.is_empty() {
        empty_view(ui, "No messages", "Messages appear while a job is processed");
        return;
    }

    egui::ScrollArea::vertical()
        .id_source("messages_scroll")
        .auto_shrink([false; 2])
        .show(ui, |ui| {
            egui::Grid::new("messages_grid")
                .striped(true)
                .num_columns(5)
                .show(ui, |ui| {
                    for message in &state.messages {
                        ui.label(
                            egui::RichText::new(message.header.timestamp.format("%H:%M:%S").to_string())
                                .monospace()
                                .weak(),
                        );
                        ui.label(format!(
                            "{} → {}",
                            message.header.from_agent, message.header.to_agent
                        ));
                        ui.label(egui::RichText::new(message.action()).strong());
                        ui.label(message.kind().as_str());
                        ui.label(egui::RichText::new(message.header.priority.name()).small());
                        ui.end_row();
                    }
                });
        });
}

/// Per-agent result payloads of the selected job
pub fn render_results(ui: &mut egui::Ui, state: &mut DashboardState) {
    ui.heading("Results");
    ui.add_space(8.0);
    job_selector(ui, state);
    ui.add_space(8.0);

    let Some(job) = state.selected_job() else {
        empty_view(ui, "No job selected", "Pick a job above");
        return;
    };
    if job.results.is_empty() {
        empty_view(ui, "No results yet", "Results appear as each agent completes");
        return;
    }

    egui::ScrollArea::vertical()
        .id_source("results_scroll")
        .auto_shrink([false; 2])
        .show(ui, |ui| {
            for (agent_id, result) in &job.results {
                egui::CollapsingHeader::new(agent_display_name(agent_id))
                    .id_source(agent_id)
                    .default_open(true)
                    .show(ui, |ui| {
                        let text = serde_json::to_string_pretty(result)
                            .unwrap_or_else(|_| result.to_string());
                        ui.label(egui::RichText::new(text).monospace().size(12.0));
                    });
            }
        });
}

/// Offered formats for the selected job and the generated files
pub fn render_downloads(
    ui: &mut egui::Ui,
    state: &mut DashboardState,
    downloads_dir: &Path,
    actions: &mut Vec<UiAction>,
) {
    ui.heading("Downloads");
    ui.label(egui::RichText::new(format!("Saved to {}", downloads_dir.display())).weak());
    ui.add_space(8.0);
    job_selector(ui, state);
    ui.add_space(8.0);

    if let Some(job) = state.selected_job() {
        if job.status == JobStatus::Completed {
            ui.horizontal_wrapped(|ui| {
                for option in download_options(job) {
                    let button = ui
                        .button(option.label)
                        .on_hover_text(format!("{} ({})", option.description, option.file_extension));
                    if button.clicked() {
                        actions.push(UiAction::GenerateDownload {
                            job_id: job.id.clone(),
                            format: option.format,
                        });
                    }
                }
            });
        } else {
            ui.label(egui::RichText::new("Downloads are available once the job completes").weak());
        }
    }

    ui.add_space(12.0);
    ui.separator();
    if state.downloads.is_empty() {
        empty_view(ui, "No downloads", "Generated files are listed here");
        return;
    }

    egui::ScrollArea::vertical()
        .id_source("downloads_scroll")
        .auto_shrink([false; 2])
        .show(ui, |ui| {
            egui::Grid::new("downloads_grid")
                .striped(true)
                .num_columns(4)
                .show(ui, |ui| {
                    for item in &state.downloads {
                        ui.label(egui::RichText::new(&item.file_name).strong());
                        ui.label(&item.file_size_label);
                        download_status_badge(ui, item.status);
                        match &item.file_path {
                            Some(path) => ui.label(
                                egui::RichText::new(path.display().to_string()).monospace().small(),
                            ),
                            None => ui.label(
                                egui::RichText::new(item.error_message.as_deref().unwrap_or(""))
                                    .weak(),
                            ),
                        };
                        ui.end_row();
                    }
                });
        });
}
