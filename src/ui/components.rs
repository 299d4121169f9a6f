// Reusable UI components
// Status badges, agent cards and the activity log

use eframe::egui;
use media_suite_backend::downloads::DownloadStatus;
use media_suite_backend::state::{Agent, AgentStatus, JobStatus};

const GREEN: egui::Color32 = egui::Color32::from_rgb(0, 180, 0);
const BLUE: egui::Color32 = egui::Color32::from_rgb(40, 140, 230);
const YELLOW: egui::Color32 = egui::Color32::from_rgb(220, 180, 0);
const RED: egui::Color32 = egui::Color32::from_rgb(220, 0, 0);

/// Colored agent status label
/// Colors: Idle (gray), Processing (blue), Completed (green), Error (red)
pub fn agent_status_badge(ui: &mut egui::Ui, status: AgentStatus) {
    let (text, color) = match status {
        AgentStatus::Idle => ("Idle", egui::Color32::GRAY),
        AgentStatus::Processing => ("Processing", BLUE),
        AgentStatus::Completed => ("Completed", GREEN),
        AgentStatus::Error => ("Error", RED),
    };
    ui.colored_label(color, text);
}

/// Colored job status label
pub fn job_status_badge(ui: &mut egui::Ui, status: JobStatus) {
    let color = match status {
        JobStatus::Queued => egui::Color32::GRAY,
        JobStatus::Processing => BLUE,
        JobStatus::Completed => GREEN,
        JobStatus::Error => RED,
        JobStatus::Cancelled => YELLOW,
    };
    ui.colored_label(color, status.as_str());
}

pub fn download_status_badge(ui: &mut egui::Ui, status: DownloadStatus) {
    let (text, color) = match status {
        DownloadStatus::Preparing => ("preparing", egui::Color32::GRAY),
        DownloadStatus::Ready => ("ready", GREEN),
        DownloadStatus::Downloading => ("downloading", BLUE),
        DownloadStatus::Completed => ("completed", GREEN),
        DownloadStatus::Error => ("error", RED),
        DownloadStatus::Expired => ("expired", YELLOW),
    };
    ui.colored_label(color, text);
}

/// Card with an agent's name, status, progress and last message
pub fn agent_card(ui: &mut egui::Ui, agent: &Agent) {
    ui.group(|ui| {
        ui.set_min_width(220.0);
        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&agent.name).strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    agent_status_badge(ui, agent.status);
                });
            });
            ui.add_space(4.0);
            ui.add(
                egui::ProgressBar::new(f32::from(agent.progress) / 100.0)
                    .text(format!("{}%", agent.progress)),
            );
            ui.add_space(4.0);
            ui.label(egui::RichText::new(&agent.last_message).weak().size(12.0));
            ui.label(
                egui::RichText::new(agent.capabilities.join(" · "))
                    .small()
                    .weak(),
            );
        });
    });
}

/// Primary action button
pub fn primary_button(ui: &mut egui::Ui, text: &str) -> egui::Response {
    ui.button(egui::RichText::new(text).strong())
}

/// Cancel button (red)
pub fn cancel_button(ui: &mut egui::Ui) -> egui::Response {
    ui.button(egui::RichText::new("⏹ Cancel").color(RED))
}

/// Scrollable log of pipeline activity, one line per event
pub struct ActivityLog {
    /// Buffer of output lines
    lines: Vec<String>,
    /// Maximum number of lines to keep (0 = unlimited)
    max_lines: usize,
    /// Whether to auto-scroll to bottom
    auto_scroll: bool,
}

impl ActivityLog {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Vec::new(),
            max_lines,
            auto_scroll: true,
        }
    }

    /// Add a line, dropping the oldest past the limit
    pub fn add_line(&mut self, line: String) {
        self.lines.push(line);
        if self.max_lines > 0 && self.lines.len() > self.max_lines {
            self.lines.remove(0);
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Render the log in a scrollable area
    pub fn render(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Activity").heading());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Clear").clicked() {
                    self.clear();
                }
                ui.add_space(8.0);
                ui.checkbox(&mut self.auto_scroll, "Auto-scroll");
            });
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .id_source("activity_log_scroll")
            .auto_shrink([false; 2])
            .max_height(220.0)
            .show(ui, |ui| {
                ui.style_mut().override_text_style = Some(egui::TextStyle::Monospace);
                ui.spacing_mut().item_spacing = egui::vec2(4.0, 2.0);

                for line in &self.lines {
                    ui.label(
                        egui::RichText::new(line)
                            .size(12.0)
                            .family(egui::FontFamily::Monospace),
                    );
                }

                if self.auto_scroll && !self.lines.is_empty() {
                    ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                }
            });
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(500)
    }
}
