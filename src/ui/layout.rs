// Main application layout
// Menu bar, tab strip, footer and the active tab

use crate::state::{DashboardState, Tab};
use crate::ui::components::ActivityLog;
use crate::ui::{tabs, UiAction};
use eframe::egui;
use std::path::Path;

/// Render the whole window
/// Returns the requests made during this frame
pub fn render_app_layout(
    ctx: &egui::Context,
    state: &mut DashboardState,
    activity: &mut ActivityLog,
    downloads_dir: &Path,
) -> Vec<UiAction> {
    let mut actions = Vec::new();

    render_menu_bar(ctx, &mut actions);
    render_tab_strip(ctx, state);
    render_footer(ctx, state);

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.add_space(8.0);
        match state.active_tab {
            Tab::Dashboard => tabs::render_dashboard(ui, state, activity),
            Tab::Upload => tabs::render_upload(ui, state, &mut actions),
            Tab::Pipeline => tabs::render_pipeline(ui, state),
            Tab::Communication => tabs::render_communication(ui, state),
            Tab::Results => tabs::render_results(ui, state),
            Tab::Downloads => tabs::render_downloads(ui, state, downloads_dir, &mut actions),
        }
    });

    actions
}

fn render_menu_bar(ctx: &egui::Context, actions: &mut Vec<UiAction>) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Refresh").clicked() {
                    actions.push(UiAction::Refresh);
                    ui.close_menu();
                }
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("View", |ui| {
                let mut dark_mode = ctx.style().visuals.dark_mode;
                if ui.checkbox(&mut dark_mode, "Dark Mode").changed() {
                    ctx.set_visuals(if dark_mode {
                        egui::Visuals::dark()
                    } else {
                        egui::Visuals::light()
                    });
                }
            });
        });
    });
}

fn render_tab_strip(ctx: &egui::Context, state: &mut DashboardState) {
    egui::TopBottomPanel::top("tab_strip").show(ctx, |ui| {
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            for tab in Tab::ALL {
                ui.selectable_value(&mut state.active_tab, tab, tab.label());
            }
        });
        ui.add_space(4.0);
    });
}

fn render_footer(ctx: &egui::Context, state: &mut DashboardState) {
    egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let busy = state.active_job().is_some();
            ui.label(
                egui::RichText::new(if busy { "Processing" } else { "Ready" })
                    .small()
                    .weak(),
            );
            if let Some(error) = state.last_error.clone() {
                ui.separator();
                ui.colored_label(egui::Color32::from_rgb(220, 0, 0), error);
                if ui.small_button("✕").clicked() {
                    state.last_error = None;
                }
            }
        });
    });
}
