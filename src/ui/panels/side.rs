use eframe::egui;

use egui::{Color32, Vec2};

use crate::prefs::UserData;
use crate::style::{DISABLED_BADGE, SYSTEM_BADGE, row_colors};
use crate::types::Application;
use crate::ui::{PackageAction, UiAction, list};
use crate::viewmodel::HomeUiState;

const ROW_HEIGHT: f32 = 44.0;

/// List in a fixed-width side panel, next to the detail.
pub fn show_panel(ctx: &egui::Context, state: &HomeUiState, prefs: &UserData) -> Vec<UiAction> {
    let mut actions = Vec::new();
    egui::SidePanel::left("app_list")
        .resizable(true)
        .default_width(320.0)
        .show(ctx, |ui| {
            actions = app_list(ui, state, prefs, true);
        });
    actions
}

/// List taking the whole window.
pub fn show_full(ctx: &egui::Context, state: &HomeUiState, prefs: &UserData) -> Vec<UiAction> {
    let mut actions = Vec::new();
    egui::CentralPanel::default().show(ctx, |ui| {
        actions = app_list(ui, state, prefs, false);
    });
    actions
}

fn app_list(ui: &mut egui::Ui, state: &HomeUiState, prefs: &UserData, highlight: bool) -> Vec<UiAction> {
    let mut actions = Vec::new();
    let (apps, selected) = match state {
        HomeUiState::NoApps { is_loading, .. } => {
            ui.centered_and_justified(|ui| {
                if *is_loading {
                    ui.spinner();
                } else {
                    ui.label("No applications found.");
                }
            });
            return actions;
        }
        HomeUiState::Success {
            app_list,
            selected_app,
            ..
        } => (app_list, selected_app),
    };

    ui.add_space(4.0);
    let spacing = ui.spacing().item_spacing.y;
    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show_rows(ui, ROW_HEIGHT + spacing, apps.len(), |ui, range| {
            for app in &apps[range] {
                if prefs.show_service_info && app.service_status.is_none() {
                    actions.push(UiAction::LoadServiceStatus(app.package_name.clone()));
                }
                let width = ui.available_width();
                let resp = list::app_row(
                    ui,
                    &app.label,
                    &row_subtitle(app, prefs.show_service_info),
                    row_badge(app),
                    Vec2::new(width, ROW_HEIGHT),
                    highlight && app.package_name == selected.package_name,
                    row_colors(),
                );
                if resp.clicked() {
                    actions.push(UiAction::Select(app.package_name.clone()));
                }
                resp.context_menu(|ui| {
                    for action in PackageAction::available(app.is_enabled) {
                        if ui.button(action.label()).clicked() {
                            actions.push(UiAction::Package(action, app.package_name.clone()));
                            ui.close();
                        }
                    }
                });
            }
        });
    actions
}

/// Version line of a row, followed by service counts once they are known.
fn row_subtitle(app: &Application, show_service_info: bool) -> String {
    let mut text = if app.version_name.is_empty() {
        app.package_name.clone()
    } else {
        format!("{}  •  {}", app.package_name, app.version_name)
    };
    if let Some(status) = app.service_status.as_ref().filter(|_| show_service_info) {
        text.push_str("  •  ");
        text.push_str(&status.summary());
    }
    text
}

fn row_badge(app: &Application) -> Option<(&'static str, Color32)> {
    if !app.is_enabled {
        Some(("disabled", DISABLED_BADGE))
    } else if app.is_system {
        Some(("system", SYSTEM_BADGE))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tests::app;
    use crate::types::AppServiceStatus;

    #[test]
    fn subtitle_shows_service_counts_when_enabled() {
        let mut entry = app("com.a", "A");
        assert_eq!(row_subtitle(&entry, true), "com.a  •  1.0");

        entry.service_status = Some(AppServiceStatus {
            package_name: "com.a".to_string(),
            running: 1,
            blocked: 2,
            total: 5,
        });
        assert!(row_subtitle(&entry, true).ends_with(&entry.service_status.as_ref().unwrap().summary()));
        assert_eq!(row_subtitle(&entry, false), "com.a  •  1.0");
    }

    #[test]
    fn disabled_badge_wins_over_system() {
        let mut entry = app("android", "Android");
        assert_eq!(row_badge(&entry), None);
        entry.is_system = true;
        assert_eq!(row_badge(&entry).map(|b| b.0), Some("system"));
        entry.is_enabled = false;
        assert_eq!(row_badge(&entry).map(|b| b.0), Some("disabled"));
    }
}
