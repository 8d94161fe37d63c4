use chrono::NaiveDateTime;
use eframe::egui;

use crate::style::{DANGER, DISABLED_BADGE, MUTED_TEXT, SYSTEM_BADGE};
use crate::tabs::{DetailTab, TabState};
use crate::types::Application;
use crate::ui::{DetailMenuItem, PackageAction, RuleAction, UiAction};
use crate::viewmodel::HomeUiState;

/// Menu entries for the current tab. Component actions only make sense
/// outside the info tab.
pub fn detail_menu_items(tabs: &TabState) -> Vec<DetailMenuItem> {
    let mut items = vec![DetailMenuItem::Share, DetailMenuItem::FindInPage];
    if tabs.current() != DetailTab::AppInfo {
        items.extend([
            DetailMenuItem::EnableApp,
            DetailMenuItem::Refresh,
            DetailMenuItem::EnableAll,
            DetailMenuItem::BlockAll,
        ]);
    }
    items
}

/// Render the detail of the selected app. `with_back` adds a back button
/// for the single-pane layout.
pub fn show(ctx: &egui::Context, state: &HomeUiState, tabs: &TabState, with_back: bool) -> Vec<UiAction> {
    let mut actions = Vec::new();
    egui::CentralPanel::default().show(ctx, |ui| {
        let HomeUiState::Success { selected_app, .. } = state else {
            ui.centered_and_justified(|ui| {
                ui.label("Select an application from the list to see details.");
            });
            return;
        };

        ui.horizontal(|ui| {
            if with_back && ui.button("⬅ Back").clicked() {
                actions.push(UiAction::CloseDetail);
            }
            header(ui, selected_app);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                ui.menu_button("⋮", |ui| {
                    for item in detail_menu_items(tabs) {
                        if ui.button(item.label()).clicked() {
                            actions.push(UiAction::Menu(item));
                            ui.close();
                        }
                    }
                });
            });
        });

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            for action in PackageAction::available(selected_app.is_enabled) {
                let button = if action == PackageAction::Uninstall {
                    egui::Button::new(egui::RichText::new(action.label()).color(egui::Color32::WHITE)).fill(DANGER)
                } else {
                    egui::Button::new(action.label())
                };
                if ui.add(button).clicked() {
                    actions.push(UiAction::Package(action, selected_app.package_name.clone()));
                }
            }
        });

        ui.add_space(6.0);
        ui.separator();
        ui.horizontal(|ui| {
            for (index, tab) in tabs.titles().iter().enumerate() {
                if ui
                    .selectable_label(index == tabs.current_index(), tab.title())
                    .clicked()
                {
                    actions.push(UiAction::SwitchTab(index));
                }
            }
        });
        ui.separator();
        ui.add_space(6.0);

        match tabs.current() {
            DetailTab::AppInfo => actions.extend(info_tab(ui, selected_app)),
            tab => {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new(format!("{} of {}", tab.title(), selected_app.package_name))
                            .color(MUTED_TEXT),
                    );
                });
            }
        }
    });
    actions
}

fn header(ui: &mut egui::Ui, app: &Application) {
    ui.vertical(|ui| {
        ui.heading(egui::RichText::new(&app.label).strong().size(20.0));
        ui.label(egui::RichText::new(&app.package_name).color(MUTED_TEXT));
        ui.horizontal(|ui| {
            ui.label(format!("Version {} ({})", app.version_name, app.version_code));
            if app.is_system {
                ui.colored_label(SYSTEM_BADGE, "system");
            }
            if !app.is_enabled {
                ui.colored_label(DISABLED_BADGE, "disabled");
            }
        });
        if let Some(status) = &app.service_status {
            ui.label(status.summary());
        }
    });
}

fn info_tab(ui: &mut egui::Ui, app: &Application) -> Vec<UiAction> {
    let mut actions = Vec::new();
    egui::Grid::new("app_info")
        .num_columns(2)
        .spacing([24.0, 6.0])
        .show(ui, |ui| {
            for (name, value) in info_rows(app) {
                ui.label(egui::RichText::new(name).color(MUTED_TEXT));
                ui.label(value);
                ui.end_row();
            }
        });

    ui.add_space(12.0);
    ui.label(egui::RichText::new("Rules").strong());
    ui.horizontal_wrapped(|ui| {
        for rule in RuleAction::ALL {
            if ui.button(rule.label()).clicked() {
                actions.push(UiAction::Rules(rule));
            }
        }
    });
    actions
}

fn format_time(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Name/value pairs of the info tab.
fn info_rows(app: &Application) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Package", app.package_name.clone()),
        ("Version", format!("{} ({})", app.version_name, app.version_code)),
        ("Installed", format_time(app.first_install_time)),
        ("Updated", format_time(app.last_update_time)),
    ];
    if let Some(info) = &app.package_info {
        rows.push(("Target SDK", info.target_sdk.map_or("-".to_string(), |v| v.to_string())));
        rows.push(("Min SDK", info.min_sdk.map_or("-".to_string(), |v| v.to_string())));
        rows.push(("Installer", info.installer.clone().unwrap_or_else(|| "-".to_string())));
        rows.push(("Code path", info.code_path.clone().unwrap_or_else(|| "-".to_string())));
        rows.push(("Data dir", info.data_dir.clone().unwrap_or_else(|| "-".to_string())));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tests::app;
    use chrono::NaiveDate;

    #[test]
    fn info_tab_menu_has_no_component_actions() {
        let tabs = TabState::default();
        assert_eq!(
            detail_menu_items(&tabs),
            vec![DetailMenuItem::Share, DetailMenuItem::FindInPage]
        );
    }

    #[test]
    fn component_tabs_add_component_actions() {
        let mut tabs = TabState::default();
        for index in 1..tabs.titles().len() {
            tabs.switch_tab(index);
            let items = detail_menu_items(&tabs);
            assert_eq!(items.len(), 6);
            assert!(items.contains(&DetailMenuItem::BlockAll));
            assert!(items.contains(&DetailMenuItem::EnableApp));
        }
    }

    #[test]
    fn info_rows_format_missing_values() {
        let mut entry = app("com.a", "A");
        entry.first_install_time =
            NaiveDate::from_ymd_opt(2024, 3, 1).and_then(|d| d.and_hms_opt(8, 30, 0));
        let rows = info_rows(&entry);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2], ("Installed", "2024-03-01 08:30:00".to_string()));
        assert_eq!(rows[3], ("Updated", "-".to_string()));
    }
}
