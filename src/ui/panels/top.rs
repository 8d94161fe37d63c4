use eframe::egui;

use crate::prefs::UserData;
use crate::types::AppSorting;
use crate::ui::UiAction;

/// Render the top bar: title, sort selector, list toggles and reload.
pub fn show(ctx: &egui::Context, prefs: &UserData, is_loading: bool) -> Vec<UiAction> {
    let mut actions = Vec::new();
    egui::TopBottomPanel::top("top").show(ctx, |ui| {
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.heading(format!("App Blocker v{}", env!("CARGO_PKG_VERSION")));
            ui.add_space(16.0);

            egui::ComboBox::from_id_salt("app_sorting")
                .selected_text(prefs.app_sorting.label())
                .show_ui(ui, |ui| {
                    for sorting in AppSorting::all() {
                        if ui
                            .selectable_label(*sorting == prefs.app_sorting, sorting.label())
                            .clicked()
                            && *sorting != prefs.app_sorting
                        {
                            actions.push(UiAction::SetSorting(*sorting));
                        }
                    }
                });

            let mut show_system = prefs.show_system_apps;
            if ui.checkbox(&mut show_system, "System apps").changed() {
                actions.push(UiAction::SetShowSystemApps(show_system));
            }
            let mut show_service = prefs.show_service_info;
            if ui.checkbox(&mut show_service, "Service info").changed() {
                actions.push(UiAction::SetShowServiceInfo(show_service));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.add_enabled(!is_loading, egui::Button::new("Refresh")).clicked() {
                    actions.push(UiAction::Reload);
                }
                if is_loading {
                    ui.spinner();
                }
            });
        });
        ui.add_space(4.0);
    });
    actions
}
