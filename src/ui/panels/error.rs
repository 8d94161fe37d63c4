use eframe::egui;

use crate::types::ErrorMessage;
use crate::ui::UiAction;

/// Render the error dialog until the user dismisses it.
pub fn show(ctx: &egui::Context, error: &ErrorMessage) -> Option<UiAction> {
    let mut dismissed = false;
    egui::Window::new("Error")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(&error.message).strong());
            if let Some(detail) = &error.detail {
                egui::CollapsingHeader::new("Details").show(ui, |ui| {
                    egui::ScrollArea::vertical().max_height(200.0).show(ui, |ui| {
                        ui.label(egui::RichText::new(detail).monospace());
                    });
                });
            }
            ui.add_space(6.0);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Dismiss").clicked() {
                    dismissed = true;
                }
            });
        });
    dismissed.then_some(UiAction::DismissError)
}
