//! Light theme and shared colors of the blocker UI.

use eframe::{egui, epaint::Color32};

use crate::types::StateColors;

pub const ACCENT: Color32 = Color32::from_rgb(26, 115, 232);
pub const MUTED_TEXT: Color32 = Color32::from_rgb(110, 112, 124);
pub const SYSTEM_BADGE: Color32 = Color32::from_rgb(196, 120, 20);
pub const DISABLED_BADGE: Color32 = Color32::from_rgb(200, 70, 70);
pub const DANGER: Color32 = Color32::from_rgb(220, 68, 68);

/// Apply the light theme to the current egui Context.
pub fn apply_style(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::light();
    visuals.window_fill = Color32::from_rgb(248, 249, 250);
    visuals.panel_fill = Color32::WHITE;
    visuals.selection.bg_fill = ACCENT;
    visuals.widgets.active.bg_fill = ACCENT;
    visuals.widgets.active.fg_stroke = egui::Stroke::new(1.0, Color32::WHITE);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(241, 243, 244);
    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    ctx.set_style(style);
}

pub fn row_colors() -> StateColors {
    StateColors {
        default: Color32::WHITE,
        hover: Color32::from_rgb(241, 243, 244),
        selected: Some(Color32::from_rgb(210, 227, 252)),
    }
}
