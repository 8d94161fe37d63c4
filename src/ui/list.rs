use crate::types::StateColors;
use eframe::emath::{Align2, Vec2};
use eframe::epaint::{Color32, FontId, StrokeKind};
use egui::{Response, Sense, Ui};

/// Two-line list row: a title and a muted subtitle, with an optional
/// colored badge on the right.
pub fn app_row(
    ui: &mut Ui,
    title: &str,
    subtitle: &str,
    badge: Option<(&str, Color32)>,
    size: Vec2,
    selected: bool,
    colors: StateColors,
) -> Response {
    let (rect, response) = ui.allocate_exact_size(size, Sense::click());

    if ui.is_rect_visible(rect) {
        let visuals = ui.style().interact_selectable(&response, selected);
        let bg_fill = if selected {
            colors.selected.unwrap_or(visuals.bg_fill)
        } else if response.hovered() {
            colors.hover
        } else {
            colors.default
        };

        let painter = ui.painter();
        painter.rect_filled(rect, 4.0, bg_fill);
        painter.rect_stroke(rect, 4.0, visuals.bg_stroke, StrokeKind::Middle);

        let left = rect.left() + 10.0;
        painter.text(
            egui::pos2(left, rect.top() + size.y * 0.33),
            Align2::LEFT_CENTER,
            title,
            FontId::proportional(14.0),
            visuals.text_color(),
        );
        painter.text(
            egui::pos2(left, rect.top() + size.y * 0.72),
            Align2::LEFT_CENTER,
            subtitle,
            FontId::proportional(11.0),
            crate::style::MUTED_TEXT,
        );
        if let Some((badge, color)) = badge {
            painter.text(
                rect.right_center() - Vec2::new(10.0, 0.0),
                Align2::RIGHT_CENTER,
                badge,
                FontId::proportional(11.0),
                color,
            );
        }
    }

    response
}
