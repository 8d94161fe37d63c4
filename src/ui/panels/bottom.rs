use eframe::egui;

use crate::style::MUTED_TEXT;
use crate::viewmodel::HomeUiState;

/// Counts shown in the status bar.
#[derive(Debug, Default, PartialEq, Eq)]
struct ListSummary {
    total: usize,
    system: usize,
    disabled: usize,
    with_services: usize,
}

fn summarize(state: &HomeUiState) -> ListSummary {
    match state {
        HomeUiState::NoApps { .. } => ListSummary::default(),
        HomeUiState::Success { app_list, .. } => ListSummary {
            total: app_list.len(),
            system: app_list.iter().filter(|a| a.is_system).count(),
            disabled: app_list.iter().filter(|a| !a.is_enabled).count(),
            with_services: app_list.iter().filter(|a| a.service_status.is_some()).count(),
        },
    }
}

/// Render the bottom status bar.
pub fn show(ctx: &egui::Context, state: &HomeUiState) {
    let summary = summarize(state);
    let text = if state.is_loading() {
        format!("Loading…  •  Applications: {}", summary.total)
    } else {
        format!(
            "Applications: {}  •  System {}  •  Disabled {}  •  Service info {}",
            summary.total, summary.system, summary.disabled, summary.with_services
        )
    };
    egui::TopBottomPanel::bottom("bottom_status")
        .resizable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.set_height(28.0);
                ui.centered_and_justified(|ui| {
                    ui.label(egui::RichText::new(text).color(MUTED_TEXT).monospace());
                });
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tests::app;
    use std::sync::Arc;

    #[test]
    fn summary_counts_badges() {
        let mut list = vec![app("a", "A"), app("b", "B"), app("c", "C")];
        list[0].is_system = true;
        list[1].is_enabled = false;
        let state = HomeUiState::Success {
            selected_app: list[0].clone(),
            app_list: Arc::new(list),
            is_detail_open: false,
            is_loading: false,
            error: None,
        };
        assert_eq!(
            summarize(&state),
            ListSummary {
                total: 3,
                system: 1,
                disabled: 1,
                with_services: 0
            }
        );
    }
}
