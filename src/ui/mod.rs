//! Egui front end of the app blocker.
//!
//! Panels only read state and return the [`UiAction`]s the user triggered.
//! [`BlockerApp`] forwards those actions to the view model after the frame
//! has been laid out.

use std::sync::Arc;

use eframe::{App, egui};

use crate::host::Host;
use crate::prefs::PreferenceStore;
use crate::style::apply_style;
use crate::types::{AppSorting, ScreenType};
use crate::viewmodel::{AppListViewModel, HomeUiState};

mod list;
mod panels;

/// Commands that act on one package of the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageAction {
    ForceStop,
    ClearCache,
    ClearData,
    Enable,
    Disable,
    Uninstall,
}

impl PackageAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ForceStop => "Force stop",
            Self::ClearCache => "Clear cache",
            Self::ClearData => "Clear data",
            Self::Enable => "Enable",
            Self::Disable => "Disable",
            Self::Uninstall => "Uninstall",
        }
    }

    /// Actions offered for an app in the given enabled state.
    pub fn available(is_enabled: bool) -> [PackageAction; 5] {
        let toggle = if is_enabled { Self::Disable } else { Self::Enable };
        [
            Self::ForceStop,
            Self::ClearCache,
            Self::ClearData,
            toggle,
            Self::Uninstall,
        ]
    }
}

/// Entries of the detail action menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetailMenuItem {
    Share,
    FindInPage,
    EnableApp,
    Refresh,
    EnableAll,
    BlockAll,
}

impl DetailMenuItem {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Share => "Share",
            Self::FindInPage => "Find in page",
            Self::EnableApp => "Enable app",
            Self::Refresh => "Refresh",
            Self::EnableAll => "Enable all",
            Self::BlockAll => "Block all",
        }
    }
}

/// Rule and IFW actions of the info tab.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleAction {
    ExportRules,
    ImportRules,
    ExportIfw,
    ImportIfw,
    ResetIfw,
}

impl RuleAction {
    pub const ALL: [RuleAction; 5] = [
        Self::ExportRules,
        Self::ImportRules,
        Self::ExportIfw,
        Self::ImportIfw,
        Self::ResetIfw,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ExportRules => "Export rules",
            Self::ImportRules => "Import rules",
            Self::ExportIfw => "Export IFW rules",
            Self::ImportIfw => "Import IFW rules",
            Self::ResetIfw => "Reset IFW",
        }
    }
}

/// Everything a panel can ask for.
#[derive(Clone, Debug, PartialEq)]
pub enum UiAction {
    Reload,
    SetSorting(AppSorting),
    SetShowSystemApps(bool),
    SetShowServiceInfo(bool),
    Select(String),
    CloseDetail,
    SwitchTab(usize),
    LoadServiceStatus(String),
    Package(PackageAction, String),
    Menu(DetailMenuItem),
    Rules(RuleAction),
    DismissError,
}

/// Main eframe application.
pub struct BlockerApp {
    vm: AppListViewModel,
}

impl BlockerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, host: Host, prefs: Arc<PreferenceStore>) -> Self {
        apply_style(&cc.egui_ctx);
        let ctx = cc.egui_ctx.clone();
        let vm = AppListViewModel::new(host, prefs, move || ctx.request_repaint());
        Self { vm }
    }

    fn dispatch(&self, action: UiAction) {
        log::trace!("UI action: {action:?}");
        match action {
            UiAction::Reload => self.vm.load_data(),
            UiAction::SetSorting(sorting) => self.vm.update_sorting(sorting),
            UiAction::SetShowSystemApps(show) => self.vm.set_show_system_apps(show),
            UiAction::SetShowServiceInfo(show) => self.vm.set_show_service_info(show),
            UiAction::Select(pkg) => self.vm.select_app(&pkg),
            UiAction::CloseDetail => self.vm.close_detail(),
            UiAction::SwitchTab(index) => self.vm.switch_tab(index),
            UiAction::LoadServiceStatus(pkg) => self.vm.update_service_status(&pkg),
            UiAction::Package(action, pkg) => match action {
                PackageAction::ForceStop => self.vm.force_stop(&pkg),
                PackageAction::ClearCache => self.vm.clear_cache(&pkg),
                PackageAction::ClearData => self.vm.clear_data(&pkg),
                PackageAction::Enable => self.vm.enable(&pkg),
                PackageAction::Disable => self.vm.disable(&pkg),
                PackageAction::Uninstall => self.vm.uninstall(&pkg),
            },
            UiAction::Menu(item) => match item {
                DetailMenuItem::Share => self.vm.on_share(),
                DetailMenuItem::FindInPage => self.vm.on_find_in_page(),
                DetailMenuItem::EnableApp => self.vm.on_enable_app(),
                DetailMenuItem::Refresh => self.vm.on_refresh(),
                DetailMenuItem::EnableAll => self.vm.on_enable_all(),
                DetailMenuItem::BlockAll => self.vm.on_block_all(),
            },
            UiAction::Rules(rule) => match rule {
                RuleAction::ExportRules => self.vm.on_export_rules(),
                RuleAction::ImportRules => self.vm.on_import_rules(),
                RuleAction::ExportIfw => self.vm.on_export_ifw(),
                RuleAction::ImportIfw => self.vm.on_import_ifw(),
                RuleAction::ResetIfw => self.vm.on_reset_ifw(),
            },
            UiAction::DismissError => self.vm.dismiss_error(),
        }
    }
}

impl App for BlockerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let state = self.vm.ui_state();
        let tabs = self.vm.tab_state();
        let prefs = self.vm.user_data();
        let mut actions = Vec::new();

        actions.extend(panels::top::show(ctx, &prefs, state.is_loading()));
        panels::bottom::show(ctx, &state);

        let detail_open = matches!(state, HomeUiState::Success { is_detail_open: true, .. });
        match ScreenType::for_width(ctx.screen_rect().width(), detail_open) {
            ScreenType::ListAndDetails => {
                actions.extend(panels::side::show_panel(ctx, &state, &prefs));
                actions.extend(panels::central::show(ctx, &state, &tabs, false));
            }
            ScreenType::ListOnly => {
                actions.extend(panels::side::show_full(ctx, &state, &prefs));
            }
            ScreenType::DetailsOnly => {
                actions.extend(panels::central::show(ctx, &state, &tabs, true));
            }
        }

        let error = self.vm.error_state().or_else(|| state.error().cloned());
        if let Some(error) = error {
            actions.extend(panels::error::show(ctx, &error));
        }

        for action in actions {
            self.dispatch(action);
        }
    }
}
