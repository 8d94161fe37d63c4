//! State holder of the app list screen.
//!
//! [`AppListViewModel`] owns the canonical [`ViewModelState`] and is the only
//! place that writes it. The UI reads immutable snapshots through
//! [`AppListViewModel::ui_state`] and reports gestures by calling the
//! mutation methods, which either update the state directly or launch
//! background work on the screen's [`TaskScope`].

use std::collections::HashSet;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::core::{apply_service_status, build_snapshot, sort_apps};
use crate::host::{Host, PackageCommand, cache_dir_for};
use crate::observable::Observable;
use crate::prefs::{PreferenceStore, UserData};
use crate::queue::SequentialQueue;
use crate::scope::TaskScope;
use crate::tabs::TabState;
use crate::types::{AppSorting, Application, ErrorMessage};

const PREFERENCE_POLL: Duration = Duration::from_millis(100);

/// Canonical, mutable screen state.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewModelState {
    pub is_loading: bool,
    /// `None` until the first successful load. Shared with the UI snapshots;
    /// writers go through `Arc::make_mut`.
    pub app_list: Option<Arc<Vec<Application>>>,
    pub selected_package: Option<String>,
    pub is_detail_open: bool,
    pub error: Option<ErrorMessage>,
}

impl Default for ViewModelState {
    fn default() -> Self {
        Self {
            is_loading: true,
            app_list: None,
            selected_package: None,
            is_detail_open: false,
            error: None,
        }
    }
}

/// Read-only state the UI renders from.
#[derive(Clone, Debug, PartialEq)]
pub enum HomeUiState {
    NoApps {
        is_loading: bool,
        error: Option<ErrorMessage>,
    },
    Success {
        app_list: Arc<Vec<Application>>,
        selected_app: Application,
        is_detail_open: bool,
        is_loading: bool,
        error: Option<ErrorMessage>,
    },
}

impl HomeUiState {
    pub fn is_loading(&self) -> bool {
        match self {
            Self::NoApps { is_loading, .. } | Self::Success { is_loading, .. } => *is_loading,
        }
    }

    pub fn error(&self) -> Option<&ErrorMessage> {
        match self {
            Self::NoApps { error, .. } | Self::Success { error, .. } => error.as_ref(),
        }
    }
}

impl ViewModelState {
    /// Resolve the selection: the stored package if still listed, else the first entry.
    pub fn to_ui_state(&self) -> HomeUiState {
        let list = match &self.app_list {
            Some(list) if !list.is_empty() => list,
            _ => {
                return HomeUiState::NoApps {
                    is_loading: self.is_loading,
                    error: self.error.clone(),
                };
            }
        };
        let selected_app = self
            .selected_package
            .as_deref()
            .and_then(|pkg| list.iter().find(|a| a.package_name == pkg))
            .unwrap_or(&list[0])
            .clone();
        HomeUiState::Success {
            app_list: list.clone(),
            selected_app,
            is_detail_open: self.is_detail_open,
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}

/// State shared between the view model and its background tasks.
struct Shared {
    host: Host,
    prefs: Arc<PreferenceStore>,
    state: Observable<ViewModelState>,
    error_state: Arc<Observable<Option<ErrorMessage>>>,
    tab_state: Observable<TabState>,
    /// Packages with a service-status lookup waiting in the queue.
    pending_status: Mutex<HashSet<String>>,
    scope: TaskScope,
    repaint: Arc<dyn Fn() + Send + Sync>,
}

impl Shared {
    fn update_state<R>(&self, f: impl FnOnce(&mut ViewModelState) -> R) -> R {
        let res = self.state.update(f);
        (self.repaint)();
        res
    }

    fn pending_status(&self) -> MutexGuard<'_, HashSet<String>> {
        self.pending_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the list with a fresh, sorted snapshot.
    fn load(&self) -> Result<()> {
        self.update_state(|s| s.is_loading = true);
        let prefs = self.prefs.user_data();
        let result = self
            .host
            .enumerator
            .list_applications(prefs.show_system_apps)
            .context("Load installed applications")
            .and_then(|raw| build_snapshot(raw, self.host.classifier.as_ref()))
            .map(|mut list| {
                sort_apps(&mut list, prefs.app_sorting);
                list
            });
        if self.scope.is_cancelled() {
            return Ok(());
        }
        match result {
            Ok(list) => {
                log::debug!("Loaded {} applications", list.len());
                self.pending_status().clear();
                self.update_state(|s| {
                    s.app_list = Some(Arc::new(list));
                    s.is_loading = false;
                });
                Ok(())
            }
            Err(e) => {
                // keep whatever list we had
                self.update_state(|s| s.is_loading = false);
                Err(e)
            }
        }
    }

    fn sort(&self, sorting: AppSorting) {
        if self.scope.is_cancelled() {
            return;
        }
        log::debug!("Sort applications by {sorting}");
        self.update_state(|s| {
            if let Some(list) = s.app_list.as_mut() {
                sort_apps(Arc::<Vec<Application>>::make_mut(list), sorting);
            }
        });
    }

    fn needs_service_status(&self, package_name: &str) -> bool {
        self.state.with(|s| {
            s.app_list
                .iter()
                .flat_map(|list| list.iter())
                .any(|a| a.package_name == package_name && a.service_status.is_none())
        })
    }

    fn refresh_service_status(&self, package_name: &str) -> Result<()> {
        if !self.prefs.user_data().show_service_info {
            return Ok(());
        }
        let ready = self.state.with(|s| !s.is_loading && s.app_list.is_some());
        if !ready {
            log::warn!("List not ready, skip service status of {package_name}");
            return Ok(());
        }
        if !self.needs_service_status(package_name) {
            return Ok(());
        }
        log::debug!("Get service status for {package_name}");
        let status = self
            .host
            .status_oracle
            .service_status(package_name)
            .with_context(|| format!("Get service status of {package_name}"))?;
        if self.scope.is_cancelled() {
            return Ok(());
        }
        let applied = self.update_state(|s| {
            s.app_list
                .as_mut()
                .is_some_and(|list| apply_service_status(Arc::<Vec<Application>>::make_mut(list), status))
        });
        if !applied {
            log::debug!("{package_name} left the list before its service status arrived");
        }
        Ok(())
    }
}

fn launch_load(shared: &Arc<Shared>) {
    let task = shared.clone();
    shared.scope.launch("load-apps", move || task.load());
}

fn launch_sort(shared: &Arc<Shared>, sorting: AppSorting) {
    let task = shared.clone();
    shared.scope.launch("sort-apps", move || {
        task.sort(sorting);
        Ok(())
    });
}

/// Re-sort on sorting changes and reload on "show system apps" changes.
fn listen_preference_changes(shared: &Arc<Shared>) {
    let rx = shared.prefs.subscribe();
    let mut last: UserData = shared.prefs.user_data();
    let listener = shared.clone();
    shared.scope.launch_loop("preference-listener", move || {
        loop {
            match rx.recv_timeout(PREFERENCE_POLL) {
                Ok(data) => {
                    if data.app_sorting != last.app_sorting {
                        launch_sort(&listener, data.app_sorting);
                    }
                    if data.show_system_apps != last.show_system_apps {
                        launch_load(&listener);
                    }
                    last = data;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if listener.scope.is_cancelled() {
                break;
            }
        }
        log::debug!("Preference listener stopped");
    });
}

fn not_implemented(action: &str) {
    log::warn!("{action} is not implemented yet");
}

pub struct AppListViewModel {
    shared: Arc<Shared>,
    queue: SequentialQueue,
}

impl AppListViewModel {
    /// Create the view model, start the first load and watch preferences.
    ///
    /// `repaint` is called after every state change.
    pub fn new(
        host: Host,
        prefs: Arc<PreferenceStore>,
        repaint: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let repaint: Arc<dyn Fn() + Send + Sync> = Arc::new(repaint);
        let error_state = Arc::new(Observable::new(None));

        let sink = error_state.clone();
        let sink_repaint = repaint.clone();
        let scope = TaskScope::new(move |err: ErrorMessage| {
            sink.set(Some(err));
            sink_repaint();
        });

        let shared = Arc::new(Shared {
            host,
            prefs,
            state: Observable::new(ViewModelState::default()),
            error_state,
            tab_state: Observable::new(TabState::default()),
            pending_status: Mutex::new(HashSet::new()),
            scope: scope.clone(),
            repaint,
        });
        let vm = Self {
            queue: SequentialQueue::new(scope, "service-status"),
            shared,
        };
        vm.load_data();
        listen_preference_changes(&vm.shared);
        vm
    }

    pub fn ui_state(&self) -> HomeUiState {
        self.shared.state.with(ViewModelState::to_ui_state)
    }

    pub fn error_state(&self) -> Option<ErrorMessage> {
        self.shared.error_state.get()
    }

    pub fn tab_state(&self) -> TabState {
        self.shared.tab_state.get()
    }

    pub fn user_data(&self) -> UserData {
        self.shared.prefs.user_data()
    }

    pub fn load_data(&self) {
        launch_load(&self.shared);
    }

    /// Persist a new sort order; the preference listener re-sorts the list.
    pub fn update_sorting(&self, sorting: AppSorting) {
        let shared = self.shared.clone();
        self.shared.scope.launch("update-sorting", move || {
            shared.prefs.set_app_sorting(sorting)
        });
    }

    pub fn set_show_system_apps(&self, show: bool) {
        let shared = self.shared.clone();
        self.shared.scope.launch("update-show-system-apps", move || {
            shared.prefs.set_show_system_apps(show)
        });
    }

    pub fn set_show_service_info(&self, show: bool) {
        let shared = self.shared.clone();
        self.shared.scope.launch("update-show-service-info", move || {
            shared.prefs.set_show_service_info(show)
        });
    }

    /// Open the detail of `package_name` after checking it is still installed.
    pub fn select_app(&self, package_name: &str) {
        let shared = self.shared.clone();
        let package_name = package_name.to_string();
        self.shared.scope.launch("load-detail", move || {
            let found = shared
                .host
                .enumerator
                .find_application(&package_name)
                .with_context(|| format!("Look up {package_name}"))?;
            if shared.scope.is_cancelled() {
                return Ok(());
            }
            match found {
                Some(app) => shared.update_state(|s| {
                    s.selected_package = Some(app.package_name);
                    s.is_detail_open = true;
                }),
                None => {
                    let error = ErrorMessage::new(format!("Can't find {package_name} in this device."));
                    log::error!("{}", error.message);
                    shared.update_state(|s| s.error = Some(error));
                }
            }
            Ok(())
        });
    }

    pub fn close_detail(&self) {
        self.shared.update_state(|s| s.is_detail_open = false);
    }

    pub fn switch_tab(&self, index: usize) {
        if self.shared.tab_state.with(|t| t.current_index() == index) {
            return;
        }
        self.shared.tab_state.update(|t| t.switch_tab(index));
        (self.shared.repaint)();
    }

    /// Queue a service-status lookup for `package_name`.
    ///
    /// Lookups run one at a time. A package that already has a status, is
    /// already waiting in the queue, or failed since the last load is not
    /// looked up again.
    pub fn update_service_status(&self, package_name: &str) {
        if !self.shared.prefs.user_data().show_service_info
            || !self.shared.needs_service_status(package_name)
        {
            return;
        }
        if !self.shared.pending_status().insert(package_name.to_string()) {
            return;
        }
        let shared = self.shared.clone();
        let pkg = package_name.to_string();
        let submitted = self.queue.submit(move || {
            let res = shared.refresh_service_status(&pkg);
            // a failed package stays pending until the next load
            if res.is_ok() {
                shared.pending_status().remove(&pkg);
            }
            res
        });
        if !submitted {
            self.shared.pending_status().remove(package_name);
        }
    }

    pub fn dismiss_error(&self) {
        self.shared.error_state.set(None);
        self.shared.update_state(|s| s.error = None);
    }

    pub fn clear_cache(&self, package_name: &str) {
        let shared = self.shared.clone();
        let package_name = package_name.to_string();
        self.shared.scope.launch("clear-cache", move || {
            let cache_dir = cache_dir_for(&package_name);
            log::debug!("Delete cache folder: {}", cache_dir.display());
            shared.host.remover.delete_recursively(&cache_dir)
        });
    }

    pub fn clear_data(&self, package_name: &str) {
        self.run_command(PackageCommand::ClearData(package_name.to_string()));
    }

    pub fn uninstall(&self, package_name: &str) {
        self.run_command(PackageCommand::Uninstall(package_name.to_string()));
    }

    pub fn force_stop(&self, package_name: &str) {
        self.run_command(PackageCommand::ForceStop(package_name.to_string()));
    }

    pub fn enable(&self, package_name: &str) {
        self.run_command(PackageCommand::Enable(package_name.to_string()));
    }

    pub fn disable(&self, package_name: &str) {
        self.run_command(PackageCommand::Disable(package_name.to_string()));
    }

    fn run_command(&self, command: PackageCommand) {
        let shared = self.shared.clone();
        self.shared.scope.launch("package-command", move || {
            shared
                .host
                .executor
                .execute(&command)
                .with_context(|| format!("Failed to run `{command}`"))?;
            if command.changes_package_list() {
                launch_load(&shared);
            }
            Ok(())
        });
    }

    pub fn on_refresh(&self) {
        not_implemented("Refresh components");
    }

    pub fn on_share(&self) {
        not_implemented("Share");
    }

    pub fn on_find_in_page(&self) {
        not_implemented("Find in page");
    }

    pub fn on_enable_app(&self) {
        not_implemented("Enable app");
    }

    pub fn on_enable_all(&self) {
        not_implemented("Enable all components");
    }

    pub fn on_block_all(&self) {
        not_implemented("Block all components");
    }

    pub fn on_export_rules(&self) {
        not_implemented("Export rules");
    }

    pub fn on_import_rules(&self) {
        not_implemented("Import rules");
    }

    pub fn on_export_ifw(&self) {
        not_implemented("Export IFW rules");
    }

    pub fn on_import_ifw(&self) {
        not_implemented("Import IFW rules");
    }

    pub fn on_reset_ifw(&self) {
        not_implemented("Reset IFW rules");
    }
}

impl Drop for AppListViewModel {
    fn drop(&mut self) {
        self.shared.scope.cancel();
    }
}
