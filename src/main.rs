mod adb;
mod config;
mod core;
mod host;
mod observable;
mod prefs;
mod queue;
mod scope;
mod style;
mod tabs;
mod types;
mod ui;
mod viewmodel;

use std::sync::Arc;

use eframe::egui;

use crate::adb::AdbHost;
use crate::config::{HostConfig, config_dir};
use crate::host::Host;
use crate::prefs::{PreferenceStore, UserData};

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = HostConfig::from_env();
    log::debug!("Host config: {config:?}");
    let host = Host::from_shared(Arc::new(AdbHost::new(config)));

    let prefs = match PreferenceStore::load(&config_dir()) {
        Ok(prefs) => prefs,
        Err(e) => {
            log::error!("Cannot load preferences, using defaults: {e:?}");
            PreferenceStore::in_memory(UserData::default())
        }
    };
    let prefs = Arc::new(prefs);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([420.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "App Blocker",
        native_options,
        Box::new(move |cc| Ok(Box::new(ui::BlockerApp::new(cc, host, prefs)))),
    )
}
