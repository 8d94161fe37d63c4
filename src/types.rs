//! Core data types shared across the application.

use std::fmt;

use chrono::NaiveDateTime;
use egui::Color32;
use serde::{Deserialize, Serialize};

/// Installed application on the device, enriched for display.
#[derive(Clone, Debug, PartialEq)]
pub struct Application {
    pub package_name: String,
    pub label: String,
    pub version_name: String,
    pub version_code: i64,
    pub is_system: bool,
    pub is_running: bool,
    pub is_enabled: bool,
    pub first_install_time: Option<NaiveDateTime>,
    pub last_update_time: Option<NaiveDateTime>,
    pub package_info: Option<PackageMetadata>,
    pub service_status: Option<AppServiceStatus>,
}

/// Extra package metadata reported by the package manager.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackageMetadata {
    pub code_path: Option<String>,
    pub data_dir: Option<String>,
    pub target_sdk: Option<u32>,
    pub min_sdk: Option<u32>,
    pub installer: Option<String>,
}

/// Running/blocked/total service counts for one package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppServiceStatus {
    pub package_name: String,
    pub running: usize,
    pub blocked: usize,
    pub total: usize,
}

impl AppServiceStatus {
    pub fn summary(&self) -> String {
        format!(
            "{} running • {} blocked • {} total",
            self.running, self.blocked, self.total
        )
    }
}

/// Sort order of the application list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppSorting {
    #[default]
    NameAscending,
    NameDescending,
    FirstInstallTimeAscending,
    FirstInstallTimeDescending,
    LastUpdateTimeAscending,
    LastUpdateTimeDescending,
}

impl AppSorting {
    pub fn all() -> &'static [AppSorting] {
        &[
            Self::NameAscending,
            Self::NameDescending,
            Self::FirstInstallTimeAscending,
            Self::FirstInstallTimeDescending,
            Self::LastUpdateTimeAscending,
            Self::LastUpdateTimeDescending,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NameAscending => "Name (A-Z)",
            Self::NameDescending => "Name (Z-A)",
            Self::FirstInstallTimeAscending => "Install time (oldest)",
            Self::FirstInstallTimeDescending => "Install time (newest)",
            Self::LastUpdateTimeAscending => "Update time (oldest)",
            Self::LastUpdateTimeDescending => "Update time (newest)",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            Self::NameAscending => "NAME_ASCENDING",
            Self::NameDescending => "NAME_DESCENDING",
            Self::FirstInstallTimeAscending => "FIRST_INSTALL_TIME_ASCENDING",
            Self::FirstInstallTimeDescending => "FIRST_INSTALL_TIME_DESCENDING",
            Self::LastUpdateTimeAscending => "LAST_UPDATE_TIME_ASCENDING",
            Self::LastUpdateTimeDescending => "LAST_UPDATE_TIME_DESCENDING",
        }
    }
}

impl fmt::Display for AppSorting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Human readable failure shown in the error dialog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorMessage {
    pub message: String,
    pub detail: Option<String>,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    /// Short message from the outermost context, full chain as detail.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let message = err.to_string();
        let message = if message.is_empty() {
            format!("{err:?}").lines().next().unwrap_or_default().to_string()
        } else {
            message
        };
        Self {
            message,
            detail: Some(format!("{err:?}")),
        }
    }
}

/// Layout of the list/detail screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenType {
    ListAndDetails,
    ListOnly,
    DetailsOnly,
}

impl ScreenType {
    /// Width (in points) from which list and detail are shown side by side.
    pub const EXPANDED_MIN_WIDTH: f32 = 840.0;

    pub fn for_width(width: f32, detail_open: bool) -> Self {
        if width >= Self::EXPANDED_MIN_WIDTH {
            Self::ListAndDetails
        } else if detail_open {
            Self::DetailsOnly
        } else {
            Self::ListOnly
        }
    }
}

pub struct StateColors {
    pub default: Color32,
    pub hover: Color32,
    pub selected: Option<Color32>, // None = use default theme color
}
