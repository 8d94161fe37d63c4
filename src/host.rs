//! Seams to the device: package enumeration, classification, service status,
//! privileged commands and file deletion.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::types::{AppServiceStatus, PackageMetadata};

/// Raw application record as reported by the package manager.
#[derive(Clone, Debug, PartialEq)]
pub struct InstalledApp {
    pub package_name: String,
    pub label: String,
    pub version_name: Option<String>,
    pub version_code: i64,
    pub is_enabled: bool,
    pub first_install_time: Option<NaiveDateTime>,
    pub last_update_time: Option<NaiveDateTime>,
    pub package_info: Option<PackageMetadata>,
}

pub trait AppEnumerator: Send + Sync {
    /// All installed apps for the current user, or only third-party ones.
    fn list_applications(&self, include_system: bool) -> Result<Vec<InstalledApp>>;

    /// Look up a single package; `Ok(None)` when it is not installed.
    fn find_application(&self, package_name: &str) -> Result<Option<InstalledApp>>;
}

pub trait PackageClassifier: Send + Sync {
    fn is_system_app(&self, package_name: &str) -> Result<bool>;
}

pub trait ServiceStatusOracle: Send + Sync {
    fn service_status(&self, package_name: &str) -> Result<AppServiceStatus>;
}

pub trait CommandExecutor: Send + Sync {
    fn execute(&self, command: &PackageCommand) -> Result<()>;
}

pub trait FileRemover: Send + Sync {
    /// Recursively delete `path` on the device.
    fn delete_recursively(&self, path: &Path) -> Result<()>;
}

/// Package-management command run through a privileged shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackageCommand {
    ClearData(String),
    Uninstall(String),
    ForceStop(String),
    Enable(String),
    Disable(String),
}

impl PackageCommand {
    pub fn package_name(&self) -> &str {
        match self {
            Self::ClearData(p)
            | Self::Uninstall(p)
            | Self::ForceStop(p)
            | Self::Enable(p)
            | Self::Disable(p) => p,
        }
    }

    /// Shell words, e.g. `["pm", "clear", "com.example"]`.
    pub fn shell_args(&self) -> Vec<&str> {
        let (tool, verb) = match self {
            Self::ClearData(_) => ("pm", "clear"),
            Self::Uninstall(_) => ("pm", "uninstall"),
            Self::ForceStop(_) => ("am", "force-stop"),
            Self::Enable(_) => ("pm", "enable"),
            Self::Disable(_) => ("pm", "disable"),
        };
        vec![tool, verb, self.package_name()]
    }

    /// Whether the device's package list changes after this command.
    pub fn changes_package_list(&self) -> bool {
        !matches!(self, Self::ForceStop(_))
    }
}

impl fmt::Display for PackageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shell_args().join(" "))
    }
}

/// Cache directory of `package_name` inside the device's data partition.
pub fn cache_dir_for(package_name: &str) -> PathBuf {
    Path::new("/data/data").join(package_name).join("cache")
}

/// Bundle of host collaborators handed to the view model.
#[derive(Clone)]
pub struct Host {
    pub enumerator: Arc<dyn AppEnumerator>,
    pub classifier: Arc<dyn PackageClassifier>,
    pub status_oracle: Arc<dyn ServiceStatusOracle>,
    pub executor: Arc<dyn CommandExecutor>,
    pub remover: Arc<dyn FileRemover>,
}

impl Host {
    /// Use a single implementation for every collaborator.
    pub fn from_shared<T>(host: Arc<T>) -> Self
    where
        T: AppEnumerator
            + PackageClassifier
            + ServiceStatusOracle
            + CommandExecutor
            + FileRemover
            + 'static,
    {
        Self {
            enumerator: host.clone(),
            classifier: host.clone(),
            status_oracle: host.clone(),
            executor: host.clone(),
            remover: host,
        }
    }
}
