//! Runtime configuration read from the environment.

use std::env;
use std::path::PathBuf;

use home::home_dir;

/// How to reach the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostConfig {
    /// `adb` binary, `BLOCKER_ADB` or `adb` from PATH.
    pub adb_path: PathBuf,
    /// Target device, `ANDROID_SERIAL`. `None` lets adb pick the only device.
    pub serial: Option<String>,
    /// Wrap privileged commands in `su -c`, `BLOCKER_ROOT=1`.
    pub root: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            serial: None,
            root: false,
        }
    }
}

impl HostConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            adb_path: lookup("BLOCKER_ADB")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.adb_path),
            serial: lookup("ANDROID_SERIAL").filter(|s| !s.trim().is_empty()),
            root: lookup("BLOCKER_ROOT")
                .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.root),
        }
    }
}

/// Directory holding persisted user preferences.
pub fn config_dir() -> PathBuf {
    home_dir()
        .map(|h| h.join(".config"))
        .unwrap_or_else(env::temp_dir)
        .join("app-blocker")
}
