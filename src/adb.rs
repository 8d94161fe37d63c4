//! Device access through `adb shell`: package listing, `dumpsys` parsing and
//! package-management commands.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::process::Command;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::config::HostConfig;
use crate::host::{
    AppEnumerator, CommandExecutor, FileRemover, InstalledApp, PackageClassifier, PackageCommand,
    ServiceStatusOracle,
};
use crate::types::{AppServiceStatus, PackageMetadata};

const DUMPSYS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("`{command}` was rejected by the device: {output}")]
    Rejected { command: String, output: String },
}

/// Host implementation backed by the `adb` command line tool.
pub struct AdbHost {
    config: HostConfig,
    system_packages: Mutex<Option<HashSet<String>>>,
}

impl AdbHost {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            system_packages: Mutex::new(None),
        }
    }

    /// Run `adb shell <args>` and return stdout.
    fn shell(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.config.adb_path);
        if let Some(serial) = &self.config.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.arg("shell").args(args);
        log::debug!("adb shell {}", args.join(" "));

        let out = cmd
            .output()
            .with_context(|| format!("Failed to run {}", self.config.adb_path.display()))?;
        if !out.status.success() {
            return Err(CommandError::Failed {
                command: args.join(" "),
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    /// Run a command that may need elevated rights.
    fn privileged_shell(&self, args: &[&str]) -> Result<String> {
        if self.config.root {
            let joined = args.join(" ");
            self.shell(&["su", "-c", joined.as_str()])
        } else {
            self.shell(args)
        }
    }

    fn dump_package(&self, package_name: &str) -> Result<Option<InstalledApp>> {
        let out = self
            .shell(&["dumpsys", "package", package_name])
            .with_context(|| format!("Read package info of {package_name}"))?;
        Ok(parse_package_dump(package_name, &out))
    }

    /// Run `f` on the cached system package set, listing it on first use.
    fn with_system_packages<R>(&self, f: impl FnOnce(&HashSet<String>) -> R) -> Result<R> {
        let mut cached = self
            .system_packages
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(set) = cached.as_ref() {
            return Ok(f(set));
        }
        let out = self
            .shell(&["pm", "list", "packages", "-s"])
            .context("List system packages")?;
        let set = cached.insert(parse_package_list(&out).into_iter().collect());
        Ok(f(set))
    }
}

impl AppEnumerator for AdbHost {
    fn list_applications(&self, include_system: bool) -> Result<Vec<InstalledApp>> {
        // system set may have changed since the last listing
        *self
            .system_packages
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;

        let args: &[&str] = if include_system {
            &["pm", "list", "packages"]
        } else {
            &["pm", "list", "packages", "-3"]
        };
        let out = self.shell(args).context("List installed packages")?;
        let dump = self
            .shell(&["dumpsys", "package", "packages"])
            .context("Read package info")?;

        let mut dumped: HashMap<String, InstalledApp> = parse_package_dumps(&dump)
            .into_iter()
            .map(|app| (app.package_name.clone(), app))
            .collect();
        let mut res = Vec::new();
        for pkg in parse_package_list(&out) {
            match dumped.remove(&pkg) {
                Some(app) => res.push(app),
                None => log::warn!("{pkg} disappeared while listing packages"),
            }
        }
        Ok(res)
    }

    fn find_application(&self, package_name: &str) -> Result<Option<InstalledApp>> {
        self.dump_package(package_name)
    }
}

impl PackageClassifier for AdbHost {
    fn is_system_app(&self, package_name: &str) -> Result<bool> {
        self.with_system_packages(|set| set.contains(package_name))
    }
}

impl ServiceStatusOracle for AdbHost {
    fn service_status(&self, package_name: &str) -> Result<AppServiceStatus> {
        let package_dump = self
            .shell(&["dumpsys", "package", package_name])
            .with_context(|| format!("Read services of {package_name}"))?;
        let activity_dump = self
            .shell(&["dumpsys", "activity", "services", package_name])
            .with_context(|| format!("Read running services of {package_name}"))?;
        Ok(parse_service_status(package_name, &package_dump, &activity_dump))
    }
}

impl CommandExecutor for AdbHost {
    fn execute(&self, command: &PackageCommand) -> Result<()> {
        let out = self.privileged_shell(&command.shell_args())?;
        if let Some(line) = out.lines().map(str::trim).find(|l| is_rejection(l)) {
            return Err(CommandError::Rejected {
                command: command.to_string(),
                output: line.to_string(),
            }
            .into());
        }
        log::info!("{command}: {}", out.trim());
        Ok(())
    }
}

impl FileRemover for AdbHost {
    fn delete_recursively(&self, path: &Path) -> Result<()> {
        let path_s = path.to_string_lossy();
        self.privileged_shell(&["rm", "-rf", path_s.as_ref()])
            .with_context(|| format!("Failed to remove dir {path_s}"))?;
        Ok(())
    }
}

fn is_rejection(line: &str) -> bool {
    ["Failure", "Failed", "Error", "Exception", "Unknown package"]
        .iter()
        .any(|p| line.starts_with(p))
}

/// Package names from `pm list packages` output (with or without `-f`).
pub fn parse_package_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(|rest| match rest.rsplit_once('=') {
            Some((_path, name)) => name,
            None => rest,
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), DUMPSYS_TIME_FORMAT).ok()
}

/// Lines of the `Package [name]` block of `dumpsys package` output.
fn package_block<'a>(package_name: &str, output: &'a str) -> Option<Vec<&'a str>> {
    let header = format!("Package [{package_name}]");
    let mut lines = output.lines().skip_while(|l| !l.trim_start().starts_with(&header));
    let first = lines.next()?;
    let indent = first.len() - first.trim_start().len();
    let block = lines
        .take_while(|l| l.trim().is_empty() || l.len() - l.trim_start().len() > indent)
        .collect();
    Some(block)
}

/// Extract an [`InstalledApp`] from `dumpsys package <name>` output.
pub fn parse_package_dump(package_name: &str, output: &str) -> Option<InstalledApp> {
    let block = package_block(package_name, output)?;
    Some(parse_block(package_name, block))
}

/// Every `Package [name]` block of `dumpsys package packages` output, in one pass.
pub fn parse_package_dumps(output: &str) -> Vec<InstalledApp> {
    let mut apps = Vec::new();
    let mut current: Option<(&str, usize, Vec<&str>)> = None;
    for line in output.lines() {
        let indent = line.len() - line.trim_start().len();
        if let Some((_, block_indent, block)) = current.as_mut() {
            if line.trim().is_empty() || indent > *block_indent {
                block.push(line);
                continue;
            }
        }
        if let Some((name, _, block)) = current.take() {
            apps.push(parse_block(name, block));
        }
        if let Some(name) = package_header(line) {
            current = Some((name, indent, Vec::new()));
        }
    }
    if let Some((name, _, block)) = current {
        apps.push(parse_block(name, block));
    }
    apps
}

/// `Package [com.example] (5c6d7e):` -> `com.example`.
fn package_header(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("Package [")?;
    rest.split_once(']').map(|(name, _)| name)
}

fn parse_block(package_name: &str, block: Vec<&str>) -> InstalledApp {
    let mut app = InstalledApp {
        package_name: package_name.to_string(),
        label: package_name.to_string(),
        version_name: None,
        version_code: 0,
        is_enabled: true,
        first_install_time: None,
        last_update_time: None,
        package_info: None,
    };
    let mut meta = PackageMetadata::default();
    let mut seen_user = false;

    for line in block {
        let line = line.trim();
        if let Some(v) = line.strip_prefix("versionName=") {
            app.version_name = Some(v.to_string());
        } else if let Some(v) = line.strip_prefix("firstInstallTime=") {
            app.first_install_time = parse_time(v);
        } else if let Some(v) = line.strip_prefix("lastUpdateTime=") {
            app.last_update_time = parse_time(v);
        } else if let Some(v) = line.strip_prefix("codePath=") {
            meta.code_path = Some(v.to_string());
        } else if let Some(v) = line.strip_prefix("dataDir=") {
            meta.data_dir = Some(v.to_string());
        } else if let Some(v) = line.strip_prefix("installerPackageName=") {
            meta.installer = Some(v.to_string()).filter(|s| s != "null");
        } else if line.starts_with("versionCode=") {
            // versionCode=42 minSdk=21 targetSdk=33
            for token in line.split_whitespace() {
                match token.split_once('=') {
                    Some(("versionCode", v)) => app.version_code = v.parse().unwrap_or(0),
                    Some(("minSdk", v)) => meta.min_sdk = v.parse().ok(),
                    Some(("targetSdk", v)) => meta.target_sdk = v.parse().ok(),
                    _ => {}
                }
            }
        } else if line.starts_with("User ") && !seen_user {
            // first user entry is the current one
            seen_user = true;
            if let Some(state) = line
                .split_whitespace()
                .find_map(|t| t.strip_prefix("enabled="))
            {
                // 0 default, 1 enabled, 2 disabled, 3 disabled-user, 4 disabled-until-used
                app.is_enabled = matches!(state, "0" | "1");
            }
        }
    }

    if meta != PackageMetadata::default() {
        app.package_info = Some(meta);
    }
    app
}

/// `com.example/.Svc` -> `com.example.Svc`, `com.example/com.other.Svc` -> `com.other.Svc`.
fn normalize_component(token: &str) -> Option<String> {
    let (pkg, class) = token.split_once('/')?;
    if class.is_empty() {
        return None;
    }
    Some(if let Some(rel) = class.strip_prefix('.') {
        format!("{pkg}.{rel}")
    } else {
        class.to_string()
    })
}

/// Count declared, disabled and running services of `package_name`.
///
/// Declared services come from the service resolver table of
/// `dumpsys package`, running ones from `dumpsys activity services`.
pub fn parse_service_status(
    package_name: &str,
    package_dump: &str,
    activity_dump: &str,
) -> AppServiceStatus {
    let prefix = format!("{package_name}/");

    let mut declared = BTreeSet::new();
    let mut in_resolver = false;
    for line in package_dump.lines() {
        if line.ends_with("Resolver Table:") {
            in_resolver = line.trim_start().starts_with("Service Resolver Table");
            continue;
        }
        if !in_resolver {
            continue;
        }
        if !line.starts_with(' ') && !line.trim().is_empty() {
            in_resolver = false;
            continue;
        }
        declared.extend(
            line.split_whitespace()
                .filter(|t| t.starts_with(&prefix))
                .filter_map(normalize_component),
        );
    }

    let mut running = BTreeSet::new();
    for line in activity_dump.lines() {
        let Some(rest) = line.trim().strip_prefix("* ServiceRecord{") else {
            continue;
        };
        if let Some(name) = rest
            .trim_end_matches('}')
            .split_whitespace()
            .filter(|t| t.starts_with(&prefix))
            .find_map(normalize_component)
        {
            running.insert(name);
        }
    }
    declared.extend(running.iter().cloned());

    let mut disabled = HashSet::new();
    let mut in_disabled = false;
    for line in package_dump.lines() {
        let trimmed = line.trim();
        if trimmed == "disabledComponents:" {
            in_disabled = true;
            continue;
        }
        if in_disabled {
            if trimmed.is_empty() || trimmed.ends_with(':') || trimmed.contains('=') {
                in_disabled = false;
            } else {
                disabled.insert(trimmed.to_string());
            }
        }
    }

    AppServiceStatus {
        package_name: package_name.to_string(),
        running: running.len(),
        blocked: declared.iter().filter(|s| disabled.contains(*s)).count(),
        total: declared.len(),
    }
}
