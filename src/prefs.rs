//! User preferences persisted as JSON, observable by the view model.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::observable::Observable;
use crate::types::AppSorting;

const USER_DATA_FILE: &str = "user_data.json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserData {
    pub app_sorting: AppSorting,
    pub show_system_apps: bool,
    pub show_service_info: bool,
}

impl Default for UserData {
    fn default() -> Self {
        Self {
            app_sorting: AppSorting::NameAscending,
            show_system_apps: false,
            show_service_info: true,
        }
    }
}

pub struct PreferenceStore {
    data: Observable<UserData>,
    path: Option<PathBuf>,
}

impl PreferenceStore {
    /// Load `user_data.json` from `dir`, falling back to defaults when absent.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(USER_DATA_FILE);
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Read preferences {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Parse preferences {}", path.display()))?
        } else {
            UserData::default()
        };
        log::debug!("Loaded preferences {data:?} from {}", path.display());
        Ok(Self {
            data: Observable::new(data),
            path: Some(path),
        })
    }

    /// Store that never touches disk.
    pub fn in_memory(data: UserData) -> Self {
        Self {
            data: Observable::new(data),
            path: None,
        }
    }

    pub fn user_data(&self) -> UserData {
        self.data.get()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<UserData> {
        self.data.subscribe()
    }

    pub fn set_app_sorting(&self, sorting: AppSorting) -> Result<()> {
        self.modify(|d| d.app_sorting = sorting)
    }

    pub fn set_show_system_apps(&self, show: bool) -> Result<()> {
        self.modify(|d| d.show_system_apps = show)
    }

    pub fn set_show_service_info(&self, show: bool) -> Result<()> {
        self.modify(|d| d.show_service_info = show)
    }

    /// Apply `f`, write the file and publish the result as one step, so
    /// concurrent setters never overwrite each other's fields.
    fn modify(&self, f: impl FnOnce(&mut UserData)) -> Result<()> {
        self.data.try_update(|current| -> Result<bool> {
            let mut next = current.clone();
            f(&mut next);
            if next == *current {
                return Ok(false);
            }
            if let Some(path) = &self.path {
                save(path, &next)?;
            }
            *current = next;
            Ok(true)
        })?;
        Ok(())
    }
}

fn save(path: &Path, data: &UserData) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json).with_context(|| format!("Write preferences {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::load(dir.path()).unwrap();
        assert_eq!(store.user_data(), UserData::default());
    }

    #[test]
    fn changes_persist_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("app-blocker");
        {
            let store = PreferenceStore::load(&nested).unwrap();
            store.set_app_sorting(AppSorting::LastUpdateTimeDescending).unwrap();
            store.set_show_system_apps(true).unwrap();
        }
        let store = PreferenceStore::load(&nested).unwrap();
        let data = store.user_data();
        assert_eq!(data.app_sorting, AppSorting::LastUpdateTimeDescending);
        assert!(data.show_system_apps);
        assert!(data.show_service_info);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(USER_DATA_FILE),
            r#"{"app_sorting":"NAME_DESCENDING"}"#,
        )
        .unwrap();
        let data = PreferenceStore::load(dir.path()).unwrap().user_data();
        assert_eq!(data.app_sorting, AppSorting::NameDescending);
        assert_eq!(data.show_system_apps, UserData::default().show_system_apps);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(USER_DATA_FILE), "{not json").unwrap();
        assert!(PreferenceStore::load(dir.path()).is_err());
    }

    #[test]
    fn concurrent_setters_keep_both_changes() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        for _ in 0..200 {
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(PreferenceStore::load(dir.path()).unwrap());
            let barrier = Arc::new(Barrier::new(2));

            let sorting = {
                let (store, barrier) = (store.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    store.set_app_sorting(AppSorting::NameDescending).unwrap();
                })
            };
            let system = {
                let (store, barrier) = (store.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    store.set_show_system_apps(true).unwrap();
                })
            };
            sorting.join().unwrap();
            system.join().unwrap();

            let expected = UserData {
                app_sorting: AppSorting::NameDescending,
                show_system_apps: true,
                ..UserData::default()
            };
            assert_eq!(store.user_data(), expected);
            assert_eq!(PreferenceStore::load(dir.path()).unwrap().user_data(), expected);
        }
    }

    #[test]
    fn failed_save_leaves_value_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the config directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = PreferenceStore::load(&blocker).unwrap();
        let rx = store.subscribe();

        assert!(store.set_show_system_apps(true).is_err());
        assert_eq!(store.user_data(), UserData::default());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unchanged_value_does_not_notify() {
        let store = PreferenceStore::in_memory(UserData::default());
        let rx = store.subscribe();
        store.set_app_sorting(AppSorting::NameAscending).unwrap();
        assert!(rx.try_recv().is_err());
        store.set_show_service_info(false).unwrap();
        assert!(!rx.try_recv().unwrap().show_service_info);
    }
}
