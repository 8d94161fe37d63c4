use std::cmp::Reverse;

use anyhow::{Context, Result};

use crate::host::{InstalledApp, PackageClassifier};
use crate::types::{AppServiceStatus, AppSorting, Application};

// Core list logic: turning host records into display records, ordering them,
// and merging per-package enrichment.

/// Build a fresh snapshot from raw host records.
///
/// Running state and service status are left unset for later enrichment.
/// A classifier failure fails the whole snapshot.
pub fn build_snapshot(
    raw: Vec<InstalledApp>,
    classifier: &dyn PackageClassifier,
) -> Result<Vec<Application>> {
    raw.into_iter()
        .map(|app| {
            let is_system = classifier
                .is_system_app(&app.package_name)
                .with_context(|| format!("Classify {}", app.package_name))?;
            Ok(Application {
                label: app.label,
                version_name: app.version_name.unwrap_or_default(),
                version_code: app.version_code,
                is_system,
                is_running: false,
                is_enabled: app.is_enabled,
                first_install_time: app.first_install_time,
                last_update_time: app.last_update_time,
                package_info: app.package_info,
                service_status: None,
                package_name: app.package_name,
            })
        })
        .collect()
}

/// Stable sort by `sorting`, then move disabled apps after enabled ones.
pub fn sort_apps(list: &mut [Application], sorting: AppSorting) {
    match sorting {
        AppSorting::NameAscending => list.sort_by_cached_key(|a| a.label.to_lowercase()),
        AppSorting::NameDescending => {
            list.sort_by_cached_key(|a| Reverse(a.label.to_lowercase()));
        }
        AppSorting::FirstInstallTimeAscending => list.sort_by_key(|a| a.first_install_time),
        AppSorting::FirstInstallTimeDescending => {
            list.sort_by_key(|a| Reverse(a.first_install_time));
        }
        AppSorting::LastUpdateTimeAscending => list.sort_by_key(|a| a.last_update_time),
        AppSorting::LastUpdateTimeDescending => {
            list.sort_by_key(|a| Reverse(a.last_update_time));
        }
    }
    list.sort_by_key(|a| !a.is_enabled);
}

/// Attach `status` to the entry with the same package name.
///
/// Returns `false` when the entry is gone or already carries a status.
pub fn apply_service_status(list: &mut [Application], status: AppServiceStatus) -> bool {
    match list
        .iter_mut()
        .find(|a| a.package_name == status.package_name)
    {
        Some(app) if app.service_status.is_none() => {
            app.service_status = Some(status);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashSet;

    pub(crate) fn app(package: &str, label: &str) -> Application {
        Application {
            package_name: package.to_string(),
            label: label.to_string(),
            version_name: "1.0".to_string(),
            version_code: 1,
            is_system: false,
            is_running: false,
            is_enabled: true,
            first_install_time: None,
            last_update_time: None,
            package_info: None,
            service_status: None,
        }
    }

    fn day(d: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 1, d).and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    fn labels(list: &[Application]) -> Vec<&str> {
        list.iter().map(|a| a.label.as_str()).collect()
    }

    struct SystemSet(HashSet<&'static str>);

    impl PackageClassifier for SystemSet {
        fn is_system_app(&self, package_name: &str) -> Result<bool> {
            Ok(self.0.contains(package_name))
        }
    }

    struct BrokenClassifier;

    impl PackageClassifier for BrokenClassifier {
        fn is_system_app(&self, _package_name: &str) -> Result<bool> {
            anyhow::bail!("device offline")
        }
    }

    fn raw(package: &str) -> InstalledApp {
        InstalledApp {
            package_name: package.to_string(),
            label: package.to_string(),
            version_name: None,
            version_code: 3,
            is_enabled: true,
            first_install_time: day(1),
            last_update_time: day(2),
            package_info: None,
        }
    }

    #[test]
    fn snapshot_classifies_and_leaves_enrichment_unset() {
        let classifier = SystemSet(["android"].into_iter().collect());
        let list = build_snapshot(vec![raw("android"), raw("com.a")], &classifier).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].is_system);
        assert!(!list[1].is_system);
        assert!(list.iter().all(|a| !a.is_running && a.service_status.is_none()));
        assert_eq!(list[1].version_name, "");
        assert_eq!(list[1].version_code, 3);
    }

    #[test]
    fn snapshot_fails_as_a_whole() {
        assert!(build_snapshot(vec![raw("com.a")], &BrokenClassifier).is_err());
    }

    #[test]
    fn name_descending_is_case_insensitive() {
        let mut list = vec![app("a", "Alpha"), app("b", "beta"), app("g", "Gamma")];
        sort_apps(&mut list, AppSorting::NameDescending);
        assert_eq!(labels(&list), vec!["Gamma", "beta", "Alpha"]);
    }

    #[test]
    fn disabled_apps_move_last_keeping_primary_order() {
        let mut list = vec![app("a", "Alpha"), app("b", "beta"), app("g", "Gamma")];
        list[2].is_enabled = false;
        sort_apps(&mut list, AppSorting::NameDescending);
        assert_eq!(labels(&list), vec!["beta", "Alpha", "Gamma"]);

        for sorting in AppSorting::all() {
            sort_apps(&mut list, *sorting);
            let first_disabled = list.iter().position(|a| !a.is_enabled).unwrap();
            assert!(list[first_disabled..].iter().all(|a| !a.is_enabled));
        }
    }

    #[test]
    fn sorting_is_stable_and_idempotent() {
        let mut list = vec![
            app("x1", "same"),
            app("x2", "Same"),
            app("y", "other"),
            app("x3", "SAME"),
        ];
        for sorting in AppSorting::all() {
            sort_apps(&mut list, *sorting);
            let once = list.clone();
            sort_apps(&mut list, *sorting);
            assert_eq!(list, once, "{sorting} not idempotent");
        }
    }

    #[test]
    fn equal_keys_keep_their_relative_order() {
        let mut list = vec![
            app("x1", "same"),
            app("y", "other"),
            app("x2", "Same"),
            app("x3", "SAME"),
        ];
        let ties = |list: &[Application]| -> Vec<String> {
            list.iter()
                .filter(|a| a.label.eq_ignore_ascii_case("same"))
                .map(|a| a.package_name.clone())
                .collect()
        };
        sort_apps(&mut list, AppSorting::NameAscending);
        assert_eq!(ties(&list), vec!["x1", "x2", "x3"]);
        sort_apps(&mut list, AppSorting::NameDescending);
        assert_eq!(ties(&list), vec!["x1", "x2", "x3"]);
        assert_eq!(list[3].package_name, "y");
    }

    #[test]
    fn time_keys_order_by_timestamp() {
        let mut list = vec![app("a", "a"), app("b", "b"), app("c", "c")];
        list[0].first_install_time = day(3);
        list[1].first_install_time = day(1);
        list[2].first_install_time = day(2);
        list[0].last_update_time = day(1);
        list[1].last_update_time = day(3);
        list[2].last_update_time = day(2);

        sort_apps(&mut list, AppSorting::FirstInstallTimeAscending);
        assert_eq!(labels(&list), vec!["b", "c", "a"]);
        sort_apps(&mut list, AppSorting::FirstInstallTimeDescending);
        assert_eq!(labels(&list), vec!["a", "c", "b"]);
        sort_apps(&mut list, AppSorting::LastUpdateTimeAscending);
        assert_eq!(labels(&list), vec!["a", "c", "b"]);
        sort_apps(&mut list, AppSorting::LastUpdateTimeDescending);
        assert_eq!(labels(&list), vec!["b", "c", "a"]);
    }

    #[test]
    fn service_status_applies_once_and_only_to_matching_entry() {
        let mut list = vec![app("a", "a"), app("b", "b")];
        let status = |running| AppServiceStatus {
            package_name: "b".to_string(),
            running,
            blocked: 0,
            total: 4,
        };
        assert!(apply_service_status(&mut list, status(1)));
        assert!(!apply_service_status(&mut list, status(2)));
        assert_eq!(list[1].service_status.as_ref().unwrap().running, 1);
        assert!(list[0].service_status.is_none());

        let missing = AppServiceStatus {
            package_name: "gone".to_string(),
            running: 0,
            blocked: 0,
            total: 0,
        };
        let before = list.clone();
        assert!(!apply_service_status(&mut list, missing));
        assert_eq!(list, before);
    }
}
