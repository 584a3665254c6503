//! Install state for repository apps

use crate::apps::{find_app, AppInfo, AppSource, CATALOGUE};
use crate::core::error::{KernelError, Result};
use ahash::AHashSet;
use serde::Serialize;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    System,
    Installed,
    Available,
}

/// One row of `list_apps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppListing {
    pub name: String,
    pub description: String,
    pub status: AppStatus,
}

/// Tracks which repository apps are installed
#[derive(Debug, Default)]
pub struct PackageManager {
    installed: RwLock<AHashSet<&'static str>>,
}

impl PackageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_of(&self, app: &AppInfo) -> AppStatus {
        match app.source {
            AppSource::System => AppStatus::System,
            AppSource::Repository if self.is_installed(app.name) => AppStatus::Installed,
            AppSource::Repository => AppStatus::Available,
        }
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Whole catalogue in catalogue order
    pub fn list(&self) -> Vec<AppListing> {
        CATALOGUE
            .iter()
            .map(|app| AppListing {
                name: app.name.to_string(),
                description: app.description.to_string(),
                status: self.status_of(app),
            })
            .collect()
    }

    pub fn install(&self, name: &str) -> Result<&'static AppInfo> {
        let app = lookup(name)?;
        if app.source == AppSource::System {
            return Err(KernelError::AlreadyExists(format!("{} is a system app", app.name)));
        }

        let mut installed = self.installed.write().unwrap_or_else(PoisonError::into_inner);
        if !installed.insert(app.name) {
            return Err(KernelError::AlreadyExists(format!("{} is already installed", app.name)));
        }
        tracing::info!(app = app.name, "App installed");
        Ok(app)
    }

    pub fn remove(&self, name: &str) -> Result<&'static AppInfo> {
        let app = lookup(name)?;
        if app.source == AppSource::System {
            return Err(KernelError::InvalidParams(format!(
                "{} is a system app and cannot be removed",
                app.name
            )));
        }

        let mut installed = self.installed.write().unwrap_or_else(PoisonError::into_inner);
        if !installed.remove(app.name) {
            return Err(KernelError::NotFound(format!("{} is not installed", app.name)));
        }
        tracing::info!(app = app.name, "App removed");
        Ok(app)
    }

    /// Resolve a name to an app that may be launched right now
    pub fn launchable(&self, name: &str) -> Result<&'static AppInfo> {
        let app = lookup(name)?;
        match self.status_of(app) {
            AppStatus::Available => Err(KernelError::NotFound(format!(
                "{} is not installed (try: install {})",
                app.name, app.name
            ))),
            AppStatus::System | AppStatus::Installed => Ok(app),
        }
    }
}

fn lookup(name: &str) -> Result<&'static AppInfo> {
    find_app(name).ok_or_else(|| KernelError::NotFound(format!("app {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(packages: &PackageManager, name: &str) -> AppStatus {
        packages
            .list()
            .into_iter()
            .find(|l| l.name == name)
            .map(|l| l.status)
            .unwrap()
    }

    #[test]
    fn test_listing_marks_every_app() {
        let packages = PackageManager::new();
        assert_eq!(packages.list().len(), CATALOGUE.len());
        assert_eq!(status(&packages, "calculator"), AppStatus::System);
        assert_eq!(status(&packages, "snake"), AppStatus::Available);

        packages.install("snake").unwrap();
        assert_eq!(status(&packages, "snake"), AppStatus::Installed);
    }

    #[test]
    fn test_install_twice_and_system_apps() {
        let packages = PackageManager::new();
        packages.install("Todo").unwrap();
        assert!(matches!(packages.install("todo"), Err(KernelError::AlreadyExists(_))));
        assert!(matches!(packages.install("notes"), Err(KernelError::AlreadyExists(_))));
        assert!(matches!(packages.install("doom"), Err(KernelError::NotFound(_))));
    }

    #[test]
    fn test_remove() {
        let packages = PackageManager::new();
        assert!(matches!(packages.remove("clock"), Err(KernelError::NotFound(_))));
        assert!(matches!(
            packages.remove("calculator"),
            Err(KernelError::InvalidParams(_))
        ));

        packages.install("clock").unwrap();
        assert_eq!(packages.remove("clock").unwrap().name, "clock");
        assert!(!packages.is_installed("clock"));
    }

    #[test]
    fn test_launchable_requires_install() {
        let packages = PackageManager::new();
        assert!(packages.launchable("sysmon").is_ok());
        assert!(matches!(packages.launchable("snake"), Err(KernelError::NotFound(_))));

        packages.install("snake").unwrap();
        assert_eq!(packages.launchable("snake").unwrap().name, "snake");
    }
}
