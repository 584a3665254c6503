//! Application catalogue and process table
//!
//! Apps themselves are opaque to the kernel; launching one only records a
//! process owned by the launching session.

pub mod packages;

pub use packages::{AppListing, AppStatus, PackageManager};

use crate::core::types::{now_millis, SessionId, Timestamp};
use ahash::AHashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

/// Where an app comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppSource {
    /// Always present, cannot be removed
    System,
    /// Must be installed from the repository before it can run
    Repository,
}

/// A catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub source: AppSource,
}

/// Every app the system knows about, system apps first
pub const CATALOGUE: &[AppInfo] = &[
    AppInfo {
        name: "calculator",
        description: "Arithmetic on the command line",
        source: AppSource::System,
    },
    AppInfo {
        name: "code_studio",
        description: "Minimal code editor",
        source: AppSource::System,
    },
    AppInfo {
        name: "notes",
        description: "Plain-text notes stored under /notes",
        source: AppSource::System,
    },
    AppInfo {
        name: "sysmon",
        description: "CPU, memory, network and disk monitor",
        source: AppSource::System,
    },
    AppInfo {
        name: "clock",
        description: "Segment-display clock",
        source: AppSource::Repository,
    },
    AppInfo {
        name: "snake",
        description: "The snake game",
        source: AppSource::Repository,
    },
    AppInfo {
        name: "todo",
        description: "Task list",
        source: AppSource::Repository,
    },
];

/// Look up a catalogue entry by name (case-insensitive)
pub fn find_app(name: &str) -> Option<&'static AppInfo> {
    let name = name.trim();
    CATALOGUE.iter().find(|a| a.name.eq_ignore_ascii_case(name))
}

/// Returned by `launch_app`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppHandle {
    pub pid: u32,
    pub name: String,
}

#[derive(Debug, Clone)]
struct Process {
    name: String,
    owner: SessionId,
    started_at: Timestamp,
}

/// Running apps shared by all sessions
#[derive(Debug)]
pub struct ProcessTable {
    next_pid: AtomicU32,
    processes: Mutex<AHashMap<u32, Process>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self {
            next_pid: AtomicU32::new(1),
            processes: Mutex::new(AHashMap::new()),
        }
    }

    /// Start an app on behalf of a session
    ///
    /// Callers resolve the name through [`PackageManager::launchable`]
    /// first, so only runnable apps get here.
    pub fn launch(&self, app: &AppInfo, owner: SessionId) -> AppHandle {
        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed);

        self.processes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                pid,
                Process {
                    name: app.name.to_string(),
                    owner,
                    started_at: now_millis(),
                },
            );
        tracing::info!(pid, app = app.name, session = %owner, "App launched");

        AppHandle {
            pid,
            name: app.name.to_string(),
        }
    }

    /// Running apps as `(pid, name)`, ordered by pid
    pub fn running(&self) -> Vec<(u32, String)> {
        let processes = self.processes.lock().unwrap_or_else(PoisonError::into_inner);
        let mut running: Vec<_> = processes
            .iter()
            .map(|(pid, p)| (*pid, p.name.clone()))
            .collect();
        running.sort_by_key(|(pid, _)| *pid);
        running
    }

    /// Milliseconds since the given process started
    pub fn age_of(&self, pid: u32) -> Option<u64> {
        let processes = self.processes.lock().unwrap_or_else(PoisonError::into_inner);
        processes
            .get(&pid)
            .map(|p| now_millis().saturating_sub(p.started_at))
    }

    /// Stop everything a session launched, returning how many were stopped
    pub fn terminate_session(&self, owner: SessionId) -> usize {
        let mut processes = self.processes.lock().unwrap_or_else(PoisonError::into_inner);
        let before = processes.len();
        processes.retain(|_, p| p.owner != owner);
        before - processes.len()
    }

    /// Stop every instance of an app, whoever launched it
    pub fn terminate_app(&self, name: &str) -> usize {
        let mut processes = self.processes.lock().unwrap_or_else(PoisonError::into_inner);
        let before = processes.len();
        processes.retain(|_, p| p.name != name);
        before - processes.len()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
