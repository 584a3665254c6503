//! Syscall surface
//!
//! Both input grammars produce a [`SyscallInvocation`]; the
//! [`SyscallTable`] is the only code that touches storage or process state.

pub mod args;
pub mod table;

pub use args::{ArgKind, ArgSpec, Params, ValidArgs};
pub use table::{SyscallContext, SyscallTable};

use crate::apps::{AppHandle, AppListing};
use crate::core::types::{Entry, PathKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Every registered syscall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Syscall {
    ListDir,
    MakeDir,
    RemoveDir,
    RemoveTree,
    ReadFile,
    WriteFile,
    RemoveFile,
    Rename,
    ChangeDir,
    LaunchApp,
    ListApps,
    InstallApp,
    RemoveApp,
    Register,
    Login,
    Logout,
    Log,
    SystemStatus,
}

const PATH: &[ArgSpec] = &[ArgSpec::required("path", ArgKind::Path)];
const OPTIONAL_PATH: &[ArgSpec] = &[ArgSpec::optional("path", ArgKind::Path)];
const PATH_AND_CONTENT: &[ArgSpec] = &[
    ArgSpec::required("path", ArgKind::Path),
    ArgSpec::required("content", ArgKind::Bytes),
];
const OLD_AND_NEW: &[ArgSpec] = &[
    ArgSpec::required("old", ArgKind::Path),
    ArgSpec::required("new", ArgKind::Path),
];
const APP_NAME: &[ArgSpec] = &[ArgSpec::required("name", ArgKind::Text)];
const CREDENTIALS: &[ArgSpec] = &[
    ArgSpec::required("username", ArgKind::Text),
    ArgSpec::required("password", ArgKind::Text),
];
const MESSAGE: &[ArgSpec] = &[ArgSpec::required("message", ArgKind::Text)];

impl Syscall {
    pub const ALL: [Syscall; 18] = [
        Syscall::ListDir,
        Syscall::MakeDir,
        Syscall::RemoveDir,
        Syscall::RemoveTree,
        Syscall::ReadFile,
        Syscall::WriteFile,
        Syscall::RemoveFile,
        Syscall::Rename,
        Syscall::ChangeDir,
        Syscall::LaunchApp,
        Syscall::ListApps,
        Syscall::InstallApp,
        Syscall::RemoveApp,
        Syscall::Register,
        Syscall::Login,
        Syscall::Logout,
        Syscall::Log,
        Syscall::SystemStatus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Syscall::ListDir => "list_dir",
            Syscall::MakeDir => "make_dir",
            Syscall::RemoveDir => "remove_dir",
            Syscall::RemoveTree => "remove_tree",
            Syscall::ReadFile => "read_file",
            Syscall::WriteFile => "write_file",
            Syscall::RemoveFile => "remove_file",
            Syscall::Rename => "rename",
            Syscall::ChangeDir => "change_dir",
            Syscall::LaunchApp => "launch_app",
            Syscall::ListApps => "list_apps",
            Syscall::InstallApp => "install_app",
            Syscall::RemoveApp => "remove_app",
            Syscall::Register => "register",
            Syscall::Login => "login",
            Syscall::Logout => "logout",
            Syscall::Log => "log",
            Syscall::SystemStatus => "system_status",
        }
    }

    /// Exact registered name lookup
    pub fn from_name(name: &str) -> Option<Syscall> {
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }

    /// Argument contract
    pub fn arg_spec(self) -> &'static [ArgSpec] {
        match self {
            Syscall::ListDir => OPTIONAL_PATH,
            Syscall::MakeDir
            | Syscall::RemoveDir
            | Syscall::RemoveTree
            | Syscall::ReadFile
            | Syscall::RemoveFile
            | Syscall::ChangeDir => PATH,
            Syscall::WriteFile => PATH_AND_CONTENT,
            Syscall::Rename => OLD_AND_NEW,
            Syscall::LaunchApp | Syscall::InstallApp | Syscall::RemoveApp => APP_NAME,
            Syscall::Register | Syscall::Login => CREDENTIALS,
            Syscall::Log => MESSAGE,
            Syscall::ListApps | Syscall::Logout | Syscall::SystemStatus => &[],
        }
    }

    /// Whether the call can change shared kernel state
    pub fn is_mutating(self) -> bool {
        !matches!(
            self,
            Syscall::ListDir
                | Syscall::ReadFile
                | Syscall::SystemStatus
                | Syscall::ChangeDir
                | Syscall::ListApps
                | Syscall::Login
                | Syscall::Logout
        )
    }

    /// Arguments that must never reach a log line
    pub fn is_sensitive_arg(name: &str) -> bool {
        name == "password"
    }
}

impl fmt::Display for Syscall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which grammar produced an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Command,
    Intent,
}

/// One requested syscall; produced per input event and discarded after
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyscallInvocation {
    pub name: Syscall,
    pub args: Params,
    pub origin: Origin,
}

impl SyscallInvocation {
    pub fn new(name: Syscall, origin: Origin) -> Self {
        Self {
            name,
            args: Params::new(),
            origin,
        }
    }

    /// Builder-style argument
    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(key.to_string(), value.into());
        self
    }
}

/// A process as reported by `system_status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningApp {
    pub pid: u32,
    pub name: String,
    pub running_secs: u64,
}

/// Aggregate figures returned by `system_status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatus {
    pub entries: usize,
    pub files: usize,
    pub directories: usize,
    pub bytes_stored: u64,
    pub running_apps: Vec<RunningApp>,
    pub uptime_secs: u64,
    pub model: Option<String>,
    /// Registered accounts
    pub users: usize,
    /// Who is logged in to the calling session
    pub user: Option<String>,
}

/// Successful syscall result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SyscallOutput {
    Done,
    Entries(Vec<Entry>),
    Bytes(Vec<u8>),
    App(AppHandle),
    Apps(Vec<AppListing>),
    Directory(PathKey),
    Removed(usize),
    Status(SystemStatus),
}
