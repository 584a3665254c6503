//! Closed registry mapping syscall names to handlers

use crate::core::error::{KernelError, Result};
use crate::core::types::{PathKey, SessionId};
use crate::fs::PathIndex;
use crate::kernel::context::KernelContext;
use crate::syscall::{
    RunningApp, Syscall, SyscallInvocation, SyscallOutput, SystemStatus, ValidArgs,
};
use crate::ui::state::LogCategory;
use ahash::AHashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

type Handler = fn(&mut SyscallContext<'_>, &ValidArgs) -> Result<SyscallOutput>;

/// What a handler may touch: shared kernel state plus the caller's session
pub struct SyscallContext<'a> {
    pub kernel: &'a KernelContext,
    pub session: SessionId,
    pub cwd: &'a mut PathKey,
    /// Logged-in account, if any
    pub user: &'a mut Option<String>,
}

impl<'a> SyscallContext<'a> {
    pub fn new(
        kernel: &'a KernelContext,
        session: SessionId,
        cwd: &'a mut PathKey,
        user: &'a mut Option<String>,
    ) -> Self {
        Self {
            kernel,
            session,
            cwd,
            user,
        }
    }

    /// Record a kernel-originated event against the caller's session
    fn system_event(&self, message: String) {
        self.kernel.log(Some(self.session), message, LogCategory::System);
    }

    fn index(&self) -> PathIndex<'a> {
        PathIndex::new(self.kernel.store.as_ref())
    }

    fn resolve(&self, raw: &str) -> Result<PathKey> {
        PathKey::resolve(&*self.cwd, raw)
    }
}

pub struct SyscallTable {
    handlers: AHashMap<Syscall, Handler>,
}

impl SyscallTable {
    /// Table with every syscall registered
    pub fn standard() -> Self {
        let mut handlers: AHashMap<Syscall, Handler> = AHashMap::new();
        handlers.insert(Syscall::ListDir, list_dir);
        handlers.insert(Syscall::MakeDir, make_dir);
        handlers.insert(Syscall::RemoveDir, remove_dir);
        handlers.insert(Syscall::RemoveTree, remove_tree);
        handlers.insert(Syscall::ReadFile, read_file);
        handlers.insert(Syscall::WriteFile, write_file);
        handlers.insert(Syscall::RemoveFile, remove_file);
        handlers.insert(Syscall::Rename, rename);
        handlers.insert(Syscall::ChangeDir, change_dir);
        handlers.insert(Syscall::LaunchApp, launch_app);
        handlers.insert(Syscall::ListApps, list_apps);
        handlers.insert(Syscall::InstallApp, install_app);
        handlers.insert(Syscall::RemoveApp, remove_app);
        handlers.insert(Syscall::Register, register);
        handlers.insert(Syscall::Login, login);
        handlers.insert(Syscall::Logout, logout);
        handlers.insert(Syscall::Log, log);
        handlers.insert(Syscall::SystemStatus, system_status);
        Self { handlers }
    }

    #[cfg(test)]
    pub(crate) fn replace(&mut self, syscall: Syscall, handler: Handler) {
        self.handlers.insert(syscall, handler);
    }

    pub fn contains(&self, syscall: Syscall) -> bool {
        self.handlers.contains_key(&syscall)
    }

    /// Validate and run one invocation
    ///
    /// Handler panics are caught and reported as `InternalError`; nothing
    /// unwinds past this boundary.
    pub fn dispatch(
        &self,
        ctx: &mut SyscallContext<'_>,
        invocation: &SyscallInvocation,
    ) -> Result<SyscallOutput> {
        let handler = self
            .handlers
            .get(&invocation.name)
            .ok_or_else(|| KernelError::UnknownAction(invocation.name.to_string()))?;
        let args = ValidArgs::validate(invocation.name, &invocation.args)?;

        tracing::debug!(
            syscall = %invocation.name,
            origin = ?invocation.origin,
            args = %redacted(&invocation.args),
            mutating = invocation.name.is_mutating(),
            "Dispatching syscall"
        );

        match catch_unwind(AssertUnwindSafe(|| handler(ctx, &args))) {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".into());
                tracing::error!(syscall = %invocation.name, %message, "Syscall handler panicked");
                Err(KernelError::internal(format!(
                    "{} panicked: {}",
                    invocation.name, message
                )))
            }
        }
    }
}

/// `key=value` pairs with sensitive values masked
fn redacted(args: &crate::syscall::Params) -> String {
    args.iter()
        .map(|(key, value)| {
            if Syscall::is_sensitive_arg(key) {
                format!("{}=***", key)
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl Default for SyscallTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn list_dir(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let path = ctx.resolve(args.path("path").unwrap_or("."))?;
    ctx.index().list_dir(&path).map(SyscallOutput::Entries)
}

fn make_dir(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let path = ctx.resolve(args.require_path("path")?)?;
    ctx.index().make_dir(&path)?;
    Ok(SyscallOutput::Done)
}

fn remove_dir(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let path = ctx.resolve(args.require_path("path")?)?;
    ctx.index().remove_dir(&path)?;
    if *ctx.cwd == path {
        *ctx.cwd = path.parent().unwrap_or_else(PathKey::root);
    }
    Ok(SyscallOutput::Done)
}

fn remove_tree(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let path = ctx.resolve(args.require_path("path")?)?;
    let removed = ctx.index().remove_tree(&path)?;
    if ctx.cwd.is_descendant_of(&path) || *ctx.cwd == path {
        *ctx.cwd = path.parent().unwrap_or_else(PathKey::root);
    }
    Ok(SyscallOutput::Removed(removed))
}

fn read_file(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let path = ctx.resolve(args.require_path("path")?)?;
    ctx.index().read_file(&path).map(SyscallOutput::Bytes)
}

fn write_file(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let path = ctx.resolve(args.require_path("path")?)?;
    ctx.index().write_file(&path, args.bytes("content")?)?;
    Ok(SyscallOutput::Done)
}

fn remove_file(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let path = ctx.resolve(args.require_path("path")?)?;
    ctx.index().remove_file(&path)?;
    Ok(SyscallOutput::Done)
}

fn rename(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let old = ctx.resolve(args.require_path("old")?)?;
    let new = ctx.resolve(args.require_path("new")?)?;
    ctx.index().rename(&old, &new)?;
    if *ctx.cwd == old || ctx.cwd.is_descendant_of(&old) {
        *ctx.cwd = ctx.cwd.rebase(&old, &new)?;
    }
    Ok(SyscallOutput::Done)
}

fn change_dir(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let path = ctx.resolve(args.require_path("path")?)?;
    let entry = ctx.index().lookup(&path)?;
    if !entry.is_directory() {
        return Err(KernelError::NotADirectory(path.to_string()));
    }
    *ctx.cwd = path.clone();
    Ok(SyscallOutput::Directory(path))
}

fn launch_app(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let app = ctx.kernel.packages.launchable(args.text("name")?)?;
    let handle = ctx.kernel.processes.launch(app, ctx.session);
    ctx.system_event(format!("launched {} (pid {})", handle.name, handle.pid));
    Ok(SyscallOutput::App(handle))
}

fn list_apps(ctx: &mut SyscallContext<'_>, _args: &ValidArgs) -> Result<SyscallOutput> {
    Ok(SyscallOutput::Apps(ctx.kernel.packages.list()))
}

fn install_app(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let app = ctx.kernel.packages.install(args.text("name")?)?;
    ctx.system_event(format!("installed {}", app.name));
    Ok(SyscallOutput::Done)
}

fn remove_app(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let app = ctx.kernel.packages.remove(args.text("name")?)?;
    let stopped = ctx.kernel.processes.terminate_app(app.name);
    ctx.system_event(format!("removed {}, {} instance(s) stopped", app.name, stopped));
    Ok(SyscallOutput::Done)
}

fn register(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let username = args.text("username")?.trim();
    ctx.kernel.accounts.register(username, args.text("password")?)?;
    ctx.system_event(format!("registered user {}", username));
    Ok(SyscallOutput::Done)
}

fn login(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let username = args.text("username")?.trim();
    if let Err(e) = ctx.kernel.accounts.verify(username, args.text("password")?) {
        tracing::warn!(session = %ctx.session, user = username, "Login rejected");
        ctx.system_event(format!("failed login for {}", username));
        return Err(e);
    }
    *ctx.user = Some(username.to_string());
    tracing::info!(session = %ctx.session, user = username, "Logged in");
    ctx.system_event(format!("{} logged in", username));
    Ok(SyscallOutput::Done)
}

fn logout(ctx: &mut SyscallContext<'_>, _args: &ValidArgs) -> Result<SyscallOutput> {
    let user = ctx
        .user
        .take()
        .ok_or_else(|| KernelError::InvalidParams("not logged in".into()))?;
    ctx.system_event(format!("{} logged out", user));
    Ok(SyscallOutput::Done)
}

fn log(ctx: &mut SyscallContext<'_>, args: &ValidArgs) -> Result<SyscallOutput> {
    let message = args.text("message")?;
    tracing::info!(session = %ctx.session, "{}", message);
    ctx.kernel
        .log(Some(ctx.session), message.to_string(), LogCategory::User);
    Ok(SyscallOutput::Done)
}

fn system_status(ctx: &mut SyscallContext<'_>, _args: &ValidArgs) -> Result<SyscallOutput> {
    let mut files = 0;
    let mut directories = 1;
    let mut bytes_stored = 0;
    for entry in ctx.kernel.store.scan_prefix("/") {
        if entry.is_directory() {
            directories += 1;
        } else {
            files += 1;
            bytes_stored += entry.size;
        }
    }

    let processes = &ctx.kernel.processes;
    let running_apps = processes
        .running()
        .into_iter()
        .map(|(pid, name)| RunningApp {
            pid,
            name,
            running_secs: processes.age_of(pid).unwrap_or(0) / 1000,
        })
        .collect();

    Ok(SyscallOutput::Status(SystemStatus {
        entries: files + directories,
        files,
        directories,
        bytes_stored,
        running_apps,
        uptime_secs: ctx.kernel.uptime_secs(),
        model: ctx.kernel.model.clone(),
        users: ctx.kernel.accounts.count(),
        user: ctx.user.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::Origin;

    fn run(
        table: &SyscallTable,
        kernel: &KernelContext,
        cwd: &mut PathKey,
        invocation: SyscallInvocation,
    ) -> Result<SyscallOutput> {
        let mut user = None;
        run_as(table, kernel, cwd, &mut user, invocation)
    }

    fn run_as(
        table: &SyscallTable,
        kernel: &KernelContext,
        cwd: &mut PathKey,
        user: &mut Option<String>,
        invocation: SyscallInvocation,
    ) -> Result<SyscallOutput> {
        let mut ctx = SyscallContext::new(kernel, SessionId::new(), cwd, user);
        table.dispatch(&mut ctx, &invocation)
    }

    fn call(name: Syscall) -> SyscallInvocation {
        SyscallInvocation::new(name, Origin::Command)
    }

    #[test]
    fn test_every_syscall_registered() {
        let table = SyscallTable::standard();
        for syscall in Syscall::ALL {
            assert!(table.contains(syscall), "{} missing", syscall);
        }
    }

    #[test]
    fn test_relative_paths_use_cwd() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();

        run(&table, &kernel, &mut cwd, call(Syscall::MakeDir).arg("path", "docs")).unwrap();
        let out = run(&table, &kernel, &mut cwd, call(Syscall::ChangeDir).arg("path", "docs"));
        assert_eq!(out.unwrap(), SyscallOutput::Directory(PathKey::parse("/docs").unwrap()));

        run(
            &table,
            &kernel,
            &mut cwd,
            call(Syscall::WriteFile).arg("path", "a.txt").arg("content", "hi"),
        )
        .unwrap();
        assert!(kernel.index().exists(&PathKey::parse("/docs/a.txt").unwrap()));
    }

    #[test]
    fn test_change_dir_to_file_fails() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();
        run(
            &table,
            &kernel,
            &mut cwd,
            call(Syscall::WriteFile).arg("path", "/f").arg("content", ""),
        )
        .unwrap();
        let err = run(&table, &kernel, &mut cwd, call(Syscall::ChangeDir).arg("path", "/f"))
            .unwrap_err();
        assert!(matches!(err, KernelError::NotADirectory(_)));
        assert!(cwd.is_root());
    }

    #[test]
    fn test_invalid_params_before_handler() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();
        let err = run(&table, &kernel, &mut cwd, call(Syscall::MakeDir)).unwrap_err();
        assert!(matches!(err, KernelError::InvalidParams(_)));
        assert_eq!(kernel.store.len(), 1);
    }

    #[test]
    fn test_remove_tree_moves_cwd_out() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();
        run(&table, &kernel, &mut cwd, call(Syscall::MakeDir).arg("path", "/a")).unwrap();
        run(&table, &kernel, &mut cwd, call(Syscall::MakeDir).arg("path", "/a/b")).unwrap();
        run(&table, &kernel, &mut cwd, call(Syscall::ChangeDir).arg("path", "/a/b")).unwrap();

        let out = run(&table, &kernel, &mut cwd, call(Syscall::RemoveTree).arg("path", "/a"));
        assert_eq!(out.unwrap(), SyscallOutput::Removed(2));
        assert!(cwd.is_root());
    }

    #[test]
    fn test_handler_panic_becomes_internal_error() {
        fn exploding(_: &mut SyscallContext<'_>, _: &ValidArgs) -> Result<SyscallOutput> {
            panic!("boom");
        }

        let mut table = SyscallTable::standard();
        table.replace(Syscall::SystemStatus, exploding);
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();

        let err = run(&table, &kernel, &mut cwd, call(Syscall::SystemStatus)).unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::InternalError);
        assert!(err.to_string().contains("boom"));

        // The table stays usable afterwards
        run(&table, &kernel, &mut cwd, call(Syscall::MakeDir).arg("path", "/ok")).unwrap();
    }

    #[test]
    fn test_log_and_status() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory().with_model("test-model");
        let mut cwd = PathKey::root();

        run(&table, &kernel, &mut cwd, call(Syscall::Log).arg("message", "hello")).unwrap();
        assert_eq!(kernel.recent_log(1)[0].message, "hello");

        run(
            &table,
            &kernel,
            &mut cwd,
            call(Syscall::WriteFile).arg("path", "/f").arg("content", "abc"),
        )
        .unwrap();
        run(&table, &kernel, &mut cwd, call(Syscall::LaunchApp).arg("name", "sysmon")).unwrap();

        match run(&table, &kernel, &mut cwd, call(Syscall::SystemStatus)).unwrap() {
            SyscallOutput::Status(status) => {
                assert_eq!(status.files, 1);
                assert_eq!(status.directories, 1);
                assert_eq!(status.bytes_stored, 3);
                assert_eq!(status.running_apps.len(), 1);
                assert_eq!(status.running_apps[0].name, "sysmon");
                assert!(status.running_apps[0].running_secs < 60);
                assert_eq!(status.model.as_deref(), Some("test-model"));
                assert_eq!(status.users, 0);
                assert_eq!(status.user, None);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_rename_carries_cwd_along() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();
        run(&table, &kernel, &mut cwd, call(Syscall::MakeDir).arg("path", "/a")).unwrap();
        run(&table, &kernel, &mut cwd, call(Syscall::MakeDir).arg("path", "/a/inner")).unwrap();

        run(&table, &kernel, &mut cwd, call(Syscall::ChangeDir).arg("path", "/a")).unwrap();
        run(&table, &kernel, &mut cwd, call(Syscall::Rename).arg("old", "/a").arg("new", "/b"))
            .unwrap();
        assert_eq!(cwd.as_str(), "/b");
        assert!(run(&table, &kernel, &mut cwd, call(Syscall::ListDir)).is_ok());

        run(&table, &kernel, &mut cwd, call(Syscall::ChangeDir).arg("path", "/b/inner")).unwrap();
        run(&table, &kernel, &mut cwd, call(Syscall::Rename).arg("old", "/b").arg("new", "/c"))
            .unwrap();
        assert_eq!(cwd.as_str(), "/c/inner");

        // Renaming an unrelated entry leaves cwd alone
        run(&table, &kernel, &mut cwd, call(Syscall::MakeDir).arg("path", "/x")).unwrap();
        run(&table, &kernel, &mut cwd, call(Syscall::Rename).arg("old", "/x").arg("new", "/y"))
            .unwrap();
        assert_eq!(cwd.as_str(), "/c/inner");
    }

    #[test]
    fn test_remove_dir_moves_cwd_to_parent() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();
        run(&table, &kernel, &mut cwd, call(Syscall::MakeDir).arg("path", "/b")).unwrap();
        run(&table, &kernel, &mut cwd, call(Syscall::ChangeDir).arg("path", "/b")).unwrap();

        run(&table, &kernel, &mut cwd, call(Syscall::RemoveDir).arg("path", "/b")).unwrap();
        assert!(cwd.is_root());
        run(
            &table,
            &kernel,
            &mut cwd,
            call(Syscall::WriteFile).arg("path", "f").arg("content", "x"),
        )
        .unwrap();
        assert!(kernel.index().exists(&PathKey::parse("/f").unwrap()));
    }

    #[test]
    fn test_app_lifecycle_is_logged() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();

        let err = run(&table, &kernel, &mut cwd, call(Syscall::LaunchApp).arg("name", "snake"))
            .unwrap_err();
        assert!(matches!(err, KernelError::NotFound(_)));

        run(&table, &kernel, &mut cwd, call(Syscall::InstallApp).arg("name", "snake")).unwrap();
        run(&table, &kernel, &mut cwd, call(Syscall::LaunchApp).arg("name", "snake")).unwrap();
        assert_eq!(kernel.processes.running().len(), 1);

        run(&table, &kernel, &mut cwd, call(Syscall::RemoveApp).arg("name", "snake")).unwrap();
        assert!(kernel.processes.running().is_empty());

        let log = kernel.recent_log(3);
        assert!(log.iter().all(|e| e.category == LogCategory::System));
        assert_eq!(log[0].message, "installed snake");
        assert!(log[1].message.starts_with("launched snake"));
        assert_eq!(log[2].message, "removed snake, 1 instance(s) stopped");
    }

    #[test]
    fn test_list_apps() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();
        match run(&table, &kernel, &mut cwd, call(Syscall::ListApps)).unwrap() {
            SyscallOutput::Apps(listing) => {
                assert_eq!(listing.len(), crate::apps::CATALOGUE.len());
                assert!(listing
                    .iter()
                    .any(|l| l.name == "todo" && l.status == crate::apps::AppStatus::Available));
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_login_sets_session_user() {
        let table = SyscallTable::standard();
        let kernel = KernelContext::in_memory();
        let mut cwd = PathKey::root();
        let mut user = None;
        let creds = |name: Syscall, password: &str| {
            call(name).arg("username", "ada").arg("password", password)
        };

        run_as(&table, &kernel, &mut cwd, &mut user, creds(Syscall::Register, "pw")).unwrap();
        assert_eq!(user, None);

        let err = run_as(&table, &kernel, &mut cwd, &mut user, creds(Syscall::Login, "bad"))
            .unwrap_err();
        assert!(matches!(err, KernelError::AuthFailed(_)));
        assert_eq!(user, None);

        run_as(&table, &kernel, &mut cwd, &mut user, creds(Syscall::Login, "pw")).unwrap();
        assert_eq!(user.as_deref(), Some("ada"));
        match run_as(&table, &kernel, &mut cwd, &mut user, call(Syscall::SystemStatus)).unwrap() {
            SyscallOutput::Status(status) => {
                assert_eq!(status.users, 1);
                assert_eq!(status.user.as_deref(), Some("ada"));
            }
            other => panic!("unexpected output {:?}", other),
        }

        run_as(&table, &kernel, &mut cwd, &mut user, call(Syscall::Logout)).unwrap();
        assert_eq!(user, None);
        assert!(run_as(&table, &kernel, &mut cwd, &mut user, call(Syscall::Logout)).is_err());

        let log = kernel.recent_log(10);
        assert!(log.iter().any(|e| e.message == "ada logged in"));
        assert!(log.iter().any(|e| e.message == "ada logged out"));
        assert!(log.iter().all(|e| !e.message.contains("pw")));
    }

    #[test]
    fn test_redacted_hides_password() {
        let inv = call(Syscall::Login).arg("username", "ada").arg("password", "hunter2");
        let shown = redacted(&inv.args);
        assert!(shown.contains("ada"));
        assert!(shown.contains("password=***"));
        assert!(!shown.contains("hunter2"));
    }
}
