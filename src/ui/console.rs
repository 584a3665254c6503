//! Plain-text rendering for the terminal shell

use crate::apps::AppStatus;
use crate::core::types::EntryKind;
use crate::kernel::Outcome;
use crate::syscall::{SyscallOutput, SystemStatus};
use crate::ui::Presenter;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Writes rendered outcomes to a byte sink (stdout by default)
pub struct ConsolePresenter<W> {
    out: W,
}

impl ConsolePresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn present(&mut self, outcome: &Outcome) {
        let text = render(outcome);
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            tracing::warn!("Failed to write output: {}", e);
        }
    }
}

/// Render one outcome as terminal text, always newline-terminated
pub fn render(outcome: &Outcome) -> String {
    let mut s = String::new();
    match &outcome.result {
        Err(e) => {
            let _ = writeln!(s, "[{}] {}", e.kind(), e);
        }
        Ok(SyscallOutput::Done) => {
            let name = outcome.syscall.map(|c| c.as_str()).unwrap_or("syscall");
            let _ = writeln!(s, "ok: {}", name);
        }
        Ok(SyscallOutput::Entries(entries)) => {
            if entries.is_empty() {
                s.push_str("(empty)\n");
            }
            for entry in entries {
                let name = entry.path.name().unwrap_or("/");
                let _ = match entry.kind {
                    EntryKind::Directory => writeln!(s, "  {}/", name),
                    EntryKind::File => writeln!(s, "  {:<24} {:>8} B", name, entry.size),
                };
            }
        }
        Ok(SyscallOutput::Bytes(bytes)) => {
            s.push_str(&String::from_utf8_lossy(bytes));
            if !s.ends_with('\n') {
                s.push('\n');
            }
        }
        Ok(SyscallOutput::App(handle)) => {
            let _ = writeln!(s, "launched {} (pid {})", handle.name, handle.pid);
        }
        Ok(SyscallOutput::Apps(listing)) => {
            for app in listing {
                let _ = writeln!(
                    s,
                    "  {:<12} {:<10} {}",
                    app.name,
                    status_label(app.status),
                    app.description
                );
            }
        }
        Ok(SyscallOutput::Directory(path)) => {
            let _ = writeln!(s, "{}", path);
        }
        Ok(SyscallOutput::Removed(count)) => {
            let _ = writeln!(s, "removed {} entries", count);
        }
        Ok(SyscallOutput::Status(status)) => render_status(&mut s, status),
    }
    s
}

fn status_label(status: AppStatus) -> &'static str {
    match status {
        AppStatus::System => "System",
        AppStatus::Installed => "Installed",
        AppStatus::Available => "Available",
    }
}

fn render_status(s: &mut String, status: &SystemStatus) {
    s.push_str("=== SYSTEM STATUS ===\n");
    let _ = writeln!(
        s,
        "  Entries: {} ({} files, {} directories)",
        status.entries, status.files, status.directories
    );
    let _ = writeln!(s, "  Stored: {} B", status.bytes_stored);
    let _ = writeln!(s, "  Uptime: {}s", status.uptime_secs);
    let _ = writeln!(
        s,
        "  User: {} ({} registered)",
        status.user.as_deref().unwrap_or("guest"),
        status.users
    );
    let _ = writeln!(
        s,
        "  Model: {}",
        status.model.as_deref().unwrap_or("offline")
    );
    if status.running_apps.is_empty() {
        s.push_str("  Apps: none\n");
    } else {
        s.push_str("  Apps:\n");
        for app in &status.running_apps {
            let _ = writeln!(s, "    [{}] {} ({}s)", app.pid, app.name, app.running_secs);
        }
    }
}
