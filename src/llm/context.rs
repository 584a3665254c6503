//! Gather shell context for inference prompts
//!
//! A short summary of where the user is and what is around them lets the
//! inference service resolve references like "that file" or "my notes".

use crate::core::types::{EntryKind, PathKey};
use crate::kernel::context::KernelContext;

/// Entries listed in a prompt before truncating
const MAX_LISTED_ENTRIES: usize = 20;

/// Recent log lines carried into a prompt
const MAX_RECENT_EVENTS: usize = 5;

/// Shell context for inference prompts
#[derive(Debug, Clone, Default)]
pub struct ShellContext {
    /// Session working directory
    pub cwd: String,
    /// Names in the working directory, directories suffixed with `/`
    pub entries: Vec<String>,
    /// Entries not listed because of the cap
    pub truncated: usize,
    /// Names of running apps
    pub running_apps: Vec<String>,
    /// Recent kernel log lines
    pub recent_events: Vec<String>,
}

impl ShellContext {
    /// Build a context from kernel state as seen by one session
    pub fn from_kernel(kernel: &KernelContext, cwd: &PathKey) -> Self {
        let mut entries = Vec::new();
        let mut truncated = 0;
        for entry in kernel.index().children_of(cwd) {
            if entries.len() >= MAX_LISTED_ENTRIES {
                truncated += 1;
                continue;
            }
            let name = entry.path.name().unwrap_or_default().to_string();
            entries.push(match entry.kind {
                EntryKind::Directory => format!("{}/", name),
                EntryKind::File => name,
            });
        }

        Self {
            cwd: cwd.to_string(),
            entries,
            truncated,
            running_apps: kernel
                .processes
                .running()
                .into_iter()
                .map(|(_, name)| name)
                .collect(),
            recent_events: kernel
                .recent_log(MAX_RECENT_EVENTS)
                .into_iter()
                .map(|e| e.message)
                .collect(),
        }
    }

    /// Create an empty context rooted at `/`
    pub fn empty() -> Self {
        Self {
            cwd: "/".into(),
            ..Self::default()
        }
    }

    /// Generate a text summary for the prompt
    pub fn summary(&self) -> String {
        let mut s = format!("Working directory: {}\n", self.cwd);

        if self.entries.is_empty() {
            s.push_str("Contents: (empty)\n");
        } else {
            s.push_str(&format!("Contents: {}", self.entries.join(", ")));
            if self.truncated > 0 {
                s.push_str(&format!(" (+{} more)", self.truncated));
            }
            s.push('\n');
        }

        if !self.running_apps.is_empty() {
            s.push_str(&format!("Running apps: {}\n", self.running_apps.join(", ")));
        }

        if !self.recent_events.is_empty() {
            s.push_str("Recent log:\n");
            for event in &self.recent_events {
                s.push_str(&format!("- {}\n", event));
            }
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::state::LogCategory;

    #[test]
    fn test_empty_context() {
        let ctx = ShellContext::empty();
        assert_eq!(ctx.cwd, "/");
        assert!(ctx.summary().contains("(empty)"));
    }

    #[test]
    fn test_context_from_kernel() {
        let kernel = KernelContext::in_memory();
        let index = kernel.index();
        index.make_dir(&PathKey::parse("/notes").unwrap()).unwrap();
        index
            .write_file(&PathKey::parse("/todo.txt").unwrap(), b"milk".to_vec())
            .unwrap();
        kernel.log(None, "booted".into(), LogCategory::System);

        let ctx = ShellContext::from_kernel(&kernel, &PathKey::root());
        assert_eq!(ctx.entries, vec!["notes/", "todo.txt"]);

        let summary = ctx.summary();
        assert!(summary.contains("Working directory: /"));
        assert!(summary.contains("notes/, todo.txt"));
        assert!(summary.contains("- booted"));
    }

    #[test]
    fn test_entry_cap() {
        let kernel = KernelContext::in_memory();
        let index = kernel.index();
        for i in 0..(MAX_LISTED_ENTRIES + 3) {
            index
                .write_file(&PathKey::parse(&format!("/f{:02}", i)).unwrap(), Vec::new())
                .unwrap();
        }

        let ctx = ShellContext::from_kernel(&kernel, &PathKey::root());
        assert_eq!(ctx.entries.len(), MAX_LISTED_ENTRIES);
        assert_eq!(ctx.truncated, 3);
        assert!(ctx.summary().contains("(+3 more)"));
    }
}
