//! Kernel log shared by every session

use crate::core::types::{now_millis, SessionId, Timestamp};
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum log entries to keep
pub const MAX_LOG_ENTRIES: usize = 50;

/// An entry in the kernel log
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub at: Timestamp,
    pub session: Option<SessionId>,
    pub message: String,
    pub category: LogCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    /// Written through the `log` syscall
    User,
    /// Session lifecycle and kernel notices
    System,
}

/// Bounded ring of recent log entries
#[derive(Debug, Default)]
pub struct LogBook {
    entries: VecDeque<LogEntry>,
}

impl LogBook {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_LOG_ENTRIES),
        }
    }

    /// Add an entry, evicting the oldest when full
    pub fn log(&mut self, session: Option<SessionId>, message: String, category: LogCategory) {
        if self.entries.len() >= MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            at: now_millis(),
            session,
            message,
            category,
        });
    }

    /// Most recent entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
