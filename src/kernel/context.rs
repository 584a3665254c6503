//! Shared kernel state handed to every session
//!
//! Nothing here is global: a [`KernelContext`] is built once at startup and
//! cloned into each session, which only ever reaches it through this handle.

use crate::apps::{PackageManager, ProcessTable};
use crate::kernel::accounts::AccountBook;
use crate::core::types::SessionId;
use crate::fs::{FlatStore, MemoryStore, PathIndex};
use crate::ui::state::{LogBook, LogCategory, LogEntry};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

#[derive(Clone)]
pub struct KernelContext {
    pub store: Arc<dyn FlatStore>,
    pub processes: Arc<ProcessTable>,
    pub packages: Arc<PackageManager>,
    pub accounts: Arc<AccountBook>,
    log: Arc<Mutex<LogBook>>,
    booted_at: Instant,
    /// Inference model reported by `system_status`
    pub model: Option<String>,
}

impl KernelContext {
    pub fn new(store: Arc<dyn FlatStore>) -> Self {
        Self {
            store,
            processes: Arc::new(ProcessTable::new()),
            packages: Arc::new(PackageManager::new()),
            accounts: Arc::new(AccountBook::new()),
            log: Arc::new(Mutex::new(LogBook::new())),
            booted_at: Instant::now(),
            model: None,
        }
    }

    /// Context over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_accounts(mut self, accounts: AccountBook) -> Self {
        self.accounts = Arc::new(accounts);
        self
    }

    pub fn index(&self) -> PathIndex<'_> {
        PathIndex::new(self.store.as_ref())
    }

    pub fn log(&self, session: Option<SessionId>, message: String, category: LogCategory) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .log(session, message, category);
    }

    pub fn recent_log(&self, count: usize) -> Vec<LogEntry> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recent(count)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.booted_at.elapsed().as_secs()
    }
}
