pub mod config;
pub mod error;
pub mod types;

pub use config::KernelConfig;
pub use error::{ErrorKind, KernelError, Result};
pub use types::{Entry, EntryKind, PathKey, SessionId};
