//! Kernel loop and the shared context sessions run against

pub mod accounts;
pub mod context;
pub mod session;

pub use accounts::AccountBook;
pub use context::KernelContext;
pub use session::{Control, LoopState, Outcome, Session, Step};
