//! Presentation side of the kernel loop

pub mod console;
pub mod state;

pub use console::{render, ConsolePresenter};
pub use state::{LogBook, LogCategory, LogEntry};

use crate::kernel::Outcome;

/// Receives every resolved outcome, errors included, unchanged
pub trait Presenter {
    fn present(&mut self, outcome: &Outcome);
}
