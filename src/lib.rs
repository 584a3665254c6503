//! NEURO-CASIO - an intent-driven shell over a path-indexed flat store

pub mod apps;
pub mod command;
pub mod core;
pub mod fs;
pub mod kernel;
pub mod llm;
pub mod syscall;
pub mod ui;
