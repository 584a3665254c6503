//! Command grammar pipeline
//!
//! Raw line -> tokenizer -> grammar -> SyscallInvocation, or
//! `NotACommand` so the caller can fall through to the intent bridge.

pub mod grammar;
pub mod tokenizer;

pub use grammar::{parse_command, Parsed, COMMANDS};
pub use tokenizer::tokenize;
