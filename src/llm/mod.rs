//! Natural language intent pipeline
//!
//! ShellContext + input -> LlmClient -> raw reply -> parser -> validated
//! SyscallInvocation. The model proposes; the registry decides.

pub mod bridge;
pub mod client;
pub mod context;
pub mod parser;

pub use bridge::IntentBridge;
pub use client::{ApiFormat, InferenceService, LlmClient};
pub use context::ShellContext;
pub use parser::{decode_intent, extract_json, validate_intent, ParsedIntent};
