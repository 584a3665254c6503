//! Intent bridge: natural language in, validated invocation out
//!
//! The only blocking call in the pipeline lives here and is always bounded
//! by a timeout. Nothing is retried; every failure is terminal for the
//! input that caused it.

use crate::core::error::{KernelError, Result};
use crate::llm::client::InferenceService;
use crate::llm::context::ShellContext;
use crate::llm::parser::{decode_intent, preamble, validate_intent};
use crate::syscall::SyscallInvocation;
use std::time::Duration;

pub struct IntentBridge<S> {
    service: S,
    timeout: Duration,
    preamble: String,
}

impl<S: InferenceService> IntentBridge<S> {
    pub fn new(service: S, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            preamble: preamble(),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// User message: context summary followed by the raw input
    fn user_prompt(input: &str, context: &ShellContext) -> String {
        format!(
            "CONTEXT:\n{}\nUSER INPUT:\n{}\n\nRespond with the JSON system call:",
            context.summary(),
            input
        )
    }

    /// Turn free-form input into a validated invocation
    pub async fn resolve(&self, input: &str, context: &ShellContext) -> Result<SyscallInvocation> {
        let prompt = Self::user_prompt(input, context);
        tracing::debug!(model = self.service.model(), "Requesting intent");

        let response = tokio::time::timeout(self.timeout, self.service.complete(&self.preamble, &prompt))
            .await
            .map_err(|_| {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "Inference timed out");
                KernelError::BridgeUnavailable(format!(
                    "no response within {} ms",
                    self.timeout.as_millis()
                ))
            })??;

        tracing::debug!(response = %response, "Inference response");

        let intent = decode_intent(&response)?;
        let invocation = validate_intent(intent)?;
        tracing::info!(syscall = %invocation.name, "Intent resolved");
        Ok(invocation)
    }
}
