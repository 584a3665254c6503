//! Kernel loop for one interactive session
//!
//! A session resolves one input event completely before it accepts the
//! next: `Idle -> Routing -> Executing -> Presenting -> Idle`. Routing
//! tries the shell grammar first and only falls through to the intent
//! bridge when the first word is not a command.

use crate::command::{parse_command, Parsed};
use crate::core::error::{ErrorKind, KernelError, Result};
use crate::core::types::{PathKey, SessionId};
use crate::kernel::context::KernelContext;
use crate::llm::{InferenceService, IntentBridge, ShellContext};
use crate::syscall::{Origin, Syscall, SyscallContext, SyscallInvocation, SyscallOutput, SyscallTable};
use crate::ui::state::LogCategory;
use crate::ui::Presenter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Routing,
    Executing,
    Presenting,
}

/// Whether the session keeps accepting input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Shutdown,
}

/// Fully resolved result of one input event
#[derive(Debug)]
pub struct Outcome {
    pub input: String,
    /// Which grammar produced (or failed to produce) the invocation
    pub origin: Option<Origin>,
    /// Set once routing succeeded
    pub syscall: Option<Syscall>,
    pub result: Result<SyscallOutput>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(KernelError::kind)
    }
}

/// What happened to one submitted line
#[derive(Debug)]
pub enum Step {
    /// Blank input
    Ignored,
    Exit,
    Completed(Outcome),
}

pub struct Session<S> {
    id: SessionId,
    kernel: KernelContext,
    cwd: PathKey,
    user: Option<String>,
    state: LoopState,
    table: SyscallTable,
    bridge: Option<IntentBridge<S>>,
    presenter: Box<dyn Presenter + Send>,
}

impl<S: InferenceService> Session<S> {
    /// Start a session at `home`, falling back to `/` when it is not a directory
    pub fn open(
        kernel: KernelContext,
        home: PathKey,
        bridge: Option<IntentBridge<S>>,
        presenter: Box<dyn Presenter + Send>,
    ) -> Self {
        let id = SessionId::new();
        let cwd = if kernel.index().is_directory(&home) {
            home
        } else {
            tracing::warn!(home = %home, "Home directory missing, starting at /");
            PathKey::root()
        };

        tracing::info!(session = %id, cwd = %cwd, online = bridge.is_some(), "Session opened");
        kernel.log(Some(id), format!("session started at {}", cwd), LogCategory::System);

        Self {
            id,
            kernel,
            cwd,
            user: None,
            state: LoopState::Idle,
            table: SyscallTable::standard(),
            bridge,
            presenter,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn cwd(&self) -> &PathKey {
        &self.cwd
    }

    /// Account logged in to this session
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn kernel(&self) -> &KernelContext {
        &self.kernel
    }

    pub fn prompt(&self) -> String {
        format!("{}@NEURO:{}> ", self.user.as_deref().unwrap_or("USER"), self.cwd)
    }

    /// Route and execute one input event without presenting it
    ///
    /// Errors are terminal for the event: nothing is retried and the
    /// session is back in `Idle` when this returns.
    pub async fn execute(&mut self, input: &str) -> Step {
        let input = input.trim();
        if input.is_empty() {
            return Step::Ignored;
        }

        self.state = LoopState::Routing;
        let (origin, routed) = self.route(input).await;

        let invocation = match routed {
            Ok(Some(invocation)) => invocation,
            Ok(None) => {
                self.state = LoopState::Idle;
                return Step::Exit;
            }
            Err(e) => {
                tracing::info!(session = %self.id, kind = ?e.kind(), "Input rejected: {}", e);
                self.state = LoopState::Idle;
                return Step::Completed(Outcome {
                    input: input.to_string(),
                    origin: Some(origin),
                    syscall: None,
                    result: Err(e),
                });
            }
        };

        self.state = LoopState::Executing;
        let mut ctx = SyscallContext::new(&self.kernel, self.id, &mut self.cwd, &mut self.user);
        let result = self.table.dispatch(&mut ctx, &invocation);
        if let Err(e) = &result {
            tracing::info!(session = %self.id, syscall = %invocation.name, kind = ?e.kind(), "Syscall failed: {}", e);
        }

        self.state = LoopState::Idle;
        Step::Completed(Outcome {
            input: input.to_string(),
            origin: Some(invocation.origin),
            syscall: Some(invocation.name),
            result,
        })
    }

    /// Execute one input event and hand the outcome to the presenter
    pub async fn submit(&mut self, input: &str) -> Control {
        match self.execute(input).await {
            Step::Ignored => Control::Continue,
            Step::Exit => Control::Shutdown,
            Step::Completed(outcome) => {
                self.state = LoopState::Presenting;
                self.presenter.present(&outcome);
                self.state = LoopState::Idle;
                Control::Continue
            }
        }
    }

    /// `Ok(None)` means the input asked to end the session
    async fn route(&self, input: &str) -> (Origin, Result<Option<SyscallInvocation>>) {
        match parse_command(input) {
            Ok(Parsed::Invocation(invocation)) => {
                tracing::debug!(syscall = %invocation.name, "Routed to command grammar");
                (Origin::Command, Ok(Some(invocation)))
            }
            Ok(Parsed::Exit) => (Origin::Command, Ok(None)),
            Err(e) => (Origin::Command, Err(e)),
            Ok(Parsed::NotACommand) => {
                let Some(bridge) = &self.bridge else {
                    return (
                        Origin::Intent,
                        Err(KernelError::BridgeUnavailable(
                            "no inference service configured".into(),
                        )),
                    );
                };
                tracing::debug!("Routed to intent bridge");
                let context = ShellContext::from_kernel(&self.kernel, &self.cwd);
                (Origin::Intent, bridge.resolve(input, &context).await.map(Some))
            }
        }
    }

    /// End the session and stop every app it launched
    pub fn close(self) {
        if let Some(user) = &self.user {
            self.kernel
                .log(Some(self.id), format!("{} logged out", user), LogCategory::System);
        }
        let stopped = self.kernel.processes.terminate_session(self.id);
        tracing::info!(session = %self.id, stopped, "Session closed");
        self.kernel.log(
            Some(self.id),
            format!("session ended, {} app(s) stopped", stopped),
            LogCategory::System,
        );
    }
}
