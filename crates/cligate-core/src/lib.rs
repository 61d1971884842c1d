//! Core domain types and error definitions for cligate.
//!
//! This crate provides the types shared across the gateway:
//!
//! - [`RelayError`]: Error type for external process invocations
//! - [`PromptRequest`]: A prompt as received from a caller
//! - [`ToolCommand`]: The external executable and its fixed arguments
//! - [`ProcessInvocation`]: A fully built command line, ready to spawn
//! - [`ProcessOutput`] and [`RelayEvent`]: Buffered and streamed outcomes
//! - [`Lifecycle`] and [`InvocationState`]: Per-invocation state machine
//!
//! # Example
//!
//! ```rust
//! use cligate_core::{ProcessInvocation, PromptRequest, ToolCommand};
//!
//! let request = PromptRequest::new("Tell me a joke");
//! let command = ToolCommand::default();
//! let invocation = ProcessInvocation::prompt(&command, &request, &[]);
//!
//! assert_eq!(invocation.command, "uvx");
//! assert_eq!(invocation.args, ["llm", "Tell me a joke", "-m", "gpt-4o-mini"]);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Error text used when a failing process wrote nothing to stderr.
pub const FALLBACK_ERROR: &str = "Command failed";

/// Exit code reported for a child that was terminated by a signal.
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// Errors that can occur while invoking the external tool.
#[derive(Error, Debug)]
pub enum RelayError {
    /// The external process exited nonzero. Carries its stderr text verbatim.
    #[error("{0}")]
    ExternalTool(String),

    /// The executable could not be started.
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Reading output or waiting for the child failed.
    #[error("I/O error while relaying process output: {0}")]
    Io(#[from] io::Error),

    /// The configured timeout elapsed before the process exited.
    #[error("Command timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    /// The process produced more output than the configured cap.
    #[error("Command output exceeded {0} bytes")]
    OutputTooLarge(usize),

    /// An invocation attempted an illegal state change.
    #[error("Invalid invocation state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: InvocationState,
        to: InvocationState,
    },
}

impl RelayError {
    /// Creates a spawn error with command context.
    pub fn spawn(command: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn { command: command.into(), source }
    }

    /// Creates an external tool error, falling back to a generic message
    /// when the process wrote nothing to stderr.
    pub fn external(stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        match stderr.is_empty() {
            true => Self::ExternalTool(FALLBACK_ERROR.to_string()),
            false => Self::ExternalTool(stderr),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// A prompt as received from a caller.
///
/// Optional fields become command-line flags only when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRequest {
    /// The prompt text, passed as a positional argument.
    pub prompt: String,
    /// Model identifier understood by the external tool.
    #[serde(default = "default_model")]
    pub model: String,
    /// Optional system prompt (`-s`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Optional sampling temperature (`-t`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Optional output token limit (`--max-tokens`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl PromptRequest {
    /// Creates a request for the default model with no optional flags.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: default_model(),
            system: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Builds the argument list that follows the executable name.
    pub fn to_args(&self, subcommand: &str) -> Vec<String> {
        let mut args = vec![
            subcommand.to_string(),
            self.prompt.clone(),
            "-m".to_string(),
            self.model.clone(),
        ];

        if let Some(system) = &self.system {
            args.extend(["-s".to_string(), system.clone()]);
        }
        if let Some(temperature) = self.temperature {
            args.extend(["-t".to_string(), temperature.to_string()]);
        }
        if let Some(max_tokens) = self.max_tokens {
            args.extend(["--max-tokens".to_string(), max_tokens.to_string()]);
        }

        args
    }
}

// ============================================================================
// Invocations
// ============================================================================

/// The external executable and the fixed arguments it is always called with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    /// Executable name, resolved through `PATH`.
    pub program: String,
    /// Literal placed before every argument list.
    pub subcommand: String,
    /// Arguments (after the subcommand) that print one model per line.
    pub list_args: Vec<String>,
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self {
            program: "uvx".to_string(),
            subcommand: "llm".to_string(),
            list_args: vec!["models".to_string(), "list".to_string()],
        }
    }
}

/// A fully built command line, owned by the relay call that spawns it.
#[derive(Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    /// Executable name.
    pub command: String,
    /// Ordered arguments.
    pub args: Vec<String>,
    /// Variables set on top of the inherited process environment.
    pub environment: BTreeMap<String, String>,
}

impl ProcessInvocation {
    /// Builds the invocation for a prompt.
    pub fn prompt(command: &ToolCommand, request: &PromptRequest, env: &[(String, String)]) -> Self {
        Self {
            command: command.program.clone(),
            args: request.to_args(&command.subcommand),
            environment: env.iter().cloned().collect(),
        }
    }

    /// Builds the invocation that lists available models.
    pub fn list_models(command: &ToolCommand, env: &[(String, String)]) -> Self {
        let args = std::iter::once(command.subcommand.clone())
            .chain(command.list_args.iter().cloned())
            .collect();

        Self {
            command: command.program.clone(),
            args,
            environment: env.iter().cloned().collect(),
        }
    }
}

const LOG_ARG_LIMIT: usize = 50;

/// Renders the command line for logs, shortening long arguments.
impl fmt::Display for ProcessInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            match arg.char_indices().nth(LOG_ARG_LIMIT) {
                Some((cut, _)) => write!(f, " {:?}...", &arg[..cut])?,
                None => write!(f, " {:?}", arg)?,
            }
        }
        Ok(())
    }
}

/// Environment values are credentials; only their names are printed.
impl fmt::Debug for ProcessInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessInvocation")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("environment", &self.environment.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Everything a buffered invocation captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessOutput {
    /// Returns true if the process exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns stdout unaltered on success, or the stderr text as an error.
    pub fn into_stdout(self) -> Result<String, RelayError> {
        match self.success() {
            true => Ok(self.stdout),
            false => Err(RelayError::external(self.stderr)),
        }
    }
}

/// One event of a streamed invocation.
///
/// A stream carries any number of output events followed by exactly one
/// [`RelayEvent::Exit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A chunk of standard output.
    Stdout(String),
    /// A chunk of standard error. Non-fatal.
    Stderr(String),
    /// The process exited with this code.
    Exit(i32),
}

impl RelayEvent {
    /// Returns true for the terminal exit event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayEvent::Exit(_))
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Execution mode of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    Buffered,
    Streaming,
}

/// State of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationState {
    Created,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Terminated,
}

impl InvocationState {
    /// Returns true for the three states that record how a run ended.
    pub fn is_outcome(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: InvocationState) -> bool {
        use InvocationState::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Succeeded, Terminated)
                | (Failed, Terminated)
                | (Cancelled, Terminated)
        )
    }
}

/// Tracks one invocation through `Created → Running → outcome → Terminated`.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    mode: InvocationMode,
    state: InvocationState,
    outcome: Option<InvocationState>,
}

impl Lifecycle {
    pub fn new(mode: InvocationMode) -> Self {
        Self { mode, state: InvocationState::Created, outcome: None }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    /// The recorded outcome, once the invocation has left `Running`.
    pub fn outcome(&self) -> Option<InvocationState> {
        self.outcome
    }

    /// Moves to `next`, rejecting illegal transitions.
    ///
    /// `Cancelled` is only legal for streaming invocations.
    pub fn advance(&mut self, next: InvocationState) -> Result<(), RelayError> {
        let cancel_in_buffered =
            next == InvocationState::Cancelled && self.mode == InvocationMode::Buffered;

        if cancel_in_buffered || !self.state.can_transition_to(next) {
            return Err(RelayError::InvalidTransition { from: self.state, to: next });
        }

        if next.is_outcome() {
            self.outcome = Some(next);
        }
        self.state = next;
        Ok(())
    }

    /// Records the outcome for an exit code and moves on to `Terminated`.
    pub fn finish(&mut self, exit_code: i32) -> Result<InvocationState, RelayError> {
        let outcome = match exit_code {
            0 => InvocationState::Succeeded,
            _ => InvocationState::Failed,
        };
        self.advance(outcome)?;
        self.advance(InvocationState::Terminated)?;
        Ok(outcome)
    }
}
