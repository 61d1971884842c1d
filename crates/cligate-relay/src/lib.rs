//! Process relay for the external LLM command-line tool.
//!
//! Every call spawns exactly one child process. Output is delivered either
//! buffered or streamed:
//!
//! - [`Relay::prompt`] / [`Relay::run_buffered`]: wait for exit, return everything
//! - [`Relay::stream`]: a [`RelayStream`] of [`RelayEvent`]s ending in one `Exit`
//! - [`Relay::list_models`]: buffered listing, one model per line
//!
//! # Buffered
//!
//! ```rust,ignore
//! use cligate_core::PromptRequest;
//! use cligate_relay::Relay;
//!
//! let relay = Relay::default();
//! let text = relay.prompt(&PromptRequest::new("Hello!")).await?;
//! ```
//!
//! # Streaming
//!
//! ```rust,ignore
//! use cligate_core::{PromptRequest, RelayEvent};
//! use futures::StreamExt;
//!
//! let mut stream = relay.stream(&PromptRequest::new("Hello!"))?;
//! while let Some(event) = stream.next().await {
//!     match event {
//!         RelayEvent::Stdout(text) => print!("{}", text),
//!         RelayEvent::Stderr(text) => eprint!("{}", text),
//!         RelayEvent::Exit(code) => println!("\nexit {}", code),
//!     }
//! }
//! ```
//!
//! Dropping a [`RelayStream`] before its `Exit` event kills the child.

mod buffered;
mod stream;
mod utf8;

use std::process::Stdio;

use cligate_config::{GatewayConfig, RelayLimits};
use cligate_core::{ProcessInvocation, ProcessOutput, PromptRequest, RelayError, ToolCommand};
use tokio::process::{Child, Command};

pub use cligate_core::{InvocationState, RelayEvent};
pub use stream::RelayStream;
pub use utf8::Utf8Chunker;

/// Size of a single read from a child pipe.
pub(crate) const CHUNK_SIZE: usize = 8 * 1024;

/// Runs the external tool on behalf of callers.
#[derive(Clone, Default)]
pub struct Relay {
    command: ToolCommand,
    limits: RelayLimits,
    env: Vec<(String, String)>,
}

impl Relay {
    /// Creates a relay for the given command, limits and forwarded variables.
    pub fn new(command: ToolCommand, limits: RelayLimits, env: Vec<(String, String)>) -> Self {
        Self { command, limits, env }
    }

    /// Creates a relay from the gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.command.clone(), config.limits.clone(), config.forwarded_env.clone())
    }

    pub fn command(&self) -> &ToolCommand {
        &self.command
    }

    /// Builds the invocation for a prompt.
    pub fn invocation(&self, request: &PromptRequest) -> ProcessInvocation {
        ProcessInvocation::prompt(&self.command, request, &self.env)
    }

    /// Runs an invocation to completion and returns everything it wrote.
    pub async fn run_buffered(&self, invocation: &ProcessInvocation) -> Result<ProcessOutput, RelayError> {
        buffered::run(invocation, &self.limits).await
    }

    /// Runs a prompt and returns its standard output unaltered.
    ///
    /// A nonzero exit becomes [`RelayError::ExternalTool`] with the captured stderr.
    pub async fn prompt(&self, request: &PromptRequest) -> Result<String, RelayError> {
        self.run_buffered(&self.invocation(request)).await?.into_stdout()
    }

    /// Starts a prompt and streams its output as it is produced.
    pub fn stream(&self, request: &PromptRequest) -> Result<RelayStream, RelayError> {
        stream::start(&self.invocation(request))
    }

    /// Lists the models the external tool knows about, in its own order.
    pub async fn list_models(&self) -> Result<Vec<String>, RelayError> {
        let invocation = ProcessInvocation::list_models(&self.command, &self.env);
        let stdout = self.run_buffered(&invocation).await?.into_stdout()?;
        Ok(parse_model_lines(&stdout))
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("command", &self.command)
            .field("limits", &self.limits)
            .field("env", &self.env.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .finish()
    }
}

/// Splits listing output into trimmed, non-empty lines.
pub fn parse_model_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Spawns one child with piped output. The child is killed if dropped unreaped.
pub(crate) fn spawn(invocation: &ProcessInvocation) -> Result<Child, RelayError> {
    Command::new(&invocation.command)
        .args(&invocation.args)
        .envs(&invocation.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RelayError::spawn(&invocation.command, e))
}
