//! Buffered invocation: collect all output, then report.

use cligate_config::RelayLimits;
use cligate_core::{
    InvocationMode, InvocationState, Lifecycle, ProcessInvocation, ProcessOutput, RelayError,
    SIGNAL_EXIT_CODE,
};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Runs the invocation to completion, honouring the output cap and timeout.
pub(crate) async fn run(
    invocation: &ProcessInvocation,
    limits: &RelayLimits,
) -> Result<ProcessOutput, RelayError> {
    let id = Uuid::new_v4();
    let mut lifecycle = Lifecycle::new(InvocationMode::Buffered);
    info!(invocation_id = %id, "Running command: {}", invocation);

    let mut child = crate::spawn(invocation).inspect_err(|e| error!(invocation_id = %id, "{}", e))?;
    lifecycle.advance(InvocationState::Running)?;

    let collected = match limits.timeout {
        Some(timeout) => tokio::time::timeout(timeout, collect(&mut child, limits.max_output_bytes))
            .await
            .unwrap_or(Err(RelayError::TimedOut(timeout))),
        None => collect(&mut child, limits.max_output_bytes).await,
    };

    let (stdout, stderr, exit_code) = match collected {
        Ok(output) => output,
        Err(e) => {
            warn!(invocation_id = %id, "Command aborted: {}", e);
            abort(&mut child).await;
            lifecycle.advance(InvocationState::Failed)?;
            lifecycle.advance(InvocationState::Terminated)?;
            return Err(e);
        }
    };

    let outcome = lifecycle.finish(exit_code)?;
    match outcome {
        InvocationState::Succeeded => debug!(invocation_id = %id, "Command succeeded ({} bytes)", stdout.len()),
        _ => warn!(invocation_id = %id, "Command exited with code {}", exit_code),
    }

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code,
    })
}

/// Reads both pipes to EOF concurrently, then reaps the child.
async fn collect(child: &mut Child, limit: usize) -> Result<(Vec<u8>, Vec<u8>, i32), RelayError> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("child stderr was not captured"))?;

    let (stdout, stderr) = tokio::try_join!(read_capped(stdout, limit), read_capped(stderr, limit))?;
    let status = child.wait().await?;

    Ok((stdout, stderr, status.code().unwrap_or(SIGNAL_EXIT_CODE)))
}

/// Reads a pipe to EOF, failing once more than `limit` bytes arrive.
async fn read_capped<R>(reader: R, limit: usize) -> Result<Vec<u8>, RelayError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.take((limit as u64).saturating_add(1)).read_to_end(&mut buf).await?;

    match buf.len() > limit {
        true => Err(RelayError::OutputTooLarge(limit)),
        false => Ok(buf),
    }
}

/// Kills and reaps a child whose output is no longer wanted.
async fn abort(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!("Child already exited: {}", e);
    }
    if let Err(e) = child.wait().await {
        error!("Failed to reap child: {}", e);
    }
}
