//! Streaming invocation with cancellation on caller disconnect.
//!
//! A driver task owns the child. It forwards stdout and stderr chunks as
//! they are read, then sends a single `Exit` event once both pipes reach EOF
//! and the child has been reaped. If the receiving [`RelayStream`] goes away
//! first, the driver kills the child once, reaps it, and stops.

use std::pin::Pin;
use std::task::{Context, Poll};

use cligate_core::{
    InvocationMode, InvocationState, Lifecycle, ProcessInvocation, RelayError, RelayEvent,
    SIGNAL_EXIT_CODE,
};
use futures::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::utf8::Utf8Chunker;
use crate::CHUNK_SIZE;

const EVENT_BUFFER: usize = 100;

/// Live output of one streamed invocation.
///
/// Yields output events in the order each pipe produced them, followed by
/// exactly one [`RelayEvent::Exit`]. Dropping it early terminates the child.
pub struct RelayStream {
    events: ReceiverStream<RelayEvent>,
    driver: JoinHandle<InvocationState>,
    pid: Option<u32>,
}

impl RelayStream {
    /// OS process id of the child, if it was still running when spawned.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Disconnects from the invocation and waits for the driver to finish.
    ///
    /// Resolves to `Cancelled` if the child was still running, otherwise to
    /// the outcome it had already reached.
    pub async fn cancel(self) -> InvocationState {
        let Self { events, driver, .. } = self;
        drop(events);
        driver.await.unwrap_or_else(|e| {
            error!("Relay driver task failed: {}", e);
            InvocationState::Failed
        })
    }
}

impl Stream for RelayStream {
    type Item = RelayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

/// Spawns the child and its driver task.
pub(crate) fn start(invocation: &ProcessInvocation) -> Result<RelayStream, RelayError> {
    let id = Uuid::new_v4();
    let mut lifecycle = Lifecycle::new(InvocationMode::Streaming);
    info!(invocation_id = %id, "Streaming command: {}", invocation);

    let mut child = crate::spawn(invocation).inspect_err(|e| error!(invocation_id = %id, "{}", e))?;
    lifecycle.advance(InvocationState::Running)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("child stderr was not captured"))?;

    let pid = child.id();
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let driver = tokio::spawn(drive(id, child, stdout, stderr, tx, lifecycle));

    Ok(RelayStream {
        events: ReceiverStream::new(rx),
        driver,
        pid,
    })
}

async fn drive<O, E>(
    id: Uuid,
    mut child: Child,
    stdout: O,
    stderr: E,
    tx: mpsc::Sender<RelayEvent>,
    mut lifecycle: Lifecycle,
) -> InvocationState
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let pumps = async {
        tokio::join!(
            pump(stdout, &tx, RelayEvent::Stdout),
            pump(stderr, &tx, RelayEvent::Stderr),
        )
    };

    let disconnected = tokio::select! {
        biased;
        _ = tx.closed() => true,
        _ = pumps => false,
    };

    let status = match disconnected {
        true => None,
        false => tokio::select! {
            biased;
            _ = tx.closed() => None,
            status = child.wait() => Some(status),
        },
    };

    let Some(status) = status else {
        return cancel(id, &mut child, &mut lifecycle).await;
    };

    let exit_code = match status {
        Ok(status) => status.code().unwrap_or(SIGNAL_EXIT_CODE),
        Err(e) => {
            error!(invocation_id = %id, "Failed to wait for child: {}", e);
            SIGNAL_EXIT_CODE
        }
    };

    let outcome = lifecycle.finish(exit_code).unwrap_or_else(|e| {
        error!(invocation_id = %id, "{}", e);
        InvocationState::Failed
    });
    match outcome {
        InvocationState::Succeeded => debug!(invocation_id = %id, "Stream finished"),
        _ => warn!(invocation_id = %id, "Streamed command exited with code {}", exit_code),
    }

    if tx.send(RelayEvent::Exit(exit_code)).await.is_err() {
        debug!(invocation_id = %id, "Caller left before the exit event");
    }
    outcome
}

/// Forwards one pipe as events until EOF or until the receiver is gone.
async fn pump<R, F>(mut reader: R, tx: &mpsc::Sender<RelayEvent>, wrap: F)
where
    R: AsyncRead + Unpin,
    F: Fn(String) -> RelayEvent,
{
    let mut decoder = Utf8Chunker::default();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let read = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to read child output: {}", e);
                break;
            }
        };

        if let Some(text) = decoder.push(&buf[..read]) {
            if tx.send(wrap(text)).await.is_err() {
                return;
            }
        }
    }

    if let Some(rest) = decoder.finish() {
        let _ = tx.send(wrap(rest)).await;
    }
}

/// Sends the single termination signal and reaps the child.
async fn cancel(id: Uuid, child: &mut Child, lifecycle: &mut Lifecycle) -> InvocationState {
    info!(invocation_id = %id, pid = ?child.id(), "Caller disconnected, terminating child");

    if let Err(e) = child.start_kill() {
        debug!(invocation_id = %id, "Child already exited: {}", e);
    }
    if let Err(e) = child.wait().await {
        error!(invocation_id = %id, "Failed to reap child: {}", e);
    }

    for next in [InvocationState::Cancelled, InvocationState::Terminated] {
        if let Err(e) = lifecycle.advance(next) {
            error!(invocation_id = %id, "{}", e);
        }
    }
    InvocationState::Cancelled
}
