//! Forwarding loop from tool stdout to the response body

use super::{StreamOutcome, StreamState, next_chunk};
use crate::error::Error;
use crate::process::ProcessHandle;
use axum::body::Bytes;
use std::io;
use std::time::Duration;
use tokio::process::ChildStdout;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

/// Upper bound on reaping a process after it was killed
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

pub(super) struct Pump {
    pub url: String,
    pub handle: ProcessHandle,
    pub reader: ReaderStream<ChildStdout>,
    pub first_chunk: Bytes,
    pub tx: mpsc::Sender<io::Result<Bytes>>,
    pub stall_timeout: Option<Duration>,
}

enum Step {
    Chunk(Bytes),
    Eof,
    ReadFailed(io::Error),
    ClientGone,
}

/// Run one stream to a terminal state
///
/// The sender side of the body channel is the only link to the client: a
/// closed channel means the client disconnected, and the process is killed
/// before anything else is read from it.
pub(super) async fn pump(pump: Pump) -> StreamOutcome {
    let Pump {
        url,
        mut handle,
        mut reader,
        first_chunk,
        tx,
        stall_timeout,
    } = pump;
    let pid = handle.pid();

    let mut bytes_sent = first_chunk.len() as u64;
    if tx.send(Ok(first_chunk)).await.is_err() {
        return abort(handle, &url, 0).await;
    }

    loop {
        let step = tokio::select! {
            biased;
            _ = tx.closed() => Step::ClientGone,
            chunk = next_chunk(&mut reader, stall_timeout) => match chunk {
                Ok(Some(bytes)) => Step::Chunk(bytes),
                Ok(None) => Step::Eof,
                Err(e) => Step::ReadFailed(e),
            },
        };

        match step {
            Step::Chunk(bytes) => {
                let len = bytes.len() as u64;
                if tx.send(Ok(bytes)).await.is_err() {
                    return abort(handle, &url, bytes_sent).await;
                }
                bytes_sent += len;
            }
            Step::ClientGone => return abort(handle, &url, bytes_sent).await,
            Step::Eof => {
                drop(reader);
                return finish(handle, &url, bytes_sent, &tx).await;
            }
            Step::ReadFailed(e) => {
                tracing::error!(url = %url, pid = ?pid, error = %e, bytes_sent, "reading tool output failed");
                handle.terminate();
                let exit = reap(handle).await;
                let diagnostic = match exit.as_ref().map(|x| x.diagnostic.as_str()) {
                    Some(stderr) if !stderr.is_empty() => format!("{e}: {stderr}"),
                    _ => e.to_string(),
                };
                return fail(&url, bytes_sent, exit.and_then(|x| x.code), diagnostic, &tx).await;
            }
        }
    }
}

async fn abort(mut handle: ProcessHandle, url: &str, bytes_sent: u64) -> StreamOutcome {
    let pid = handle.pid();
    handle.terminate();
    let exit = reap(handle).await;

    tracing::info!(
        url,
        pid = ?pid,
        bytes_sent,
        state = %StreamState::Aborted,
        "client disconnected, download process terminated"
    );

    StreamOutcome {
        state: StreamState::Aborted,
        bytes_sent,
        exit_code: exit.and_then(|x| x.code),
        diagnostic: None,
    }
}

/// Wait for the tool after its stdout closed
///
/// The client can still leave while the tool lingers, so the body channel is
/// watched here too.
async fn finish(
    mut handle: ProcessHandle,
    url: &str,
    bytes_sent: u64,
    tx: &mpsc::Sender<io::Result<Bytes>>,
) -> StreamOutcome {
    let pid = handle.pid();
    let waited = tokio::select! {
        biased;
        _ = tx.closed() => None,
        exit = handle.wait_exit() => Some(exit),
    };
    let exit = match waited {
        None => return abort(handle, url, bytes_sent).await,
        Some(Ok(exit)) => exit,
        Some(Err(e)) => {
            return fail(url, bytes_sent, None, format!("waiting for tool failed: {e}"), tx).await;
        }
    };

    if exit.success() {
        tracing::info!(url, pid = ?pid, bytes_sent, state = %StreamState::Completed, "download finished");
        return StreamOutcome {
            state: StreamState::Completed,
            bytes_sent,
            exit_code: exit.code,
            diagnostic: None,
        };
    }

    let code = exit.code;
    let diagnostic = match exit.into_error() {
        Error::ExtractionFailed { diagnostic, .. } => diagnostic,
        other => other.to_string(),
    };
    fail(url, bytes_sent, code, diagnostic, tx).await
}

/// Cut the body short and report a failed stream
async fn fail(
    url: &str,
    bytes_sent: u64,
    exit_code: Option<i32>,
    diagnostic: String,
    tx: &mpsc::Sender<io::Result<Bytes>>,
) -> StreamOutcome {
    let error = Error::StreamInterrupted(diagnostic.clone());
    tracing::error!(
        url,
        bytes_sent,
        exit_code = ?exit_code,
        state = %StreamState::Failed,
        error = %error,
        "download stream failed after headers were sent"
    );

    // An error item makes the server drop the connection instead of ending
    // the body cleanly, so the client sees a truncated transfer.
    let _ = tx.send(Err(io::Error::other(error.to_string()))).await;

    StreamOutcome {
        state: StreamState::Failed,
        bytes_sent,
        exit_code,
        diagnostic: Some(diagnostic),
    }
}

async fn reap(handle: ProcessHandle) -> Option<crate::process::ProcessExit> {
    let pid = handle.pid();
    match tokio::time::timeout(REAP_TIMEOUT, handle.wait()).await {
        Ok(Ok(exit)) => Some(exit),
        Ok(Err(e)) => {
            tracing::warn!(pid = ?pid, error = %e, "failed to reap download process");
            None
        }
        Err(_) => {
            tracing::warn!(pid = ?pid, "download process did not exit after kill");
            None
        }
    }
}
