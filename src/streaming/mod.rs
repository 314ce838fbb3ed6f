//! Stream download orchestrator
//!
//! Turns an [`ExtractionRequest`] into live media bytes without touching disk:
//!
//! ```text
//! Building -> Spawned -> Streaming -> { Completed | Aborted | Failed }
//! ```
//!
//! [`StreamOrchestrator::start`] covers `Building` and `Spawned` and holds the
//! response back until the tool has produced its first chunk, so a tool that
//! fails immediately still yields a proper HTTP error. From `Streaming` on,
//! a [`pump`] task owns the process handle and forwards stdout into a bounded
//! channel that feeds the response body; headers are fixed at that point and
//! failures can only cut the body short.

use crate::error::{Error, Result};
use crate::extractor::{Extractor, Invocation};
use crate::types::{ExtractionRequest, OutputFormat};
use crate::utils::{content_disposition, sanitize_filename};
use crate::process::ProcessHandle;
use axum::body::Bytes;
use futures::StreamExt;
use std::io;
use std::time::Duration;
use tokio::process::ChildStdout;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::ReaderStream;

mod pump;

/// Read size for stdout chunks
const CHUNK_SIZE: usize = 64 * 1024;

/// Lifecycle of one download stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Selecting the argument set
    Building,
    /// Process started, no output yet
    Spawned,
    /// Bytes are flowing to the client
    Streaming,
    /// Process exited 0 and every byte was handed to the response
    Completed,
    /// Client went away; process terminated
    Aborted,
    /// Process failed or stalled after streaming began
    Failed,
}

impl StreamState {
    /// Lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Building => "building",
            StreamState::Spawned => "spawned",
            StreamState::Streaming => "streaming",
            StreamState::Completed => "completed",
            StreamState::Aborted => "aborted",
            StreamState::Failed => "failed",
        }
    }

    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Aborted | StreamState::Failed
        )
    }
}

impl std::fmt::Display for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final report of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Terminal state reached
    pub state: StreamState,
    /// Bytes handed to the response body
    pub bytes_sent: u64,
    /// Exit code of the tool, when it exited normally
    pub exit_code: Option<i32>,
    /// Diagnostic for failed streams
    pub diagnostic: Option<String>,
}

/// Starts download streams
#[derive(Clone, Debug)]
pub struct StreamOrchestrator {
    extractor: Extractor,
}

impl StreamOrchestrator {
    /// Create an orchestrator on top of `extractor`
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }

    /// Spawn the tool for `request` and wait for its first chunk
    ///
    /// `title` is sanitized into the attachment filename. Any failure before
    /// the first byte is returned as an error (and the process is reaped);
    /// after that, the returned [`PreparedDownload`] owns the process.
    pub async fn start(
        &self,
        request: &ExtractionRequest,
        title: Option<&str>,
    ) -> Result<PreparedDownload> {
        let config = self.extractor.config();
        let default_name = config.download.default_filename.as_str();
        let url = request.source_url.as_str();
        let format = request.output_format;

        tracing::debug!(url, %format, state = %StreamState::Building, "building download");
        let base = sanitize_filename(title.unwrap_or_default(), default_name);
        let disposition = content_disposition(&base, format, default_name);

        let mut handle = self.extractor.spawn(&Invocation::Download { url, format })?;
        let pid = handle.pid();
        tracing::debug!(url, pid = ?pid, state = %StreamState::Spawned, "download process started");

        let stdout = match handle.take_stdout() {
            Some(stdout) => stdout,
            None => {
                handle.terminate();
                let _ = handle.wait().await;
                return Err(Error::Io(io::Error::other("tool stdout was not captured")));
            }
        };
        let mut reader = ReaderStream::with_capacity(stdout, CHUNK_SIZE);
        let stall_timeout = config.download.stall_timeout;

        match next_chunk(&mut reader, stall_timeout).await {
            Ok(Some(first_chunk)) => {
                tracing::debug!(
                    url,
                    pid = ?pid,
                    state = %StreamState::Streaming,
                    filename = %format!("{base}.{}", format.extension()),
                    "first chunk received, committing response"
                );
                Ok(PreparedDownload {
                    request: request.clone(),
                    filename: format!("{base}.{}", format.extension()),
                    content_disposition: disposition,
                    handle,
                    reader,
                    first_chunk,
                    channel_capacity: config.download.channel_capacity.max(1),
                    stall_timeout,
                })
            }
            Ok(None) => {
                let exit = handle.wait().await?;
                tracing::error!(
                    url,
                    pid = ?pid,
                    exit_code = ?exit.code,
                    diagnostic = %exit.diagnostic,
                    "download produced no output"
                );
                if exit.success() {
                    Err(Error::extraction_failed(
                        "extraction tool produced no output",
                        exit.code,
                    ))
                } else {
                    Err(exit.into_error())
                }
            }
            Err(e) => {
                handle.terminate();
                let exit = handle.wait().await.ok();
                tracing::error!(url, pid = ?pid, error = %e, "download failed before first byte");
                let diagnostic = match exit.map(|x| x.diagnostic).filter(|d| !d.is_empty()) {
                    Some(stderr) => format!("{e}: {stderr}"),
                    None => e.to_string(),
                };
                Err(Error::extraction_failed(diagnostic, None))
            }
        }
    }
}

/// A download whose process has produced output but whose body is not yet flowing
#[derive(Debug)]
pub struct PreparedDownload {
    request: ExtractionRequest,
    filename: String,
    content_disposition: String,
    handle: ProcessHandle,
    reader: ReaderStream<ChildStdout>,
    first_chunk: Bytes,
    channel_capacity: usize,
    stall_timeout: Option<Duration>,
}

/// A download being pumped into a response body
pub struct ActiveDownload {
    /// Response body chunks; an `Err` item means the stream was cut short
    pub body: ReceiverStream<io::Result<Bytes>>,
    /// Resolves once the process is gone
    pub outcome: JoinHandle<StreamOutcome>,
}

impl PreparedDownload {
    /// OS pid of the tool process
    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }

    /// Attachment filename including extension
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Requested output format
    pub fn format(&self) -> OutputFormat {
        self.request.output_format
    }

    /// `Content-Type` header value
    pub fn content_type(&self) -> &'static str {
        self.request.output_format.content_type()
    }

    /// `Content-Disposition` header value
    pub fn content_disposition(&self) -> &str {
        &self.content_disposition
    }

    /// Hand the process to a pump task and return the body stream
    ///
    /// Dropping `body` counts as a client disconnect.
    pub fn spawn(self) -> ActiveDownload {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let outcome = tokio::spawn(pump::pump(pump::Pump {
            url: self.request.source_url,
            handle: self.handle,
            reader: self.reader,
            first_chunk: self.first_chunk,
            tx,
            stall_timeout: self.stall_timeout,
        }));

        ActiveDownload {
            body: ReceiverStream::new(rx),
            outcome,
        }
    }
}

/// Next stdout chunk, `Ok(None)` at end of stream
async fn next_chunk(
    reader: &mut ReaderStream<ChildStdout>,
    stall_timeout: Option<Duration>,
) -> io::Result<Option<Bytes>> {
    let next = match stall_timeout {
        Some(limit) => tokio::time::timeout(limit, reader.next())
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no output for {limit:?}"),
                )
            })?,
        None => reader.next().await,
    };
    next.transpose()
}
