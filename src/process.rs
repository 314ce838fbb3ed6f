//! External process adapter
//!
//! Spawns an executable directly (never through a shell), hands out its
//! stdout as a lazily consumed pipe, drains stderr in the background into a
//! bounded diagnostic buffer, and owns the process until it has exited.
//!
//! On unix every child is placed in its own process group, and
//! [`ProcessHandle::terminate`] signals the whole group so helpers started by
//! the tool do not outlive it.

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinHandle;

/// Exit report of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    /// Tail of standard error, lossily decoded and trimmed
    pub diagnostic: String,
}

impl ProcessExit {
    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a failed exit into [`Error::ExtractionFailed`]
    ///
    /// An empty stderr is replaced by a description of the exit status.
    pub fn into_error(self) -> Error {
        let diagnostic = if self.diagnostic.is_empty() {
            match self.code {
                Some(code) => format!("tool exited with code {code}"),
                None => "tool was terminated by a signal".to_string(),
            }
        } else {
            self.diagnostic
        };
        Error::extraction_failed(diagnostic, self.code)
    }
}

/// Everything needed to start one process
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions<'a> {
    /// Environment overrides layered over the inherited environment
    pub env: Vec<(&'a str, &'a str)>,
    /// Bytes of stderr retained for the diagnostic
    pub stderr_limit: usize,
}

/// Start `program` with `args`
///
/// stdin is closed, stdout is piped for the caller, stderr is drained by a
/// background task. `permit` (if any) is held until the handle is dropped so
/// an admission limit covers the whole process lifetime.
pub fn spawn<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    options: &SpawnOptions<'_>,
    permit: Option<OwnedSemaphorePermit>,
) -> Result<ProcessHandle> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    for (key, value) in &options.env {
        command.env(key, value);
    }

    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|source| Error::ProcessSpawnFailed {
        program: program.display().to_string(),
        source,
    })?;

    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child
        .stderr
        .take()
        .map(|pipe| tokio::spawn(drain_tail(pipe, options.stderr_limit)));

    tracing::debug!(program = %program.display(), pid = ?pid, "spawned external process");

    Ok(ProcessHandle {
        child,
        pid,
        program: program.display().to_string(),
        stdout,
        stderr,
        terminated: false,
        exited: false,
        _permit: permit,
    })
}

/// Exclusive ownership of one running external process
///
/// Never shared between requests. Dropping a handle whose process is still
/// running terminates it.
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    program: String,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    terminated: bool,
    exited: bool,
    _permit: Option<OwnedSemaphorePermit>,
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("program", &self.program)
            .field("pid", &self.pid)
            .field("terminated", &self.terminated)
            .field("exited", &self.exited)
            .finish()
    }
}

impl ProcessHandle {
    /// OS process id (also the process group id on unix)
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Program this handle was spawned from
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Take the stdout pipe; `None` if already taken
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Forcibly stop the process and its process group
    ///
    /// Idempotent: only the first call does anything, and a process that has
    /// already exited is left alone. OS errors from signalling (e.g. the
    /// process exited between the check and the signal) are logged, never
    /// returned. Returns `true` if a kill signal was actually sent.
    pub fn terminate(&mut self) -> bool {
        if self.terminated || self.exited {
            return false;
        }
        self.terminated = true;

        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exited = true;
                tracing::debug!(pid = ?self.pid, %status, "process already exited, nothing to terminate");
                return false;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(pid = ?self.pid, error = %e, "could not poll process before terminate");
            }
        }

        #[cfg(unix)]
        if let Some(pid) = self.pid {
            if let Err(e) = kill_process_group(pid) {
                tracing::debug!(pid, error = %e, "process group signal failed");
            }
        }

        match self.child.start_kill() {
            Ok(()) => {
                tracing::debug!(pid = ?self.pid, program = %self.program, "terminated external process");
                true
            }
            Err(e) => {
                tracing::warn!(pid = ?self.pid, error = %e, "failed to signal external process");
                false
            }
        }
    }

    /// Wait for the process to exit and collect its diagnostic
    ///
    /// An unread stdout pipe is closed first so a chatty process cannot
    /// block on a full pipe forever. A nonzero exit is not an error here.
    pub async fn wait(mut self) -> Result<ProcessExit> {
        self.wait_exit().await
    }

    /// Like [`wait`](Self::wait), but keeps the handle so the caller can
    /// still terminate the process if the wait is abandoned
    ///
    /// Cancel-safe up to the point the process has exited.
    pub async fn wait_exit(&mut self) -> Result<ProcessExit> {
        drop(self.stdout.take());

        let status = self.child.wait().await?;
        self.exited = true;

        let diagnostic = match self.stderr.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        tracing::debug!(pid = ?self.pid, code = ?status.code(), "external process exited");

        Ok(ProcessExit {
            code: status.code(),
            diagnostic,
        })
    }

    /// Read all of stdout (up to `limit` bytes) and wait for exit
    ///
    /// Exceeding `limit` terminates the process and yields
    /// [`Error::MalformedMetadata`].
    pub async fn collect_output(mut self, limit: usize) -> Result<(Vec<u8>, ProcessExit)> {
        let mut buffer = Vec::new();

        if let Some(stdout) = self.stdout.take() {
            let mut limited = stdout.take(limit as u64 + 1);
            limited.read_to_end(&mut buffer).await?;

            if buffer.len() > limit {
                self.terminate();
                let _ = self.wait().await;
                return Err(Error::MalformedMetadata(format!(
                    "tool output exceeded {limit} bytes"
                )));
            }
        }

        let exit = self.wait().await?;
        Ok((buffer, exit))
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.exited && !self.terminated {
            self.terminate();
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| std::io::Error::other(format!("pid {pgid} out of range")))?;
    // SAFETY: killpg has no memory-safety preconditions; it only sends a signal.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Read `pipe` to the end, keeping only the last `limit` bytes
async fn drain_tail<R: AsyncRead + Unpin>(mut pipe: R, limit: usize) -> String {
    let mut kept: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                kept.extend_from_slice(&chunk[..n]);
                if kept.len() > limit {
                    let excess = kept.len() - limit;
                    kept.drain(..excess);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "stderr read failed");
                break;
            }
        }
    }

    String::from_utf8_lossy(&kept).trim().to_string()
}
