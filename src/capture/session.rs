//! Capture process session
//!
//! A [`CaptureSession`] owns one running capture tool: its process handle,
//! its stdout and the task draining its stderr. [`CaptureSession::shutdown`]
//! kills and reaps the process; the child is also spawned with
//! `kill_on_drop` so a dropped session never leaves the tool running.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::error::CaptureError;
use crate::registry::StreamChannel;

use super::config::CaptureCommand;

/// How long to wait for the stderr drain after the process is gone
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Longest stderr line logged as one record; longer output is split
const MAX_STDERR_LINE: u64 = 1024;

/// One running capture process
#[derive(Debug)]
pub struct CaptureSession {
    channel: StreamChannel,
    program: String,
    child: Child,
    stdout: ChildStdout,
    stderr_task: JoinHandle<()>,
}

impl CaptureSession {
    /// Spawn the capture tool with piped stdout and stderr
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(channel: StreamChannel, command: &CaptureCommand) -> Result<Self, CaptureError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        // kill_on_drop takes care of the child on the early returns
        let stdout = child.stdout.take().ok_or(CaptureError::Pipe {
            channel,
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or(CaptureError::Pipe {
            channel,
            stream: "stderr",
        })?;

        let stderr_task = tokio::spawn(drain_stderr(channel, stderr));

        tracing::info!(
            channel = %channel,
            program = %command.program,
            pid = ?child.id(),
            "Capture process started"
        );

        Ok(Self {
            channel,
            program: command.program.clone(),
            child,
            stdout,
            stderr_task,
        })
    }

    /// Channel this session captures
    pub fn channel(&self) -> StreamChannel {
        self.channel
    }

    /// OS process id, if the process has not been reaped yet
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Read the next block of capture output
    ///
    /// End of output is reported as [`CaptureError::Eof`]. Cancel-safe.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        match self.stdout.read(buf).await {
            Ok(0) if !buf.is_empty() => Err(CaptureError::Eof),
            Ok(n) => Ok(n),
            Err(e) => Err(CaptureError::Read(e)),
        }
    }

    /// Kill the process, reap it and release its pipes
    pub async fn shutdown(self) {
        let Self {
            channel,
            program,
            mut child,
            stdout,
            mut stderr_task,
        } = self;

        drop(stdout);

        // Fails only if the process was already reaped
        if let Err(e) = child.start_kill() {
            tracing::debug!(channel = %channel, error = %e, "Capture process already gone");
        }

        match child.wait().await {
            Ok(status) => {
                tracing::info!(
                    channel = %channel,
                    program = %program,
                    status = %status,
                    "Capture process exited"
                );
            }
            Err(e) => {
                tracing::warn!(
                    channel = %channel,
                    program = %program,
                    error = %e,
                    "Failed to reap capture process"
                );
            }
        }

        // A grandchild may still hold stderr open
        if tokio::time::timeout(STDERR_DRAIN_TIMEOUT, &mut stderr_task)
            .await
            .is_err()
        {
            stderr_task.abort();
        }
    }
}

/// Read one stderr line of at most [`MAX_STDERR_LINE`] bytes into `line`
///
/// A tool that never writes a newline is read in bounded pieces instead of
/// growing `line` without limit. Returns 0 at end of output.
async fn read_stderr_line<R>(reader: &mut R, line: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    reader.take(MAX_STDERR_LINE).read_until(b'\n', line).await
}

/// Forward the tool's stderr to the log, line by line
async fn drain_stderr(channel: StreamChannel, stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut line = Vec::new();

    loop {
        match read_stderr_line(&mut reader, &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end();
                if !text.is_empty() {
                    tracing::info!(channel = %channel, "capture: {}", text);
                }
            }
            Err(e) => {
                tracing::debug!(channel = %channel, error = %e, "Capture stderr closed");
                break;
            }
        }
    }
}
