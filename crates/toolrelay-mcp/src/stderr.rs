//! Bounded capture of a server's stderr.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

/// Maximum number of stderr lines kept per server.
pub const MAX_STDERR_LINES: usize = 200;

/// Ring buffer of recent stderr lines, shared with the capture task.
#[derive(Debug, Clone, Default)]
pub struct StderrLog {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl StderrLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, evicting the oldest at capacity.
    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() >= MAX_STDERR_LINES {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Snapshot of the buffered lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Buffered lines joined with newlines.
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    /// Drain `stderr` into this log until EOF.
    pub fn capture<R>(&self, server_id: &str, stderr: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let log = self.clone();
        let server_id = server_id.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        tracing::debug!(server_id = %server_id, line = %line, "server stderr");
                        log.push(line);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(server_id = %server_id, error = %e, "stderr read failed");
                        break;
                    }
                }
            }
        })
    }
}
