//! Captured outcome of one checker invocation.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Output and exit status of a completed child process.
///
/// Built once by the invoker and handed to the caller; there are no setters.
/// Stdout is kept as raw bytes for relaying and as lossy UTF-8 text for
/// display and JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Program that was run.
    program: String,

    /// Exit code, or `None` when the child was terminated by a signal.
    exit_code: Option<i32>,

    /// Captured stdout, exactly as written by the child.
    #[serde(skip)]
    stdout_bytes: Vec<u8>,

    /// Stdout decoded as UTF-8, invalid sequences replaced.
    stdout: String,

    /// Captured stderr.
    stderr: String,

    /// Wall-clock duration in milliseconds.
    duration_ms: u64,

    /// When the child was spawned.
    started_at: DateTime<Utc>,
}

impl ExecutionResult {
    pub(crate) fn new(
        program: String,
        exit_code: Option<i32>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        duration_ms: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            program,
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stdout_bytes: stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            duration_ms,
            started_at,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Stdout as text. Use [`stdout_bytes`](Self::stdout_bytes) to relay it.
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Stdout byte-for-byte as the child wrote it.
    pub fn stdout_bytes(&self) -> &[u8] {
        &self.stdout_bytes
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the checker passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-readable exit status, e.g. `exited with code 1`.
    pub fn status_label(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exited with code {}", code),
            None => "was terminated by a signal".to_string(),
        }
    }

    /// Consume the result, keeping only stdout.
    pub fn into_stdout(self) -> String {
        self.stdout
    }
}
