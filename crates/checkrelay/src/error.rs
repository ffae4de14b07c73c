//! Error types for checker invocation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::ExecutionResult;

/// A standard stream of the child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Discriminant of a [`RelayError`], for callers that branch on the failure
/// class rather than on the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Launch,
    NonZeroExit,
    StreamRead,
    Wait,
    Timeout,
    Runtime,
    MissingDependency,
}

/// Errors produced while invoking an external checker.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The program could not be found or started.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    /// The program ran to completion but reported failure.
    #[error("`{program}` {}", .result.status_label())]
    NonZeroExit {
        program: String,
        result: Box<ExecutionResult>,
    },

    /// One of the output pipes could not be drained.
    #[error("failed to read {stream} of `{program}`: {source}")]
    StreamRead {
        program: String,
        stream: Stream,
        source: std::io::Error,
    },

    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },

    /// The deadline elapsed; the child has been killed and reaped.
    #[error("`{program}` timed out after {}ms", .limit.as_millis())]
    Timeout { program: String, limit: Duration },

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// A declared tool dependency failed its preflight probe.
    #[error("dependency `{program}` is not usable: {detail}")]
    MissingDependency { program: String, detail: String },
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelayError::Launch { .. } => ErrorKind::Launch,
            RelayError::NonZeroExit { .. } => ErrorKind::NonZeroExit,
            RelayError::StreamRead { .. } => ErrorKind::StreamRead,
            RelayError::Wait { .. } => ErrorKind::Wait,
            RelayError::Timeout { .. } => ErrorKind::Timeout,
            RelayError::Runtime(_) => ErrorKind::Runtime,
            RelayError::MissingDependency { .. } => ErrorKind::MissingDependency,
        }
    }

    /// The program this error is about, if any.
    pub fn program(&self) -> Option<&str> {
        match self {
            RelayError::Launch { program, .. }
            | RelayError::NonZeroExit { program, .. }
            | RelayError::StreamRead { program, .. }
            | RelayError::Wait { program, .. }
            | RelayError::Timeout { program, .. }
            | RelayError::MissingDependency { program, .. } => Some(program),
            RelayError::Runtime(_) => None,
        }
    }

    /// The captured result carried by a [`RelayError::NonZeroExit`].
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            RelayError::NonZeroExit { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<ExecutionResult> {
        match self {
            RelayError::NonZeroExit { result, .. } => Some(*result),
            _ => None,
        }
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = std::result::Result<T, RelayError>;
