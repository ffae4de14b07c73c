//! checkrelay - run an external checker and relay what it says
//!
//! Launches a fixed checker invocation (by default `python3 -m lambdacheck`)
//! as a child process and returns:
//! - its stdout, verbatim
//! - its stderr
//! - its exit status
//!
//! Launch failures, non-zero exits, pipe read failures and timeouts are
//! distinct [`RelayError`] variants. The checker's output is never parsed.

pub mod error;
pub mod invocation;
pub mod invoker;
pub mod preflight;
pub mod result;
pub mod telemetry;

// Re-export key types
pub use error::{ErrorKind, RelayError, RelayResult, Stream};
pub use invocation::{
    ExitPolicy, InvocationSpec, ToolDependency, DEFAULT_INTERPRETER, DEFAULT_MODULE, MODULE_FLAG,
};
pub use invoker::{run_check, run_check_with, Invoker};
pub use preflight::{preflight, preflight_blocking, probe, PROBE_TIMEOUT};
pub use result::ExecutionResult;
pub use telemetry::init_tracing;
