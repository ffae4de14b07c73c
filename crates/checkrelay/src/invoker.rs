//! Child-process execution and output capture.

use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::{RelayError, RelayResult, Stream};
use crate::invocation::{ExitPolicy, InvocationSpec};
use crate::result::ExecutionResult;

/// Runs an [`InvocationSpec`] as a child process and captures what it wrote.
pub struct Invoker;

impl Invoker {
    /// Run the spec and apply its [`ExitPolicy`].
    ///
    /// Under [`ExitPolicy::Fail`] a non-zero exit becomes
    /// [`RelayError::NonZeroExit`], which still carries the captured output.
    pub async fn run(spec: &InvocationSpec) -> RelayResult<ExecutionResult> {
        let result = Self::execute(spec).await?;

        if result.passed() || spec.exit_policy() == ExitPolicy::Report {
            return Ok(result);
        }

        Err(RelayError::NonZeroExit {
            program: spec.program().to_string(),
            result: Box::new(result),
        })
    }

    /// Run the spec to completion and return whatever it produced,
    /// regardless of exit status.
    ///
    /// Stdin is the null device. Stdout and stderr are drained concurrently
    /// while waiting, so neither pipe can fill up and stall the child. If the
    /// spec has a timeout and it elapses, the child is killed and reaped
    /// before [`RelayError::Timeout`] is returned.
    pub async fn execute(spec: &InvocationSpec) -> RelayResult<ExecutionResult> {
        let span = info_span!("invoke", program = %spec.program());
        Self::execute_inner(spec).instrument(span).await
    }

    async fn execute_inner(spec: &InvocationSpec) -> RelayResult<ExecutionResult> {
        let program = spec.program();
        let started_at = Utc::now();
        let start = Instant::now();

        debug!(command = %spec, "spawning");

        let mut child = Command::new(program)
            .args(spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RelayError::Launch {
                program: program.to_string(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = match spec.timeout() {
            Some(limit) => {
                let timed =
                    tokio::time::timeout(limit, capture(&mut child, program, stdout, stderr))
                        .await;
                match timed {
                    Ok(outcome) => outcome,
                    Err(_elapsed) => {
                        reap(&mut child).await;
                        warn!(
                            limit_ms = limit.as_millis() as u64,
                            "deadline elapsed, child killed"
                        );
                        return Err(RelayError::Timeout {
                            program: program.to_string(),
                            limit,
                        });
                    }
                }
            }
            None => capture(&mut child, program, stdout, stderr).await,
        };

        let (status, stdout, stderr) = match outcome {
            Ok(captured) => captured,
            Err(err) => {
                reap(&mut child).await;
                return Err(err);
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = status.code();

        info!(
            exit_code = ?exit_code,
            duration_ms,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "child exited"
        );

        Ok(ExecutionResult::new(
            program.to_string(),
            exit_code,
            stdout,
            stderr,
            duration_ms,
            started_at,
        ))
    }
}

/// Wait for the child while draining both pipes. Stops at the first error.
async fn capture<O, E>(
    child: &mut Child,
    program: &str,
    stdout: Option<O>,
    stderr: Option<E>,
) -> RelayResult<(ExitStatus, Vec<u8>, Vec<u8>)>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let wait = async {
        child.wait().await.map_err(|source| RelayError::Wait {
            program: program.to_string(),
            source,
        })
    };

    tokio::try_join!(
        wait,
        drain(stdout, program, Stream::Stdout),
        drain(stderr, program, Stream::Stderr),
    )
}

/// Read a pipe to EOF. The read end is dropped on return.
async fn drain<R>(reader: Option<R>, program: &str, stream: Stream) -> RelayResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|source| RelayError::StreamRead {
                program: program.to_string(),
                stream,
                source,
            })?;
    }
    Ok(buf)
}

/// Kill the child if it is still running and wait for it to be reaped.
async fn reap(child: &mut Child) {
    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(err) = child.kill().await {
        warn!(error = %err, "failed to kill child");
    }
}

/// Run the default checker invocation (`python3 -m lambdacheck`), blocking
/// the calling thread until it finishes.
pub fn run_check() -> RelayResult<ExecutionResult> {
    run_check_with(&InvocationSpec::default())
}

/// Blocking form of [`Invoker::run`].
///
/// Drives the invocation on a private current-thread runtime. Called from
/// inside an async context it fails with [`RelayError::Runtime`]; use
/// [`Invoker::run`] there instead.
pub fn run_check_with(spec: &InvocationSpec) -> RelayResult<ExecutionResult> {
    block_on(Invoker::run(spec))?
}

/// Drive `future` to completion on a fresh current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> RelayResult<F::Output> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(RelayError::Runtime(std::io::Error::new(
            std::io::ErrorKind::Other,
            "blocking call made from inside an async runtime",
        )));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(RelayError::Runtime)?;

    Ok(runtime.block_on(future))
}
