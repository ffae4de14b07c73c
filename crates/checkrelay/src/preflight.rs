//! Startup check for the tool an invocation depends on.
//!
//! The invoker only discovers a missing interpreter or module when it runs.
//! [`preflight`] runs the dependency's probe up front so a host can refuse to
//! start with a clear message instead.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{RelayError, RelayResult};
use crate::invocation::{ExitPolicy, InvocationSpec, ToolDependency};
use crate::invoker::{block_on, Invoker};

/// Upper bound on how long a probe may run.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Verify the dependency declared by `spec`, if any.
///
/// Fails with [`RelayError::Launch`] when the program cannot start and with
/// [`RelayError::MissingDependency`] when the probe exits non-zero.
pub async fn preflight(spec: &InvocationSpec) -> RelayResult<()> {
    let Some(dependency) = spec.dependency() else {
        debug!(program = %spec.program(), "no dependency declared, skipping preflight");
        return Ok(());
    };
    probe(dependency).await
}

/// Run one dependency probe.
pub async fn probe(dependency: &ToolDependency) -> RelayResult<()> {
    let probe = InvocationSpec::new(dependency.program.clone(), dependency.probe_args.clone())
        .with_timeout(PROBE_TIMEOUT)
        .with_exit_policy(ExitPolicy::Report);

    let result = Invoker::run(&probe).await?;
    if result.passed() {
        info!(program = %dependency.program, "dependency available");
        return Ok(());
    }

    // Last non-empty stderr line is usually the interpreter's own summary,
    // e.g. "ModuleNotFoundError: No module named 'lambdacheck'".
    let detail = result
        .stderr()
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| format!("probe {}: {}", result.status_label(), line))
        .unwrap_or_else(|| format!("probe {}", result.status_label()));

    warn!(program = %dependency.program, %detail, "dependency probe failed");

    Err(RelayError::MissingDependency {
        program: dependency.program.clone(),
        detail,
    })
}

/// Blocking form of [`preflight`].
pub fn preflight_blocking(spec: &InvocationSpec) -> RelayResult<()> {
    block_on(preflight(spec))?
}
