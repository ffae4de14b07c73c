//! checkrelay - run the notebook checker and relay its output
//!
//! ## Commands
//!
//! - `check`: run `<python> -m <module>`, write its stdout verbatim to our
//!   stdout and exit with its status
//! - `preflight`: verify the interpreter starts and the module imports
//!
//! Logs go to stderr; stdout carries only the checker's output.

use anyhow::{Context, Result};
use checkrelay::{
    init_tracing, preflight, ErrorKind, ExecutionResult, ExitPolicy, InvocationSpec, Invoker,
    RelayError, DEFAULT_INTERPRETER, DEFAULT_MODULE,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn, Level};

#[derive(Parser)]
#[command(name = "checkrelay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run the notebook checker and relay its output", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the checker and relay its stdout
    Check {
        #[command(flatten)]
        tool: ToolArgs,

        /// Kill the checker after this many milliseconds (0 disables)
        #[arg(long, env = "CHECKRELAY_TIMEOUT_MS")]
        timeout_ms: Option<u64>,

        /// Relay output and exit 0 even when the checker fails
        #[arg(long)]
        allow_failure: bool,

        /// Verify the interpreter and module before running
        #[arg(long)]
        preflight: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Verify the interpreter starts and the checker module imports
    Preflight {
        #[command(flatten)]
        tool: ToolArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Which interpreter and module make up the checker invocation.
#[derive(Args)]
struct ToolArgs {
    /// Python interpreter used to run the checker
    #[arg(long, env = "CHECKRELAY_PYTHON", default_value = DEFAULT_INTERPRETER)]
    python: String,

    /// Checker module, run with `-m`
    #[arg(long, env = "CHECKRELAY_MODULE", default_value = DEFAULT_MODULE)]
    module: String,
}

impl ToolArgs {
    fn spec(&self) -> InvocationSpec {
        InvocationSpec::python_module(self.python.clone(), &self.module)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Checker stdout, unmodified
    Text,
    /// Full execution result as JSON
    Json,
}

#[derive(Serialize)]
struct PreflightReport<'a> {
    program: &'a str,
    module: &'a str,
    available: bool,
    error_kind: Option<ErrorKind>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    init_tracing(cli.json, level);

    let outcome = match cli.command {
        Commands::Check {
            tool,
            timeout_ms,
            allow_failure,
            preflight,
            format,
        } => cmd_check(&tool, timeout_ms, allow_failure, preflight, format).await,
        Commands::Preflight { tool, format } => cmd_preflight(&tool, format).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<RelayError>()
                .map(|relay| kind_exit_code(relay.kind()))
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

/// Host exit code for a failure that kept the checker from completing.
fn kind_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Launch | ErrorKind::MissingDependency => 127,
        ErrorKind::Timeout => 124,
        ErrorKind::StreamRead | ErrorKind::Wait => 74,
        ErrorKind::Runtime => 70,
        ErrorKind::NonZeroExit => 1,
    }
}

/// Host exit code mirroring a completed checker's status.
fn checker_exit_code(result: &ExecutionResult) -> u8 {
    match result.exit_code() {
        Some(0) => 0,
        Some(code) => u8::try_from(code).ok().filter(|c| *c != 0).unwrap_or(1),
        None => 1,
    }
}

/// Run the checker and relay its output
async fn cmd_check(
    tool: &ToolArgs,
    timeout_ms: Option<u64>,
    allow_failure: bool,
    run_preflight: bool,
    format: OutputFormat,
) -> Result<ExitCode> {
    let policy = if allow_failure {
        ExitPolicy::Report
    } else {
        ExitPolicy::Fail
    };
    let mut spec = tool.spec().with_exit_policy(policy);
    if let Some(ms) = timeout_ms {
        spec = spec.with_timeout(Duration::from_millis(ms));
    }

    if run_preflight {
        preflight(&spec).await.context("checker preflight failed")?;
    }

    info!(command = %spec, "running checker");

    let result = match Invoker::run(&spec).await {
        Ok(result) => result,
        Err(RelayError::NonZeroExit { result, .. }) => *result,
        Err(err) => return Err(err).with_context(|| format!("failed to run `{}`", spec)),
    };

    emit(&result, format)?;

    if result.passed() {
        return Ok(ExitCode::SUCCESS);
    }

    if allow_failure {
        warn!(status = %result.status_label(), "checker failed, ignored (--allow-failure)");
        return Ok(ExitCode::SUCCESS);
    }

    error!(
        status = %result.status_label(),
        stderr = %result.stderr().trim_end(),
        "checker failed"
    );
    Ok(ExitCode::from(checker_exit_code(&result)))
}

/// Write the result to stdout in the requested format.
fn emit(result: &ExecutionResult, format: OutputFormat) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    match format {
        OutputFormat::Text => stdout
            .write_all(result.stdout_bytes())
            .context("failed to relay checker output")?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, result)
                .context("failed to serialize execution result")?;
            writeln!(stdout).context("failed to write to stdout")?;
        }
    }

    stdout.flush().context("failed to flush stdout")
}

/// Verify the checker's interpreter and module
async fn cmd_preflight(tool: &ToolArgs, format: OutputFormat) -> Result<ExitCode> {
    let spec = tool.spec();
    let outcome = preflight(&spec).await;

    if format == OutputFormat::Json {
        let report = PreflightReport {
            program: &tool.python,
            module: &tool.module,
            available: outcome.is_ok(),
            error_kind: outcome.as_ref().err().map(RelayError::kind),
            error: outcome.as_ref().err().map(ToString::to_string),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(match &outcome {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => ExitCode::from(kind_exit_code(err.kind())),
        });
    }

    outcome.with_context(|| format!("checker `{}` is not usable", spec))?;
    println!("✓ `{}` can run module `{}`", tool.python, tool.module);
    Ok(ExitCode::SUCCESS)
}
