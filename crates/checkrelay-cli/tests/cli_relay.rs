//! End-to-end tests for the `checkrelay` binary.
//!
//! Stand-in interpreters (`echo`, `false`, `sh`) replace python so the tests
//! do not depend on the checker being installed.

use std::process::{Command, Output};

fn checkrelay(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_checkrelay"))
        .args(args)
        .env_remove("CHECKRELAY_PYTHON")
        .env_remove("CHECKRELAY_MODULE")
        .env_remove("CHECKRELAY_TIMEOUT_MS")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run checkrelay")
}

/// Test: checker stdout is relayed verbatim and a passing checker exits 0
#[test]
fn test_check_relays_stdout() {
    let out = checkrelay(&["check", "--python", "echo", "--module", "lambdacheck"]);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(out.stdout, b"-m lambdacheck\n");
}

/// Test: stdout bytes that are not valid UTF-8 are relayed unchanged
#[cfg(unix)]
#[test]
fn test_check_relays_non_utf8_bytes() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let interpreter = dir.path().join("fake-python");
    std::fs::write(&interpreter, "#!/bin/sh\nprintf 'ok\\377\\n'\n").expect("write stub");
    std::fs::set_permissions(&interpreter, std::fs::Permissions::from_mode(0o755))
        .expect("chmod stub");

    let out = checkrelay(&["check", "--python", interpreter.to_str().expect("utf-8 path")]);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(out.stdout, [b'o', b'k', 0xff, b'\n']);
}

/// Test: --timeout-ms 0 means no deadline
#[test]
fn test_check_zero_timeout_runs_normally() {
    let out = checkrelay(&["check", "--python", "echo", "--timeout-ms", "0"]);

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(out.stdout, b"-m lambdacheck\n");
}

/// Test: a failing checker's exit code is mirrored
#[test]
fn test_check_mirrors_failure_exit_code() {
    let out = checkrelay(&["check", "--python", "false"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
}

/// Test: --allow-failure relays and exits 0
#[test]
fn test_check_allow_failure() {
    let out = checkrelay(&["check", "--python", "false", "--allow-failure"]);

    assert_eq!(out.status.code(), Some(0));
}

/// Test: a missing interpreter is reported by name with exit code 127
#[test]
fn test_check_missing_interpreter() {
    let out = checkrelay(&["check", "--python", "definitely-not-a-real-python-xyz"]);

    assert_eq!(out.status.code(), Some(127));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("definitely-not-a-real-python-xyz"),
        "stderr: {stderr}"
    );
}

/// Test: --format json emits the whole execution result
#[test]
fn test_check_json_format() {
    let out = checkrelay(&[
        "check", "--python", "echo", "--module", "lambdacheck", "--format", "json",
    ]);

    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(value["program"], "echo");
    assert_eq!(value["exit_code"], 0);
    assert_eq!(value["stdout"], "-m lambdacheck\n");
    assert_eq!(value["stderr"], "");
}

/// Test: interpreter and module can come from the environment
#[test]
fn test_check_reads_environment() {
    let out = Command::new(env!("CARGO_BIN_EXE_checkrelay"))
        .arg("check")
        .env("CHECKRELAY_PYTHON", "echo")
        .env("CHECKRELAY_MODULE", "grader")
        .env_remove("CHECKRELAY_TIMEOUT_MS")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run checkrelay");

    assert!(out.status.success());
    assert_eq!(out.stdout, b"-m grader\n");
}

/// Test: check --preflight refuses to run when the module cannot be imported
#[test]
fn test_check_with_failing_preflight() {
    // `sh -c "import lambdacheck"` fails like a python without the module.
    let out = checkrelay(&["check", "--python", "sh", "--preflight"]);

    assert_eq!(out.status.code(), Some(127));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("preflight"), "stderr: {stderr}");
}

/// Test: preflight subcommand succeeds for a usable interpreter
#[test]
fn test_preflight_ok() {
    let out = checkrelay(&["preflight", "--python", "echo"]);

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("lambdacheck"), "stdout: {stdout}");
}

/// Test: preflight JSON report for an unusable interpreter
#[test]
fn test_preflight_json_failure() {
    let out = checkrelay(&["preflight", "--python", "sh", "--format", "json"]);

    assert_eq!(out.status.code(), Some(127));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid JSON");
    assert_eq!(value["available"], false);
    assert_eq!(value["error_kind"], "missing_dependency");
    assert_eq!(value["module"], "lambdacheck");
}
