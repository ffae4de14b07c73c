//! Invocation specs: what to launch and how to treat its exit status.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Interpreter used for the default checker invocation.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Module run by the default checker invocation.
pub const DEFAULT_MODULE: &str = "lambdacheck";

/// Interpreter flag that runs a module as a program.
pub const MODULE_FLAG: &str = "-m";

/// How a completed child with a non-zero exit status is surfaced.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    /// Non-zero exit is a [`RelayError::NonZeroExit`](crate::RelayError::NonZeroExit)
    /// carrying the captured output.
    #[default]
    Fail,

    /// Non-zero exit is returned as a normal result; the caller inspects
    /// [`ExecutionResult::passed`](crate::ExecutionResult::passed).
    Report,
}

/// An external tool the invocation depends on, plus the probe that proves
/// it is usable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolDependency {
    /// Program that must be launchable.
    pub program: String,

    /// Arguments of the probe run; the probe must exit 0.
    pub probe_args: Vec<String>,
}

impl ToolDependency {
    /// Interpreter must start and be able to import `module`.
    pub fn python_module(interpreter: impl Into<String>, module: &str) -> Self {
        Self {
            program: interpreter.into(),
            probe_args: vec!["-c".to_string(), format!("import {}", module)],
        }
    }

    pub fn new(program: impl Into<String>, probe_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            probe_args,
        }
    }
}

/// Immutable description of one child-process launch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvocationSpec {
    program: String,
    args: Vec<String>,
    #[serde(default)]
    timeout: Option<Duration>,
    #[serde(default)]
    exit_policy: ExitPolicy,
    #[serde(default)]
    dependency: Option<ToolDependency>,
}

impl InvocationSpec {
    /// Generic program with a fixed argument list and no declared dependency.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: None,
            exit_policy: ExitPolicy::default(),
            dependency: None,
        }
    }

    /// `<interpreter> -m <module>`, declaring the interpreter and module as
    /// a dependency.
    pub fn python_module(interpreter: impl Into<String>, module: &str) -> Self {
        let interpreter = interpreter.into();
        let dependency = ToolDependency::python_module(interpreter.clone(), module);
        Self {
            dependency: Some(dependency),
            ..Self::new(interpreter, [MODULE_FLAG, module])
        }
    }

    /// Kill the child and fail with a timeout once `limit` has elapsed.
    ///
    /// A zero `limit` means no deadline.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = (!limit.is_zero()).then_some(limit);
        self
    }

    pub fn with_exit_policy(mut self, policy: ExitPolicy) -> Self {
        self.exit_policy = policy;
        self
    }

    pub fn with_dependency(mut self, dependency: ToolDependency) -> Self {
        self.dependency = Some(dependency);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The deadline, if any. A zero duration (e.g. from a deserialized spec)
    /// counts as none.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.filter(|limit| !limit.is_zero())
    }

    pub fn exit_policy(&self) -> ExitPolicy {
        self.exit_policy
    }

    pub fn dependency(&self) -> Option<&ToolDependency> {
        self.dependency.as_ref()
    }
}

impl Default for InvocationSpec {
    /// The checker: `python3 -m lambdacheck`.
    fn default() -> Self {
        Self::python_module(DEFAULT_INTERPRETER, DEFAULT_MODULE)
    }
}

impl fmt::Display for InvocationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_word(f, &self.program)?;
        for arg in &self.args {
            f.write_str(" ")?;
            write_word(f, arg)?;
        }
        Ok(())
    }
}

fn write_word(f: &mut fmt::Formatter<'_>, word: &str) -> fmt::Result {
    if word.is_empty() || word.contains(char::is_whitespace) || word.contains('"') {
        write!(f, "{:?}", word)
    } else {
        f.write_str(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fixed_checker_invocation() {
        let spec = InvocationSpec::default();
        assert_eq!(spec.program(), "python3");
        assert_eq!(spec.args(), &["-m".to_string(), "lambdacheck".to_string()]);
        assert_eq!(spec.timeout(), None);
        assert_eq!(spec.exit_policy(), ExitPolicy::Fail);
    }

    #[test]
    fn test_python_module_declares_dependency() {
        let spec = InvocationSpec::python_module("/usr/bin/python3.11", "lambdacheck");
        let dep = spec.dependency().expect("dependency declared");
        assert_eq!(dep.program, "/usr/bin/python3.11");
        assert_eq!(dep.probe_args, vec!["-c", "import lambdacheck"]);
    }

    #[test]
    fn test_generic_spec_has_no_dependency() {
        let spec = InvocationSpec::new("echo", ["OK"]);
        assert!(spec.dependency().is_none());
        assert_eq!(spec.args(), &["OK".to_string()]);
    }

    #[test]
    fn test_builders() {
        let spec = InvocationSpec::new("sleep", ["30"])
            .with_timeout(Duration::from_millis(100))
            .with_exit_policy(ExitPolicy::Report);
        assert_eq!(spec.timeout(), Some(Duration::from_millis(100)));
        assert_eq!(spec.exit_policy(), ExitPolicy::Report);
    }

    #[test]
    fn test_sub_millisecond_timeout_kept() {
        let spec = InvocationSpec::new("sleep", ["30"]).with_timeout(Duration::from_micros(500));
        assert_eq!(spec.timeout(), Some(Duration::from_micros(500)));
    }

    #[test]
    fn test_zero_timeout_means_no_deadline() {
        let spec = InvocationSpec::new("sleep", ["30"])
            .with_timeout(Duration::from_millis(100))
            .with_timeout(Duration::ZERO);
        assert_eq!(spec.timeout(), None);
    }

    #[test]
    fn test_display_quotes_words_with_spaces() {
        let spec = InvocationSpec::new("sh", ["-c", "printf OK"]);
        assert_eq!(spec.to_string(), "sh -c \"printf OK\"");
        assert_eq!(InvocationSpec::default().to_string(), "python3 -m lambdacheck");
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let spec: InvocationSpec =
            serde_json::from_str(r#"{"program":"python3","args":["-m","lambdacheck"]}"#).unwrap();
        assert_eq!(spec.exit_policy(), ExitPolicy::Fail);
        assert_eq!(spec.timeout(), None);
        assert!(spec.dependency().is_none());
    }

    #[test]
    fn test_deserialized_zero_timeout_means_no_deadline() {
        let spec: InvocationSpec = serde_json::from_str(
            r#"{"program":"sleep","args":["30"],"timeout":{"secs":0,"nanos":0}}"#,
        )
        .unwrap();
        assert_eq!(spec.timeout(), None);
    }
}
