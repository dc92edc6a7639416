//! Tool invocation on top of a `ProcessRunner`
//!
//! `ShellExecutor` turns a tool invocation (program, arguments, working
//! directory, `KEY=VALUE` environment list, dry-run flag, stderr target) into a
//! `ProcessCommand` and converts a non-successful exit status into a
//! `ProcessError` that still carries the exit code, so callers can classify it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::builder::ProcessCommandBuilder;
use super::error::ProcessError;
use super::runner::{ExitStatus, OutputMode, ProcessCommand, ProcessRunner, StderrTarget};

/// A single tool invocation
#[derive(Debug, Clone, Default)]
pub struct ShellInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<String>,
    pub dry_run: bool,
    pub stderr: StderrTarget,
    pub timeout: Option<Duration>,
}

impl ShellInvocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(|s| s.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    pub fn with_env(mut self, env: &[String]) -> Self {
        self.env = env.to_vec();
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn stderr(mut self, target: StderrTarget) -> Self {
        self.stderr = target;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn to_command(&self, output: OutputMode) -> ProcessCommand {
        let mut builder = ProcessCommandBuilder::new(&self.program)
            .args(&self.args)
            .env_list(&self.env)
            .output(output)
            .stderr(self.stderr.clone());
        if let Some(dir) = &self.working_dir {
            builder = builder.current_dir(dir);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

#[derive(Clone)]
pub struct ShellExecutor {
    runner: Arc<dyn ProcessRunner>,
}

impl ShellExecutor {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Run with output streamed to the terminal
    pub async fn execute(&self, invocation: ShellInvocation) -> Result<(), ProcessError> {
        self.run(invocation, OutputMode::Inherit).await.map(|_| ())
    }

    /// Run attached to the caller's terminal, stdin included
    pub async fn execute_interactive(
        &self,
        invocation: ShellInvocation,
    ) -> Result<(), ProcessError> {
        self.run(invocation, OutputMode::Interactive).await.map(|_| ())
    }

    /// Run and return captured stdout
    ///
    /// In dry-run mode nothing is spawned and an empty string is returned.
    pub async fn capture(&self, invocation: ShellInvocation) -> Result<String, ProcessError> {
        self.run(invocation, OutputMode::Capture).await
    }

    async fn run(
        &self,
        invocation: ShellInvocation,
        output: OutputMode,
    ) -> Result<String, ProcessError> {
        let command_line = invocation.command_line();

        if invocation.dry_run {
            info!("Dry run: would execute '{}'", command_line);
            if let Some(dir) = &invocation.working_dir {
                debug!("Dry run working directory: {}", dir.display());
            }
            return Ok(String::new());
        }

        debug!("Executing '{}'", command_line);
        let result = self.runner.run(invocation.to_command(output)).await?;

        match result.status {
            ExitStatus::Success => Ok(result.stdout),
            ExitStatus::Error(code) => Err(ProcessError::ExitCode {
                command: command_line,
                code,
            }),
            ExitStatus::Signal(signal) => Err(ProcessError::Signal {
                command: command_line,
                signal,
            }),
            ExitStatus::Timeout => Err(ProcessError::Timeout(result.duration)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::MockProcessRunner;

    #[tokio::test]
    async fn test_dry_run_spawns_nothing() {
        let mock = MockProcessRunner::new();
        let executor = ShellExecutor::new(Arc::new(mock.clone()));

        executor
            .execute(ShellInvocation::new("terraform", ["apply"]).dry_run(true))
            .await
            .unwrap();

        assert!(mock.get_call_history().is_empty());
    }

    #[tokio::test]
    async fn test_exit_code_is_preserved() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("terraform")
            .returns_exit_code(1)
            .returns_stderr("Workspace \"dev\" doesn't exist.")
            .finish();
        let executor = ShellExecutor::new(Arc::new(mock.clone()));

        let err = executor
            .execute(ShellInvocation::new("terraform", ["workspace", "select", "dev"]))
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), Some(1));
        assert!(err.to_string().contains("terraform workspace select dev"));
    }

    #[tokio::test]
    async fn test_invocation_is_translated() {
        let mut mock = MockProcessRunner::new();
        mock.expect_command("helmfile")
            .returns_stdout("ok")
            .finish();
        let executor = ShellExecutor::new(Arc::new(mock.clone()));

        let stdout = executor
            .capture(
                ShellInvocation::new("helmfile", ["diff"])
                    .in_dir(Path::new("/tmp/components/echo"))
                    .with_env(&["STACK=dev".to_string()])
                    .stderr(StderrTarget::Stdout),
            )
            .await
            .unwrap();
        assert_eq!(stdout, "ok");

        let calls = mock.get_call_history();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["diff"]);
        assert_eq!(calls[0].env.get("STACK"), Some(&"dev".to_string()));
        assert_eq!(calls[0].stderr, StderrTarget::Stdout);
        assert_eq!(calls[0].output, OutputMode::Capture);
        assert_eq!(
            calls[0].working_dir.as_deref(),
            Some(Path::new("/tmp/components/echo"))
        );
    }
}
