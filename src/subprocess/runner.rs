use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use super::error::ProcessError;

/// Where a child's standard error stream is sent
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StderrTarget {
    #[default]
    Inherit,
    Stdout,
    Null,
    File(PathBuf),
}

impl StderrTarget {
    /// Parse a redirect target as given on the command line
    ///
    /// `/dev/stdout`, `/dev/stderr` and `/dev/null` map to the matching
    /// stream, anything else is treated as a file path.
    pub fn parse(target: &str) -> Self {
        match target.trim() {
            "" | "/dev/stderr" => StderrTarget::Inherit,
            "/dev/stdout" => StderrTarget::Stdout,
            "/dev/null" => StderrTarget::Null,
            other => StderrTarget::File(PathBuf::from(other)),
        }
    }
}

/// How stdout (and an inherited stderr) is wired for a child process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Stream directly to the terminal
    #[default]
    Inherit,
    /// Collect into `ProcessOutput`
    Capture,
    /// Inherit stdin as well, for tools that may prompt
    Interactive,
}

#[derive(Debug, Clone)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub output: OutputMode,
    pub stderr: StderrTarget,
}

impl ProcessCommand {
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error(i32),
    Timeout,
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError>;
}

pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Log command execution details
    fn log_command_start(command: &ProcessCommand) {
        tracing::debug!("Executing subprocess: {}", command.display());

        if !command.env.is_empty() {
            tracing::trace!("Extra environment variables: {:?}", command.env);
        }

        if let Some(ref dir) = command.working_dir {
            tracing::trace!("Working directory: {:?}", dir);
        }
    }

    /// Configure the command with environment, working directory and stdio.
    ///
    /// The parent environment is inherited; tools need cloud credentials and
    /// `PATH` from the caller's shell. Explicit variables override inherited ones.
    fn configure_command(
        command: &ProcessCommand,
    ) -> Result<tokio::process::Command, ProcessError> {
        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args);
        // A timed-out child must not outlive the wait
        cmd.kill_on_drop(true);

        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        Self::configure_stdio(&mut cmd, command)?;
        Ok(cmd)
    }

    /// Configure stdio for the process
    fn configure_stdio(
        cmd: &mut tokio::process::Command,
        command: &ProcessCommand,
    ) -> Result<(), ProcessError> {
        match command.output {
            OutputMode::Capture => {
                cmd.stdin(Stdio::null());
                cmd.stdout(Stdio::piped());
            }
            OutputMode::Inherit => {
                cmd.stdin(Stdio::null());
                cmd.stdout(Stdio::inherit());
            }
            OutputMode::Interactive => {
                cmd.stdin(Stdio::inherit());
                cmd.stdout(Stdio::inherit());
            }
        }

        match &command.stderr {
            StderrTarget::Inherit if command.output == OutputMode::Capture => {
                cmd.stderr(Stdio::piped());
            }
            StderrTarget::Inherit => {
                cmd.stderr(Stdio::inherit());
            }
            StderrTarget::Stdout => {
                cmd.stderr(Stdio::from(std::io::stdout()));
            }
            StderrTarget::Null => {
                cmd.stderr(Stdio::null());
            }
            StderrTarget::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                cmd.stderr(Stdio::from(file));
            }
        }

        Ok(())
    }

    /// Wait for process with optional timeout
    async fn wait_with_timeout(
        child: tokio::process::Child,
        timeout: Option<Duration>,
    ) -> Result<std::process::Output, ProcessError> {
        match timeout {
            Some(duration) => {
                match tokio::time::timeout(duration, child.wait_with_output()).await {
                    Ok(result) => result.map_err(ProcessError::Io),
                    Err(_) => Err(ProcessError::Timeout(duration)),
                }
            }
            None => child.wait_with_output().await.map_err(ProcessError::Io),
        }
    }

    /// Convert process exit status to our ExitStatus enum
    fn parse_exit_status(status: std::process::ExitStatus) -> ExitStatus {
        if status.success() {
            ExitStatus::Success
        } else if let Some(code) = status.code() {
            ExitStatus::Error(code)
        } else {
            Self::parse_signal_status(status)
        }
    }

    /// Parse signal status on Unix systems
    #[cfg(unix)]
    fn parse_signal_status(status: std::process::ExitStatus) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            ExitStatus::Signal(signal)
        } else {
            ExitStatus::Error(1)
        }
    }

    #[cfg(not(unix))]
    fn parse_signal_status(_status: std::process::ExitStatus) -> ExitStatus {
        ExitStatus::Error(1)
    }

    /// Log the process execution result
    fn log_result(result: &ProcessOutput, command: &ProcessCommand) {
        let command_str = command.display();

        match &result.status {
            ExitStatus::Success => {
                tracing::debug!(
                    "Subprocess completed successfully in {:?}: {}",
                    result.duration,
                    command_str
                );
            }
            ExitStatus::Error(code) => {
                tracing::debug!(
                    "Subprocess failed with exit code {} in {:?}: {}",
                    code,
                    result.duration,
                    command_str
                );
                if !result.stderr.is_empty() {
                    tracing::trace!("Stderr: {}", result.stderr);
                }
            }
            ExitStatus::Signal(signal) => {
                tracing::warn!(
                    "Subprocess terminated by signal {} in {:?}: {}",
                    signal,
                    result.duration,
                    command_str
                );
            }
            ExitStatus::Timeout => {
                tracing::warn!(
                    "Subprocess timed out after {:?}: {}",
                    result.duration,
                    command_str
                );
            }
        }
    }

    /// Map spawn error to ProcessError
    fn map_spawn_error(error: std::io::Error, command: &ProcessCommand) -> ProcessError {
        if error.kind() == std::io::ErrorKind::NotFound {
            ProcessError::CommandNotFound(command.program.clone())
        } else {
            ProcessError::SpawnFailed {
                command: command.display(),
                source: error,
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let start = std::time::Instant::now();

        Self::log_command_start(&command);

        let mut cmd = Self::configure_command(&command)?;
        let child = cmd
            .spawn()
            .map_err(|e| Self::map_spawn_error(e, &command))?;

        let output = Self::wait_with_timeout(child, command.timeout).await?;

        let result = ProcessOutput {
            status: Self::parse_exit_status(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        };

        Self::log_result(&result, &command);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_command() -> ProcessCommand {
        ProcessCommand {
            program: "echo".to_string(),
            args: vec!["test".to_string()],
            env: HashMap::new(),
            working_dir: None,
            timeout: None,
            output: OutputMode::Capture,
            stderr: StderrTarget::Inherit,
        }
    }

    #[test]
    fn test_stderr_target_parse() {
        assert_eq!(StderrTarget::parse(""), StderrTarget::Inherit);
        assert_eq!(StderrTarget::parse("/dev/stderr"), StderrTarget::Inherit);
        assert_eq!(StderrTarget::parse("/dev/stdout"), StderrTarget::Stdout);
        assert_eq!(StderrTarget::parse("/dev/null"), StderrTarget::Null);
        assert_eq!(
            StderrTarget::parse("/tmp/tf.log"),
            StderrTarget::File(PathBuf::from("/tmp/tf.log"))
        );
    }

    #[test]
    fn test_command_display() {
        let command = test_command();
        assert_eq!(command.display(), "echo test");

        let mut bare = test_command();
        bare.args.clear();
        assert_eq!(bare.display(), "echo");
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_exit_status() {
        use std::os::unix::process::ExitStatusExt;

        let status = std::process::ExitStatus::from_raw(0);
        assert_eq!(
            TokioProcessRunner::parse_exit_status(status),
            ExitStatus::Success
        );

        // Exit code 1
        let status = std::process::ExitStatus::from_raw(256);
        assert_eq!(
            TokioProcessRunner::parse_exit_status(status),
            ExitStatus::Error(1)
        );

        // SIGKILL
        let status = std::process::ExitStatus::from_raw(9);
        assert_eq!(
            TokioProcessRunner::parse_exit_status(status),
            ExitStatus::Signal(9)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timed_out_child_is_killed() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("after_timeout");

        let mut command = test_command();
        command.program = "sh".to_string();
        command.args = vec![
            "-c".to_string(),
            format!("sleep 1; touch '{}'", marker.display()),
        ];
        command.timeout = Some(Duration::from_millis(200));

        let err = TokioProcessRunner.run(command).await.unwrap_err();
        assert!(matches!(err, ProcessError::Timeout(_)));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_env_is_passed_to_child() {
        let mut command = test_command();
        command.program = "sh".to_string();
        command.args = vec!["-c".to_string(), "printf %s \"$STACKCTL_TEST_VAR\"".to_string()];
        command
            .env
            .insert("STACKCTL_TEST_VAR".to_string(), "value-1".to_string());

        let output = TokioProcessRunner.run(command).await.unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout, "value-1");
    }
}
