use std::time::Duration;

use crate::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Process timed out after {0:?}")]
    Timeout(Duration),

    #[error("'{command}' exited with code {code}")]
    ExitCode { command: String, code: i32 },

    #[error("'{command}' terminated by signal {signal}")]
    Signal { command: String, signal: i32 },

    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mock expectation not met: {0}")]
    MockExpectationNotMet(String),
}

impl ProcessError {
    /// Exit code reported by the child process, if it exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::ExitCode { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Registry code used when this error surfaces to the user
    pub fn code(&self) -> u16 {
        match self {
            ProcessError::CommandNotFound(_) => ErrorCode::EXEC_COMMAND_NOT_FOUND,
            ProcessError::Timeout(_) => ErrorCode::EXEC_TIMEOUT,
            ProcessError::ExitCode { .. } => ErrorCode::EXEC_SUBPROCESS_FAILED,
            ProcessError::Signal { .. } => ErrorCode::EXEC_SIGNAL_RECEIVED,
            ProcessError::SpawnFailed { .. } => ErrorCode::EXEC_SPAWN_FAILED,
            ProcessError::Io(_) | ProcessError::MockExpectationNotMet(_) => ErrorCode::EXEC_GENERIC,
        }
    }
}
