use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

use crate::backend::BackendError;
use crate::subprocess::ProcessError;

/// The unified error type for stackctl
///
/// Guard failures name the component and stack they were raised for, so the
/// message alone is enough to act on.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{:04}] '{key}' must be configured (or set {env_var}): {message}", ErrorCode::CONFIG_MISSING_REQUIRED)]
    ConfigPrecondition {
        key: String,
        env_var: String,
        message: String,
    },

    #[error("[E{:04}] `{command}` requires a stack; pass it with --stack", ErrorCode::INVOCATION_MISSING_STACK)]
    MissingStack { command: String },

    #[error("[E{:04}] {message}", ErrorCode::INVOCATION_INVALID)]
    InvalidInvocation { message: String },

    #[error(
        "[E{:04}] component '{component}' points to the {tool} component '{final_component}', but it does not exist in '{base_path}'",
        ErrorCode::COMPONENT_INVALID,
        base_path = .base_path.display()
    )]
    InvalidComponent {
        tool: String,
        component: String,
        final_component: String,
        base_path: PathBuf,
    },

    #[error(
        "[E{:04}] abstract component '{component}' cannot be provisioned in stack '{stack}' (`{command}`); abstract components are not deployable",
        ErrorCode::COMPONENT_ABSTRACT
    )]
    AbstractComponent {
        component: String,
        stack: String,
        command: String,
    },

    #[error(
        "[E{:04}] component '{component}' is locked in stack '{stack}' and cannot be modified with `{command}`",
        ErrorCode::COMPONENT_LOCKED
    )]
    LockedComponent {
        component: String,
        stack: String,
        command: String,
    },

    #[error(
        "[E{:04}] component '{component}' in stack '{stack}' did not pass the validation policies",
        ErrorCode::COMPONENT_NOT_VALID
    )]
    ComponentNotValid { component: String, stack: String },

    #[error(
        "[E{:04}] workspaces are not supported for the '{backend_type}' backend (component '{component}', stack '{stack}')",
        ErrorCode::WORKSPACE_UNSUPPORTED
    )]
    UnsupportedWorkspaceOperation {
        backend_type: String,
        component: String,
        stack: String,
    },

    #[error(
        "[E{:04}] `apply` for component '{component}' in stack '{stack}' needs an interactive terminal; pass -auto-approve to run unattended",
        ErrorCode::TTY_REQUIRED
    )]
    NoInteractiveTerminal { component: String, stack: String },

    #[error("[E{:04}] failed to write '{path}': {source}", ErrorCode::ARTIFACT_WRITE_FAILED, path = .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("[E{:04}] plan comparison failed: {message}", ErrorCode::EXEC_PLAN_DIFF)]
    PlanDiff { message: String },

    #[error("[E{code:04}] {0}", code = .0.code())]
    Process(#[from] ProcessError),

    #[error("[E{code:04}] {0}", code = .0.code())]
    Backend(#[from] BackendError),
}

impl StackError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_invocation(message: impl Into<String>) -> Self {
        Self::InvalidInvocation {
            message: message.into(),
        }
    }

    pub fn artifact(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Artifact {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn plan_diff(message: impl Into<String>) -> Self {
        Self::PlanDiff {
            message: message.into(),
        }
    }

    /// Add a source error to a configuration error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        if let Self::Config { source: src, .. } = &mut self {
            *src = Some(source.into());
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. } => *code,
            Self::ConfigPrecondition { .. } => ErrorCode::CONFIG_MISSING_REQUIRED,
            Self::MissingStack { .. } => ErrorCode::INVOCATION_MISSING_STACK,
            Self::InvalidInvocation { .. } => ErrorCode::INVOCATION_INVALID,
            Self::InvalidComponent { .. } => ErrorCode::COMPONENT_INVALID,
            Self::AbstractComponent { .. } => ErrorCode::COMPONENT_ABSTRACT,
            Self::LockedComponent { .. } => ErrorCode::COMPONENT_LOCKED,
            Self::ComponentNotValid { .. } => ErrorCode::COMPONENT_NOT_VALID,
            Self::UnsupportedWorkspaceOperation { .. } => ErrorCode::WORKSPACE_UNSUPPORTED,
            Self::NoInteractiveTerminal { .. } => ErrorCode::TTY_REQUIRED,
            Self::Artifact { .. } => ErrorCode::ARTIFACT_WRITE_FAILED,
            Self::PlanDiff { .. } => ErrorCode::EXEC_PLAN_DIFF,
            Self::Process(err) => err.code(),
            Self::Backend(err) => err.code(),
        }
    }

    /// Get the exit code for this error
    ///
    /// A tool that exited on its own passes its exit code through unchanged.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Process(err) => err.exit_code().unwrap_or(1),
            Self::Config { .. } | Self::ConfigPrecondition { .. } => 2,
            Self::MissingStack { .. } | Self::InvalidInvocation { .. } => 2,
            Self::InvalidComponent { .. }
            | Self::AbstractComponent { .. }
            | Self::LockedComponent { .. }
            | Self::ComponentNotValid { .. }
            | Self::UnsupportedWorkspaceOperation { .. }
            | Self::NoInteractiveTerminal { .. } => 3,
            Self::Artifact { .. } | Self::Backend(_) => 4,
            Self::PlanDiff { .. } => 5,
        }
    }

    /// True for errors raised by the validation gate
    pub fn is_guard_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingStack { .. }
                | Self::InvalidComponent { .. }
                | Self::AbstractComponent { .. }
                | Self::LockedComponent { .. }
                | Self::ComponentNotValid { .. }
                | Self::UnsupportedWorkspaceOperation { .. }
        )
    }
}

/// Type alias for Results using StackError
pub type Result<T> = std::result::Result<T, StackError>;

impl From<serde_yaml::Error> for StackError {
    fn from(err: serde_yaml::Error) -> Self {
        StackError::config_with_code(ErrorCode::CONFIG_INVALID_YAML, "Invalid YAML syntax")
            .with_source(err)
    }
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::config_with_code(ErrorCode::CONFIG_GENERIC, "Invalid JSON document")
            .with_source(err)
    }
}
