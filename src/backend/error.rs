//! Error types for remote state reads

use thiserror::Error;

use crate::error::ErrorCode;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Error, Debug)]
pub enum BackendError {
    /// No reader is registered for the requested backend type
    #[error(
        "unsupported backend type `{backend_type}`; supported backends: {}",
        .supported.iter().map(|t| format!("`{t}`")).collect::<Vec<_>>().join(", ")
    )]
    UnsupportedBackendType {
        backend_type: String,
        supported: Vec<String>,
    },

    /// The raw state document could not be parsed
    #[error("error processing terraform state file: {0}")]
    StateParse(#[source] serde_json::Error),

    /// The reader failed to fetch the state
    #[error("failed to read {backend_type} backend state from '{location}': {message}")]
    Read {
        backend_type: String,
        location: String,
        message: String,
    },

    /// The backend section is missing something the reader needs
    #[error("invalid {backend_type} backend configuration: {message}")]
    Configuration {
        backend_type: String,
        message: String,
    },

    /// An output query expression could not be parsed
    #[error("invalid output query `{expression}`: {message}")]
    InvalidQuery { expression: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn read(
        backend_type: &str,
        location: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Read {
            backend_type: backend_type.to_string(),
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn configuration(backend_type: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            backend_type: backend_type.to_string(),
            message: message.into(),
        }
    }

    /// Registry code used when this error surfaces to the user
    pub fn code(&self) -> u16 {
        match self {
            Self::UnsupportedBackendType { .. } => ErrorCode::BACKEND_UNSUPPORTED_TYPE,
            Self::StateParse(_) => ErrorCode::BACKEND_STATE_PARSE,
            Self::Read { .. } | Self::Io(_) => ErrorCode::BACKEND_READ_FAILED,
            Self::Configuration { .. } => ErrorCode::BACKEND_CONFIGURATION,
            Self::InvalidQuery { .. } => ErrorCode::BACKEND_INVALID_QUERY,
        }
    }
}
