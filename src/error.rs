//! Error types for calvault
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad title, bad args, bad config)
//! - 3: Storage unavailable (task folder missing or unwritable)
//! - 4: Observer misuse (state machine violated)
//! - 5: Fatal I/O or watch failure

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the calvault CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const STORAGE_UNAVAILABLE: i32 = 3;
    pub const OBSERVER_MISUSE: i32 = 4;
    pub const FATAL: i32 = 5;
}

/// Main error type for calvault operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid task title '{title}': {reason}")]
    InvalidTitle { title: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Storage (exit code 3)
    #[error("Task storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: PathBuf, reason: String },

    // Observer state machine (exit code 4)
    #[error("Change observer is already running")]
    AlreadyRunning,

    #[error("Change observer is not running")]
    NotRunning,

    #[error("Change observer has not been stopped")]
    NotStopped,

    #[error("Change observer was already stopped and cannot be restarted")]
    AlreadyStopped,

    // Fatal failures (exit code 5)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    pub(crate) fn invalid_title(title: &str, reason: impl Into<String>) -> Self {
        Error::InvalidTitle {
            title: title.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn storage_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::StorageUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidTitle { .. } | Error::InvalidConfig(_) | Error::InvalidArgument(_) => {
                exit_codes::USER_ERROR
            }

            Error::StorageUnavailable { .. } => exit_codes::STORAGE_UNAVAILABLE,

            Error::AlreadyRunning
            | Error::NotRunning
            | Error::NotStopped
            | Error::AlreadyStopped => exit_codes::OBSERVER_MISUSE,

            Error::Io(_)
            | Error::Watch(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::FATAL,
        }
    }

    /// Whether the caller can reasonably fix the input or retry.
    ///
    /// Observer misuse is a programming error and fatal faults propagate
    /// unchanged, so neither counts as recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InvalidTitle { .. }
                | Error::StorageUnavailable { .. }
                | Error::InvalidConfig(_)
                | Error::InvalidArgument(_)
        )
    }

    /// Structured context for the error, if any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::InvalidTitle { title, reason } => Some(serde_json::json!({
                "title": title,
                "reason": reason,
            })),
            Error::StorageUnavailable { path, reason } => Some(serde_json::json!({
                "path": path.to_string_lossy(),
                "reason": reason,
            })),
            Error::InvalidConfig(message) | Error::InvalidArgument(message) => {
                Some(serde_json::json!({ "message": message }))
            }
            _ => None,
        }
    }
}

/// Result type alias for calvault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
