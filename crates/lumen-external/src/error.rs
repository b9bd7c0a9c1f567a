//! Error type for process-backed extensions.
//!
//! Every failure of a child process run (spawn, exit status, timeout,
//! malformed output) lands in [`ExternalError`], which converts into the
//! engine's [`ExtensionError`] for isolation and into [`AppError`] for the
//! binaries.

use std::path::PathBuf;

use lumen_core::error::{AppError, ErrorKind};
use lumen_engine::error::ExtensionError;
use thiserror::Error;

/// Errors raised while loading or calling an external extension.
#[derive(Debug, Error)]
pub enum ExternalError {
    // --- Process errors ---
    /// The executable could not be started.
    #[error("Failed to start '{path}': {source}")]
    Spawn {
        /// Path of the executable.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The process did not finish in time and was killed.
    #[error("Process timed out after {timeout_seconds}s")]
    Timeout {
        /// The timeout that was exceeded.
        timeout_seconds: u64,
    },

    /// The process exited with a non-zero code.
    #[error("Exit code is {code}: {output}")]
    ExitCode {
        /// The exit code.
        code: i32,
        /// Captured stdout and stderr.
        output: String,
    },

    /// The process was terminated by a signal.
    #[error("Process crashed")]
    Crashed,

    // --- Protocol errors ---
    /// Output was not valid JSON.
    #[error("Invalid JSON at line {line}, column {column}: {message}")]
    InvalidJson {
        /// Line of the error.
        line: usize,
        /// Column of the error.
        column: usize,
        /// Parser message.
        message: String,
    },

    /// Output was valid JSON but did not follow the protocol.
    #[error("{0}")]
    Protocol(String),

    /// The metadata interface id is missing or unsupported.
    #[error("Interface id '{found}' does not match '{expected}'")]
    InterfaceMismatch {
        /// Reported interface id.
        found: String,
        /// Supported interface id.
        expected: &'static str,
    },

    // --- Loading errors ---
    /// A declared dependency is not on `PATH`.
    #[error("Dependency '{0}' is not available")]
    MissingDependency(String),

    /// IO error while scanning the extension directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ExternalError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

impl From<ExternalError> for ExtensionError {
    fn from(err: ExternalError) -> Self {
        match err {
            ExternalError::InvalidJson { .. }
            | ExternalError::Protocol(_)
            | ExternalError::InterfaceMismatch { .. } => ExtensionError::Protocol(err.to_string()),
            _ => ExtensionError::Process(err.to_string()),
        }
    }
}

impl From<ExternalError> for AppError {
    fn from(err: ExternalError) -> Self {
        match &err {
            ExternalError::MissingDependency(_) | ExternalError::InterfaceMismatch { .. } => {
                AppError::validation(err.to_string())
            }
            ExternalError::Io(_) => AppError::new(ErrorKind::Io, err.to_string()),
            _ => AppError::extension(err.to_string()),
        }
    }
}
