//! Error types for the engine.
//!
//! None of these are fatal: registry errors go back to the plugin loader,
//! extension errors are isolated per call, activation errors go back to
//! the display layer.

use std::time::Duration;

use lumen_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Signal that a search term was empty after trimming.
///
/// Not an error in the user-visible sense: the engine answers it with an
/// empty publish and never constructs a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("search term is empty")]
pub struct EmptyTerm;

/// Errors reported by [`ExtensionRegistry`](crate::registry::ExtensionRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An extension with this id is already registered. The existing
    /// registration wins.
    #[error("Extension '{0}' is already registered")]
    DuplicateRegistration(String),

    /// No extension with this id is registered.
    #[error("Extension '{0}' is not registered")]
    UnknownExtension(String),
}

/// A fault raised by an extension hook.
#[derive(Debug, Clone, Error)]
pub enum ExtensionError {
    /// The extension reported a failure of its own.
    #[error("{0}")]
    Failed(String),

    /// The hook did not complete in time.
    #[error("Extension '{extension}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// Id of the extension.
        extension: String,
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The hook panicked.
    #[error("Extension '{extension}' panicked: {message}")]
    Panicked {
        /// Id of the extension.
        extension: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// A backing process failed to run or exited unsuccessfully.
    #[error("Process failed: {0}")]
    Process(String),

    /// The extension answered with malformed output.
    #[error("Protocol violation: {0}")]
    Protocol(String),
}

impl ExtensionError {
    /// Convenience constructor for [`ExtensionError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors returned when the display layer activates a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// Nothing has been published yet, or the last publish was empty.
    #[error("No published query to activate")]
    NoPublishedQuery,

    /// The index does not address a published match.
    #[error("Result index {index} is out of range (query has {len} matches)")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of matches in the published query.
        len: usize,
    },

    /// The item has no action to run.
    #[error("Item '{0}' has no actions")]
    NoAction(String),

    /// The action could not be started.
    #[error("Failed to launch '{program}': {message}")]
    Launch {
        /// Program that was launched.
        program: String,
        /// Underlying error message.
        message: String,
    },
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        let kind = match err {
            RegistryError::DuplicateRegistration(_) => ErrorKind::Conflict,
            RegistryError::UnknownExtension(_) => ErrorKind::NotFound,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

impl From<ExtensionError> for AppError {
    fn from(err: ExtensionError) -> Self {
        AppError::with_source(ErrorKind::Extension, err.to_string(), err)
    }
}

impl From<ActivationError> for AppError {
    fn from(err: ActivationError) -> Self {
        AppError::with_source(ErrorKind::Validation, err.to_string(), err)
    }
}
