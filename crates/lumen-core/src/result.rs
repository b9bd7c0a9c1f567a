//! Convenience result type alias for Lumen.

use crate::error::AppError;

/// A specialized `Result` type for Lumen operations.
pub type AppResult<T> = Result<T, AppError>;
