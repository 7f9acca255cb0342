//! Convenience result type alias for the membership engine.

use crate::error::AppError;

/// A specialized `Result` type for membership operations.
///
/// This is defined as a convenience so that every crate does not need to
/// write `Result<T, AppError>` explicitly.
pub type AppResult<T> = Result<T, AppError>;
