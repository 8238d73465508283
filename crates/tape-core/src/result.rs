//! Result type alias for reshape-tape operations

use crate::error::TapeError;

/// Standard Result type for reshape-tape operations
pub type Result<T> = std::result::Result<T, TapeError>;

/// Extension trait for Result to provide additional convenience methods
pub trait ResultExt<T> {
    /// Log the error and continue with None
    fn log_and_continue(self) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn log_and_continue(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Continuing after error: {}", err);
                None
            }
        }
    }
}
