//! Error types for runner startup and configuration

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for reshape-tape operations
///
/// Everything here is a startup problem: a manifest, plugin or test table
/// that cannot be loaded, or an option that cannot be interpreted. Problems
/// inside a single case are [`crate::Failure`] values and never become a
/// `TapeError`.
#[derive(Debug, Error)]
pub enum TapeError {
    /// Project manifest missing, unreadable or malformed
    #[error("{} failed to load: {message}", path.display())]
    ManifestLoad { path: PathBuf, message: String },

    /// Plugin module missing or not executable
    #[error("{} failed to load: {message}", path.display())]
    PluginLoad { path: PathBuf, message: String },

    /// Test table missing, unreadable or malformed
    #[error("{} failed to load: {message}", path.display())]
    TableLoad { path: PathBuf, message: String },

    /// An interpreted option carries a value of the wrong shape
    #[error("Invalid value for option '{key}': {message}")]
    InvalidOption { key: String, message: String },

    /// File system I/O errors
    #[error("IO error for path '{}': {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ManifestLoad,
    PluginLoad,
    TableLoad,
    InvalidOption,
    Io,
}

impl TapeError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TapeError::ManifestLoad { .. } => ErrorKind::ManifestLoad,
            TapeError::PluginLoad { .. } => ErrorKind::PluginLoad,
            TapeError::TableLoad { .. } => ErrorKind::TableLoad,
            TapeError::InvalidOption { .. } => ErrorKind::InvalidOption,
            TapeError::IoError { .. } => ErrorKind::Io,
        }
    }

    pub fn manifest_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn plugin_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PluginLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn table_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::TableLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invalid_option(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_errors_name_the_resource() {
        let err = TapeError::plugin_load("/work/plugin", "not found");
        assert_eq!(err.to_string(), "/work/plugin failed to load: not found");
        assert_eq!(err.kind(), ErrorKind::PluginLoad);
    }

    #[test]
    fn invalid_option_names_the_key() {
        let err = TapeError::invalid_option("policy", "expected 'sequential' or 'parallel'");
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
        assert!(err.to_string().contains("'policy'"));
    }
}
