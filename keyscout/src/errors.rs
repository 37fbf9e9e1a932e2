/// Error types for keyscout.
///
/// Errors fall into two groups. Configuration and dispatch errors are fatal and
/// surface from [`crate::search`] before (or instead of) a result. Per-file
/// errors (`FileNotFound`, `PermissionDenied`, `IoError`, `EncodingError`) are
/// produced inside a worker, logged, and never abort the run:
///
/// ```rust,ignore
/// match search(&config) {
///     Ok(outcome) => // Report matches,
///     Err(SearchError::InvalidRoot(path)) => // Bad --source,
///     Err(e) => // Other fatal errors
/// }
/// ```
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid root path: {0} is not a readable directory")]
    InvalidRoot(PathBuf),
    #[error("No keywords provided")]
    NoKeywords,
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Failed to dispatch workers: {0}")]
    DispatchError(String),
    #[error("Incomplete aggregation: expected {expected} worker results, received {received}")]
    IncompleteAggregation { expected: usize, received: usize },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::str::Utf8Error,
    },
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_root(path: impl Into<PathBuf>) -> Self {
        Self::InvalidRoot(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn dispatch_error(msg: impl Into<String>) -> Self {
        Self::DispatchError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::str::Utf8Error) -> Self {
        Self::EncodingError {
            path: path.into(),
            source,
        }
    }

    /// Maps an I/O error on `path` to the most specific variant.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }
}
