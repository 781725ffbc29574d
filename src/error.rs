//! Structured error types for store and index operations.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Not found errors
    DocumentNotFound,
    TaskNotFound,

    // Conflict errors
    StaleTask,

    // Internal errors
    IoError,
    SnapshotError,
}

/// Failure of a document store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return StoreError::NotFound(path.to_string_lossy().replace('\\', "/"));
        }
        StoreError::Io { path, source }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::NotFound(_) => ErrorCode::DocumentNotFound,
            StoreError::Io { .. } => ErrorCode::IoError,
        }
    }
}

/// Failure of a task index operation.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The document no longer has a task line where the record says it is.
    #[error("task line {line} of {path} is no longer a task")]
    StaleTask { path: String, line: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl IndexError {
    pub fn task_not_found(id: &str) -> Self {
        IndexError::TaskNotFound(id.to_string())
    }

    pub fn stale(path: &str, line: usize) -> Self {
        IndexError::StaleTask {
            path: path.to_string(),
            line,
        }
    }

    pub fn snapshot(err: impl std::fmt::Display) -> Self {
        IndexError::Snapshot(err.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            IndexError::TaskNotFound(_) => ErrorCode::TaskNotFound,
            IndexError::StaleTask { .. } => ErrorCode::StaleTask,
            IndexError::Store(e) => e.code(),
            IndexError::Snapshot(_) => ErrorCode::SnapshotError,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type for index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err = StoreError::io(
            "notes/a.md",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, StoreError::NotFound(ref p) if p == "notes/a.md"));
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
    }

    #[test]
    fn test_codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&IndexError::stale("a.md", 3).code()).unwrap();
        assert_eq!(json, "\"STALE_TASK\"");
        let err: IndexError = StoreError::io(
            "a.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
        )
        .into();
        assert_eq!(err.code(), ErrorCode::IoError);
    }
}
