//! Centralized error types for receiptbox.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the attachment store.
///
/// Every failure is returned to the caller; nothing is retried or swallowed
/// inside the store. "Directory already exists" and "account has no
/// attachments yet" are not errors and never surface here.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The caller supplied a missing or malformed argument.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The storage directory cannot be created or written to.
    #[error("Storage unavailable at '{path}': {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing or publishing the attachment file failed. No partial file is left behind.
    #[error("Failed to write attachment '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The reference no longer points to an existing regular file.
    #[error("Attachment not found: {0}")]
    NotFound(PathBuf),

    /// Reading an existing attachment or directory failed.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, StoreError>`.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create an `InvalidInput` variant from any displayable reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Classify a read-side `io::Error`: absence becomes `NotFound`,
    /// anything else is `ReadFailed`.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::ReadFailed { path, source }
        }
    }

    /// Create a `StorageUnavailable` variant from a path and an `io::Error`.
    pub fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Create a `WriteFailed` variant from a path and an `io::Error`.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }

    /// `true` for the stale-reference case callers are expected to recover from.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_read_maps_absence_to_not_found() {
        let err = StoreError::read("/x/y", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_maps_other_errors_to_read_failed() {
        let err = StoreError::read(
            "/x/y",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, StoreError::ReadFailed { .. }));
    }

    #[test]
    fn test_display_includes_path() {
        let err = StoreError::unavailable("/root/a", io::Error::other("disk full"));
        let msg = err.to_string();
        assert!(msg.contains("/root/a"));
        assert!(msg.contains("disk full"));
    }
}
