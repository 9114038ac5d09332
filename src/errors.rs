//! Typed error definitions for lazy_migrate.
//! Absence is a branch condition (`NotFound`), everything else a backend failure
//! that the router passes through untouched.

use std::fmt;
use std::io;
use thiserror::Error;

/// Capability names, used to label failures and recorded calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FileExists,
    DirectoryExists,
    Read,
    ReadStream,
    Write,
    WriteStream,
    Delete,
    DeleteDirectory,
    CreateDirectory,
    SetVisibility,
    Visibility,
    MimeType,
    LastModified,
    FileSize,
    ListContents,
    Move,
    Copy,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::FileExists => "file_exists",
            Operation::DirectoryExists => "directory_exists",
            Operation::Read => "read",
            Operation::ReadStream => "read_stream",
            Operation::Write => "write",
            Operation::WriteStream => "write_stream",
            Operation::Delete => "delete",
            Operation::DeleteDirectory => "delete_directory",
            Operation::CreateDirectory => "create_directory",
            Operation::SetVisibility => "set_visibility",
            Operation::Visibility => "visibility",
            Operation::MimeType => "mime_type",
            Operation::LastModified => "last_modified",
            Operation::FileSize => "file_size",
            Operation::ListContents => "list_contents",
            Operation::Move => "move",
            Operation::Copy => "copy",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("{operation} failed for '{path}': {source}")]
    Backend {
        operation: Operation,
        path: String,
        #[source]
        source: io::Error,
    },

    /// The object is safely in the new backend but its old copy could not be removed.
    #[error("'{path}' was migrated but the old copy could not be removed: {source}")]
    OrphanedSource {
        path: String,
        #[source]
        source: Box<StorageError>,
    },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub fn not_found(path: impl Into<String>) -> Self {
        StorageError::NotFound { path: path.into() }
    }

    pub fn backend(operation: Operation, path: impl Into<String>, source: io::Error) -> Self {
        StorageError::Backend {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Map an io::Error, turning `ErrorKind::NotFound` into [`StorageError::NotFound`].
    pub fn from_io(operation: Operation, path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound { path }
        } else {
            StorageError::backend(operation, path, source)
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            StorageError::NotFound { .. } => 2,
            StorageError::Backend { .. } => 10,
            StorageError::OrphanedSource { .. } => 20,
            StorageError::InvalidPath { .. } => 22,
        }
    }

    /// Short snake_case tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::NotFound { .. } => "not_found",
            StorageError::Backend { .. } => "backend_failure",
            StorageError::OrphanedSource { .. } => "orphaned_source",
            StorageError::InvalidPath { .. } => "invalid_path",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_becomes_not_found() {
        let err = StorageError::from_io(
            Operation::Read,
            "a.txt",
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn other_io_errors_keep_operation_and_kind() {
        let err = StorageError::from_io(
            Operation::Write,
            "a.txt",
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        match &err {
            StorageError::Backend {
                operation, source, ..
            } => {
                assert_eq!(*operation, Operation::Write);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(err.to_string().starts_with("write failed for 'a.txt'"));
    }

    #[test]
    fn orphaned_source_keeps_inner_error() {
        let inner = StorageError::backend(Operation::Delete, "x", io::Error::other("boom"));
        let err = StorageError::OrphanedSource {
            path: "x".into(),
            source: Box::new(inner),
        };
        assert_eq!(err.kind(), "orphaned_source");
        let src = std::error::Error::source(&err).expect("source");
        assert!(src.to_string().contains("boom"));
    }
}
