//! Error types for the burrow-storage crate

use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// A storage root is missing, not a directory, or not writable
    #[error("invalid storage root {path}: {reason}")]
    InvalidRoot { path: String, reason: String },

    /// Path not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The parent directory of a path does not exist
    #[error("parent directory missing: {0}")]
    ParentMissing(String),

    /// Expected a directory
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// The operation is not allowed on this path (e.g. removing the root)
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Map an I/O error for `path`, promoting `NotFound` to a typed variant
    pub(crate) fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_string()),
            _ => Self::Io(err),
        }
    }
}
