//! # Burrow Storage
//!
//! Local filesystem storage layer for the Burrow file-serving daemon.
//!
//! This crate provides:
//! - **Root validation**: Data and temp roots are created, checked and probed for writability
//! - **Path confinement**: Request paths are cleaned and can never escape the data root
//! - **Staged writes**: Uploads land in the temp root and are renamed into place
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         API modules (WebDAV, files)     │
//! ├─────────────────────────────────────────┤
//! │             Storage Trait               │
//! ├─────────────────────────────────────────┤
//! │              LocalStorage               │
//! ├────────────────────┬────────────────────┤
//! │   rootDataDir      │    rootTempDir     │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use burrow_storage::{LocalStorage, Storage};
//!
//! let storage = LocalStorage::new("/srv/data", "/srv/tmp")?;
//! storage.write("notes/todo.txt", bytes::Bytes::from_static(b"milk")).await?;
//! let entry = storage.stat("notes/todo.txt").await?;
//! ```

pub mod error;
pub mod local;
pub mod path;

pub use error::{Result, StorageError};
pub use local::LocalStorage;
pub use path::clean_path;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata describing a file or directory under the data root
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Path relative to the data root, always starting with `/`
    pub path: String,
    /// Final path component (empty for the root)
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Size in bytes (zero for directories)
    pub size: u64,
    /// Last modification time, when the platform reports one
    pub modified: Option<DateTime<Utc>>,
}

/// Trait for storage backends handed to API modules
///
/// All paths are interpreted relative to the data root. Implementations
/// must tolerate concurrent calls on disjoint paths.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get metadata for a path
    async fn stat(&self, path: &str) -> Result<Entry>;

    /// Read a whole file
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Create or replace a file, returning its new metadata
    async fn write(&self, path: &str, data: Bytes) -> Result<Entry>;

    /// Remove a file or a directory tree
    async fn remove(&self, path: &str) -> Result<()>;

    /// Create a single directory
    async fn create_dir(&self, path: &str) -> Result<()>;

    /// List the direct children of a directory, sorted by name
    async fn list(&self, path: &str) -> Result<Vec<Entry>>;
}
