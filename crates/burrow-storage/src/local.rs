//! Local filesystem storage rooted at a data directory

use crate::path::confine;
use crate::{Entry, Storage, StorageError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Storage backed by a data root and a temp root on the local filesystem
#[derive(Clone, Debug)]
pub struct LocalStorage {
    data_dir: PathBuf,
    temp_dir: PathBuf,
}

impl LocalStorage {
    /// Validate and prepare both roots.
    ///
    /// Missing roots are created. Each root must be a directory that accepts
    /// a probe file, otherwise `StorageError::InvalidRoot` is returned.
    pub fn new(data_dir: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let temp_dir = temp_dir.into();

        prepare_root(&data_dir)?;
        prepare_root(&temp_dir)?;

        info!(
            data_dir = %data_dir.display(),
            temp_dir = %temp_dir.display(),
            "storage roots ready"
        );

        Ok(Self { data_dir, temp_dir })
    }

    /// Data root
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Temp root used for staging writes
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Map a request path to its confined logical form and absolute location
    fn resolve(&self, path: &str) -> (String, PathBuf) {
        let logical = confine(path);
        let absolute = self.data_dir.join(logical.trim_start_matches('/'));
        (logical, absolute)
    }
}

fn prepare_root(root: &Path) -> Result<()> {
    let invalid = |reason: String| StorageError::InvalidRoot {
        path: root.display().to_string(),
        reason,
    };

    std::fs::create_dir_all(root).map_err(|e| invalid(format!("cannot create: {e}")))?;

    let meta = std::fs::metadata(root).map_err(|e| invalid(format!("cannot stat: {e}")))?;
    if !meta.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }

    // Dropped immediately, which removes the probe file again.
    tempfile::Builder::new()
        .prefix(".burrow-probe")
        .tempfile_in(root)
        .map_err(|e| invalid(format!("not writable: {e}")))?;

    Ok(())
}

fn to_entry(logical: &str, meta: &std::fs::Metadata) -> Entry {
    let name = logical.rsplit('/').next().unwrap_or_default().to_string();
    Entry {
        path: logical.to_string(),
        name,
        is_dir: meta.is_dir(),
        size: if meta.is_dir() { 0 } else { meta.len() },
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
    }
}

fn join_logical(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn stat(&self, path: &str) -> Result<Entry> {
        let (logical, absolute) = self.resolve(path);
        let meta = tokio::fs::metadata(&absolute)
            .await
            .map_err(|e| StorageError::from_io(&logical, e))?;
        Ok(to_entry(&logical, &meta))
    }

    async fn read(&self, path: &str) -> Result<Bytes> {
        let (logical, absolute) = self.resolve(path);
        let meta = tokio::fs::metadata(&absolute)
            .await
            .map_err(|e| StorageError::from_io(&logical, e))?;
        if meta.is_dir() {
            return Err(StorageError::IsADirectory(logical));
        }
        let data = tokio::fs::read(&absolute)
            .await
            .map_err(|e| StorageError::from_io(&logical, e))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, path: &str, data: Bytes) -> Result<Entry> {
        let (logical, absolute) = self.resolve(path);
        if logical == "/" {
            return Err(StorageError::InvalidPath(logical));
        }

        match absolute.parent() {
            Some(parent) if tokio::fs::metadata(parent).await.is_ok_and(|m| m.is_dir()) => {}
            _ => return Err(StorageError::ParentMissing(logical)),
        }
        if tokio::fs::metadata(&absolute).await.is_ok_and(|m| m.is_dir()) {
            return Err(StorageError::IsADirectory(logical));
        }

        let temp_dir = self.temp_dir.clone();
        let target = absolute.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut staged = tempfile::NamedTempFile::new_in(&temp_dir)?;
            staged.write_all(&data)?;
            staged.as_file().sync_all()?;
            if let Err(err) = staged.persist(&target) {
                // Temp and data roots on different filesystems cannot rename.
                std::fs::copy(err.file.path(), &target)?;
            }
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        debug!(path = %logical, "stored file");
        self.stat(&logical).await
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let (logical, absolute) = self.resolve(path);
        if logical == "/" {
            return Err(StorageError::InvalidPath(logical));
        }
        let meta = tokio::fs::metadata(&absolute)
            .await
            .map_err(|e| StorageError::from_io(&logical, e))?;
        let removed = if meta.is_dir() {
            tokio::fs::remove_dir_all(&absolute).await
        } else {
            tokio::fs::remove_file(&absolute).await
        };
        removed.map_err(|e| StorageError::from_io(&logical, e))?;
        debug!(path = %logical, "removed");
        Ok(())
    }

    async fn create_dir(&self, path: &str) -> Result<()> {
        let (logical, absolute) = self.resolve(path);
        if logical == "/" {
            return Err(StorageError::AlreadyExists(logical));
        }
        match absolute.parent() {
            Some(parent) if tokio::fs::metadata(parent).await.is_ok_and(|m| m.is_dir()) => {}
            _ => return Err(StorageError::ParentMissing(logical)),
        }
        tokio::fs::create_dir(&absolute)
            .await
            .map_err(|e| StorageError::from_io(&logical, e))
    }

    async fn list(&self, path: &str) -> Result<Vec<Entry>> {
        let (logical, absolute) = self.resolve(path);
        let meta = tokio::fs::metadata(&absolute)
            .await
            .map_err(|e| StorageError::from_io(&logical, e))?;
        if !meta.is_dir() {
            return Err(StorageError::NotADirectory(logical));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&absolute)
            .await
            .map_err(|e| StorageError::from_io(&logical, e))?;
        while let Some(child) = dir.next_entry().await? {
            let name = child.file_name().to_string_lossy().into_owned();
            let meta = child.metadata().await?;
            entries.push(to_entry(&join_logical(&logical, &name), &meta));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
