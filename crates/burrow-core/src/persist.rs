//! Atomic JSON persistence shared by the config and credential stores

use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// How an existing file at the destination is treated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Overwrite {
    Allow,
    Deny,
}

/// Serialize `value` as pretty JSON and move it into place in one rename.
///
/// The temp file is created next to `path` so the rename never crosses a
/// filesystem. With `Overwrite::Deny` an existing file yields
/// `io::ErrorKind::AlreadyExists` and is left untouched.
pub(crate) fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
    overwrite: Overwrite,
) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let json = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(&json)?;
    temp_file.write_all(b"\n")?;
    temp_file.as_file().sync_all()?;

    match overwrite {
        Overwrite::Allow => temp_file.persist(path).map(|_| ()).map_err(|e| e.error),
        Overwrite::Deny => temp_file
            .persist_noclobber(path)
            .map(|_| ())
            .map_err(|e| e.error),
    }
}
