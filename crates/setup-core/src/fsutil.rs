//! Directory copy and atomic publish helpers.
//!
//! Directories are never populated in place: content is staged in a hidden
//! sibling and renamed over the destination once complete, so a crashed or
//! failed run leaves either the old state or nothing.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

use crate::{Error, Result};

/// Hidden sibling used to stage content for `dest`.
#[must_use]
pub fn staging_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("stage");
    dest.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

/// Remove a directory tree if it exists.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(e, path, "remove_dir_all")),
    }
}

/// Best-effort removal of a scratch file or directory.
pub fn remove_quietly(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    if let Err(e) = result {
        trace!(path = %path.display(), error = %e, "Scratch cleanup skipped");
    }
}

/// Replace `dest` with the fully populated `staging` directory.
pub fn publish_dir(staging: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create_dir_all"))?;
    }
    remove_dir_if_exists(dest)?;
    fs::rename(staging, dest).map_err(|e| Error::io(e, dest, "rename"))
}

/// Populate `dest` through a staging sibling, then publish it.
///
/// Whatever was at `dest` before is discarded. On failure the staging
/// directory is removed and `dest` is left untouched.
pub fn populate_atomically<F>(dest: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let staging = staging_path(dest);
    fs::create_dir_all(&staging).map_err(|e| Error::io(e, &staging, "create_dir_all"))?;

    if let Err(e) = fill(&staging) {
        remove_quietly(&staging);
        return Err(e);
    }
    if let Err(e) = publish_dir(&staging, dest) {
        remove_quietly(&staging);
        return Err(e);
    }
    Ok(())
}

/// Recursively copy `src` into `dst`, preserving symlinks and permissions.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| Error::io(e, dst, "create_dir_all"))?;

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            Error::io(source, path, "walk")
        })?;
        let rel = entry.path().strip_prefix(src).map_err(|_| {
            Error::cache(format!(
                "path {} is not under {}",
                entry.path().display(),
                src.display()
            ))
        })?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(e, &target, "create_dir_all"))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::io(e, &target, "copy"))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> Result<()> {
    let link = fs::read_link(src).map_err(|e| Error::io(e, src, "read_link"))?;
    std::os::unix::fs::symlink(&link, target).map_err(|e| Error::io(e, target, "symlink"))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> Result<()> {
    // Windows symlinks need privileges; materialize the link target instead.
    if src.is_dir() {
        copy_dir_all(src, target)
    } else {
        fs::copy(src, target)
            .map(|_| ())
            .map_err(|e| Error::io(e, target, "copy"))
    }
}

/// Run blocking filesystem work off the async runtime.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::cache(format!("blocking task failed: {e}")))?
}
