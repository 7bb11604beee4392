//! Persistent snapshot cache keyed by cache key.
//!
//! A snapshot is a `tar.zst` of one directory. Restores require an exact key
//! match; there is no prefix fallback.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::extract::unpack_tar_zst;
use crate::fsutil::{blocking, populate_atomically, remove_quietly};
use crate::{Error, Result};

/// zstd level used for snapshots.
const SNAPSHOT_LEVEL: i32 = 3;

/// Storage backend for directory snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Restore the snapshot stored under `key` into `dir`.
    ///
    /// Returns the matched key, or `None` when nothing is stored under it.
    /// Existing content of `dir` is replaced on a hit and untouched on a miss.
    async fn restore(&self, dir: &Path, key: &str) -> Result<Option<String>>;

    /// Store the contents of `dir` under `key`, replacing any previous snapshot.
    async fn save(&self, dir: &Path, key: &str) -> Result<()>;

    /// Drop the snapshot stored under `key`. Missing snapshots are not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Snapshot store on the local filesystem.
///
/// Structure:
/// ```text
/// {root}/
/// └── setup-ndk-clang-r27-c1234567-linux-x86.tar.zst
/// ```
#[derive(Debug, Clone)]
pub struct LocalSnapshotStore {
    root: PathBuf,
}

impl LocalSnapshotStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the store root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot for `key`.
    pub fn snapshot_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.tar.zst")))
    }

    /// Check whether a snapshot exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.snapshot_path(key).is_ok_and(|p| p.is_file())
    }
}

fn validate_key(key: &str) -> Result<()> {
    let bad = key.is_empty()
        || key.starts_with('.')
        || key.contains(['/', '\\', ':'])
        || key.contains("..");
    if bad {
        Err(Error::cache(format!("invalid cache key: {key:?}")))
    } else {
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for LocalSnapshotStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn restore(&self, dir: &Path, key: &str) -> Result<Option<String>> {
        let snapshot = self.snapshot_path(key)?;
        if !snapshot.is_file() {
            debug!(key, "No snapshot stored");
            return Ok(None);
        }

        let dest = dir.to_path_buf();
        blocking(move || {
            populate_atomically(&dest, |staging| unpack_tar_zst(&snapshot, staging))
        })
        .await?;

        info!(key, dir = %dir.display(), "Restored snapshot");
        Ok(Some(key.to_string()))
    }

    async fn save(&self, dir: &Path, key: &str) -> Result<()> {
        let snapshot = self.snapshot_path(key)?;
        let root = self.root.clone();
        let src = dir.to_path_buf();

        blocking(move || {
            fs::create_dir_all(&root).map_err(|e| Error::io(e, &root, "create_dir_all"))?;
            let partial = root.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
            let written = write_snapshot(&src, &partial)
                .and_then(|()| {
                    fs::rename(&partial, &snapshot).map_err(|e| Error::io(e, &snapshot, "rename"))
                });
            if written.is_err() {
                remove_quietly(&partial);
            }
            written
        })
        .await?;

        info!(key, dir = %dir.display(), "Saved snapshot");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let snapshot = self.snapshot_path(key)?;
        match tokio::fs::remove_file(&snapshot).await {
            Ok(()) => {
                debug!(key, "Removed snapshot");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(e, &snapshot, "remove_file")),
        }
    }
}

fn write_snapshot(src: &Path, dst: &Path) -> Result<()> {
    let file = fs::File::create(dst).map_err(|e| Error::io(e, dst, "create"))?;
    let enc = zstd::Encoder::new(file, SNAPSHOT_LEVEL)
        .map_err(|e| Error::cache(format!("zstd encoder error: {e}")))?;
    let mut builder = tar::Builder::new(enc);
    builder.follow_symlinks(false);

    builder
        .append_dir_all(".", src)
        .map_err(|e| Error::cache(format!("tar append failed for {}: {e}", src.display())))?;
    let enc = builder
        .into_inner()
        .map_err(|e| Error::cache(format!("tar finalize failed: {e}")))?;
    enc.finish()
        .map_err(|e| Error::cache(format!("zstd finish failed: {e}")))?;
    Ok(())
}
