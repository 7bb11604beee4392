//! Runner tool cache.
//!
//! Layout (compatible with hosted runner tool caches):
//! ```text
//! {root}/
//! └── ndk-clang/
//!     └── r27-c1234567/
//!         ├── x64/            # extracted toolchain
//!         └── x64.complete    # publish marker
//! ```
//!
//! An entry is only visible once its marker exists. The marker is written
//! after the directory has been renamed into place.

use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::fsutil::{copy_dir_all, populate_atomically, remove_quietly};
use crate::{Error, Result};

/// Tool name under which clang builds are cached.
pub const TOOL_NAME: &str = "ndk-clang";

/// Directory-per-version tool cache.
#[derive(Debug, Clone)]
pub struct ToolCache {
    root: PathBuf,
    arch: String,
}

impl ToolCache {
    /// Create a cache at `root` for entries of architecture `arch`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, arch: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            arch: arch.into(),
        }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the entry for `tool` at `version`.
    #[must_use]
    pub fn entry_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.root.join(tool).join(version).join(&self.arch)
    }

    fn marker_path(&self, tool: &str, version: &str) -> PathBuf {
        self.root
            .join(tool)
            .join(version)
            .join(format!("{}.complete", self.arch))
    }

    /// Find a published entry.
    #[must_use]
    pub fn find(&self, tool: &str, version: &str) -> Option<PathBuf> {
        let dir = self.entry_dir(tool, version);
        if self.marker_path(tool, version).is_file() && dir.is_dir() {
            trace!(tool, version, ?dir, "Tool cache hit");
            Some(dir)
        } else {
            trace!(tool, version, "Tool cache miss");
            None
        }
    }

    /// Copy `source` into the cache as `tool`/`version` and publish it.
    ///
    /// Any previous entry, complete or not, is replaced.
    pub fn cache_dir(&self, source: &Path, tool: &str, version: &str) -> Result<PathBuf> {
        if !source.is_dir() {
            return Err(Error::cache(format!(
                "cannot cache {}: not a directory",
                source.display()
            )));
        }
        let dest = self.entry_dir(tool, version);
        let marker = self.marker_path(tool, version);
        remove_quietly(&marker);

        populate_atomically(&dest, |staging| copy_dir_all(source, staging))?;
        std::fs::write(&marker, b"").map_err(|e| Error::io(e, &marker, "write"))?;

        debug!(tool, version, ?dest, "Published tool cache entry");
        Ok(dest)
    }
}
