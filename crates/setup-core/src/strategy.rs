//! Cache policies behind a single install contract.
//!
//! - [`TieredStrategy`]: tool cache → optional snapshot store → network,
//!   backfilling every enabled layer on a miss.
//! - [`FreshStrategy`]: always download into a wiped install directory.
//!
//! Neither policy locks: two runs targeting the same install directory or
//! tool cache entry race, and the last rename wins.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CacheMode;
use crate::download::Downloader;
use crate::extract::ArchiveExtractor;
use crate::fsutil::{
    blocking, copy_dir_all, populate_atomically, remove_dir_if_exists, remove_quietly,
};
use crate::locator::ArtifactLocation;
use crate::snapshot::SnapshotStore;
use crate::tool_cache::{TOOL_NAME, ToolCache};
use crate::{Error, Result};

/// One build to make available locally.
#[derive(Debug, Clone, Copy)]
pub struct InstallRequest<'a> {
    /// NDK version identifier.
    pub version: &'a str,
    /// Clang build revision.
    pub revision: &'a str,
    /// Precomputed key, URL and install directory.
    pub location: &'a ArtifactLocation,
}

impl InstallRequest<'_> {
    /// Version string used for tool cache entries.
    #[must_use]
    pub fn tool_version(&self) -> String {
        format!("{}-{}", self.version, self.revision)
    }
}

/// A cache policy for installing toolchain builds.
#[async_trait]
pub trait InstallStrategy: Send + Sync {
    /// Which policy this is.
    fn mode(&self) -> CacheMode;

    /// Make the requested build available and return its directory.
    async fn ensure_installed(&self, request: &InstallRequest<'_>) -> Result<PathBuf>;
}

/// Download and extraction shared by both policies.
#[derive(Debug, Clone)]
pub struct Fetcher {
    downloader: Downloader,
    extractor: ArchiveExtractor,
    temp_root: PathBuf,
}

impl Fetcher {
    /// Create a fetcher that downloads into `temp_root`.
    #[must_use]
    pub fn new(
        downloader: Downloader,
        extractor: ArchiveExtractor,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            downloader,
            extractor,
            temp_root: temp_root.into(),
        }
    }

    /// Download the archive at `url` into the temp area.
    pub async fn download(&self, url: &str) -> Result<PathBuf> {
        self.downloader.download_to_dir(url, &self.temp_root).await
    }

    /// Extract `archive`, then delete it whether or not extraction worked.
    pub async fn extract(&self, archive: PathBuf, dest: Option<PathBuf>) -> Result<PathBuf> {
        let extractor = self.extractor.clone();
        blocking(move || {
            let result = extractor.extract(&archive, dest.as_deref());
            remove_quietly(&archive);
            result
        })
        .await
    }
}

/// Tool cache, then optional persistent snapshot, then network.
pub struct TieredStrategy {
    fetcher: Fetcher,
    tool_cache: ToolCache,
    snapshots: Option<Arc<dyn SnapshotStore>>,
}

impl TieredStrategy {
    /// Create a tiered strategy. `snapshots` enables the persistent layer.
    #[must_use]
    pub fn new(
        fetcher: Fetcher,
        tool_cache: ToolCache,
        snapshots: Option<Arc<dyn SnapshotStore>>,
    ) -> Self {
        Self {
            fetcher,
            tool_cache,
            snapshots,
        }
    }

    async fn backfill_snapshot(
        &self,
        store: &dyn SnapshotStore,
        cached: &Path,
        location: &ArtifactLocation,
    ) -> Result<()> {
        info!("Adding to the local cache...");
        let src = cached.to_path_buf();
        let dest = location.install_dir.clone();
        blocking(move || populate_atomically(&dest, |staging| copy_dir_all(&src, staging))).await?;
        store.save(&location.install_dir, &location.cache_key).await
    }
}

#[async_trait]
impl InstallStrategy for TieredStrategy {
    fn mode(&self) -> CacheMode {
        CacheMode::Tiered
    }

    async fn ensure_installed(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let location = request.location;
        let tool_version = request.tool_version();

        if let Some(path) = self.tool_cache.find(TOOL_NAME, &tool_version) {
            info!(path = %path.display(), "Found in tool cache");
            return Ok(path);
        }

        if let Some(store) = &self.snapshots {
            debug!(store = store.name(), key = %location.cache_key, "Trying persistent cache");
            match store
                .restore(&location.install_dir, &location.cache_key)
                .await
            {
                Ok(Some(key)) if key == location.cache_key => {
                    info!(path = %location.install_dir.display(), "Found in local cache");
                    return Ok(location.install_dir.clone());
                }
                Ok(_) => {}
                Err(e) => {
                    // An unreadable snapshot is a miss; the backfill below replaces it.
                    warn!(
                        store = store.name(),
                        key = %location.cache_key,
                        error = %e,
                        "Failed to restore from local cache"
                    );
                    if let Err(e) = store.remove(&location.cache_key).await {
                        debug!(error = %e, "Could not remove unreadable snapshot");
                    }
                }
            }
        }

        info!(
            "Attempting to download ndk-{} clang-{}...",
            request.version, request.revision
        );
        let archive = self.fetcher.download(&location.download_url).await?;

        info!("Extracting...");
        let extracted = self.fetcher.extract(archive, None).await?;

        info!("Adding to the tool cache...");
        let tool_cache = self.tool_cache.clone();
        let scratch = extracted.clone();
        let cached = blocking(move || {
            let result = tool_cache.cache_dir(&scratch, TOOL_NAME, &tool_version);
            remove_quietly(&scratch);
            result
        })
        .await?;

        let install_path = match &self.snapshots {
            Some(store) => {
                self.backfill_snapshot(store.as_ref(), &cached, location)
                    .await?;
                location.install_dir.clone()
            }
            None => cached,
        };

        info!(path = %install_path.display(), "Done");
        Ok(install_path)
    }
}

/// Always download and extract into a wiped install directory.
pub struct FreshStrategy {
    fetcher: Fetcher,
}

impl FreshStrategy {
    /// Create a fresh strategy.
    #[must_use]
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl InstallStrategy for FreshStrategy {
    fn mode(&self) -> CacheMode {
        CacheMode::Fresh
    }

    async fn ensure_installed(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let location = request.location;
        let install_dir = location.install_dir.clone();

        info!(
            "Attempting to download ndk-{} clang-{}...",
            request.version, request.revision
        );
        let archive = self.fetcher.download(&location.download_url).await?;

        let dir = install_dir.clone();
        let prepared = blocking(move || {
            remove_dir_if_exists(&dir)?;
            std::fs::create_dir_all(&dir).map_err(|e| Error::io(e, &dir, "create_dir_all"))
        })
        .await;
        if let Err(e) = prepared {
            remove_quietly(&archive);
            return Err(e);
        }

        info!(path = %install_dir.display(), "Extracting...");
        if let Err(e) = self
            .fetcher
            .extract(archive, Some(install_dir.clone()))
            .await
        {
            remove_quietly(&install_dir);
            return Err(e);
        }

        info!(path = %install_dir.display(), "Done");
        Ok(install_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractMethod;
    use crate::platform::OsFamily;
    use tempfile::TempDir;

    fn location(temp: &TempDir) -> ArtifactLocation {
        ArtifactLocation {
            cache_key: "setup-ndk-clang-r27-c1-linux-x86".into(),
            download_url: "http://127.0.0.1:9/unreachable.tar.zst".into(),
            install_dir: temp.path().join("home/.setup-ndk-clang/r27/c1"),
        }
    }

    fn fetcher(temp: &TempDir) -> Fetcher {
        Fetcher::new(
            Downloader::new().unwrap(),
            ArchiveExtractor::new(ExtractMethod::Builtin, OsFamily::Linux, temp.path().join("tmp")),
            temp.path().join("tmp"),
        )
    }

    #[test]
    fn test_tool_version() {
        let temp = TempDir::new().unwrap();
        let location = location(&temp);
        let request = InstallRequest {
            version: "r27",
            revision: "c1",
            location: &location,
        };
        assert_eq!(request.tool_version(), "r27-c1");
    }

    #[test]
    fn test_modes() {
        let temp = TempDir::new().unwrap();
        let tiered = TieredStrategy::new(fetcher(&temp), ToolCache::new(temp.path(), "x64"), None);
        let fresh = FreshStrategy::new(fetcher(&temp));
        assert_eq!(tiered.mode(), CacheMode::Tiered);
        assert_eq!(fresh.mode(), CacheMode::Fresh);
    }

    #[tokio::test]
    async fn test_tiered_tool_cache_hit_skips_network() -> Result<()> {
        let temp = TempDir::new().unwrap();
        let tool_cache = ToolCache::new(temp.path().join("toolcache"), "x64");
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("bin")).unwrap();
        tool_cache.cache_dir(&src, TOOL_NAME, "r27-c1")?;

        let location = location(&temp);
        let strategy = TieredStrategy::new(fetcher(&temp), tool_cache.clone(), None);
        let path = strategy
            .ensure_installed(&InstallRequest {
                version: "r27",
                revision: "c1",
                location: &location,
            })
            .await?;

        assert_eq!(path, tool_cache.entry_dir(TOOL_NAME, "r27-c1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_fresh_download_failure_keeps_existing_install() {
        let temp = TempDir::new().unwrap();
        let location = location(&temp);
        std::fs::create_dir_all(&location.install_dir).unwrap();
        std::fs::write(location.install_dir.join("marker"), b"x").unwrap();

        let strategy = FreshStrategy::new(fetcher(&temp));
        let result = strategy
            .ensure_installed(&InstallRequest {
                version: "r27",
                revision: "c1",
                location: &location,
            })
            .await;

        assert!(matches!(result, Err(Error::Http { .. })));
        assert!(location.install_dir.join("marker").exists());
    }
}
