//! Installer facade: compatibility gate, resolution, location and strategy.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::Result;
use crate::config::{CacheMode, InstallOptions, InstallerConfig};
use crate::download::Downloader;
use crate::extract::ArchiveExtractor;
use crate::locator::ArtifactLocator;
use crate::mapping::VersionResolver;
use crate::snapshot::{LocalSnapshotStore, SnapshotStore};
use crate::strategy::{Fetcher, FreshStrategy, InstallRequest, InstallStrategy, TieredStrategy};
use crate::tool_cache::ToolCache;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// Directory containing the toolchain.
    pub path: PathBuf,
    /// Requested NDK version.
    pub version: String,
    /// Resolved clang build revision.
    pub revision: String,
    /// Persistent cache key of the build.
    pub cache_key: String,
    /// Directories the caller should put on its search path.
    ///
    /// The installer never touches process-wide state itself.
    pub path_additions: Vec<PathBuf>,
}

/// Installs prebuilt NDK clang toolchains.
pub struct Installer {
    config: InstallerConfig,
    downloader: Downloader,
    snapshots: Arc<dyn SnapshotStore>,
}

impl Installer {
    /// Create an installer using the local snapshot store under the
    /// configured snapshot root.
    pub fn new(config: InstallerConfig) -> Result<Self> {
        let snapshots = Arc::new(LocalSnapshotStore::new(config.snapshot_root.clone()));
        Ok(Self {
            config,
            downloader: Downloader::new()?,
            snapshots,
        })
    }

    /// Replace the persistent snapshot backend.
    #[must_use]
    pub fn with_snapshot_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = store;
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    /// Make the clang build for `version` available locally.
    ///
    /// The host compatibility check runs before any network access.
    pub async fn ensure_clang(
        &self,
        version: &str,
        options: InstallOptions,
    ) -> Result<Installation> {
        let platform = &self.config.platform;
        platform.check_compatibility()?;
        let locator = ArtifactLocator::new(
            platform,
            self.config.release_base_url.clone(),
            self.config.install_root(),
        )?;

        let resolver = VersionResolver::new(self.downloader.clone(), &self.config.mapping_url);
        let revision = resolver.resolve(version).await?;
        let location = locator.locate(version, &revision);
        debug!(
            key = %location.cache_key,
            url = %location.download_url,
            dir = %location.install_dir.display(),
            "Located artifact"
        );

        let strategy = self.strategy(options);
        info!(mode = %strategy.mode(), local_cache = options.local_cache, "Installing");
        let path = strategy
            .ensure_installed(&InstallRequest {
                version,
                revision: &revision,
                location: &location,
            })
            .await?;

        let path_additions = if options.add_to_path {
            let bin = path.join("bin");
            info!(path = %bin.display(), "Added to path");
            vec![bin]
        } else {
            info!("Not added to path");
            Vec::new()
        };

        Ok(Installation {
            path,
            version: version.to_string(),
            revision,
            cache_key: location.cache_key,
            path_additions,
        })
    }

    fn strategy(&self, options: InstallOptions) -> Box<dyn InstallStrategy> {
        let fetcher = Fetcher::new(
            self.downloader.clone(),
            ArchiveExtractor::new(
                self.config.extract_method,
                self.config.platform.os.clone(),
                self.config.temp_root.clone(),
            ),
            self.config.temp_root.clone(),
        );
        match self.config.cache_mode {
            CacheMode::Tiered => {
                let tool_cache = ToolCache::new(
                    self.config.tool_cache_root.clone(),
                    self.config.platform.arch.to_string(),
                );
                let snapshots = options.local_cache.then(|| Arc::clone(&self.snapshots));
                Box::new(TieredStrategy::new(fetcher, tool_cache, snapshots))
            }
            CacheMode::Fresh => Box::new(FreshStrategy::new(fetcher)),
        }
    }
}
