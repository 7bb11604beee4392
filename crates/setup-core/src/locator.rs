//! Cache keys, download URLs and install directories.

use std::path::PathBuf;

use crate::Result;
use crate::platform::Platform;

/// Prefix shared by every persistent cache key.
pub const CACHE_KEY_PREFIX: &str = "setup-ndk-clang";

/// Everything needed to fetch and place one toolchain build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    /// Persistent cache key.
    pub cache_key: String,
    /// Release archive URL.
    pub download_url: String,
    /// Deterministic install directory, `{root}/{version}/{revision}`.
    pub install_dir: PathBuf,
}

/// Derives artifact locations from host facts.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    platform_name: &'static str,
    release_base_url: String,
    install_root: PathBuf,
}

impl ArtifactLocator {
    /// Create a locator for `platform`.
    ///
    /// Fails with `UnsupportedPlatform` when the OS family has no artifact naming.
    pub fn new(
        platform: &Platform,
        release_base_url: impl Into<String>,
        install_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            platform_name: platform.download_name()?,
            release_base_url: release_base_url.into().trim_end_matches('/').to_string(),
            install_root: install_root.into(),
        })
    }

    /// Platform name used in keys and URLs.
    #[must_use]
    pub fn platform_name(&self) -> &'static str {
        self.platform_name
    }

    /// Persistent cache key for a build.
    #[must_use]
    pub fn cache_key(&self, version: &str, revision: &str) -> String {
        format!(
            "{CACHE_KEY_PREFIX}-{version}-{revision}-{}",
            self.platform_name
        )
    }

    /// Archive file name for a build.
    #[must_use]
    pub fn archive_name(&self, version: &str, revision: &str) -> String {
        format!(
            "clang-{}-ndk-{version}-{revision}.tar.zst",
            self.platform_name
        )
    }

    /// Release archive URL for a build.
    #[must_use]
    pub fn download_url(&self, version: &str, revision: &str) -> String {
        format!(
            "{}/{}",
            self.release_base_url,
            self.archive_name(version, revision)
        )
    }

    /// Install directory for a build.
    #[must_use]
    pub fn install_dir(&self, version: &str, revision: &str) -> PathBuf {
        self.install_root.join(version).join(revision)
    }

    /// Compute every location for a build.
    #[must_use]
    pub fn locate(&self, version: &str, revision: &str) -> ArtifactLocation {
        ArtifactLocation {
            cache_key: self.cache_key(version, revision),
            download_url: self.download_url(version, revision),
            install_dir: self.install_dir(version, revision),
        }
    }
}
