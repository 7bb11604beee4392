//! Installer configuration.
//!
//! Directory defaults follow the CI runner when it is present:
//! 1) `RUNNER_TOOL_CACHE` / `RUNNER_TEMP` (GitHub-hosted and self-hosted runners)
//! 2) OS cache dir / OS temp dir
//!
//! The persistent snapshot store lives under `SETUP_NDK_CLANG_CACHE_DIR`, or
//! `{os cache}/setup-ndk-clang/snapshots` when unset.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use crate::platform::Platform;

/// Default location of the NDK version → clang revision mapping.
pub const DEFAULT_MAPPING_URL: &str =
    "https://raw.githubusercontent.com/Ylarod/setup-ndk-clang/refs/heads/main/mapping.json";

/// Default base URL for prebuilt toolchain archives.
pub const DEFAULT_RELEASE_BASE_URL: &str =
    "https://github.com/Ylarod/setup-ndk-clang/releases/download/prebuilt";

/// Name of the per-user install directory under the home directory.
pub const INSTALL_DIR_NAME: &str = ".setup-ndk-clang";

/// How installs are cached between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheMode {
    /// Tool cache, then optional persistent snapshot, then network.
    #[default]
    Tiered,
    /// Always download and extract into a wiped install directory.
    Fresh,
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tiered => write!(f, "tiered"),
            Self::Fresh => write!(f, "fresh"),
        }
    }
}

impl FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiered" => Ok(Self::Tiered),
            "fresh" => Ok(Self::Fresh),
            _ => Err(format!("Unknown cache mode: {s} (expected tiered or fresh)")),
        }
    }
}

/// How `.tar.zst` archives are decompressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExtractMethod {
    /// In-process streaming zstd decoder.
    #[default]
    Builtin,
    /// External decompression program chosen per OS family.
    System,
}

impl fmt::Display for ExtractMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => write!(f, "builtin"),
            Self::System => write!(f, "system"),
        }
    }
}

impl FromStr for ExtractMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "builtin" => Ok(Self::Builtin),
            "system" => Ok(Self::System),
            _ => Err(format!(
                "Unknown extract method: {s} (expected builtin or system)"
            )),
        }
    }
}

/// Per-call options for [`Installer::ensure_clang`](crate::Installer::ensure_clang).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstallOptions {
    /// Report `{path}/bin` as a search-path addition.
    pub add_to_path: bool,
    /// Enable the persistent snapshot cache layer.
    pub local_cache: bool,
}

/// Installer configuration.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Home directory; installs land in `{home}/.setup-ndk-clang/{version}/{revision}`.
    pub home_dir: PathBuf,
    /// Root of the tool cache.
    pub tool_cache_root: PathBuf,
    /// Scratch area for downloads and extraction.
    pub temp_root: PathBuf,
    /// Root of the persistent snapshot store.
    pub snapshot_root: PathBuf,
    /// Version mapping document URL.
    pub mapping_url: String,
    /// Base URL that release archives are published under.
    pub release_base_url: String,
    /// Cache policy.
    pub cache_mode: CacheMode,
    /// Decompression method.
    pub extract_method: ExtractMethod,
    /// Host platform facts.
    pub platform: Platform,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self::from_inputs(EnvInputs::from_env())
    }
}

impl InstallerConfig {
    /// Create a configuration with defaults taken from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the home directory.
    #[must_use]
    pub fn with_home_dir(mut self, path: PathBuf) -> Self {
        self.home_dir = path;
        self
    }

    /// Set the tool cache root.
    #[must_use]
    pub fn with_tool_cache_root(mut self, path: PathBuf) -> Self {
        self.tool_cache_root = path;
        self
    }

    /// Set the temp root.
    #[must_use]
    pub fn with_temp_root(mut self, path: PathBuf) -> Self {
        self.temp_root = path;
        self
    }

    /// Set the snapshot root.
    #[must_use]
    pub fn with_snapshot_root(mut self, path: PathBuf) -> Self {
        self.snapshot_root = path;
        self
    }

    /// Set the mapping document URL.
    #[must_use]
    pub fn with_mapping_url(mut self, url: impl Into<String>) -> Self {
        self.mapping_url = url.into();
        self
    }

    /// Set the release base URL. A trailing slash is dropped.
    #[must_use]
    pub fn with_release_base_url(mut self, url: impl Into<String>) -> Self {
        self.release_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the cache mode.
    #[must_use]
    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Set the extract method.
    #[must_use]
    pub fn with_extract_method(mut self, method: ExtractMethod) -> Self {
        self.extract_method = method;
        self
    }

    /// Override the detected platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Root under which versioned installs are placed.
    #[must_use]
    pub fn install_root(&self) -> PathBuf {
        self.home_dir.join(INSTALL_DIR_NAME)
    }

    fn from_inputs(inputs: EnvInputs) -> Self {
        let os_cache = inputs.os_cache_dir.clone();
        let tool_cache_root = inputs.runner_tool_cache.unwrap_or_else(|| {
            os_cache
                .clone()
                .unwrap_or_else(|| inputs.temp_dir.clone())
                .join("setup-ndk-clang")
                .join("tool-cache")
        });
        let snapshot_root = inputs.cache_dir_override.unwrap_or_else(|| {
            os_cache
                .unwrap_or_else(|| inputs.temp_dir.clone())
                .join("setup-ndk-clang")
                .join("snapshots")
        });
        let home_dir = inputs.home_dir.unwrap_or_else(|| {
            warn!(
                temp = %inputs.temp_dir.display(),
                "Home directory unknown; installing under the temp dir"
            );
            inputs.temp_dir.clone()
        });
        Self {
            home_dir,
            tool_cache_root,
            temp_root: inputs.runner_temp.unwrap_or(inputs.temp_dir),
            snapshot_root,
            mapping_url: DEFAULT_MAPPING_URL.to_string(),
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
            cache_mode: CacheMode::default(),
            extract_method: ExtractMethod::default(),
            platform: Platform::current(),
        }
    }
}

/// Environment facts that directory defaults are derived from.
#[derive(Debug, Clone)]
struct EnvInputs {
    runner_tool_cache: Option<PathBuf>,
    runner_temp: Option<PathBuf>,
    cache_dir_override: Option<PathBuf>,
    os_cache_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    temp_dir: PathBuf,
}

impl EnvInputs {
    fn from_env() -> Self {
        Self {
            runner_tool_cache: non_empty_env("RUNNER_TOOL_CACHE"),
            runner_temp: non_empty_env("RUNNER_TEMP"),
            cache_dir_override: non_empty_env("SETUP_NDK_CLANG_CACHE_DIR"),
            os_cache_dir: dirs::cache_dir(),
            home_dir: dirs::home_dir(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

fn non_empty_env(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, OsFamily};

    fn bare_inputs() -> EnvInputs {
        EnvInputs {
            runner_tool_cache: None,
            runner_temp: None,
            cache_dir_override: None,
            os_cache_dir: Some(PathBuf::from("/cache")),
            home_dir: Some(PathBuf::from("/home/ci")),
            temp_dir: PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn test_missing_home_falls_back_to_temp() {
        let config = InstallerConfig::from_inputs(EnvInputs {
            home_dir: None,
            ..bare_inputs()
        });
        assert_eq!(config.home_dir, PathBuf::from("/tmp"));
        assert_eq!(
            config.install_root(),
            PathBuf::from("/tmp/.setup-ndk-clang")
        );
    }

    #[test]
    fn test_defaults_without_runner() {
        let config = InstallerConfig::from_inputs(bare_inputs());
        assert_eq!(config.home_dir, PathBuf::from("/home/ci"));
        assert_eq!(
            config.tool_cache_root,
            PathBuf::from("/cache/setup-ndk-clang/tool-cache")
        );
        assert_eq!(config.temp_root, PathBuf::from("/tmp"));
        assert_eq!(
            config.snapshot_root,
            PathBuf::from("/cache/setup-ndk-clang/snapshots")
        );
        assert_eq!(config.mapping_url, DEFAULT_MAPPING_URL);
        assert_eq!(config.release_base_url, DEFAULT_RELEASE_BASE_URL);
        assert_eq!(config.cache_mode, CacheMode::Tiered);
        assert_eq!(config.extract_method, ExtractMethod::Builtin);
    }

    #[test]
    fn test_runner_directories_take_precedence() {
        let inputs = EnvInputs {
            runner_tool_cache: Some(PathBuf::from("/opt/hostedtoolcache")),
            runner_temp: Some(PathBuf::from("/runner/_temp")),
            cache_dir_override: Some(PathBuf::from("/persist")),
            ..bare_inputs()
        };
        let config = InstallerConfig::from_inputs(inputs);
        assert_eq!(config.tool_cache_root, PathBuf::from("/opt/hostedtoolcache"));
        assert_eq!(config.temp_root, PathBuf::from("/runner/_temp"));
        assert_eq!(config.snapshot_root, PathBuf::from("/persist"));
    }

    #[test]
    fn test_missing_os_cache_falls_back_to_temp() {
        let inputs = EnvInputs {
            os_cache_dir: None,
            ..bare_inputs()
        };
        let config = InstallerConfig::from_inputs(inputs);
        assert_eq!(
            config.tool_cache_root,
            PathBuf::from("/tmp/setup-ndk-clang/tool-cache")
        );
    }

    #[test]
    fn test_install_root() {
        let config = InstallerConfig::from_inputs(bare_inputs());
        assert_eq!(
            config.install_root(),
            PathBuf::from("/home/ci/.setup-ndk-clang")
        );
    }

    #[test]
    fn test_builder_methods() {
        let config = InstallerConfig::from_inputs(bare_inputs())
            .with_home_dir(PathBuf::from("/h"))
            .with_mapping_url("http://localhost/mapping.json")
            .with_release_base_url("http://localhost/releases/")
            .with_cache_mode(CacheMode::Fresh)
            .with_extract_method(ExtractMethod::System)
            .with_platform(Platform::new(OsFamily::Darwin, Arch::Arm64));
        assert_eq!(config.home_dir, PathBuf::from("/h"));
        assert_eq!(config.mapping_url, "http://localhost/mapping.json");
        assert_eq!(config.release_base_url, "http://localhost/releases");
        assert_eq!(config.cache_mode, CacheMode::Fresh);
        assert_eq!(config.extract_method, ExtractMethod::System);
        assert_eq!(config.platform.compatibility_key(), "darwin-arm64");
    }

    #[test]
    fn test_cache_mode_parse() {
        assert_eq!("tiered".parse::<CacheMode>().unwrap(), CacheMode::Tiered);
        assert_eq!("FRESH".parse::<CacheMode>().unwrap(), CacheMode::Fresh);
        assert!("sometimes".parse::<CacheMode>().is_err());
        assert_eq!(CacheMode::Fresh.to_string(), "fresh");
    }

    #[test]
    fn test_extract_method_parse() {
        assert_eq!(
            "builtin".parse::<ExtractMethod>().unwrap(),
            ExtractMethod::Builtin
        );
        assert_eq!(
            "System".parse::<ExtractMethod>().unwrap(),
            ExtractMethod::System
        );
        assert!("7z".parse::<ExtractMethod>().is_err());
    }
}
