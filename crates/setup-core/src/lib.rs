//! Prebuilt Android NDK clang toolchain installer.
//!
//! This crate resolves an NDK version to a clang build revision, locates the
//! matching release archive for the host, and makes it available locally
//! through a layered cache:
//! - Runner tool cache, published with a completion marker
//! - Optional persistent snapshot store keyed by cache key
//! - Network download and `tar.zst` extraction
//!
//! # Overview
//!
//! ```no_run
//! use setup_ndk_clang_core::{InstallOptions, Installer, InstallerConfig};
//!
//! # async fn run() -> setup_ndk_clang_core::Result<()> {
//! let installer = Installer::new(InstallerConfig::new())?;
//! let install = installer
//!     .ensure_clang("r27", InstallOptions { add_to_path: true, local_cache: false })
//!     .await?;
//! println!("{}", install.path.display());
//! # Ok(())
//! # }
//! ```
//!
//! The installer reports search-path changes in
//! [`Installation::path_additions`] and leaves applying them to the caller.

#![expect(
    clippy::missing_errors_doc,
    reason = "Every fallible function returns the crate Error; variants are documented there"
)]

pub mod config;
pub mod download;
mod error;
pub mod extract;
pub mod fsutil;
pub mod installer;
pub mod locator;
pub mod mapping;
pub mod platform;
pub mod snapshot;
pub mod strategy;
pub mod tool_cache;

pub use config::{CacheMode, ExtractMethod, InstallOptions, InstallerConfig};
pub use error::{Error, Result};
pub use installer::{Installation, Installer};
pub use locator::{ArtifactLocation, ArtifactLocator};
pub use mapping::{VersionMapping, VersionResolver};
pub use platform::{Arch, OsFamily, Platform};
pub use snapshot::{LocalSnapshotStore, SnapshotStore};
pub use strategy::{FreshStrategy, InstallRequest, InstallStrategy, TieredStrategy};
pub use tool_cache::ToolCache;
