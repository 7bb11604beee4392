//! Error types for toolchain resolution and installation.

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Result type for toolchain operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or installing a toolchain.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Host OS/arch combination is not in the supported set.
    #[error("Unsupported host \"{host}\"")]
    #[diagnostic(
        code(setup_ndk_clang::platform::unsupported_host),
        help("Supported hosts: linux-x64, win32-x64, darwin-x64, darwin-arm64")
    )]
    UnsupportedHost {
        /// The offending `{os}-{arch}` key.
        host: String,
    },

    /// OS family has no prebuilt artifact naming.
    #[error("Unsupported platform: {os}")]
    #[diagnostic(code(setup_ndk_clang::platform::unsupported_platform))]
    UnsupportedPlatform {
        /// The OS family name.
        os: String,
    },

    /// Requested NDK version is absent from the mapping document.
    #[error(
        "No clang revision found for NDK version {version}. Available versions: {}",
        available.join(", ")
    )]
    #[diagnostic(
        code(setup_ndk_clang::mapping::version_not_found),
        help("Pick one of the listed NDK versions")
    )]
    VersionNotFound {
        /// The requested version.
        version: String,
        /// Every version in the mapping, in document order.
        available: Vec<String>,
    },

    /// Mapping document could not be parsed.
    #[error("Invalid version mapping from {url}: {source}")]
    #[diagnostic(code(setup_ndk_clang::mapping::invalid))]
    InvalidMapping {
        /// Where the document came from.
        url: String,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// Transport-level HTTP failure.
    #[error("Request to {url} failed: {message}")]
    #[diagnostic(code(setup_ndk_clang::http::request))]
    Http {
        /// Requested URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Server answered with a non-success status.
    #[error("Unexpected HTTP {status} from {url}")]
    #[diagnostic(
        code(setup_ndk_clang::http::status),
        help("Check that the NDK version and its clang revision have a published artifact")
    )]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Archive could not be extracted.
    #[error("Failed to extract {}: {message}", archive.display())]
    #[diagnostic(code(setup_ndk_clang::extract))]
    Extraction {
        /// Archive path.
        archive: Box<Path>,
        /// Error message.
        message: String,
    },

    /// I/O error with the operation and path that caused it.
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(setup_ndk_clang::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available.
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "rename", "create_dir_all").
        operation: String,
    },

    /// Cache bookkeeping failed.
    #[error("Cache error: {message}")]
    #[diagnostic(code(setup_ndk_clang::cache))]
    Cache {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Create an unsupported host error.
    #[must_use]
    pub fn unsupported_host(host: impl Into<String>) -> Self {
        Self::UnsupportedHost { host: host.into() }
    }

    /// Create an unsupported platform error.
    #[must_use]
    pub fn unsupported_platform(os: impl Into<String>) -> Self {
        Self::UnsupportedPlatform { os: os.into() }
    }

    /// Create a version not found error.
    #[must_use]
    pub fn version_not_found(version: impl Into<String>, available: Vec<String>) -> Self {
        Self::VersionNotFound {
            version: version.into(),
            available,
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn http(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a status error.
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Create an extraction error.
    #[must_use]
    pub fn extraction(archive: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.as_ref().into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context.
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }

    /// Create a cache error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_host_message() {
        let err = Error::unsupported_host("freebsd-x64");
        assert_eq!(err.to_string(), "Unsupported host \"freebsd-x64\"");
    }

    #[test]
    fn test_unsupported_platform_message() {
        let err = Error::unsupported_platform("aix");
        assert_eq!(err.to_string(), "Unsupported platform: aix");
    }

    #[test]
    fn test_version_not_found_lists_versions_in_order() {
        let err = Error::version_not_found("r999", vec!["r27".into(), "r26".into()]);
        assert_eq!(
            err.to_string(),
            "No clang revision found for NDK version r999. Available versions: r27, r26"
        );
    }

    #[test]
    fn test_io_error_with_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io(source, "/tmp/x", "read");
        assert_eq!(err.to_string(), "I/O read failed: /tmp/x");
    }

    #[test]
    fn test_io_error_without_path() {
        let source = std::io::Error::other("boom");
        let err = Error::io_no_path(source, "spawn");
        assert_eq!(err.to_string(), "I/O spawn failed");
    }

    #[test]
    fn test_http_status_message() {
        let err = Error::http_status("https://example.com/a.tar.zst", 404);
        assert_eq!(
            err.to_string(),
            "Unexpected HTTP 404 from https://example.com/a.tar.zst"
        );
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = Error::unsupported_host("freebsd-x64");
        let code = err.code().map(|c| c.to_string());
        assert_eq!(
            code.as_deref(),
            Some("setup_ndk_clang::platform::unsupported_host")
        );
    }
}
