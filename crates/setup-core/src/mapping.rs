//! NDK version → clang revision resolution.
//!
//! The mapping document is fetched on every run and never persisted:
//!
//! ```json
//! { "mapping": { "r27": "c1234567", "r26": "c7654321" } }
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::info;

use crate::download::Downloader;
use crate::{Error, Result};

/// Parsed mapping document. Key order follows the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VersionMapping {
    /// NDK version → clang build revision.
    pub mapping: IndexMap<String, String>,
}

impl VersionMapping {
    /// Parse a mapping document.
    pub fn parse(json: &str, source_url: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| Error::InvalidMapping {
            url: source_url.to_string(),
            source,
        })
    }

    /// Look up the revision for `version`.
    ///
    /// An empty revision counts as missing.
    pub fn revision_for(&self, version: &str) -> Result<&str> {
        match self.mapping.get(version) {
            Some(revision) if !revision.is_empty() => Ok(revision),
            _ => Err(Error::version_not_found(version, self.versions())),
        }
    }

    /// Every known version, in document order.
    #[must_use]
    pub fn versions(&self) -> Vec<String> {
        self.mapping.keys().cloned().collect()
    }
}

/// Resolves NDK versions against the hosted mapping.
#[derive(Debug, Clone)]
pub struct VersionResolver {
    downloader: Downloader,
    url: String,
}

impl VersionResolver {
    /// Create a resolver for the mapping at `url`.
    #[must_use]
    pub fn new(downloader: Downloader, url: impl Into<String>) -> Self {
        Self {
            downloader,
            url: url.into(),
        }
    }

    /// Mapping document URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and parse the mapping document.
    pub async fn fetch_mapping(&self) -> Result<VersionMapping> {
        info!(url = %self.url, "Fetching mapping");
        let body = self.downloader.fetch_text(&self.url).await?;
        VersionMapping::parse(&body, &self.url)
    }

    /// Resolve `version` to its clang build revision.
    pub async fn resolve(&self, version: &str) -> Result<String> {
        let mapping = self.fetch_mapping().await?;
        let revision = mapping.revision_for(version)?.to_string();
        info!(ndk = %version, %revision, "Found clang revision");
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOC: &str = r#"{"mapping":{"r27":"c1234567","r26":"c7654321","r25c":"b9"}}"#;

    #[test]
    fn test_parse_preserves_order() {
        let mapping = VersionMapping::parse(DOC, "test").unwrap();
        assert_eq!(mapping.versions(), vec!["r27", "r26", "r25c"]);
    }

    #[test]
    fn test_revision_for_hit() {
        let mapping = VersionMapping::parse(DOC, "test").unwrap();
        assert_eq!(mapping.revision_for("r26").unwrap(), "c7654321");
    }

    #[test]
    fn test_revision_for_miss_lists_all_versions() {
        let mapping = VersionMapping::parse(DOC, "test").unwrap();
        let err = mapping.revision_for("r999").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("r999"));
        assert!(message.ends_with("Available versions: r27, r26, r25c"));
    }

    #[test]
    fn test_empty_revision_is_missing() {
        let mapping = VersionMapping::parse(r#"{"mapping":{"r27":""}}"#, "test").unwrap();
        assert!(matches!(
            mapping.revision_for("r27"),
            Err(Error::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_document() {
        let err = VersionMapping::parse(r#"{"versions":[]}"#, "http://x/m.json").unwrap_err();
        assert!(matches!(err, Error::InvalidMapping { ref url, .. } if url == "http://x/m.json"));

        assert!(VersionMapping::parse("not json", "test").is_err());
    }

    #[tokio::test]
    async fn test_resolve_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/mapping.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DOC))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = VersionResolver::new(
            Downloader::new().unwrap(),
            format!("{}/mapping.json", server.uri()),
        );
        assert_eq!(resolver.resolve("r27").await.unwrap(), "c1234567");
    }

    #[tokio::test]
    async fn test_resolve_propagates_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let resolver = VersionResolver::new(
            Downloader::new().unwrap(),
            format!("{}/mapping.json", server.uri()),
        );
        assert!(matches!(
            resolver.resolve("r27").await,
            Err(Error::HttpStatus { status: 503, .. })
        ));
    }
}
