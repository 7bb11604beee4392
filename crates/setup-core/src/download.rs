//! HTTP access for the mapping document and release archives.

use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use crate::{Error, Result};

/// Thin wrapper over a shared HTTP client.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Create a downloader with the crate's user agent.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("setup-ndk-clang/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http("<client>", format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(url, status.as_u16()));
        }
        Ok(response)
    }

    /// Fetch a small text document.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!(%url, "Fetching document");
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| Error::http(url, format!("Failed to read body: {e}")))
    }

    /// Stream `url` into a uniquely named file inside `dir`.
    ///
    /// A partially written file is removed when the transfer fails.
    pub async fn download_to_dir(&self, url: &str, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::io(e, dir, "create_dir_all"))?;
        let dest = dir.join(uuid::Uuid::new_v4().to_string());

        debug!(%url, dest = %dest.display(), "Downloading");
        let result = self.stream_into(url, &dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&dest).await;
        }
        result.map(|bytes| {
            debug!(%url, bytes, "Download complete");
            dest
        })
    }

    async fn stream_into(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.get(url).await?;
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| Error::io(e, dest, "create"))?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::http(url, format!("Failed to read body: {e}")))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(e, dest, "write"))?;
            written += chunk.len() as u64;
            trace!(written, "Received chunk");
        }
        file.flush().await.map_err(|e| Error::io(e, dest, "flush"))?;
        Ok(written)
    }
}
