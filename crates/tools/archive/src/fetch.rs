//! Fetching archive bytes.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Retrieves archive bytes from a location.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch the whole archive into memory.
    async fn download(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Downloader backed by an HTTP client.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Create a downloader with a nodepack user agent.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("nodepack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::download_failed("(client)", e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &Url) -> Result<Vec<u8>> {
        debug!(%url, "Downloading archive");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| Error::download_failed(url.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::download_failed(url.as_str(), e.to_string()))
    }
}
