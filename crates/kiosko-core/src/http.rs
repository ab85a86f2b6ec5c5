//! HTTP asset fetcher.

use async_trait::async_trait;
use kiosko_abstraction::{AssetFetcher, CancellationToken, FetchError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{KioskoError, Result};

/// Fetches module assets from an HTTP origin.
///
/// Relative asset paths such as `./modules/caja/caja.html` are resolved
/// against the base URL; absolute `http(s)://` URLs are used as they are.
#[derive(Debug, Clone)]
pub struct HttpAssetFetcher {
    client: Client,
    base_url: String,
}

impl HttpAssetFetcher {
    /// Creates a fetcher for `base_url`.
    ///
    /// # Errors
    /// Returns `KioskoError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("kiosko/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KioskoError::Http(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a fetcher using an existing client.
    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves an asset path against the base URL.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let relative = path.trim_start_matches("./").trim_start_matches('/');
        format!("{}/{}", self.base_url.trim_end_matches('/'), relative)
    }

    async fn get_text(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(to_fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response.text().await.map_err(to_fetch_error)
    }
}

fn to_fetch_error(e: reqwest::Error) -> FetchError {
    match e.status() {
        Some(status) => FetchError::Status(status.as_u16()),
        None => FetchError::Network(e.to_string()),
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch_text(&self, path: &str, cancel: &CancellationToken) -> std::result::Result<String, FetchError> {
        let url = self.resolve(path);
        debug!(url = %url, "GET");
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.get_text(&url) => result,
        }
    }

    async fn probe(&self, path: &str) -> std::result::Result<(), FetchError> {
        let url = self.resolve(path);
        debug!(url = %url, "HEAD");
        let response = self.client.head(&url).send().await.map_err(to_fetch_error)?;
        let status = response.status();
        if status.is_success() { Ok(()) } else { Err(FetchError::Status(status.as_u16())) }
    }
}
