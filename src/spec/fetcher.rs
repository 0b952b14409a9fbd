use crate::error::{FetchFailure, Result, SpecError};
use crate::spec::cache::SpecCache;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const SPEC_ACCEPT: &str = "application/json, application/x-yaml, text/yaml";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads OpenAPI documents, going through [`SpecCache`] first.
#[derive(Debug, Clone)]
pub struct SpecFetcher {
    client: reqwest::Client,
}

impl SpecFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("arr-navigator/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Cached bytes when fresh, otherwise a network GET. Successful downloads
    /// are written back to the cache; a failed write is only logged.
    pub async fn fetch(
        &self,
        url: &str,
        cache: &SpecCache,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        if let Some(bytes) = cache.get(url) {
            tracing::debug!(url, bytes = bytes.len(), "Spec served from cache");
            return Ok(bytes);
        }

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(SpecError::fetch(url, FetchFailure::Cancelled));
            }
            result = self.download(url) => result.map_err(|cause| SpecError::fetch(url, cause))?,
        };

        tracing::info!(url, bytes = bytes.len(), "Downloaded spec");

        if let Err(e) = cache.try_put(url, &bytes) {
            tracing::warn!(url, error = %e, "Failed to cache spec");
        }

        Ok(bytes)
    }

    async fn download(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, SPEC_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
