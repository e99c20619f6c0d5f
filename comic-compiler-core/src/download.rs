//! HTTP session and the retrying image downloader.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::config::DownloadConfig;
use crate::contract::{DownloadedImage, Fetcher};
use crate::error::{DownloadError, NetworkError};

/// The process-wide HTTP session: one cookie store and one set of default
/// headers, reused for every page and image request of a run.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &DownloadConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .cookie_store(true)
            .build()?;
        info!(
            timeout_secs = config.timeout_secs,
            "Initialised HTTP session"
        );
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, &e))?;
        debug!(url, bytes = body.len(), "Fetched");
        Ok(body.to_vec())
    }
}

/// Delay before retry number `attempt + 1`: 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(16))
}

/// Write `bytes` to `destination` without ever exposing a partial file there.
///
/// The data goes to a temporary file next to the destination which is then
/// renamed into place.
pub fn persist_atomically(destination: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(destination).map_err(|e| e.error)?;
    Ok(())
}

/// Downloads single images, retrying transient network failures with
/// exponential backoff.
pub struct ResilientDownloader<'a, F: Fetcher + ?Sized> {
    fetcher: &'a F,
    max_retries: u32,
}

impl<'a, F: Fetcher + ?Sized> ResilientDownloader<'a, F> {
    pub fn new(fetcher: &'a F, max_retries: u32) -> Self {
        Self {
            fetcher,
            max_retries: max_retries.max(1),
        }
    }

    /// Fetch `url` and store it at `destination`.
    ///
    /// Retryable failures are retried until `max_retries` attempts were made;
    /// terminal failures return at once. On any error nothing is left at
    /// `destination`.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        sequence_index: usize,
    ) -> Result<DownloadedImage, DownloadError> {
        let mut attempt = 0;
        let body = loop {
            match self.fetcher.fetch(url).await {
                Ok(body) => break body,
                Err(e) if e.is_retryable() => {
                    if attempt + 1 < self.max_retries {
                        let wait = backoff_delay(attempt);
                        warn!(
                            url,
                            attempt = attempt + 1,
                            max_retries = self.max_retries,
                            wait_secs = wait.as_secs(),
                            error = %e,
                            "Download failed, retrying"
                        );
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }
                    error!(
                        url,
                        attempts = self.max_retries,
                        error = %e,
                        "Download failed after all attempts"
                    );
                    return Err(DownloadError::Exhausted {
                        url: url.to_string(),
                        attempts: self.max_retries,
                        last: e,
                    });
                }
                Err(e) => {
                    error!(url, attempt = attempt + 1, error = %e, "Download failed");
                    return Err(DownloadError::Terminal {
                        url: url.to_string(),
                        attempt: attempt + 1,
                        source: e,
                    });
                }
            }
        };

        persist_atomically(destination, &body).map_err(|source| {
            error!(path = %destination.display(), error = ?source, "Failed to write image");
            DownloadError::Write {
                path: destination.to_path_buf(),
                source,
            }
        })?;
        debug!(url, path = %destination.display(), bytes = body.len(), "Saved image");

        Ok(DownloadedImage {
            source_url: url.to_string(),
            local_path: destination.to_path_buf(),
            sequence_index,
            byte_size: body.len() as u64,
        })
    }
}
