//! Plain data handed between pipeline stages, plus the [`Fetcher`] seam.
//!
//! Every network read in the pipeline goes through a single [`Fetcher`], so the
//! whole run can be driven by a mock in tests (see `MockFetcher`, generated by
//! `mockall` under the `test-export-mocks` feature).

use async_trait::async_trait;
use std::ops::RangeInclusive;
use std::path::PathBuf;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::NetworkError;

/// One issue of the series: its number and the page URL derived for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub issue_number: u32,
    pub resolved_url: String,
}

/// Title and ordered image URLs scraped from an issue page.
///
/// The order of `image_urls` is the page order of the finished documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageManifest {
    pub title: String,
    pub image_urls: Vec<String>,
}

/// An image persisted to disk by the downloader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub source_url: String,
    pub local_path: PathBuf,
    /// 1-based position in the manifest.
    pub sequence_index: usize,
    pub byte_size: u64,
}

/// Why an issue produced no documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoImagesFound,
    NoImagesDownloaded { attempted: usize },
    OutputDirectory(String),
    NoDocumentsBuilt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedIssue {
    pub issue_number: u32,
    pub reason: SkipReason,
}

/// Final report of a compile run.
#[derive(Debug, Clone)]
pub struct SeriesRunSummary {
    pub series_title: String,
    pub output_root: PathBuf,
    pub files_created: usize,
    pub issues_processed: RangeInclusive<u32>,
    pub completed: Vec<u32>,
    pub skipped: Vec<SkippedIssue>,
}

impl SeriesRunSummary {
    /// A run succeeds when at least one document was written.
    pub fn succeeded(&self) -> bool {
        self.files_created > 0
    }
}

/// Fetches raw bytes over the shared HTTP session.
///
/// Implementations must report non-2xx responses as [`NetworkError::Status`] and
/// must only return `Ok` once the whole body has been received.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, NetworkError>;
}
