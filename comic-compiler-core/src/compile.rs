//! High-level pipeline: orchestrates resolve → scrape → download → assemble for a comic series.
//!
//! For every issue derived from the seed URL this module:
//!   - Fetches the issue page and extracts its [`ImageManifest`](crate::contract::ImageManifest)
//!   - Downloads each image, in manifest order, into the issue's `images/` directory
//!   - Builds the requested PDF and/or EPUB from whatever was downloaded
//!   - Records the issue as completed or skipped in the [`SeriesRunSummary`]
//!
//! # Error Handling
//! Only an invalid config, a seed URL without an issue number and an output
//! root that cannot be created abort the run. Failures of a page, an image or a
//! document are logged with the issue number and never escalate past that issue.
//!
//! # Ordering
//! Issues are handled strictly one after the other and images strictly in
//! manifest order. Each image download is followed by the configured image
//! delay, each issue that reached assembly by the issue delay.
//!
//! # Navigation
//! - Main entrypoint: [`compile_series`]

use tracing::{error, info, warn};

use crate::config::{CompileConfig, OutputFormat};
use crate::contract::{
    DownloadedImage, Fetcher, IssueRequest, SeriesRunSummary, SkipReason, SkippedIssue,
};
use crate::download::ResilientDownloader;
use crate::error::CompileError;
use crate::layout::{image_file_name, issue_title, safe_title, series_title_from, IssueLayout};
use crate::manifest::{fetch_manifest, UNKNOWN_TITLE};
use crate::sequence::IssuePattern;
use crate::{epub, pdf};

/// What happened to one issue.
enum IssueOutcome {
    Completed { files: Vec<String> },
    Skipped(SkipReason),
}

/// Run state carried from one issue to the next.
struct SeriesState {
    /// Fixed by the first issue that has images.
    series_title: Option<String>,
    files_created: usize,
    completed: Vec<u32>,
    skipped: Vec<SkippedIssue>,
}

/// Compile every issue from the seed URL's number up to `config.end_number`.
pub async fn compile_series<F>(
    config: &CompileConfig,
    fetcher: &F,
) -> Result<SeriesRunSummary, CompileError>
where
    F: Fetcher + ?Sized,
{
    config.validate()?;
    info!(
        seed_url = %config.seed_url,
        end_number = config.end_number,
        format = ?config.format,
        dpi = config.dpi,
        output_dir = %config.output_dir.display(),
        "[COMPILE] Starting comic compilation"
    );

    let pattern = IssuePattern::parse(&config.seed_url).map_err(|e| {
        error!(error = %e, "[COMPILE][ERROR] Could not resolve issue sequence");
        e
    })?;
    let issues = pattern.issues(config.end_number);
    info!(
        start_number = pattern.start_number,
        end_number = config.end_number,
        issues = issues.len(),
        "[COMPILE] Resolved issue sequence"
    );

    std::fs::create_dir_all(&config.output_dir).map_err(|source| {
        error!(path = %config.output_dir.display(), error = ?source, "[COMPILE][ERROR] Could not create output directory");
        CompileError::OutputRoot {
            path: config.output_dir.clone(),
            source,
        }
    })?;

    let mut state = SeriesState {
        series_title: None,
        files_created: 0,
        completed: Vec::new(),
        skipped: Vec::new(),
    };

    for request in &issues {
        let issue_number = request.issue_number;
        match process_issue(config, fetcher, request, &mut state).await {
            IssueOutcome::Completed { files } => {
                info!(
                    issue = issue_number,
                    files = %files.join(", "),
                    "[COMPILE] Created files for issue"
                );
                state.files_created += files.len();
                state.completed.push(issue_number);
                tokio::time::sleep(config.download.issue_delay()).await;
            }
            IssueOutcome::Skipped(reason) => {
                warn!(issue = issue_number, reason = ?reason, "[COMPILE] Skipping issue");
                let built_nothing = reason == SkipReason::NoDocumentsBuilt;
                state.skipped.push(SkippedIssue {
                    issue_number,
                    reason,
                });
                // Assembly was attempted, so every image was requested.
                if built_nothing {
                    tokio::time::sleep(config.download.issue_delay()).await;
                }
            }
        }
    }

    let (series_title, output_root) = match state.series_title {
        Some(title) => {
            let root = config.output_dir.join(safe_title(&title));
            (title, root)
        }
        None => (UNKNOWN_TITLE.to_string(), config.output_dir.clone()),
    };

    let summary = SeriesRunSummary {
        series_title,
        output_root,
        files_created: state.files_created,
        issues_processed: pattern.start_number..=config.end_number,
        completed: state.completed,
        skipped: state.skipped,
    };
    if summary.succeeded() {
        info!(
            series_title = %summary.series_title,
            output_root = %summary.output_root.display(),
            files_created = summary.files_created,
            completed = summary.completed.len(),
            skipped = summary.skipped.len(),
            "[COMPILE] Finished comic compilation"
        );
    } else {
        error!(
            skipped = summary.skipped.len(),
            "[COMPILE][ERROR] No files were created successfully"
        );
    }
    Ok(summary)
}

async fn process_issue<F>(
    config: &CompileConfig,
    fetcher: &F,
    request: &IssueRequest,
    state: &mut SeriesState,
) -> IssueOutcome
where
    F: Fetcher + ?Sized,
{
    let issue_number = request.issue_number;
    info!(issue = issue_number, url = %request.resolved_url, "[COMPILE] Processing issue");

    let manifest = fetch_manifest(fetcher, &request.resolved_url).await;
    if manifest.image_urls.is_empty() {
        return IssueOutcome::Skipped(SkipReason::NoImagesFound);
    }

    // Provisional until this issue has downloaded something.
    let series_title = state
        .series_title
        .clone()
        .unwrap_or_else(|| series_title_from(&manifest.title));
    let safe = safe_title(&series_title);
    let layout = IssueLayout::new(&config.output_dir.join(&safe), &safe, issue_number);
    if let Err(e) = std::fs::create_dir_all(&layout.images_dir) {
        error!(
            issue = issue_number,
            path = %layout.images_dir.display(),
            error = ?e,
            "[COMPILE][ERROR] Could not create issue directory"
        );
        return IssueOutcome::Skipped(SkipReason::OutputDirectory(e.to_string()));
    }

    let attempted = manifest.image_urls.len();
    info!(issue = issue_number, images = attempted, "[COMPILE] Downloading images");
    let downloaded = download_images(config, fetcher, issue_number, &manifest.image_urls, &layout).await;
    if downloaded.is_empty() {
        return IssueOutcome::Skipped(SkipReason::NoImagesDownloaded { attempted });
    }
    if state.series_title.is_none() {
        info!(issue = issue_number, series_title = %series_title, "[COMPILE] Series title fixed");
        state.series_title = Some(series_title.clone());
    }
    info!(
        issue = issue_number,
        downloaded = downloaded.len(),
        total = attempted,
        "[COMPILE] Downloaded images for issue"
    );

    // PDF and EPUB encoding is CPU-bound; keep it off the async workers so
    // cancellation stays responsive.
    let title = issue_title(&series_title, issue_number);
    let (format, dpi) = (config.format, config.dpi);
    let files = match tokio::task::spawn_blocking(move || {
        assemble_documents(format, dpi, issue_number, &title, &downloaded, &layout)
    })
    .await
    {
        Ok(files) => files,
        Err(e) => {
            error!(issue = issue_number, error = %e, "[COMPILE][ERROR] Document assembly aborted");
            Vec::new()
        }
    };
    if files.is_empty() {
        return IssueOutcome::Skipped(SkipReason::NoDocumentsBuilt);
    }
    IssueOutcome::Completed { files }
}

async fn download_images<F>(
    config: &CompileConfig,
    fetcher: &F,
    issue_number: u32,
    image_urls: &[String],
    layout: &IssueLayout,
) -> Vec<DownloadedImage>
where
    F: Fetcher + ?Sized,
{
    let downloader = ResilientDownloader::new(fetcher, config.download.max_retries);
    let mut downloaded = Vec::with_capacity(image_urls.len());
    for (i, url) in image_urls.iter().enumerate() {
        let sequence_index = i + 1;
        let destination = layout.images_dir.join(image_file_name(sequence_index, url));
        match downloader.download(url, &destination, sequence_index).await {
            Ok(image) => downloaded.push(image),
            Err(e) => {
                warn!(
                    issue = issue_number,
                    url = %url,
                    sequence_index,
                    error = %e,
                    "[COMPILE] Image not downloaded"
                );
            }
        }
        tokio::time::sleep(config.download.image_delay()).await;
    }
    downloaded
}

/// Build the requested documents; returns the names of the files written.
fn assemble_documents(
    format: OutputFormat,
    dpi: u32,
    issue_number: u32,
    title: &str,
    images: &[DownloadedImage],
    layout: &IssueLayout,
) -> Vec<String> {
    let mut files = Vec::new();

    if format.wants_pdf() {
        match pdf::assemble(images, &layout.pdf_path, title, dpi) {
            Ok(report) => files.push(format!("PDF: {}", file_name(&report.path))),
            Err(e) => error!(issue = issue_number, error = %e, "[COMPILE][ERROR] PDF not created"),
        }
    }
    if format.wants_epub() {
        match epub::assemble(images, &layout.epub_path, title) {
            Ok(report) => files.push(format!("EPUB: {}", file_name(&report.path))),
            Err(e) => error!(issue = issue_number, error = %e, "[COMPILE][ERROR] EPUB not created"),
        }
    }
    files
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
