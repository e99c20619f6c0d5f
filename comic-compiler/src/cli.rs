//! # comic-compiler CLI Interface
//!
//! Argument parsing, validation and the async [`run`] entrypoint. All pipeline
//! logic lives in [`comic_compiler_core`]; this module only turns command-line
//! input into a [`CompileConfig`], wires up the HTTP session and reports the
//! outcome to the user.
//!
//! ## How To Use
//! - From a shell: `comic-compiler --help`.
//! - Programmatically or from tests: build a [`Cli`] and call [`run`].
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comic_compiler_core::compile::compile_series;
use comic_compiler_core::config::{CompileConfig, OutputFormat, DEFAULT_DPI};
use comic_compiler_core::contract::SeriesRunSummary;
use comic_compiler_core::download::HttpFetcher;
use std::path::PathBuf;

use crate::load_config::load_config;

const EXAMPLES: &str = r#"Examples:
  comic-compiler "https://grabber.zone/comics/sonic-idw/sonic-the-hedgehog-01/" 3 ./output
  comic-compiler "https://grabber.zone/comics/sonic-idw/sonic-the-hedgehog-01/" 3 ./output --format pdf
  comic-compiler "https://grabber.zone/comics/sonic-idw/sonic-the-hedgehog-01/" 3 ./output --format epub
  comic-compiler "https://grabber.zone/comics/sonic-idw/sonic-the-hedgehog-01/" 3 ./output --dpi 300
  comic-compiler "https://grabber.zone/comics/sonic-idw/sonic-the-hedgehog-01/" 3 ./output --config tuning.yaml"#;

/// Download comic pages and convert them to PDF and EPUB formats.
#[derive(Parser, Debug)]
#[clap(
    name = "comic-compiler",
    version,
    about = "Download comic pages and convert them to PDF and EPUB formats",
    after_long_help = EXAMPLES,
    allow_negative_numbers = true
)]
pub struct Cli {
    /// URL of the first issue; it must end in the issue number
    pub seed_url: String,

    /// Last issue number to download (inclusive)
    pub end_number: i64,

    /// Directory the series folder is created in
    pub output_dir: PathBuf,

    /// Which documents to build for every issue
    #[clap(long, short = 'f', value_enum, default_value_t = FormatArg::Both)]
    pub format: FormatArg,

    /// Resolution used to size PDF pages (50-600); lower means larger pages
    #[clap(long, default_value_t = i64::from(DEFAULT_DPI))]
    pub dpi: i64,

    /// Optional YAML file with a `download:` section (retries, timeouts, delays)
    #[clap(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Both,
    Pdf,
    Epub,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Both => OutputFormat::Both,
            FormatArg::Pdf => OutputFormat::PdfOnly,
            FormatArg::Epub => OutputFormat::EpubOnly,
        }
    }
}

/// Async CLI entrypoint shared by `main` and the integration tests.
///
/// Returns the run summary; whether the run counts as a success is decided by
/// the caller via [`SeriesRunSummary::succeeded`].
pub async fn run(cli: Cli) -> Result<SeriesRunSummary> {
    tracing::info!("trace_initialised");

    let mut config = CompileConfig::from_args(
        &cli.seed_url,
        cli.end_number,
        cli.output_dir.clone(),
        cli.format.into(),
        cli.dpi,
    )?;
    if let Some(path) = &cli.config {
        config.download = load_config(path)?.download;
    }
    config.trace_loaded();

    let fetcher = HttpFetcher::new(&config.download).context("Failed to build HTTP client")?;
    let summary = compile_series(&config, &fetcher).await?;
    print_summary(&summary);
    Ok(summary)
}

fn print_summary(summary: &SeriesRunSummary) {
    if summary.succeeded() {
        println!("Successfully processed {}", summary.series_title);
        println!("Output directory: {}", summary.output_root.display());
        println!(
            "Created {} files for issues {} to {}",
            summary.files_created,
            summary.issues_processed.start(),
            summary.issues_processed.end()
        );
        println!(
            "Completed {} issues, skipped {}; each issue saved in its own subdirectory",
            summary.completed.len(),
            summary.skipped.len()
        );
    } else {
        println!("No files were created successfully");
    }
}
