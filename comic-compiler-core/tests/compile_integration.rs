use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

use comic_compiler_core::compile::compile_series;
use comic_compiler_core::config::{CompileConfig, DownloadConfig, OutputFormat};
use comic_compiler_core::contract::{MockFetcher, SkipReason, SkippedIssue};
use comic_compiler_core::error::{CompileError, NetworkError, SequenceError};
use tempfile::tempdir;

const SEED: &str = "https://comics.test/sonic-idw/sonic-the-hedgehog-01/";

const ISSUE_ONE: &str = r#"<html><head><title>Sonic the Hedgehog #01 | Comics</title></head>
<body>
  <div class="chapters_selectbox_holder"><select>
    <option selected="selected">Sonic the Hedgehog #01</option>
    <option>Sonic the Hedgehog #02</option>
  </select></div>
  <div class="reading-content">
    <img src="https://cdn.comics.test/sonic/01/p1.png">
    <img data-src="https://cdn.comics.test/sonic/01/p2.png">
    <img src="//cdn.comics.test/sonic/01/p3.png">
  </div>
</body></html>"#;

const ISSUE_TWO: &str = r#"<html><head><title>Sonic the Hedgehog #02</title></head>
<body><div class="entry-content"><p>Coming soon</p></div></body></html>"#;

fn png() -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::new_rgb8(120, 180)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn quick_config(output_dir: PathBuf, end: i64, format: OutputFormat) -> CompileConfig {
    let mut config = CompileConfig::from_args(SEED, end, output_dir, format, 150).unwrap();
    config.download = DownloadConfig {
        max_retries: 1,
        image_delay_ms: 0,
        issue_delay_ms: 0,
        ..DownloadConfig::default()
    };
    config
}

fn series_fetcher(broken_image: Option<&'static str>) -> MockFetcher {
    let image = png();
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().returning(move |url| {
        if Some(url) == broken_image {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        match url {
            "https://comics.test/sonic-idw/sonic-the-hedgehog-01/" => Ok(ISSUE_ONE.as_bytes().to_vec()),
            "https://comics.test/sonic-idw/sonic-the-hedgehog-02/" => Ok(ISSUE_TWO.as_bytes().to_vec()),
            u if u.starts_with("https://cdn.comics.test/") => Ok(image.clone()),
            other => Err(NetworkError::Status {
                url: other.to_string(),
                status: 404,
            }),
        }
    });
    fetcher
}

fn dir_names(path: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn two_issue_run_with_one_empty_issue() {
    let out = tempdir().unwrap();
    let config = quick_config(out.path().to_path_buf(), 2, OutputFormat::Both);
    let fetcher = series_fetcher(None);

    let summary = compile_series(&config, &fetcher).await.expect("run completes");

    assert!(summary.succeeded());
    assert_eq!(summary.series_title, "Sonic the Hedgehog");
    assert_eq!(summary.files_created, 2);
    assert_eq!(summary.issues_processed, 1..=2);
    assert_eq!(summary.completed, vec![1]);
    assert_eq!(
        summary.skipped,
        vec![SkippedIssue {
            issue_number: 2,
            reason: SkipReason::NoImagesFound,
        }]
    );

    let series_dir = out.path().join("Sonic-the-Hedgehog");
    assert_eq!(summary.output_root, series_dir);
    assert_eq!(dir_names(out.path()), vec!["Sonic-the-Hedgehog"]);
    assert_eq!(dir_names(&series_dir), vec!["issue-01"]);

    let issue_dir = series_dir.join("issue-01");
    assert_eq!(
        dir_names(&issue_dir),
        vec![
            "Sonic-the-Hedgehog-01.epub",
            "Sonic-the-Hedgehog-01.pdf",
            "images"
        ]
    );
    assert_eq!(
        dir_names(&issue_dir.join("images")),
        vec!["0001.png", "0002.png", "0003.png"]
    );
    let pdf = std::fs::read(issue_dir.join("Sonic-the-Hedgehog-01.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    let epub = std::fs::read(issue_dir.join("Sonic-the-Hedgehog-01.epub")).unwrap();
    assert!(epub.starts_with(b"PK"));
}

#[tokio::test]
async fn failed_image_is_left_out_and_only_pdf_is_built() {
    let out = tempdir().unwrap();
    let config = quick_config(out.path().to_path_buf(), 1, OutputFormat::PdfOnly);
    let fetcher = series_fetcher(Some("https://cdn.comics.test/sonic/01/p2.png"));

    let summary = compile_series(&config, &fetcher).await.expect("run completes");

    assert!(summary.succeeded());
    assert_eq!(summary.files_created, 1);
    let issue_dir = out.path().join("Sonic-the-Hedgehog").join("issue-01");
    assert_eq!(
        dir_names(&issue_dir),
        vec!["Sonic-the-Hedgehog-01.pdf", "images"]
    );
    assert_eq!(
        dir_names(&issue_dir.join("images")),
        vec!["0001.png", "0003.png"]
    );
}

#[tokio::test]
async fn run_without_images_creates_nothing() {
    let out = tempdir().unwrap();
    let mut config = quick_config(out.path().to_path_buf(), 2, OutputFormat::Both);
    config.seed_url = "https://comics.test/sonic-idw/sonic-the-hedgehog-02/".to_string();
    let fetcher = series_fetcher(None);

    let summary = compile_series(&config, &fetcher).await.expect("run completes");

    assert!(!summary.succeeded());
    assert_eq!(summary.files_created, 0);
    assert_eq!(summary.series_title, "Unknown Comic");
    assert_eq!(summary.output_root, out.path());
    assert!(dir_names(out.path()).is_empty());
}

#[tokio::test]
async fn seed_without_number_aborts_before_any_request() {
    let out = tempdir().unwrap();
    let mut config = quick_config(out.path().to_path_buf(), 3, OutputFormat::Both);
    config.seed_url = "https://comics.test/sonic-idw/latest/".to_string();
    // No expectations: any fetch would panic.
    let fetcher = MockFetcher::new();

    let err = compile_series(&config, &fetcher).await.unwrap_err();

    assert!(matches!(
        err,
        CompileError::Sequence(SequenceError::PatternNotFound { .. })
    ));
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let out = tempdir().unwrap();
    let mut config = quick_config(out.path().to_path_buf(), 3, OutputFormat::Both);
    config.dpi = 1200;
    let fetcher = MockFetcher::new();

    assert!(matches!(
        compile_series(&config, &fetcher).await,
        Err(CompileError::Validation(_))
    ));
}

#[tokio::test]
async fn series_title_comes_from_first_issue_with_downloads() {
    let out = tempdir().unwrap();
    let config = quick_config(out.path().to_path_buf(), 2, OutputFormat::PdfOnly);
    let image = png();
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().returning(move |url| match url {
        "https://comics.test/sonic-idw/sonic-the-hedgehog-01/" => Ok(br#"<html>
            <head><title>Wrong Series #01</title></head>
            <body><div class="reading-content">
              <img src="https://cdn.comics.test/gone/01/p1.png">
            </div></body></html>"#
            .to_vec()),
        "https://comics.test/sonic-idw/sonic-the-hedgehog-02/" => Ok(br#"<html>
            <head><title>Sonic the Hedgehog #02</title></head>
            <body><div class="reading-content">
              <img src="https://cdn.comics.test/sonic/02/p1.png">
            </div></body></html>"#
            .to_vec()),
        u if u.starts_with("https://cdn.comics.test/sonic/") => Ok(image.clone()),
        other => Err(NetworkError::Status {
            url: other.to_string(),
            status: 404,
        }),
    });

    let summary = compile_series(&config, &fetcher).await.expect("run completes");

    assert_eq!(summary.series_title, "Sonic the Hedgehog");
    assert_eq!(summary.output_root, out.path().join("Sonic-the-Hedgehog"));
    assert_eq!(summary.completed, vec![2]);
    assert_eq!(
        summary.skipped,
        vec![SkippedIssue {
            issue_number: 1,
            reason: SkipReason::NoImagesDownloaded { attempted: 1 },
        }]
    );
    assert!(out
        .path()
        .join("Sonic-the-Hedgehog")
        .join("issue-02")
        .join("Sonic-the-Hedgehog-02.pdf")
        .exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_run_leaves_no_partial_document() {
    let out = tempdir().unwrap();
    let config = quick_config(out.path().to_path_buf(), 1, OutputFormat::Both);
    let mut large = Vec::new();
    image::DynamicImage::new_rgb8(3000, 4500)
        .write_to(&mut Cursor::new(&mut large), image::ImageFormat::Png)
        .unwrap();
    let mut fetcher = MockFetcher::new();
    fetcher.expect_fetch().returning(move |url| match url {
        "https://comics.test/sonic-idw/sonic-the-hedgehog-01/" => Ok(br#"<html>
            <head><title>Sonic the Hedgehog #01</title></head>
            <body><div class="reading-content">
              <img src="https://cdn.comics.test/sonic/01/p1.png">
              <img src="https://cdn.comics.test/sonic/01/p2.png">
            </div></body></html>"#
            .to_vec()),
        _ => Ok(large.clone()),
    });

    let cancelled = tokio::time::timeout(
        Duration::from_millis(50),
        compile_series(&config, &fetcher),
    )
    .await;
    assert!(cancelled.is_err(), "run should still be assembling");

    // Whatever is at the final paths right after cancelling is complete.
    let issue_dir = out.path().join("Sonic-the-Hedgehog").join("issue-01");
    let pdf_path = issue_dir.join("Sonic-the-Hedgehog-01.pdf");
    if let Ok(pdf) = std::fs::read(&pdf_path) {
        assert!(pdf.starts_with(b"%PDF"));
        let tail = &pdf[pdf.len().saturating_sub(32)..];
        assert!(tail.windows(5).any(|w| w == b"%%EOF"), "truncated PDF");
    }
    let epub_path = issue_dir.join("Sonic-the-Hedgehog-01.epub");
    if let Ok(file) = std::fs::File::open(&epub_path) {
        zip::ZipArchive::new(file).expect("complete EPUB archive");
    }
}
