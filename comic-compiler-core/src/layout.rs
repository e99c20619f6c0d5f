//! Names of everything a run writes under the output directory.
//!
//! ```text
//! <output>/<safe_title>/issue-<NN>/images/<seq><ext>
//! <output>/<safe_title>/issue-<NN>/<safe_title>-<NN>.pdf
//! <output>/<safe_title>/issue-<NN>/<safe_title>-<NN>.epub
//! ```

use std::path::{Path, PathBuf};

use regex::Regex;
use reqwest::Url;

const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";
const UNTITLED: &str = "untitled";

fn regex(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "Invalid regex");
            None
        }
    }
}

/// Series title taken from an issue title: the trailing issue number (and
/// anything after it) is removed. Falls back to the full title when nothing
/// would remain.
pub fn series_title_from(issue_title: &str) -> String {
    let stripped = regex(r"#?\d+.*$")
        .map(|re| re.replace(issue_title, "").trim().to_string())
        .unwrap_or_default();
    if stripped.is_empty() {
        issue_title.to_string()
    } else {
        stripped
    }
}

/// Directory-safe form of a title: only word characters, spaces and hyphens
/// survive, and runs of spaces or hyphens become a single `-`.
pub fn safe_title(title: &str) -> String {
    let (Some(strip), Some(collapse)) = (regex(r"[^\w\s-]"), regex(r"[-\s]+")) else {
        return UNTITLED.to_string();
    };
    let kept = strip.replace_all(title, "");
    let safe = collapse.replace_all(kept.trim(), "-").into_owned();
    if safe.is_empty() || safe == "-" {
        UNTITLED.to_string()
    } else {
        safe
    }
}

/// Paths of one issue's outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLayout {
    pub issue_dir: PathBuf,
    pub images_dir: PathBuf,
    pub pdf_path: PathBuf,
    pub epub_path: PathBuf,
}

impl IssueLayout {
    pub fn new(series_dir: &Path, safe_title: &str, issue_number: u32) -> Self {
        let issue_dir = series_dir.join(format!("issue-{issue_number:02}"));
        Self {
            images_dir: issue_dir.join("images"),
            pdf_path: issue_dir.join(format!("{safe_title}-{issue_number:02}.pdf")),
            epub_path: issue_dir.join(format!("{safe_title}-{issue_number:02}.epub")),
            issue_dir,
        }
    }
}

/// Document title of one issue, e.g. `Sonic the Hedgehog #03`.
pub fn issue_title(series_title: &str, issue_number: u32) -> String {
    format!("{series_title} #{issue_number:02}")
}

/// Local file name of the image at 1-based `sequence_index`.
///
/// The extension is taken from the URL path (query and fragment ignored),
/// `.jpg` when the path has none.
pub fn image_file_name(sequence_index: usize, image_url: &str) -> String {
    let ext = Url::parse(image_url)
        .ok()
        .and_then(|url| {
            let last = url.path_segments()?.last()?.to_string();
            let dot = last.rfind('.').filter(|&i| i > 0 && i + 1 < last.len())?;
            Some(last[dot..].to_string())
        })
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string());
    format!("{sequence_index:04}{ext}")
}
