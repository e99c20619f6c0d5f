use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ValidationError;

pub const MIN_DPI: u32 = 50;
pub const MAX_DPI: u32 = 600;
pub const DEFAULT_DPI: u32 = 150;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Which documents to build for every issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Both,
    PdfOnly,
    EpubOnly,
}

impl OutputFormat {
    pub fn wants_pdf(self) -> bool {
        matches!(self, OutputFormat::Both | OutputFormat::PdfOnly)
    }

    pub fn wants_epub(self) -> bool {
        matches!(self, OutputFormat::Both | OutputFormat::EpubOnly)
    }
}

/// Network tuning: retries, timeouts and politeness delays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownloadConfig {
    /// Total attempts per image, including the first one.
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Pause after every image download.
    pub image_delay_ms: u64,
    /// Pause after every completed issue.
    pub issue_delay_ms: u64,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout_secs: 30,
            image_delay_ms: 500,
            issue_delay_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn image_delay(&self) -> Duration {
        Duration::from_millis(self.image_delay_ms)
    }

    pub fn issue_delay(&self) -> Duration {
        Duration::from_millis(self.issue_delay_ms)
    }
}

/// Everything one compile run needs.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    pub seed_url: String,
    pub end_number: u32,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub dpi: u32,
    /// Replaced wholesale by the CLI's YAML `download:` section when given.
    pub download: DownloadConfig,
}

impl CompileConfig {
    /// Validate raw user input and build a config with default download tuning.
    pub fn from_args(
        seed_url: &str,
        end_number: i64,
        output_dir: PathBuf,
        format: OutputFormat,
        dpi: i64,
    ) -> Result<Self, ValidationError> {
        if !(seed_url.starts_with("http://") || seed_url.starts_with("https://")) {
            return Err(ValidationError::InvalidSeedUrl(seed_url.to_string()));
        }
        let end_number = match u32::try_from(end_number) {
            Ok(n) if n >= 1 => n,
            _ => return Err(ValidationError::NonPositiveEnd(end_number)),
        };
        let dpi = match u32::try_from(dpi) {
            Ok(d) if (MIN_DPI..=MAX_DPI).contains(&d) => d,
            _ => {
                return Err(ValidationError::DpiOutOfRange {
                    value: dpi,
                    min: MIN_DPI,
                    max: MAX_DPI,
                })
            }
        };
        Ok(Self {
            seed_url: seed_url.to_string(),
            end_number,
            output_dir,
            format,
            dpi,
            download: DownloadConfig::default(),
        })
    }

    /// Re-check a config whose fields were changed after [`CompileConfig::from_args`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        Self::from_args(
            &self.seed_url,
            i64::from(self.end_number),
            self.output_dir.clone(),
            self.format,
            i64::from(self.dpi),
        )
        .map(|_| ())
    }

    pub fn trace_loaded(&self) {
        info!(
            seed_url = %self.seed_url,
            end_number = self.end_number,
            output_dir = %self.output_dir.display(),
            format = ?self.format,
            dpi = self.dpi,
            "Loaded CompileConfig"
        );
        debug!(?self, "CompileConfig loaded (full debug)");
    }
}
