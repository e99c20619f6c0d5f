/// `load_config` module: loads the optional YAML tuning file into a [`DownloadConfig`].
///
/// This is the only place where user-supplied YAML is parsed. The file has a
/// single `download:` section; any key left out keeps its default, unknown keys
/// are rejected so typos do not silently fall back to defaults.
///
/// ```yaml
/// download:
///   max_retries: 5
///   timeout_secs: 60
///   image_delay_ms: 250
///   issue_delay_ms: 2000
/// ```
///
/// # Errors
/// All errors use `anyhow::Error` and name the offending file; they surface at
/// the CLI boundary.
use anyhow::Result;
use comic_compiler_core::config::DownloadConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub download: DownloadConfig,
}

impl CliConfig {
    pub fn trace_loaded(&self) {
        info!(
            max_retries = self.download.max_retries,
            timeout_secs = self.download.timeout_secs,
            image_delay_ms = self.download.image_delay_ms,
            issue_delay_ms = self.download.issue_delay_ms,
            "Loaded CliConfig"
        );
    }
}

/// Loads and parses a YAML tuning file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!(
                "Failed to parse config YAML {:?}: {e}",
                path_ref
            ));
        }
    };
    if config.download.max_retries == 0 {
        error!(config_path = ?path_ref, "max_retries must be at least 1");
        return Err(anyhow::anyhow!(
            "Invalid config {:?}: download.max_retries must be at least 1",
            path_ref
        ));
    }

    config.trace_loaded();
    Ok(config)
}
