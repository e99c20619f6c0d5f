//! Error taxonomy for the compile pipeline.
//!
//! Only [`ValidationError`], [`SequenceError`] and the I/O failure to create the
//! output root abort a run (see [`CompileError`]). Everything else is scoped to a
//! single image, document or issue and is logged and absorbed by the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Bad user input, detected before any work starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("seed URL must start with http:// or https://, got {0:?}")]
    InvalidSeedUrl(String),
    #[error("end number must be a positive integer, got {0}")]
    NonPositiveEnd(i64),
    #[error("DPI must be between {min} and {max}, got {value}")]
    DpiOutOfRange { value: i64, min: u32, max: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    /// The seed URL does not end in a run of digits.
    #[error("could not find an issue number pattern in URL {url}")]
    PatternNotFound { url: String },
}

/// A single HTTP request failed.
///
/// `Connect`, `Timeout` and `Transfer` are transient and worth retrying; the
/// remaining variants are terminal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("transfer from {url} was interrupted: {message}")]
    Transfer { url: String, message: String },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
    #[error("request to {url} could not be sent: {message}")]
    Request { url: String, message: String },
}

impl NetworkError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::Connect { .. } | NetworkError::Timeout { .. } | NetworkError::Transfer { .. }
        )
    }

    pub fn url(&self) -> &str {
        match self {
            NetworkError::Connect { url, .. }
            | NetworkError::Timeout { url }
            | NetworkError::Transfer { url, .. }
            | NetworkError::Status { url, .. }
            | NetworkError::Malformed { url, .. }
            | NetworkError::Request { url, .. } => url,
        }
    }

    /// Classify a `reqwest` failure.
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        let url = url.to_string();
        let message = err.to_string();
        if err.is_timeout() {
            NetworkError::Timeout { url }
        } else if err.is_connect() {
            NetworkError::Connect { url, message }
        } else if err.is_body() {
            NetworkError::Transfer { url, message }
        } else if let Some(status) = err.status() {
            NetworkError::Status {
                url,
                status: status.as_u16(),
            }
        } else if err.is_decode() || err.is_redirect() {
            NetworkError::Malformed { url, message }
        } else {
            NetworkError::Request { url, message }
        }
    }
}

/// The page of an issue could not be fetched.
#[derive(Debug, Error)]
#[error("failed to fetch issue page {url}: {source}")]
pub struct FetchError {
    pub url: String,
    #[source]
    pub source: NetworkError,
}

/// Outcome of a download that did not produce a file.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: NetworkError,
    },
    #[error("download of {url} failed on attempt {attempt}: {source}")]
    Terminal {
        url: String,
        attempt: u32,
        #[source]
        source: NetworkError,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An image could not be read or measured.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("could not read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode image: {0}")]
    Image(String),
}

/// A document could not be built.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no images to assemble")]
    NoImages,
    #[error("none of the {attempted} images could be rendered")]
    NoRenderablePages { attempted: usize },
    #[error("page for {path} would be {width_points:.1}x{height_points:.1}pt, outside PDF page limits")]
    PageSize {
        path: PathBuf,
        width_points: f64,
        height_points: f64,
    },
    #[error("EPUB writer failed: {0}")]
    Epub(String),
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that abort a whole compile run.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("could not create output directory {path}: {source}")]
    OutputRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_failures_are_retryable() {
        let url = "https://example.com/a.jpg".to_string();
        assert!(NetworkError::Timeout { url: url.clone() }.is_retryable());
        assert!(NetworkError::Connect {
            url: url.clone(),
            message: "refused".into()
        }
        .is_retryable());
        assert!(NetworkError::Transfer {
            url: url.clone(),
            message: "eof".into()
        }
        .is_retryable());
        assert!(!NetworkError::Status {
            url: url.clone(),
            status: 404
        }
        .is_retryable());
        assert!(!NetworkError::Malformed {
            url,
            message: "bad".into()
        }
        .is_retryable());
    }

    #[test]
    fn messages_carry_the_url() {
        let err = NetworkError::Status {
            url: "https://example.com/x.png".into(),
            status: 403,
        };
        assert_eq!(err.url(), "https://example.com/x.png");
        assert!(err.to_string().contains("HTTP 403"));
    }
}
