//! Error types for the fetch-enrich pipeline.
//!
//! Only [`ConfigError`] is fatal, and only at startup. Everything raised
//! while a cycle runs is contained: [`FetchError`] empties one adapter's
//! batch, [`ExtractionError`] empties one item's keyword list, and
//! [`SinkError`] is logged by the orchestrator.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A failed `fetch()`, tagged with the adapter that produced it.
#[derive(Error, Debug)]
#[error("fetch from `{adapter}` failed: {cause}")]
pub struct FetchError {
    /// `source_name()` of the failing adapter.
    pub adapter: String,
    #[source]
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(adapter: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            adapter: adapter.into(),
            cause,
        }
    }

    /// Whether the adapter was cut off by the per-adapter timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, FetchCause::Timeout(_))
    }
}

/// Why a fetch failed.
#[derive(Error, Debug)]
pub enum FetchCause {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The adapter task panicked or was aborted.
    #[error("task aborted: {0}")]
    Aborted(String),
}

/// Keyword extraction could not run for one document.
///
/// Never escapes the extractor; it is logged and the document gets no keywords.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no usable tokens in content of {url}")]
    EmptyContent { url: String },
}

/// Missing or invalid configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A sink could not take a batch.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl SinkError {
    /// Transient failures worth retrying: connection problems, timeouts,
    /// 5xx and 429.
    pub fn is_retryable(&self) -> bool {
        match self {
            SinkError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            SinkError::Status { status, .. } => *status >= 500 || *status == 429,
            SinkError::Io(_) | SinkError::Json(_) => false,
        }
    }
}
