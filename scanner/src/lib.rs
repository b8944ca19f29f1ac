//! Live accessibility checks for the test delivery report.
//!
//! When no pre-computed accessibility document exists, the report can scan
//! the manifest's accessibility targets itself. Each target page is fetched
//! once, with a per-request timeout, and checked for the structural problems
//! screen readers trip over (missing language, title, alt text, labels).
//! A page that cannot be fetched is recorded as a failed check for that test
//! id; it never aborts the scan.

pub mod checks;
pub mod fetch;
pub mod scanner;
pub mod source;

use report_model::ReportError;
use std::time::Duration;
use thiserror::Error;

pub use checks::{check_html, PageFindings};
pub use fetch::{HttpFetcher, PageFetcher};
pub use scanner::{AccessibilityRecord, AccessibilityScanner, ScanTarget};
pub use source::{ScanningSource, CACHE_KEY};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Request to {url} timed out after {}s", timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Invalid target URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    /// Report condition recorded for a check that could not complete.
    pub fn to_condition(&self) -> ReportError {
        match self {
            Self::Timeout { url, timeout } => ReportError::ExternalCheckTimeout {
                url: url.clone(),
                timeout_secs: timeout.as_secs(),
            },
            Self::Request { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::InvalidUrl { url, .. } => ReportError::ExternalCheckFailed {
                url: url.clone(),
                reason: self.to_string(),
            },
            Self::InvalidConfig { message } => ReportError::ExternalCheckFailed {
                url: String::new(),
                reason: message.clone(),
            },
        }
    }
}
