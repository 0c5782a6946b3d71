//! Error types for the browser, store and run boundaries.

use std::time::Duration;
use thiserror::Error;

/// Failures of the browsing capability. Recoverable per step.
#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("timed out after {timeout:?} waiting for `{selector}`")]
    Timeout { selector: String, timeout: Duration },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("timed out after {0:?} waiting for navigation")]
    NavigationTimeout(Duration),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("browser error: {0}")]
    Driver(String),
}

impl From<chromiumoxide::error::CdpError> for BrowseError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        BrowseError::Driver(e.to_string())
    }
}

/// Failures of the persistence service
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store connection lock poisoned")]
    Poisoned,
}

/// Fatal failures that abort the whole run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("listing page unavailable: {0}")]
    ListingUnavailable(String),

    #[error("listing page blocked or behind a captcha (title: {title})")]
    Blocked { title: String },

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Browse(#[from] BrowseError),
}
