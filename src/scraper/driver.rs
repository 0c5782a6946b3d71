//! Browsing capability used by the listing and detail scrapers.
//!
//! Extraction never holds element handles: callers snapshot the rendered DOM
//! with [`PageDriver::content`] and parse it offline.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::BrowseError;

pub type BrowseResult<T> = Result<T, BrowseError>;

/// A browser that can open independent page contexts
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn new_page(&self) -> BrowseResult<Box<dyn PageDriver>>;
}

/// One browsing context
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load a URL, waiting at most `timeout` for the document
    async fn goto(&self, url: &str, timeout: Duration) -> BrowseResult<()>;

    /// Wait until `selector` matches at least one element
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowseResult<()>;

    async fn click(&self, selector: &str) -> BrowseResult<()>;

    /// Click the `index`-th element matching `selector`
    async fn click_nth(&self, selector: &str, index: usize) -> BrowseResult<()>;

    async fn wait_for_navigation(&self, timeout: Duration) -> BrowseResult<()>;

    /// Rendered DOM as HTML
    async fn content(&self) -> BrowseResult<String>;

    async fn title(&self) -> BrowseResult<String>;

    async fn close(&self) -> BrowseResult<()>;
}
