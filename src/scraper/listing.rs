//! Listing page loading and readiness checks.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::driver::PageDriver;
use super::parsers::ListingParser;
use super::{BLOCKED_MARKERS, LISTING_READY_SELECTORS};
use crate::config::ScrapeConfig;
use crate::error::RunError;
use crate::retry::{retry, RetryConfig};
use crate::types::RaceDescriptor;

/// Wait budget for each fallback readiness selector after the primary one
const FALLBACK_PROBE: Duration = Duration::from_secs(1);

/// Loads the listing page and extracts race descriptors from it
pub struct ListingScraper<'a> {
    listing_url: &'a str,
    config: &'a ScrapeConfig,
    retry: RetryConfig,
}

impl<'a> ListingScraper<'a> {
    pub fn new(listing_url: &'a str, config: &'a ScrapeConfig) -> Self {
        Self {
            listing_url,
            config,
            retry: RetryConfig::browser(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Load the listing on `page` and return its descriptors in row order.
    ///
    /// Any failure here is fatal for the run.
    pub async fn scrape(&self, page: &dyn PageDriver) -> Result<Vec<RaceDescriptor>, RunError> {
        info!(url = %self.listing_url, "loading listing page");

        retry(&self.retry, "listing navigation", || {
            page.goto(self.listing_url, self.config.navigation_timeout())
        })
        .await
        .map_err(|e| RunError::ListingUnavailable(e.to_string()))?;

        self.check_not_blocked(page).await?;
        let ready = self.wait_until_ready(page).await?;

        let html = page.content().await?;
        let descriptors = ListingParser::parse(&html);

        if descriptors.is_empty() {
            warn!(ready_selector = ready, "listing rendered but no races were extracted");
        } else {
            info!("found {} races on listing", descriptors.len());
        }
        for descriptor in &descriptors {
            debug!(track = %descriptor.track_name_clean, race = descriptor.race_number, row = %descriptor.element_ref, "listing race");
        }

        Ok(descriptors)
    }

    async fn check_not_blocked(&self, page: &dyn PageDriver) -> Result<(), RunError> {
        let title = page.title().await.unwrap_or_default();
        let body = page.content().await?;

        if BLOCKED_MARKERS
            .iter()
            .any(|marker| title.contains(marker) || body.contains(marker))
        {
            return Err(RunError::Blocked { title });
        }
        Ok(())
    }

    /// First readiness selector present on the page
    async fn wait_until_ready(&self, page: &dyn PageDriver) -> Result<&'static str, RunError> {
        for (i, selector) in LISTING_READY_SELECTORS.into_iter().enumerate() {
            let limit = if i == 0 {
                self.config.element_timeout()
            } else {
                FALLBACK_PROBE
            };
            match page.wait_for_selector(selector, limit).await {
                Ok(()) => {
                    if i > 0 {
                        warn!(selector, "primary race row selector missing, listing matched a fallback");
                    } else {
                        debug!(selector, "listing ready");
                    }
                    return Ok(selector);
                }
                Err(e) => debug!(selector, error = %e, "readiness selector not present"),
            }
        }

        Err(RunError::ListingUnavailable(
            "no race rows rendered on listing page".to_string(),
        ))
    }
}
