//! Per-race detail scraping: re-navigate to the race, read MTP and pools.

use tokio::time::sleep;
use tracing::{debug, warn};

use super::driver::{BrowseResult, BrowserDriver, PageDriver};
use super::parsers::{ListingParser, PoolsParser};
use super::{MTP_BADGE_SELECTOR, POOLS_TABLE_SELECTOR, POOLS_TAB_SELECTOR, RACE_ROW_SELECTOR};
use crate::config::ScrapeConfig;
use crate::error::BrowseError;
use crate::types::{PoolSnapshot, RaceDescriptor, RowRef};

/// What one detail visit produced.
///
/// A missing MTP badge is not an error. A pools failure only loses the pools.
#[derive(Debug)]
pub struct RaceDetail {
    pub mtp: Option<u32>,
    pub pools: Result<PoolSnapshot, BrowseError>,
}

/// Visits race detail views, one fresh page per race
pub struct DetailScraper<'a> {
    browser: &'a dyn BrowserDriver,
    listing_url: &'a str,
    config: &'a ScrapeConfig,
}

impl<'a> DetailScraper<'a> {
    pub fn new(browser: &'a dyn BrowserDriver, listing_url: &'a str, config: &'a ScrapeConfig) -> Self {
        Self {
            browser,
            listing_url,
            config,
        }
    }

    /// Scrape one race. Fails only when the race page cannot be reached.
    ///
    /// The page is closed whatever the outcome.
    pub async fn scrape(&self, descriptor: &RaceDescriptor) -> BrowseResult<RaceDetail> {
        let page = self.browser.new_page().await?;
        let result = self.scrape_on(page.as_ref(), descriptor).await;

        if let Err(e) = page.close().await {
            debug!(race = %descriptor, error = %e, "failed to close race page");
        }
        result
    }

    async fn scrape_on(
        &self,
        page: &dyn PageDriver,
        descriptor: &RaceDescriptor,
    ) -> BrowseResult<RaceDetail> {
        self.navigate_to_race(page, descriptor).await?;

        let mtp = self.read_mtp(page, descriptor).await;
        let pools = self.read_pools(page).await;

        Ok(RaceDetail { mtp, pools })
    }

    /// Load the listing again and follow the race's row
    async fn navigate_to_race(
        &self,
        page: &dyn PageDriver,
        descriptor: &RaceDescriptor,
    ) -> BrowseResult<()> {
        page.goto(self.listing_url, self.config.navigation_timeout())
            .await?;
        page.wait_for_selector(RACE_ROW_SELECTOR, self.config.element_timeout())
            .await?;

        match &descriptor.element_ref {
            RowRef::Id(_) => {
                let selector = descriptor.element_ref.id_selector().unwrap_or_default();
                page.click(&selector).await?
            }
            RowRef::Ordinal(_) => {
                let index = self.locate_row(page, descriptor).await?;
                page.click_nth(RACE_ROW_SELECTOR, index).await?
            }
        }

        page.wait_for_navigation(self.config.navigation_timeout())
            .await
    }

    /// Position of the race among the rows of the listing now loaded on `page`.
    ///
    /// Rows without an id shift as earlier races go off, so the race is found
    /// again by track and race number. The nearest row to the old position wins.
    async fn locate_row(
        &self,
        page: &dyn PageDriver,
        descriptor: &RaceDescriptor,
    ) -> BrowseResult<usize> {
        let html = page.content().await?;
        let row = ListingParser::parse(&html)
            .into_iter()
            .filter(|row| {
                row.track_name_clean == descriptor.track_name_clean
                    && row.race_number == descriptor.race_number
            })
            .min_by_key(|row| row.ordinal_index.abs_diff(descriptor.ordinal_index));

        let Some(row) = row else {
            return Err(BrowseError::ElementNotFound(format!(
                "{descriptor} is no longer on the listing"
            )));
        };
        if row.ordinal_index != descriptor.ordinal_index {
            debug!(
                race = %descriptor,
                from = descriptor.ordinal_index,
                to = row.ordinal_index,
                "race row moved on listing"
            );
        }
        Ok(row.ordinal_index)
    }

    async fn read_mtp(&self, page: &dyn PageDriver, descriptor: &RaceDescriptor) -> Option<u32> {
        if let Err(e) = page
            .wait_for_selector(MTP_BADGE_SELECTOR, self.config.mtp_timeout())
            .await
        {
            debug!(race = %descriptor, error = %e, "no MTP badge");
            return None;
        }

        match page.content().await {
            Ok(html) => PoolsParser::parse_mtp(&html),
            Err(e) => {
                warn!(race = %descriptor, error = %e, "failed to read MTP");
                None
            }
        }
    }

    async fn read_pools(&self, page: &dyn PageDriver) -> BrowseResult<PoolSnapshot> {
        page.click(POOLS_TAB_SELECTOR).await?;
        page.wait_for_selector(POOLS_TABLE_SELECTOR, self.config.pools_timeout())
            .await?;

        // Amounts populate asynchronously after the table renders
        sleep(self.config.pools_settle()).await;

        let html = page.content().await?;
        Ok(PoolsParser::parse(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::driver::fake::{FakeRace, FakeSite};
    use crate::scraper::fixtures;

    const UNNAMED_LISTING: &str = r#"<div class="track track-list--row">
            <span class="track-name">Del Mar</span>
            <div class="race-number"><span>Race 1</span></div></div>
        <div class="track track-list--row">
            <span class="track-name">Santa Anita</span>
            <div class="race-number"><span>Race 2</span></div></div>"#;

    fn descriptors() -> Vec<RaceDescriptor> {
        ListingParser::parse(fixtures::LISTING_HTML)
    }

    #[tokio::test]
    async fn test_scrape_race() {
        let site = fixtures::site();
        let config = ScrapeConfig::instant();
        let scraper = DetailScraper::new(&site, "https://example.test/races", &config);

        let detail = scraper.scrape(&descriptors()[0]).await.unwrap();

        assert_eq!(detail.mtp, Some(7));
        let pools = detail.pools.unwrap();
        assert_eq!(pools.runners.len(), 2);
        assert_eq!(pools.totals.win.as_deref(), Some("$41,210"));
        assert_eq!(site.visits(), vec!["race-GP-3".to_string()]);
    }

    #[tokio::test]
    async fn test_fresh_page_per_race_and_always_closed() {
        let site = fixtures::site().with_broken_row("race-AQU-5");
        let config = ScrapeConfig::instant();
        let scraper = DetailScraper::new(&site, "https://example.test/races", &config);
        let races = descriptors();

        assert!(scraper.scrape(&races[0]).await.is_ok());
        let stale = scraper.scrape(&races[1]).await;
        assert!(matches!(stale, Err(BrowseError::NavigationTimeout(_))));

        assert_eq!(site.pages_opened(), 2);
        assert_eq!(site.pages_closed(), 2);
    }

    #[tokio::test]
    async fn test_missing_mtp_badge_is_not_an_error() {
        let site = fixtures::site().with_race("race-GP-3", fixtures::race(None));
        let config = ScrapeConfig::instant();
        let scraper = DetailScraper::new(&site, "https://example.test/races", &config);

        let detail = scraper.scrape(&descriptors()[0]).await.unwrap();
        assert_eq!(detail.mtp, None);
        assert!(detail.pools.is_ok());
    }

    #[tokio::test]
    async fn test_pools_failure_keeps_mtp() {
        let site = fixtures::site().with_race(
            "race-GP-3",
            FakeRace {
                detail_html: fixtures::detail_html(Some(4)),
                pools_html: None,
            },
        );
        let config = ScrapeConfig::instant();
        let scraper = DetailScraper::new(&site, "https://example.test/races", &config);

        let detail = scraper.scrape(&descriptors()[0]).await.unwrap();
        assert_eq!(detail.mtp, Some(4));
        assert!(matches!(detail.pools, Err(BrowseError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_ordinal_row_reference() {
        let site = FakeSite::new(UNNAMED_LISTING).with_race("#1", fixtures::race(Some(9)));
        let config = ScrapeConfig::instant();
        let scraper = DetailScraper::new(&site, "https://example.test/races", &config);

        let races = ListingParser::parse(UNNAMED_LISTING);
        assert_eq!(races[1].element_ref, RowRef::Ordinal(1));

        let detail = scraper.scrape(&races[1]).await.unwrap();
        assert_eq!(detail.mtp, Some(9));
        assert_eq!(site.visits(), vec!["#1".to_string()]);
    }

    #[tokio::test]
    async fn test_ordinal_row_followed_after_listing_shift() {
        // Del Mar R1 went off between the listing read and the detail visit
        let shifted = r#"<div class="track track-list--row">
                <span class="track-name">Santa Anita</span>
                <div class="race-number"><span>Race 2</span></div></div>
            <div class="track track-list--row">
                <span class="track-name">Los Alamitos</span>
                <div class="race-number"><span>Race 3</span></div></div>"#;
        let site = FakeSite::new(shifted)
            .with_race("#0", fixtures::race(Some(9)))
            .with_race("#1", fixtures::race(Some(2)));
        let config = ScrapeConfig::instant();
        let scraper = DetailScraper::new(&site, "https://example.test/races", &config);

        let santa_anita = &ListingParser::parse(UNNAMED_LISTING)[1];
        let detail = scraper.scrape(santa_anita).await.unwrap();

        assert_eq!(detail.mtp, Some(9));
        assert_eq!(site.visits(), vec!["#0".to_string()]);
    }

    #[tokio::test]
    async fn test_ordinal_row_gone_is_not_followed() {
        let shifted = r#"<div class="track track-list--row">
                <span class="track-name">Los Alamitos</span>
                <div class="race-number"><span>Race 3</span></div></div>
            <div class="track track-list--row">
                <span class="track-name">Los Alamitos</span>
                <div class="race-number"><span>Race 4</span></div></div>"#;
        let site = FakeSite::new(shifted)
            .with_race("#0", fixtures::race(Some(2)))
            .with_race("#1", fixtures::race(Some(6)));
        let config = ScrapeConfig::instant();
        let scraper = DetailScraper::new(&site, "https://example.test/races", &config);

        let santa_anita = &ListingParser::parse(UNNAMED_LISTING)[1];
        let result = scraper.scrape(santa_anita).await;

        assert!(matches!(result, Err(BrowseError::ElementNotFound(_))));
        assert!(site.visits().is_empty());
        assert_eq!(site.pages_closed(), 1);
    }
}
