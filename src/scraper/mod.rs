//! Web scraper module for the wagering site
//!
//! Provides browser automation, HTML parsing, listing extraction and
//! per-race detail scraping.

pub mod browser;
pub mod detail;
pub mod driver;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod listing;
pub mod parsers;

pub use browser::Browser;
pub use detail::DetailScraper;
pub use driver::BrowserDriver;
pub use listing::ListingScraper;

/// Default today's-races listing page
pub const LISTING_URL: &str = "https://www.twinspires.com/bet/todays-races/time";

/// One race row on the listing page
pub const RACE_ROW_SELECTOR: &str = ".track.track-list--row";

/// Looser selectors that still indicate a rendered listing, in priority order
pub const LISTING_READY_SELECTORS: [&str; 5] = [
    RACE_ROW_SELECTOR,
    ".track-list--row",
    ".track",
    "[data-testid*=\"race\"]",
    "[class*=\"track\"]",
];

/// Minutes-to-post badge on the race detail view
pub const MTP_BADGE_SELECTOR: &str = ".mtp-badge";

/// Pools tab trigger on the race detail view
pub const POOLS_TAB_SELECTOR: &str = "#pools";

/// Pools table, present once the pools tab has rendered
pub const POOLS_TABLE_SELECTOR: &str = ".pools-basic";

/// Page text that marks a blocked or captcha interstitial
pub const BLOCKED_MARKERS: [&str; 2] = ["Access Denied", "captcha"];
