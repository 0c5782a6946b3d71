//! HTML parsers for the listing and race detail pages.

pub mod listing;
pub mod pools;

pub use listing::ListingParser;
pub use pools::PoolsParser;

use scraper::{ElementRef, Selector};

/// Trimmed text of the first element matching `selector` under `scope`
pub(crate) fn first_text(scope: &ElementRef, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
}
