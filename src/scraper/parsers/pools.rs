//! Race detail parser: minutes-to-post badge and the win/place/show pools table.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::debug;

use super::first_text;
use crate::normalize::parse_leading_int;
use crate::types::{PoolSnapshot, PoolTotals, RunnerPoolRow};

static MTP_VALUE: Lazy<Selector> = Lazy::new(|| Selector::parse(".mtp-badge .mtp-value").unwrap());
static TOTALS: Lazy<Selector> = Lazy::new(|| Selector::parse(".pools-header-totals").unwrap());
static RUNNER_ROW: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pools-basic .pools-row").unwrap());
static SADDLE_CLOTH: Lazy<Selector> = Lazy::new(|| Selector::parse(".saddle-cloth").unwrap());
static ODDS: Lazy<Selector> = Lazy::new(|| Selector::parse(".pools-odds").unwrap());
static TOTAL_WIN: Lazy<Selector> = Lazy::new(|| Selector::parse(".pools-row__win").unwrap());
static TOTAL_PLACE: Lazy<Selector> = Lazy::new(|| Selector::parse(".pools-row__place").unwrap());
static TOTAL_SHOW: Lazy<Selector> = Lazy::new(|| Selector::parse(".pools-row__show").unwrap());
static WIN_AMOUNT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pools-row__win .amount").unwrap());
static PLACE_AMOUNT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pools-row__place .amount").unwrap());
static SHOW_AMOUNT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pools-row__show .amount").unwrap());

/// Parser for race detail snapshots
pub struct PoolsParser;

impl PoolsParser {
    /// Minutes to post from the MTP badge, if rendered and numeric
    pub fn parse_mtp(html: &str) -> Option<u32> {
        let document = Html::parse_document(html);
        let text = first_text(&document.root_element(), &MTP_VALUE)?;
        let mtp = parse_leading_int(&text);
        if mtp.is_none() {
            debug!(text = %text, "unparsable MTP badge");
        }
        mtp
    }

    /// Pool totals and one row per runner with a parsable post position.
    ///
    /// Post positions are unique within the snapshot: a repeated position keeps
    /// its first row.
    pub fn parse(html: &str) -> PoolSnapshot {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let totals = root
            .select(&TOTALS)
            .next()
            .map(|header| PoolTotals {
                win: first_text(&header, &TOTAL_WIN),
                place: first_text(&header, &TOTAL_PLACE),
                show: first_text(&header, &TOTAL_SHOW),
            })
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let mut runners = Vec::new();

        for row in root.select(&RUNNER_ROW) {
            let Some(post_text) = first_text(&row, &SADDLE_CLOTH) else {
                continue;
            };
            let Some(post_position) = parse_leading_int(&post_text).filter(|p| *p > 0) else {
                debug!(text = %post_text, "skipping pools row without post position");
                continue;
            };
            if !seen.insert(post_position) {
                debug!(post_position, "skipping repeated pools row");
                continue;
            }

            runners.push(RunnerPoolRow {
                post_position,
                odds_raw: first_text(&row, &ODDS),
                win_amount_raw: first_text(&row, &WIN_AMOUNT),
                place_amount_raw: first_text(&row, &PLACE_AMOUNT),
                show_amount_raw: first_text(&row, &SHOW_AMOUNT),
            });
        }

        PoolSnapshot { totals, runners }
    }
}
