//! Today's-races listing parser.
//!
//! Turns a rendered listing snapshot into race descriptors, in row order.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::first_text;
use crate::normalize::{clean_track_name, parse_race_number};
use crate::scraper::RACE_ROW_SELECTOR;
use crate::types::{RaceDescriptor, RowRef};

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse(RACE_ROW_SELECTOR).unwrap());
static TRACK_NAME_WITH_ID: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".track-name[id*='track-name']").unwrap());
static TRACK_NAME_IN_RACE_INFO: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".track-race-info .track-name").unwrap());
static ANY_TRACK_NAME: Lazy<Selector> = Lazy::new(|| Selector::parse(".track-name").unwrap());
static RACE_NUMBER: Lazy<Selector> = Lazy::new(|| Selector::parse(".race-number span").unwrap());

type TrackNameStrategy = fn(&ElementRef) -> Option<String>;

/// Track-name lookups in priority order; the first non-empty result wins
const TRACK_NAME_STRATEGIES: [TrackNameStrategy; 3] =
    [track_name_with_id, track_name_in_race_info, any_track_name];

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.is_empty())
}

fn track_name_with_id(row: &ElementRef) -> Option<String> {
    non_empty(first_text(row, &TRACK_NAME_WITH_ID))
}

fn track_name_in_race_info(row: &ElementRef) -> Option<String> {
    non_empty(first_text(row, &TRACK_NAME_IN_RACE_INFO))
}

fn any_track_name(row: &ElementRef) -> Option<String> {
    non_empty(first_text(row, &ANY_TRACK_NAME))
}

/// Parser for the listing page
pub struct ListingParser;

impl ListingParser {
    /// Parse all race rows. Rows without a usable track name or race number
    /// are dropped; duplicates are kept.
    pub fn parse(html: &str) -> Vec<RaceDescriptor> {
        let document = Html::parse_document(html);

        document
            .select(&ROW)
            .enumerate()
            .filter_map(|(index, row)| Self::parse_row(&row, index))
            .collect()
    }

    fn parse_row(row: &ElementRef, index: usize) -> Option<RaceDescriptor> {
        let raw = TRACK_NAME_STRATEGIES
            .iter()
            .find_map(|strategy| strategy(row));
        let clean = clean_track_name(raw.as_deref().unwrap_or_default());

        let race_number = first_text(row, &RACE_NUMBER)
            .as_deref()
            .and_then(parse_race_number)
            .filter(|n| *n > 0);

        let Some(race_number) = race_number.filter(|_| !clean.is_empty()) else {
            debug!(index, raw = ?raw, "dropping listing row without track name or race number");
            return None;
        };

        let element_ref = match row.value().attr("id").map(str::trim) {
            Some(id) if !id.is_empty() => RowRef::Id(id.to_string()),
            _ => RowRef::Ordinal(index),
        };

        Some(RaceDescriptor {
            track_name_raw: raw.unwrap_or_default(),
            track_name_clean: clean,
            race_number,
            element_ref,
            ordinal_index: index,
        })
    }
}
