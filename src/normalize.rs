//! Text normalization for scraped listing and pools text.
//!
//! Every function is pure and returns `None` (or an empty string) instead of
//! an error: unparsable page text is expected noise, not a failure.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{NormalizedRunnerUpdate, RunnerPoolRow};

/// Leading artifact the listing prepends to some track names
const VENDOR_PREFIX: &str = "ExpertE";

/// Texts meaning scratched / not running
const NON_RUNNER_MARKERS: [&str; 2] = ["SCR", "NR"];

static RACE_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Race\s+\d+").unwrap());

static RACE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bRace\s+(\d+)\b").unwrap());

/// Trailing qualifier fragments, applied in order.
/// Currency blocks go first so "Purse:" and age fragments are seen at the end.
static TRAILING_NOISE: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"\$[\d,]+(?:\.\d+)?[kKmM]?(?:\s+.*)?$").unwrap(),
        Regex::new(r"Purse:.*$").unwrap(),
        Regex::new(r"\d+yo.*$").unwrap(),
    ]
});

/// Clean a raw listing track-name string down to the bare track name.
///
/// Returns an empty string when nothing usable remains.
pub fn clean_track_name(raw: &str) -> String {
    let mut name = raw.trim();
    name = name.strip_prefix(VENDOR_PREFIX).unwrap_or(name).trim();

    if let Some(m) = RACE_MARKER_RE.find(name) {
        name = name[..m.start()].trim();
    }

    let mut name = name.to_string();
    for pattern in TRAILING_NOISE.iter() {
        if pattern.is_match(&name) {
            name = pattern.replace(&name, "").trim().to_string();
        }
    }

    name
}

/// Extract `N` from "Race N"
pub fn parse_race_number(text: &str) -> Option<u32> {
    RACE_NUMBER_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Parse a leading integer the way page badges render it ("5", "12 MTP")
pub fn parse_leading_int(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn is_non_runner(text: &str) -> bool {
    NON_RUNNER_MARKERS.contains(&text)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Convert fractional odds text to decimal odds (ratio + 1, two decimals).
///
/// "1/9" -> 1.11, "15" -> 16.00, "SCR"/"NR"/"" -> None
pub fn odds_to_decimal(text: Option<&str>) -> Option<f64> {
    let text = text?.trim();
    if text.is_empty() || is_non_runner(text) {
        return None;
    }

    let ratio = if let Some((num, den)) = text.split_once('/') {
        let num = parse_finite(num)?;
        let den = parse_finite(den)?;
        if den == 0.0 {
            return None;
        }
        num / den
    } else {
        parse_finite(text)?
    };

    if ratio < 0.0 {
        return None;
    }
    Some(round2(ratio + 1.0))
}

/// Parse a currency amount like "$13,686"
pub fn clean_amount(text: Option<&str>) -> Option<f64> {
    let text = text?.trim();
    if text.is_empty() || is_non_runner(text) {
        return None;
    }

    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    parse_finite(&cleaned).filter(|v| *v >= 0.0)
}

/// Normalize one pools row into a partial runner update
pub fn normalize_runner_row(row: &RunnerPoolRow) -> NormalizedRunnerUpdate {
    NormalizedRunnerUpdate {
        post_position: row.post_position,
        decimal_odds: odds_to_decimal(row.odds_raw.as_deref()),
        win: clean_amount(row.win_amount_raw.as_deref()),
        place: clean_amount(row.place_amount_raw.as_deref()),
        show: clean_amount(row.show_amount_raw.as_deref()),
    }
}
