//! Domain types shared across the pipeline stages.

use serde::{Deserialize, Deserializer, Serialize};

/// How a listing row is re-located on a freshly loaded listing page.
///
/// Only a value, never a live element handle: it is resolved again after every
/// navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RowRef {
    /// DOM `id` attribute of the row
    Id(String),
    /// Position in the race-row collection (rows without an id)
    Ordinal(usize),
}

impl RowRef {
    /// Attribute selector for id references. Ordinal references have none.
    pub fn id_selector(&self) -> Option<String> {
        match self {
            RowRef::Id(id) => Some(format!("[id=\"{}\"]", id.replace('"', "\\\""))),
            RowRef::Ordinal(_) => None,
        }
    }
}

impl std::fmt::Display for RowRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowRef::Id(id) => write!(f, "#{}", id),
            RowRef::Ordinal(i) => write!(f, "row[{}]", i),
        }
    }
}

/// One race row scraped from the listing page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceDescriptor {
    pub track_name_raw: String,
    pub track_name_clean: String,
    pub race_number: u32,
    pub element_ref: RowRef,
    pub ordinal_index: usize,
}

impl std::fmt::Display for RaceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - Race {}", self.track_name_clean, self.race_number)
    }
}

/// Schedule record owned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRace {
    #[serde(deserialize_with = "id_from_any")]
    pub race_id: String,
    pub track_name: String,
    pub race_number: u32,
    pub race_date: String,
    #[serde(default, deserialize_with = "opt_text_from_any")]
    pub purse: Option<String>,
}

/// Runner record as returned by a `(race_id, post_position)` lookup
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunnerRecord {
    #[serde(deserialize_with = "id_from_any")]
    pub runner_id: String,
    #[serde(default)]
    pub horse_name: Option<String>,
    pub post_position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched { race: PersistedRace, kind: MatchKind },
    Unmatched,
}

/// Exactly one per descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub descriptor: RaceDescriptor,
    pub outcome: MatchOutcome,
}

impl MatchResult {
    pub fn kind(&self) -> Option<MatchKind> {
        match &self.outcome {
            MatchOutcome::Matched { kind, .. } => Some(*kind),
            MatchOutcome::Unmatched => None,
        }
    }
}

/// Raw pool totals from the pools header
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolTotals {
    pub win: Option<String>,
    pub place: Option<String>,
    pub show: Option<String>,
}

/// One runner row of the pools table, text as rendered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerPoolRow {
    pub post_position: u32,
    pub odds_raw: Option<String>,
    pub win_amount_raw: Option<String>,
    pub place_amount_raw: Option<String>,
    pub show_amount_raw: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolSnapshot {
    pub totals: PoolTotals,
    pub runners: Vec<RunnerPoolRow>,
}

/// Partial runner update. `None` fields are left untouched in the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedRunnerUpdate {
    #[serde(skip)]
    pub post_position: u32,
    #[serde(rename = "pool_odds", skip_serializing_if = "Option::is_none")]
    pub decimal_odds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show: Option<f64>,
}

impl NormalizedRunnerUpdate {
    pub fn is_empty(&self) -> bool {
        self.decimal_odds.is_none()
            && self.win.is_none()
            && self.place.is_none()
            && self.show.is_none()
    }
}

/// Store ids may be text or integer columns
fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn opt_text_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}
