//! Write scraped MTP and pool figures back to the store.
//!
//! Failures are logged and reported as outcomes; nothing here aborts a race
//! or its sibling runners.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::normalize::normalize_runner_row;
use crate::storage::RaceStore;
use crate::types::RunnerPoolRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateOutcome {
    Updated,
    /// Nothing to write, or no single record to write it to
    Skipped,
    Failed,
}

/// Runner update counts for one race
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunnerTally {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunnerTally {
    pub fn record(&mut self, outcome: UpdateOutcome) {
        match outcome {
            UpdateOutcome::Updated => self.updated += 1,
            UpdateOutcome::Skipped => self.skipped += 1,
            UpdateOutcome::Failed => self.failed += 1,
        }
    }
}

pub struct PersistenceUpdater<'a> {
    store: &'a dyn RaceStore,
}

impl<'a> PersistenceUpdater<'a> {
    pub fn new(store: &'a dyn RaceStore) -> Self {
        Self { store }
    }

    pub async fn update_race_time_to_post(
        &self,
        race_id: &str,
        minutes: Option<u32>,
    ) -> UpdateOutcome {
        let Some(minutes) = minutes else {
            return UpdateOutcome::Skipped;
        };

        match self.store.update_minutes_to_post(race_id, minutes).await {
            Ok(()) => {
                info!(race_id, mtp = minutes, "updated minutes to post");
                UpdateOutcome::Updated
            }
            Err(e) => {
                warn!(race_id, error = %e, "failed to update minutes to post");
                UpdateOutcome::Failed
            }
        }
    }

    /// Write the normalized fields of one pools row to its runner record.
    ///
    /// Fields that did not normalize are left out so stored values survive.
    pub async fn update_runner_pools(&self, race_id: &str, row: &RunnerPoolRow) -> UpdateOutcome {
        let post_position = row.post_position;

        let runners = match self.store.find_runners(race_id, post_position).await {
            Ok(runners) => runners,
            Err(e) => {
                warn!(race_id, post_position, error = %e, "runner lookup failed");
                return UpdateOutcome::Failed;
            }
        };

        let runner = match runners.as_slice() {
            [runner] => runner,
            [] => {
                info!(race_id, post_position, "no runner record for post position");
                return UpdateOutcome::Skipped;
            }
            _ => {
                warn!(
                    race_id,
                    post_position,
                    candidates = runners.len(),
                    "ambiguous runner records for post position"
                );
                return UpdateOutcome::Skipped;
            }
        };

        let update = normalize_runner_row(row);
        if update.is_empty() {
            debug!(race_id, post_position, "no parsable pool fields");
            return UpdateOutcome::Skipped;
        }

        match self.store.update_runner(&runner.runner_id, &update).await {
            Ok(()) => {
                debug!(
                    race_id,
                    post_position,
                    runner_id = %runner.runner_id,
                    horse = ?runner.horse_name,
                    odds = ?update.decimal_odds,
                    win = ?update.win,
                    "updated runner pools"
                );
                UpdateOutcome::Updated
            }
            Err(e) => {
                warn!(race_id, post_position, runner_id = %runner.runner_id, error = %e, "runner update failed");
                UpdateOutcome::Failed
            }
        }
    }

    /// Apply every row, continuing past individual failures
    pub async fn update_all_runners(&self, race_id: &str, rows: &[RunnerPoolRow]) -> RunnerTally {
        let mut tally = RunnerTally::default();
        for row in rows {
            tally.record(self.update_runner_pools(race_id, row).await);
        }
        tally
    }
}
