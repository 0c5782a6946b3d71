//! Reconcile scraped listing races with the persisted schedule.
//!
//! Exact lookup on (track, race number, date) first, then a fuzzy lookup on
//! the first word of the track name. The fuzzy pass takes the first hit with
//! no further disambiguation, so its results are always reported as fuzzy.

use tracing::{debug, info, warn};

use crate::storage::RaceStore;
use crate::types::{MatchKind, MatchOutcome, MatchResult, PersistedRace, RaceDescriptor};

pub struct RaceMatcher<'a> {
    store: &'a dyn RaceStore,
    race_date: &'a str,
}

impl<'a> RaceMatcher<'a> {
    pub fn new(store: &'a dyn RaceStore, race_date: &'a str) -> Self {
        Self { store, race_date }
    }

    /// One result per descriptor, in input order
    pub async fn match_all(&self, descriptors: Vec<RaceDescriptor>) -> Vec<MatchResult> {
        let mut results = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            results.push(self.match_one(descriptor).await);
        }

        let count = |kind| results.iter().filter(|r| r.kind() == Some(kind)).count();
        info!(
            exact = count(MatchKind::Exact),
            fuzzy = count(MatchKind::Fuzzy),
            total = results.len(),
            "matched listing against schedule"
        );
        results
    }

    pub async fn match_one(&self, descriptor: RaceDescriptor) -> MatchResult {
        let outcome = match self.find(&descriptor).await {
            Some((race, kind)) => {
                info!(
                    track = %descriptor.track_name_clean,
                    race = descriptor.race_number,
                    race_id = %race.race_id,
                    purse = ?race.purse,
                    kind = ?kind,
                    "matched race"
                );
                MatchOutcome::Matched { race, kind }
            }
            None => {
                info!(
                    track = %descriptor.track_name_clean,
                    race = descriptor.race_number,
                    "no stored race for listing entry"
                );
                MatchOutcome::Unmatched
            }
        };

        MatchResult {
            descriptor,
            outcome,
        }
    }

    /// A failed exact lookup ends the search; the fuzzy pass only runs on a clean miss.
    async fn find(&self, descriptor: &RaceDescriptor) -> Option<(PersistedRace, MatchKind)> {
        let exact = self
            .store
            .find_race_exact(
                &descriptor.track_name_clean,
                descriptor.race_number,
                self.race_date,
            )
            .await;

        match exact {
            Ok(Some(race)) => Some((race, MatchKind::Exact)),
            Ok(None) => self
                .find_fuzzy(descriptor)
                .await
                .map(|race| (race, MatchKind::Fuzzy)),
            Err(e) => {
                warn!(race = %descriptor, error = %e, "exact race lookup failed");
                None
            }
        }
    }

    async fn find_fuzzy(&self, descriptor: &RaceDescriptor) -> Option<PersistedRace> {
        let token = descriptor.track_name_clean.split_whitespace().next()?;

        let candidates = match self
            .store
            .find_races_fuzzy(token, descriptor.race_number, self.race_date)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(race = %descriptor, error = %e, "fuzzy race lookup failed");
                return None;
            }
        };

        if candidates.len() > 1 {
            let tracks: Vec<&str> = candidates.iter().map(|r| r.track_name.as_str()).collect();
            warn!(
                race = %descriptor,
                token,
                candidates = ?tracks,
                "ambiguous fuzzy match, taking the first candidate"
            );
        } else {
            debug!(race = %descriptor, token, hits = candidates.len(), "fuzzy lookup");
        }

        candidates.into_iter().next()
    }
}
