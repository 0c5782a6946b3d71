//! Storage for the race schedule and runner records
//!
//! The schedule is owned by an external record store. Two backends implement
//! [`RaceStore`]:
//! - `rest`: PostgREST-style HTTP API (production)
//! - `repository`: local SQLite file with the same tables

pub mod repository;
pub mod rest;
pub mod schema;

pub use repository::SqliteRepository;
pub use rest::RestStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{NormalizedRunnerUpdate, PersistedRace, RunnerRecord};

pub type StoreResult<T> = Result<T, StoreError>;

/// Record operations the pipeline needs from the schedule store
#[async_trait]
pub trait RaceStore: Send + Sync {
    /// Race with exactly this track name, number and date
    async fn find_race_exact(
        &self,
        track_name: &str,
        race_number: u32,
        race_date: &str,
    ) -> StoreResult<Option<PersistedRace>>;

    /// Races whose track name contains `token` (case-insensitive), same number and date
    async fn find_races_fuzzy(
        &self,
        token: &str,
        race_number: u32,
        race_date: &str,
    ) -> StoreResult<Vec<PersistedRace>>;

    async fn update_minutes_to_post(&self, race_id: &str, minutes: u32) -> StoreResult<()>;

    async fn find_runners(&self, race_id: &str, post_position: u32)
        -> StoreResult<Vec<RunnerRecord>>;

    /// Write only the fields present in `update`
    async fn update_runner(
        &self,
        runner_id: &str,
        update: &NormalizedRunnerUpdate,
    ) -> StoreResult<()>;
}
