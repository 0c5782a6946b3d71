//! SQLite repository implementing the schedule store locally

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

use super::schema::create_tables;
use super::{RaceStore, StoreResult};
use crate::error::StoreError;
use crate::types::{NormalizedRunnerUpdate, PersistedRace, RunnerRecord};

/// Repository for the local schedule database
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Create a new repository, initializing the database if needed
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(db_path).context("Failed to open database")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        create_tables(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory repository (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> StoreResult<T> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&conn)?)
    }

    fn race_from_row(row: &Row) -> rusqlite::Result<PersistedRace> {
        Ok(PersistedRace {
            race_id: row.get(0)?,
            track_name: row.get(1)?,
            race_number: row.get(2)?,
            race_date: row.get(3)?,
            purse: row.get(4)?,
        })
    }
}

/// Escape LIKE wildcards so the token matches literally
fn like_pattern(token: &str) -> String {
    let escaped = token
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl RaceStore for SqliteRepository {
    async fn find_race_exact(
        &self,
        track_name: &str,
        race_number: u32,
        race_date: &str,
    ) -> StoreResult<Option<PersistedRace>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT race_id, track_name, race_number, race_date, purse
                FROM drf_races
                WHERE track_name = ?1 AND race_number = ?2 AND race_date = ?3
                ORDER BY rowid
                LIMIT 1
                "#,
            )?;
            let mut rows = stmt.query_map(
                params![track_name, race_number, race_date],
                Self::race_from_row,
            )?;
            let race = rows.next().transpose()?;
            Ok(race)
        })
    }

    async fn find_races_fuzzy(
        &self,
        token: &str,
        race_number: u32,
        race_date: &str,
    ) -> StoreResult<Vec<PersistedRace>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT race_id, track_name, race_number, race_date, purse
                FROM drf_races
                WHERE track_name LIKE ?1 ESCAPE '\' AND race_number = ?2 AND race_date = ?3
                ORDER BY rowid
                "#,
            )?;
            let races = stmt
                .query_map(
                    params![like_pattern(token), race_number, race_date],
                    Self::race_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(races)
        })
    }

    async fn update_minutes_to_post(&self, race_id: &str, minutes: u32) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE drf_races SET mtp = ?1 WHERE race_id = ?2",
                params![minutes, race_id],
            )?;
            Ok(())
        })
    }

    async fn find_runners(
        &self,
        race_id: &str,
        post_position: u32,
    ) -> StoreResult<Vec<RunnerRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT runner_id, horse_name, post_position
                FROM drf_runners
                WHERE race_id = ?1 AND post_position = ?2
                "#,
            )?;
            let runners = stmt
                .query_map(params![race_id, post_position], |row| {
                    Ok(RunnerRecord {
                        runner_id: row.get(0)?,
                        horse_name: row.get(1)?,
                        post_position: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(runners)
        })
    }

    async fn update_runner(
        &self,
        runner_id: &str,
        update: &NormalizedRunnerUpdate,
    ) -> StoreResult<()> {
        self.with_conn(|conn| {
            // COALESCE keeps the stored value for fields absent from the update
            conn.execute(
                r#"
                UPDATE drf_runners
                SET pool_odds = COALESCE(?1, pool_odds),
                    win = COALESCE(?2, win),
                    place = COALESCE(?3, place),
                    show = COALESCE(?4, show)
                WHERE runner_id = ?5
                "#,
                params![
                    update.decimal_odds,
                    update.win,
                    update.place,
                    update.show,
                    runner_id,
                ],
            )?;
            Ok(())
        })
    }
}

/// Seeding and inspection helpers for tests
#[cfg(test)]
impl SqliteRepository {
    pub fn insert_race(&self, race: &PersistedRace) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO drf_races
                (race_id, track_name, race_number, race_date, purse)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    race.race_id,
                    race.track_name,
                    race.race_number,
                    race.race_date,
                    race.purse,
                ],
            )
        })?;
        Ok(())
    }

    pub fn insert_runner(&self, runner_id: &str, race_id: &str, post_position: u32) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT OR REPLACE INTO drf_runners (runner_id, race_id, horse_name, post_position)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![runner_id, race_id, format!("Horse {}", post_position), post_position],
            )
        })?;
        Ok(())
    }

    /// (pool_odds, win, place, show) for a runner
    pub fn runner_pools(
        &self,
        runner_id: &str,
    ) -> Result<(Option<f64>, Option<f64>, Option<f64>, Option<f64>)> {
        Ok(self.with_conn(|conn| {
            conn.query_row(
                "SELECT pool_odds, win, place, show FROM drf_runners WHERE runner_id = ?1",
                [runner_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
        })?)
    }

    pub fn race_mtp(&self, race_id: &str) -> Result<Option<u32>> {
        Ok(self.with_conn(|conn| {
            conn.query_row(
                "SELECT mtp FROM drf_races WHERE race_id = ?1",
                [race_id],
                |row| row.get(0),
            )
        })?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn race(race_id: &str, track: &str, number: u32, date: &str) -> PersistedRace {
        PersistedRace {
            race_id: race_id.to_string(),
            track_name: track.to_string(),
            race_number: number,
            race_date: date.to_string(),
            purse: Some("$40,000".to_string()),
        }
    }

    #[tokio::test]
    async fn test_find_race_exact() {
        let repo = SqliteRepository::in_memory().unwrap();
        repo.insert_race(&race("GP-3", "Gulfstream Park", 3, "10/16/2026"))
            .unwrap();

        let found = repo
            .find_race_exact("Gulfstream Park", 3, "10/16/2026")
            .await
            .unwrap();
        assert_eq!(found.unwrap().race_id, "GP-3");

        let other_day = repo
            .find_race_exact("Gulfstream Park", 3, "10/15/2026")
            .await
            .unwrap();
        assert!(other_day.is_none());

        let case_differs = repo
            .find_race_exact("gulfstream park", 3, "10/16/2026")
            .await
            .unwrap();
        assert!(case_differs.is_none());
    }

    #[tokio::test]
    async fn test_find_races_fuzzy() {
        let repo = SqliteRepository::in_memory().unwrap();
        repo.insert_race(&race("AQU-5", "Aqueduct Racetrack", 5, "10/16/2026"))
            .unwrap();
        repo.insert_race(&race("AQU-6", "Aqueduct Racetrack", 6, "10/16/2026"))
            .unwrap();

        let found = repo
            .find_races_fuzzy("aqueduct", 5, "10/16/2026")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].race_id, "AQU-5");
    }

    #[tokio::test]
    async fn test_fuzzy_token_is_literal() {
        let repo = SqliteRepository::in_memory().unwrap();
        repo.insert_race(&race("X-1", "Penn National", 1, "10/16/2026"))
            .unwrap();

        let found = repo.find_races_fuzzy("%", 1, "10/16/2026").await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_update_minutes_to_post() {
        let repo = SqliteRepository::in_memory().unwrap();
        repo.insert_race(&race("GP-3", "Gulfstream Park", 3, "10/16/2026"))
            .unwrap();

        repo.update_minutes_to_post("GP-3", 12).await.unwrap();
        assert_eq!(repo.race_mtp("GP-3").unwrap(), Some(12));
    }

    #[tokio::test]
    async fn test_update_runner_keeps_absent_fields() {
        let repo = SqliteRepository::in_memory().unwrap();
        repo.insert_race(&race("GP-3", "Gulfstream Park", 3, "10/16/2026"))
            .unwrap();
        repo.insert_runner("r1", "GP-3", 1).unwrap();

        let full = NormalizedRunnerUpdate {
            post_position: 1,
            decimal_odds: Some(1.11),
            win: Some(13686.0),
            place: Some(5120.0),
            show: Some(2004.0),
        };
        repo.update_runner("r1", &full).await.unwrap();

        let partial = NormalizedRunnerUpdate {
            post_position: 1,
            win: Some(14000.0),
            ..Default::default()
        };
        repo.update_runner("r1", &partial).await.unwrap();

        assert_eq!(
            repo.runner_pools("r1").unwrap(),
            (Some(1.11), Some(14000.0), Some(5120.0), Some(2004.0))
        );
    }

    #[tokio::test]
    async fn test_find_runners() {
        let repo = SqliteRepository::in_memory().unwrap();
        repo.insert_race(&race("GP-3", "Gulfstream Park", 3, "10/16/2026"))
            .unwrap();
        repo.insert_runner("r1", "GP-3", 1).unwrap();
        repo.insert_runner("r2", "GP-3", 2).unwrap();

        let runners = repo.find_runners("GP-3", 2).await.unwrap();
        assert_eq!(runners.len(), 1);
        assert_eq!(runners[0].runner_id, "r2");
        assert!(repo.find_runners("GP-3", 9).await.unwrap().is_empty());
    }
}
