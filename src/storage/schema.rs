//! SQLite schema for the local schedule store
//!
//! Tables mirror the hosted store:
//! - drf_races: Race schedule, one row per (track, race number, date)
//! - drf_runners: Runners per race with the latest pool figures

use rusqlite::{Connection, Result};

/// Create all tables in the database
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS drf_races (
            race_id TEXT PRIMARY KEY,
            track_name TEXT NOT NULL,
            race_number INTEGER NOT NULL,
            race_date TEXT NOT NULL,
            purse TEXT,
            mtp INTEGER
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS drf_runners (
            runner_id TEXT PRIMARY KEY,
            race_id TEXT NOT NULL REFERENCES drf_races(race_id),
            horse_name TEXT,
            post_position INTEGER NOT NULL,
            pool_odds REAL,
            win REAL,
            place REAL,
            show REAL
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_races_lookup ON drf_races(race_date, race_number)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_runners_race_post ON drf_runners(race_id, post_position)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                 ('drf_races', 'drf_runners')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_create_tables_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();
    }
}
