use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use crate::error::{ElevatorError, Result};
use crate::level::Level;

use super::{LevelDataStorage, LevelRecord, NOTHING_STORED, NOT_INITIALIZED};

/// SQL to create the level marker table (SQLite).
///
/// The `id = 1` check keeps the table down to the single marker row.
pub const CREATE_LEVELS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS elevator_levels (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    level_number INTEGER NOT NULL,
    description TEXT NOT NULL,
    saved_at TEXT NOT NULL
)
"#;

const UPSERT_LEVEL_SQL: &str = r#"
INSERT INTO elevator_levels (id, level_number, description, saved_at)
VALUES (1, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
    level_number = excluded.level_number,
    description = excluded.description,
    saved_at = excluded.saved_at
"#;

/// Progress store backed by a SQLite database.
///
/// The lift is synchronous, so the store drives its pool on a private
/// current-thread runtime. Do not call it from inside another tokio runtime.
pub struct SqliteLevelDataStorage {
    url: String,
    runtime: Runtime,
    pool: Option<SqlitePool>,
}

impl SqliteLevelDataStorage {
    /// Creates a store for the database at `url` (e.g. `sqlite:levels.db`).
    ///
    /// The database file is created on [`LevelDataStorage::initialize`] if
    /// it does not exist.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            url: url.into(),
            runtime,
            pool: None,
        })
    }

    /// Returns the database URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reads the stored record, if any.
    pub fn current_record(&self) -> Result<Option<LevelRecord>> {
        let pool = self.pool()?;
        let row: Option<(i64, String, String)> = self.runtime.block_on(
            sqlx::query_as(
                "SELECT level_number, description, saved_at FROM elevator_levels WHERE id = 1",
            )
            .fetch_optional(pool),
        )?;

        Ok(row.map(|(level_number, description, saved_at)| LevelRecord {
            level_number,
            description,
            saved_at: parse_saved_at(&saved_at),
        }))
    }

    fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .as_ref()
            .ok_or_else(|| ElevatorError::state(NOT_INITIALIZED))
    }
}

fn parse_saved_at(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            // SQLite datetime format fallback
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|dt| dt.and_utc())
                .unwrap_or_else(|_| {
                    warn!(saved_at = %value, "Unparseable level timestamp, using now");
                    Utc::now()
                })
        })
}

impl LevelDataStorage for SqliteLevelDataStorage {
    fn initialize(&mut self) -> Result<()> {
        let options = SqliteConnectOptions::from_str(&self.url)?.create_if_missing(true);
        let pool = self.runtime.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await?;
            sqlx::query(CREATE_LEVELS_TABLE_SQL).execute(&pool).await?;
            Ok::<_, sqlx::Error>(pool)
        })?;

        debug!(url = %self.url, "SQLite level store initialized");
        self.pool = Some(pool);
        Ok(())
    }

    fn has_stored_level_info(&self) -> Result<bool> {
        let pool = self.pool()?;
        let row: (i64,) = self
            .runtime
            .block_on(sqlx::query_as("SELECT COUNT(*) FROM elevator_levels").fetch_one(pool))?;
        Ok(row.0 > 0)
    }

    fn save_current_level(&mut self, level: &Level) -> Result<()> {
        let record = LevelRecord::now(level);
        let pool = self.pool()?;
        self.runtime.block_on(
            sqlx::query(UPSERT_LEVEL_SQL)
                .bind(record.level_number)
                .bind(&record.description)
                .bind(record.saved_at.to_rfc3339())
                .execute(pool),
        )?;
        Ok(())
    }

    fn get_current_level(&self) -> Result<Level> {
        self.current_record()?
            .map(|record| record.to_level())
            .ok_or_else(|| ElevatorError::state(NOTHING_STORED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn memory_storage() -> SqliteLevelDataStorage {
        let mut storage = SqliteLevelDataStorage::new("sqlite::memory:").unwrap();
        storage.initialize().unwrap();
        storage
    }

    #[test]
    fn test_requires_initialize() {
        let storage = SqliteLevelDataStorage::new("sqlite::memory:").unwrap();
        let err = storage.has_stored_level_info().unwrap_err();
        assert_eq!(err.to_string(), NOT_INITIALIZED);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut storage = memory_storage();
        storage.initialize().unwrap();
        assert!(!storage.has_stored_level_info().unwrap());
    }

    #[test]
    fn test_no_level_stored() {
        let storage = memory_storage();
        assert!(!storage.has_stored_level_info().unwrap());

        let err = storage.get_current_level().unwrap_err();
        assert_eq!(err.to_string(), NOTHING_STORED);
    }

    #[test]
    fn test_save_keeps_single_row() {
        let mut storage = memory_storage();
        storage.save_current_level(&Level::new(0, "Init level")).unwrap();
        storage
            .save_current_level(&Level::new(0, "Init level with updated text"))
            .unwrap();
        storage.save_current_level(&Level::new(2, "Second level")).unwrap();

        let pool = storage.pool().unwrap();
        let count: (i64,) = storage
            .runtime
            .block_on(sqlx::query_as("SELECT COUNT(*) FROM elevator_levels").fetch_one(pool))
            .unwrap();
        assert_eq!(count.0, 1);

        let current = storage.get_current_level().unwrap();
        assert_eq!(current.number(), 2);
        assert_eq!(current.description(), "Second level");
    }

    #[test]
    fn test_marker_survives_reopen() {
        let dir = tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("levels.db").display());

        {
            let mut storage = SqliteLevelDataStorage::new(&url).unwrap();
            storage.initialize().unwrap();
            storage.save_current_level(&Level::new(3, "third")).unwrap();
        }

        let mut reopened = SqliteLevelDataStorage::new(&url).unwrap();
        reopened.initialize().unwrap();
        let record = reopened.current_record().unwrap().unwrap();
        assert_eq!(record.level_number, 3);
        assert_eq!(record.description, "third");
        assert!(record.saved_at <= Utc::now());
    }

    #[test]
    fn test_parse_saved_at_formats() {
        let rfc = parse_saved_at("2024-05-01T10:00:00+00:00");
        assert_eq!(rfc.to_rfc3339(), "2024-05-01T10:00:00+00:00");

        let sqlite = parse_saved_at("2024-05-01 10:00:00");
        assert_eq!(sqlite, rfc);
    }

    #[test]
    fn test_parse_saved_at_garbage_falls_back_to_now() {
        let before = Utc::now();
        let parsed = parse_saved_at("not a timestamp");
        assert!(parsed >= before);
        assert!(parsed <= Utc::now());
    }
}
