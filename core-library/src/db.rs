//! # Library Database
//!
//! Opens the SQLite file that backs the library and brings its schema up to
//! date. Every pool handed out by this module has run the embedded
//! migrations and holds the single `scan_bookkeeping` row the sync engine
//! reads at the start of every scan.
//!
//! File databases run in WAL mode so readers (UI queries) never block the
//! scan writer. In-memory databases keep one connection alive for the life of
//! the pool, since the data disappears with the last connection.
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("library.db")).await?;
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Where the library lives and how many connections may touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// How long a connection waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl DatabaseConfig {
    /// Library stored in the file at `database_path`, created if missing.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_url: format!("sqlite:{}", database_path.into().display()),
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Throwaway library for tests.
    ///
    /// Limited to one connection: every connection to `:memory:` would
    /// otherwise see its own empty database.
    pub fn in_memory() -> Self {
        Self {
            database_url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url == IN_MEMORY_URL
    }
}

/// Open the library, apply pending migrations and verify the schema.
///
/// # Errors
///
/// - `Database` if the file cannot be opened
/// - `Migration` if a migration fails
/// - `DataIntegrity` if the bookkeeping row is missing or duplicated
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(database_url = %config.database_url, "Opening library database");

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LibraryError::Database)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    let mut pool_options = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(config.max_connections);
    if config.is_in_memory() {
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await.map_err(|e| {
        warn!(error = %e, "Failed to open library database");
        LibraryError::Database(e)
    })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| LibraryError::Migration(e.to_string()))?;
    debug!("Library migrations applied");

    verify_bookkeeping(&pool).await?;

    Ok(pool)
}

/// In-memory library with the full schema, for tests.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

async fn verify_bookkeeping(pool: &Pool<Sqlite>) -> Result<()> {
    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scan_bookkeeping")
        .fetch_one(pool)
        .await?;

    if rows != 1 {
        return Err(LibraryError::DataIntegrity(format!(
            "expected one scan bookkeeping row, found {}",
            rows
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn columns(pool: &Pool<Sqlite>, table: &str) -> Vec<String> {
        sqlx::query_as::<_, (String,)>("SELECT name FROM pragma_table_info(?)")
            .bind(table)
            .fetch_all(pool)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.0)
            .collect()
    }

    #[tokio::test]
    async fn test_schema_after_migrations() {
        let pool = create_test_pool().await.unwrap();

        let songs = columns(&pool, "songs").await;
        for column in ["path", "modified_at", "play_count", "is_favorite", "rating"] {
            assert!(songs.iter().any(|c| c == column), "songs.{} missing", column);
        }
        assert!(columns(&pool, "albums").await.iter().any(|c| c == "min_year"));
        assert!(columns(&pool, "artists").await.iter().any(|c| c == "album_count"));
        assert!(columns(&pool, "scan_bookkeeping")
            .await
            .iter()
            .any(|c| c == "stats_dirty"));
    }

    #[tokio::test]
    async fn test_song_paths_are_unique() {
        let pool = create_test_pool().await.unwrap();
        let insert = "INSERT INTO songs (path, title, artist, album, duration_ms, modified_at, added_at, updated_at) \
                      VALUES ('/m/a.mp3', 'A', 'Artist1', 'Album1', 1000, 1, 1, 1)";

        sqlx::query(insert).execute(&pool).await.unwrap();
        let duplicate = sqlx::query(insert).execute(&pool).await;

        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_reopening_file_keeps_library() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::new(dir.path().join("library.db"));

        let pool = create_pool(config.clone()).await.unwrap();
        sqlx::query("UPDATE scan_bookkeeping SET last_scan_at = 42")
            .execute(&pool)
            .await
            .unwrap();
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        pool.close().await;

        let pool = create_pool(config).await.unwrap();
        let (last_scan_at,): (Option<i64>,) =
            sqlx::query_as("SELECT last_scan_at FROM scan_bookkeeping")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(last_scan_at, Some(42));
    }

    #[tokio::test]
    async fn test_missing_bookkeeping_row_is_reported() {
        let pool = create_test_pool().await.unwrap();
        sqlx::query("DELETE FROM scan_bookkeeping")
            .execute(&pool)
            .await
            .unwrap();

        let result = verify_bookkeeping(&pool).await;

        assert!(matches!(result, Err(LibraryError::DataIntegrity(_))));
    }

    #[test]
    fn test_config() {
        let file = DatabaseConfig::new("/tmp/library.db").with_max_connections(0);
        assert_eq!(file.database_url, "sqlite:/tmp/library.db");
        assert_eq!(file.max_connections, 1);
        assert!(!file.is_in_memory());

        assert!(DatabaseConfig::in_memory().is_in_memory());
    }
}
