//! Artists keyed by exact name.

use crate::error::{LibraryError, Result};
use crate::models::{Artist, ArtistStats, NewArtist};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Byte-exact match; `DataIntegrity` if several rows share the name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Artist>>;

    async fn insert(&self, artist: &NewArtist) -> Result<i64>;

    /// Song count, album count and total duration, as recomputed from songs
    async fn update_stats(&self, id: i64, stats: &ArtistStats) -> Result<()>;

    /// `false` when no artist had this id.
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    async fn all(&self) -> Result<Vec<Artist>>;
}

/// Artist store over the library pool.
pub struct SqliteArtistRepository {
    pool: SqlitePool,
}

impl SqliteArtistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtistRepository for SqliteArtistRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let mut rows = query_as::<_, Artist>("SELECT * FROM artists WHERE name = ? LIMIT 2")
            .bind(name)
            .fetch_all(&self.pool)
            .await?;

        if rows.len() > 1 {
            return Err(LibraryError::DataIntegrity(format!(
                "multiple artists named {}",
                name
            )));
        }

        Ok(rows.pop())
    }

    async fn insert(&self, artist: &NewArtist) -> Result<i64> {
        artist.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Artist".to_string(),
            message: e,
        })?;

        let now = chrono::Utc::now().timestamp();
        let result = query(
            r#"
            INSERT INTO artists (
                name, song_count, album_count, total_duration_ms, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&artist.name)
        .bind(artist.song_count)
        .bind(artist.album_count)
        .bind(artist.total_duration_ms)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_stats(&self, id: i64, stats: &ArtistStats) -> Result<()> {
        let result = query(
            r#"
            UPDATE artists
            SET song_count = ?, album_count = ?, total_duration_ms = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(stats.song_count)
        .bind(stats.album_count)
        .bind(stats.total_duration_ms)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Artist".to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = query("DELETE FROM artists WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM artists")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }

    async fn all(&self) -> Result<Vec<Artist>> {
        let artists = query_as::<_, Artist>("SELECT * FROM artists ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(artists)
    }
}
