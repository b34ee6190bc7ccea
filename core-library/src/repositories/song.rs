//! Song repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{validate_rating, AlbumStats, ArtistStats, NewSong, Song, SongUpdate};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::debug;

/// Song repository interface for data access operations
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// Find a song by its file path
    ///
    /// # Returns
    /// - `Ok(Some(song))` if exactly one row matches
    /// - `Ok(None)` if not found
    /// - `Err(LibraryError::DataIntegrity)` if more than one row matches
    async fn find_by_path(&self, path: &str) -> Result<Option<Song>>;

    /// Insert new songs, skipping paths that already exist
    ///
    /// Returns the number of rows inserted.
    async fn insert_many(&self, songs: &[NewSong]) -> Result<u64>;

    /// Overwrite the source-owned columns of existing songs
    ///
    /// Play count, last played, favorite flag and rating are left untouched.
    /// Returns the number of rows updated.
    async fn update_many(&self, updates: &[SongUpdate]) -> Result<u64>;

    /// Delete songs by path
    ///
    /// Returns the number of rows deleted.
    async fn delete_by_paths(&self, paths: &[String]) -> Result<u64>;

    /// Every stored song path
    async fn all_paths(&self) -> Result<Vec<String>>;

    /// Distinct `(album, artist)` keys referenced by stored songs
    async fn album_keys(&self) -> Result<Vec<(String, String)>>;

    /// Distinct artist names referenced by stored songs
    async fn artist_names(&self) -> Result<Vec<String>>;

    /// Recompute statistics for the songs of one album
    async fn album_stats(&self, name: &str, artist: &str) -> Result<AlbumStats>;

    /// Recompute statistics for the songs of one artist
    async fn artist_stats(&self, name: &str) -> Result<ArtistStats>;

    /// Count total songs
    async fn count(&self) -> Result<i64>;

    /// Increment the play count and stamp the last played time
    async fn record_play(&self, path: &str, played_at: i64) -> Result<()>;

    /// Mark or unmark a song as favorite
    async fn set_favorite(&self, path: &str, favorite: bool) -> Result<()>;

    /// Set or clear the star rating (1-5)
    async fn set_rating(&self, path: &str, rating: Option<i32>) -> Result<()>;

    /// Explicitly reset the play count to zero
    async fn reset_play_count(&self, path: &str) -> Result<()>;
}

/// SQLite implementation of SongRepository
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    /// Create a new SqliteSongRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn validate(song: &NewSong) -> Result<()> {
        song.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Song".to_string(),
            message: e,
        })
    }

    fn not_found(path: &str) -> LibraryError {
        LibraryError::NotFound {
            entity_type: "Song".to_string(),
            id: path.to_string(),
        }
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn find_by_path(&self, path: &str) -> Result<Option<Song>> {
        // fetch_all rather than fetch_optional so a duplicate is detected, not hidden
        let mut rows = query_as::<_, Song>("SELECT * FROM songs WHERE path = ? LIMIT 2")
            .bind(path)
            .fetch_all(&self.pool)
            .await?;

        if rows.len() > 1 {
            return Err(LibraryError::DataIntegrity(format!(
                "{} songs share path {}",
                rows.len(),
                path
            )));
        }

        Ok(rows.pop())
    }

    async fn insert_many(&self, songs: &[NewSong]) -> Result<u64> {
        for song in songs {
            Self::validate(song)?;
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for song in songs {
            let result = query(
                r#"
                INSERT INTO songs (
                    path, title, artist, album, duration_ms, size, modified_at,
                    track_number, year, source_album_id, source_artist_id,
                    added_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(path) DO NOTHING
                "#,
            )
            .bind(&song.path)
            .bind(&song.title)
            .bind(&song.artist)
            .bind(&song.album)
            .bind(song.duration_ms)
            .bind(song.size)
            .bind(song.modified_at)
            .bind(song.track_number)
            .bind(song.year)
            .bind(&song.source_album_id)
            .bind(&song.source_artist_id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        debug!(requested = songs.len(), inserted, "Inserted songs");
        Ok(inserted)
    }

    async fn update_many(&self, updates: &[SongUpdate]) -> Result<u64> {
        for song in updates {
            Self::validate(song)?;
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut updated = 0;

        for song in updates {
            let result = query(
                r#"
                UPDATE songs
                SET title = ?, artist = ?, album = ?, duration_ms = ?, size = ?,
                    modified_at = ?, track_number = ?, year = ?,
                    source_album_id = ?, source_artist_id = ?, updated_at = ?
                WHERE path = ?
                "#,
            )
            .bind(&song.title)
            .bind(&song.artist)
            .bind(&song.album)
            .bind(song.duration_ms)
            .bind(song.size)
            .bind(song.modified_at)
            .bind(song.track_number)
            .bind(song.year)
            .bind(&song.source_album_id)
            .bind(&song.source_artist_id)
            .bind(now)
            .bind(&song.path)
            .execute(&mut *tx)
            .await?;

            updated += result.rows_affected();
        }

        tx.commit().await?;

        debug!(requested = updates.len(), updated, "Updated songs");
        Ok(updated)
    }

    async fn delete_by_paths(&self, paths: &[String]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;

        for path in paths {
            let result = query("DELETE FROM songs WHERE path = ?")
                .bind(path)
                .execute(&mut *tx)
                .await?;
            deleted += result.rows_affected();
        }

        tx.commit().await?;

        debug!(requested = paths.len(), deleted, "Deleted songs");
        Ok(deleted)
    }

    async fn all_paths(&self) -> Result<Vec<String>> {
        let paths = query_as::<_, (String,)>("SELECT path FROM songs ORDER BY path ASC")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.0)
            .collect();

        Ok(paths)
    }

    async fn album_keys(&self) -> Result<Vec<(String, String)>> {
        let keys = query_as::<_, (String, String)>(
            "SELECT DISTINCT album, artist FROM songs ORDER BY artist, album",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn artist_names(&self) -> Result<Vec<String>> {
        let names = query_as::<_, (String,)>("SELECT DISTINCT artist FROM songs ORDER BY artist")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| row.0)
            .collect();

        Ok(names)
    }

    async fn album_stats(&self, name: &str, artist: &str) -> Result<AlbumStats> {
        let stats = query_as::<_, AlbumStats>(
            r#"
            SELECT COUNT(*) AS song_count,
                   COALESCE(SUM(duration_ms), 0) AS total_duration_ms,
                   MIN(year) AS min_year,
                   MAX(year) AS max_year,
                   (SELECT first.year FROM songs AS first
                    WHERE first.album = ?1 AND first.artist = ?2
                    ORDER BY first.id ASC LIMIT 1) AS first_year
            FROM songs
            WHERE album = ?1 AND artist = ?2
            "#,
        )
        .bind(name)
        .bind(artist)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn artist_stats(&self, name: &str) -> Result<ArtistStats> {
        let stats = query_as::<_, ArtistStats>(
            r#"
            SELECT COUNT(*) AS song_count,
                   COUNT(DISTINCT album) AS album_count,
                   COALESCE(SUM(duration_ms), 0) AS total_duration_ms
            FROM songs
            WHERE artist = ?
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM songs")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }

    async fn record_play(&self, path: &str, played_at: i64) -> Result<()> {
        let result = query(
            "UPDATE songs SET play_count = play_count + 1, last_played_at = ? WHERE path = ?",
        )
        .bind(played_at)
        .bind(path)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(path));
        }

        Ok(())
    }

    async fn set_favorite(&self, path: &str, favorite: bool) -> Result<()> {
        let result = query("UPDATE songs SET is_favorite = ? WHERE path = ?")
            .bind(favorite)
            .bind(path)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(path));
        }

        Ok(())
    }

    async fn set_rating(&self, path: &str, rating: Option<i32>) -> Result<()> {
        validate_rating(rating).map_err(|e| LibraryError::InvalidInput {
            field: "rating".to_string(),
            message: e,
        })?;

        let result = query("UPDATE songs SET rating = ? WHERE path = ?")
            .bind(rating)
            .bind(path)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(path));
        }

        Ok(())
    }

    async fn reset_play_count(&self, path: &str) -> Result<()> {
        let result = query("UPDATE songs SET play_count = 0 WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(path));
        }

        Ok(())
    }
}
