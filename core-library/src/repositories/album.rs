//! Albums keyed by `(name, artist)`.
//!
//! Rows are created by the scan engine and their statistics are always
//! recomputed from `songs`, never incremented in place.

use crate::error::{LibraryError, Result};
use crate::models::{Album, AlbumStats, NewAlbum};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// `DataIntegrity` when the key matches more than one row.
    async fn find_by_name_and_artist(&self, name: &str, artist: &str) -> Result<Option<Album>>;

    /// Fails on a duplicate key or a blank name or artist.
    async fn insert(&self, album: &NewAlbum) -> Result<i64>;

    /// Overwrite the derived statistics. `year` is only backfilled while unset.
    async fn update_stats(&self, id: i64, stats: &AlbumStats) -> Result<()>;

    /// `false` when no album had this id.
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    /// Ordered by artist, then name
    async fn all(&self) -> Result<Vec<Album>>;
}

pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn find_by_name_and_artist(&self, name: &str, artist: &str) -> Result<Option<Album>> {
        let mut rows =
            query_as::<_, Album>("SELECT * FROM albums WHERE name = ? AND artist = ? LIMIT 2")
                .bind(name)
                .bind(artist)
                .fetch_all(&self.pool)
                .await?;

        if rows.len() > 1 {
            return Err(LibraryError::DataIntegrity(format!(
                "multiple albums keyed ({}, {})",
                name, artist
            )));
        }

        Ok(rows.pop())
    }

    async fn insert(&self, album: &NewAlbum) -> Result<i64> {
        album.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Album".to_string(),
            message: e,
        })?;

        let now = chrono::Utc::now().timestamp();
        let result = query(
            r#"
            INSERT INTO albums (
                name, artist, song_count, total_duration_ms, year,
                min_year, max_year, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&album.name)
        .bind(&album.artist)
        .bind(album.song_count)
        .bind(album.total_duration_ms)
        .bind(album.year)
        .bind(album.year)
        .bind(album.year)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_stats(&self, id: i64, stats: &AlbumStats) -> Result<()> {
        let result = query(
            r#"
            UPDATE albums
            SET song_count = ?, total_duration_ms = ?, min_year = ?, max_year = ?,
                year = COALESCE(year, ?), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(stats.song_count)
        .bind(stats.total_duration_ms)
        .bind(stats.min_year)
        .bind(stats.max_year)
        .bind(stats.first_year)
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Album".to_string(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = query("DELETE FROM albums WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM albums")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }

    async fn all(&self) -> Result<Vec<Album>> {
        let albums = query_as::<_, Album>("SELECT * FROM albums ORDER BY artist ASC, name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(albums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup_repo() -> SqliteAlbumRepository {
        SqliteAlbumRepository::new(create_test_pool().await.unwrap())
    }

    fn new_album(name: &str, artist: &str) -> NewAlbum {
        NewAlbum {
            name: name.to_string(),
            artist: artist.to_string(),
            song_count: 2,
            total_duration_ms: 380_000,
            year: Some(1999),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_album() {
        let repo = setup_repo().await;

        let id = repo.insert(&new_album("Album1", "Artist1")).await.unwrap();
        let found = repo
            .find_by_name_and_artist("Album1", "Artist1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.id, id);
        assert_eq!(found.song_count, 2);
        assert_eq!(found.year, Some(1999));
        assert_eq!(found.min_year, Some(1999));
    }

    #[tokio::test]
    async fn test_same_name_different_artist_is_distinct() {
        let repo = setup_repo().await;
        repo.insert(&new_album("Greatest Hits", "Artist1")).await.unwrap();
        repo.insert(&new_album("Greatest Hits", "Artist2")).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert!(repo
            .find_by_name_and_artist("Greatest Hits", "Artist3")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let repo = setup_repo().await;
        repo.insert(&new_album("Album1", "Artist1")).await.unwrap();
        let result = repo.insert(&new_album("Album1", "Artist1")).await;
        assert!(matches!(result, Err(LibraryError::Database(_))));
    }

    #[tokio::test]
    async fn test_update_stats() {
        let repo = setup_repo().await;
        let mut album = new_album("Album1", "Artist1");
        album.year = None;
        let id = repo.insert(&album).await.unwrap();

        let stats = AlbumStats {
            song_count: 1,
            total_duration_ms: 180_000,
            min_year: Some(2004),
            max_year: Some(2006),
            first_year: Some(2005),
        };
        repo.update_stats(id, &stats).await.unwrap();

        let found = repo.all().await.unwrap().pop().unwrap();
        assert_eq!(found.song_count, 1);
        assert_eq!(found.total_duration_ms, 180_000);
        assert_eq!(found.year, Some(2005));
        assert_eq!(found.min_year, Some(2004));
        assert_eq!(found.max_year, Some(2006));
    }

    #[tokio::test]
    async fn test_update_stats_missing_album() {
        let repo = setup_repo().await;
        let result = repo.update_stats(42, &AlbumStats::default()).await;
        assert!(matches!(result, Err(LibraryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_album() {
        let repo = setup_repo().await;
        let id = repo.insert(&new_album("Album1", "Artist1")).await.unwrap();

        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_album_validation() {
        let repo = setup_repo().await;
        let result = repo.insert(&new_album("", "Artist1")).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }
}
