//! Repository bundle shared by the planner and the writer.

use core_library::repositories::{
    AlbumRepository, ArtistRepository, ScanBookkeepingRepository, SongRepository,
    SqliteAlbumRepository, SqliteArtistRepository, SqliteScanBookkeepingRepository,
    SqliteSongRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Read and write access to the persistent library.
#[derive(Clone)]
pub struct LibraryStore {
    pub songs: Arc<dyn SongRepository>,
    pub albums: Arc<dyn AlbumRepository>,
    pub artists: Arc<dyn ArtistRepository>,
    pub bookkeeping: Arc<dyn ScanBookkeepingRepository>,
}

impl LibraryStore {
    pub fn new(
        songs: Arc<dyn SongRepository>,
        albums: Arc<dyn AlbumRepository>,
        artists: Arc<dyn ArtistRepository>,
        bookkeeping: Arc<dyn ScanBookkeepingRepository>,
    ) -> Self {
        Self {
            songs,
            albums,
            artists,
            bookkeeping,
        }
    }

    /// SQLite-backed repositories sharing one pool.
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            songs: Arc::new(SqliteSongRepository::new(pool.clone())) as Arc<dyn SongRepository>,
            albums: Arc::new(SqliteAlbumRepository::new(pool.clone())) as Arc<dyn AlbumRepository>,
            artists: Arc::new(SqliteArtistRepository::new(pool.clone()))
                as Arc<dyn ArtistRepository>,
            bookkeeping: Arc::new(SqliteScanBookkeepingRepository::new(pool))
                as Arc<dyn ScanBookkeepingRepository>,
        }
    }
}
