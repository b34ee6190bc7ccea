//! Domain models for the media library
//!
//! Rows are mapped with `sqlx::FromRow`. Insert and update payloads are
//! separate structs so that user-owned song state can never travel through a
//! scan write.

use bridge_traits::TrackRecord;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// =============================================================================
// Songs
// =============================================================================

/// A persisted song: the media index projection plus user-owned state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Song {
    /// Synthetic row id
    pub id: i64,
    /// Absolute file path, unique across all songs
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Duration in milliseconds
    pub duration_ms: i64,
    /// File size in bytes
    pub size: i64,
    /// Source modification time (Unix seconds)
    pub modified_at: i64,
    pub track_number: Option<i32>,
    pub year: Option<i32>,
    /// Album identifier assigned by the media index
    pub source_album_id: Option<String>,
    /// Artist identifier assigned by the media index
    pub source_artist_id: Option<String>,
    /// Times played; only grows, except through an explicit reset
    pub play_count: i64,
    pub last_played_at: Option<i64>,
    pub is_favorite: bool,
    /// 1-5 stars
    pub rating: Option<i32>,
    pub added_at: i64,
    pub updated_at: i64,
}

/// Source-owned song columns.
///
/// Used both for inserts and for updates keyed by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSong {
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: i64,
    pub size: i64,
    pub modified_at: i64,
    pub track_number: Option<i32>,
    pub year: Option<i32>,
    pub source_album_id: Option<String>,
    pub source_artist_id: Option<String>,
}

/// Update payload for a changed song. Carries the same source-owned columns
/// as an insert; the row is located by `path`.
pub type SongUpdate = NewSong;

impl NewSong {
    /// Validate song data
    pub fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("Song path cannot be empty".to_string());
        }

        if self.duration_ms < 0 {
            return Err("Duration cannot be negative".to_string());
        }

        if self.artist.trim().is_empty() || self.album.trim().is_empty() {
            return Err(format!("Song {} has a blank artist or album", self.path));
        }

        Ok(())
    }
}

impl From<&TrackRecord> for NewSong {
    fn from(record: &TrackRecord) -> Self {
        Self {
            path: record.path.clone(),
            title: record.title.clone(),
            artist: record.artist.clone(),
            album: record.album.clone(),
            duration_ms: record.duration_ms,
            size: record.size,
            modified_at: record.modified_at,
            track_number: record.track_number,
            year: record.year,
            source_album_id: record.album_id.clone(),
            source_artist_id: record.artist_id.clone(),
        }
    }
}

/// Validate a star rating
pub fn validate_rating(rating: Option<i32>) -> Result<(), String> {
    match rating {
        Some(stars) if !(1..=5).contains(&stars) => {
            Err(format!("Rating {} is out of range 1-5", stars))
        }
        _ => Ok(()),
    }
}

// =============================================================================
// Albums
// =============================================================================

/// An album keyed by `(name, artist)`.
///
/// `song_count`, `total_duration_ms`, `min_year` and `max_year` are derived
/// from the song table and never edited by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub artist: String,
    pub song_count: i64,
    pub total_duration_ms: i64,
    /// Representative year: the year of the album's first song in source
    /// order. Songs are inserted in source order, so the store reads it back
    /// as the year of the lowest song id. Set once, filled in later only if
    /// it started out unknown.
    pub year: Option<i32>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlbum {
    pub name: String,
    pub artist: String,
    pub song_count: i64,
    pub total_duration_ms: i64,
    pub year: Option<i32>,
}

impl NewAlbum {
    /// Validate album data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Album name cannot be empty".to_string());
        }

        if self.artist.trim().is_empty() {
            return Err("Album artist cannot be empty".to_string());
        }

        if self.song_count < 0 {
            return Err("Song count cannot be negative".to_string());
        }

        Ok(())
    }
}

/// Statistics recomputed from the songs of one album.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AlbumStats {
    pub song_count: i64,
    pub total_duration_ms: i64,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    /// Year of the earliest-inserted song, the representative album year
    pub first_year: Option<i32>,
}

// =============================================================================
// Artists
// =============================================================================

/// An artist keyed by exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub song_count: i64,
    /// Distinct album names among the artist's songs
    pub album_count: i64,
    pub total_duration_ms: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArtist {
    pub name: String,
    pub song_count: i64,
    pub album_count: i64,
    pub total_duration_ms: i64,
}

impl NewArtist {
    /// Validate artist data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Artist name cannot be empty".to_string());
        }

        if self.song_count < 0 || self.album_count < 0 {
            return Err("Artist counts cannot be negative".to_string());
        }

        Ok(())
    }
}

/// Statistics recomputed from the songs of one artist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ArtistStats {
    pub song_count: i64,
    pub album_count: i64,
    pub total_duration_ms: i64,
}

// =============================================================================
// Scan bookkeeping
// =============================================================================

/// Which kind of scan last advanced the bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    Full,
    Incremental,
}

impl ScanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Full => "full",
            ScanKind::Incremental => "incremental",
        }
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single persisted bookkeeping record.
///
/// `last_scan_at` bounds the next incremental scan. All timestamps are the
/// *start* time of the scan that wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ScanBookkeeping {
    pub last_scan_at: Option<i64>,
    pub last_full_scan_at: Option<i64>,
    pub last_incremental_scan_at: Option<i64>,
    pub scan_count: i64,
    /// A scan started writing and has not finished recomputing statistics
    pub stats_dirty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_song(path: &str) -> NewSong {
        NewSong::from(&TrackRecord::new(path, "Title", "Artist", "Album", 200_000, 10))
    }

    #[test]
    fn test_new_song_from_record() {
        let mut record = TrackRecord::new("/m/a.mp3", "A", "Artist1", "Album1", 200_000, 42)
            .with_size(1024)
            .with_year(2001)
            .with_track_number(4);
        record.album_id = Some("idx-album-7".to_string());

        let song = NewSong::from(&record);
        assert_eq!(song.path, "/m/a.mp3");
        assert_eq!(song.modified_at, 42);
        assert_eq!(song.size, 1024);
        assert_eq!(song.year, Some(2001));
        assert_eq!(song.track_number, Some(4));
        assert_eq!(song.source_album_id, Some("idx-album-7".to_string()));
        assert_eq!(song.source_artist_id, None);
    }

    #[test]
    fn test_song_validation() {
        assert!(new_song("/m/a.mp3").validate().is_ok());

        let mut blank_path = new_song("  ");
        assert!(blank_path.validate().is_err());
        blank_path.path = "/m/b.mp3".to_string();
        blank_path.duration_ms = -1;
        assert!(blank_path.validate().is_err());

        let mut blank_artist = new_song("/m/c.mp3");
        blank_artist.artist = String::new();
        assert!(blank_artist.validate().is_err());
    }

    #[test]
    fn test_rating_validation() {
        assert!(validate_rating(None).is_ok());
        assert!(validate_rating(Some(1)).is_ok());
        assert!(validate_rating(Some(5)).is_ok());
        assert!(validate_rating(Some(0)).is_err());
        assert!(validate_rating(Some(6)).is_err());
    }

    #[test]
    fn test_album_and_artist_validation() {
        let album = NewAlbum {
            name: "Album1".to_string(),
            artist: "Artist1".to_string(),
            song_count: 2,
            total_duration_ms: 380_000,
            year: None,
        };
        assert!(album.validate().is_ok());
        assert!(NewAlbum {
            name: " ".to_string(),
            ..album.clone()
        }
        .validate()
        .is_err());

        let artist = NewArtist {
            name: "Artist1".to_string(),
            song_count: 2,
            album_count: 1,
            total_duration_ms: 380_000,
        };
        assert!(artist.validate().is_ok());
        assert!(NewArtist {
            song_count: -1,
            ..artist
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_scan_kind_serialization() {
        assert_eq!(ScanKind::Full.to_string(), "full");
        let json = serde_json::to_string(&ScanKind::Incremental).unwrap();
        assert_eq!(json, "\"incremental\"");
    }
}
