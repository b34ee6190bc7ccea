//! Media Source Abstraction
//!
//! The device-wide media index is the source of truth for which audio files
//! exist. The core only consumes flat [`TrackRecord`] snapshots from it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Snapshot of one track as reported by the media index at scan time.
///
/// `path` is the unique key. Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Absolute file path
    pub path: String,
    /// Track title
    pub title: String,
    /// Artist name as reported by the index
    pub artist: String,
    /// Album name as reported by the index
    pub album: String,
    /// Duration in milliseconds
    pub duration_ms: i64,
    /// File size in bytes
    pub size: i64,
    /// Last modification time of the file (Unix seconds)
    pub modified_at: i64,
    /// Track position on album
    pub track_number: Option<i32>,
    /// Release year
    pub year: Option<i32>,
    /// Album identifier assigned by the index, if any
    pub album_id: Option<String>,
    /// Artist identifier assigned by the index, if any
    pub artist_id: Option<String>,
}

impl TrackRecord {
    /// Create a record with the fields every index provides.
    pub fn new(
        path: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        duration_ms: i64,
        modified_at: i64,
    ) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            duration_ms,
            size: 0,
            modified_at,
            track_number: None,
            year: None,
            album_id: None,
            artist_id: None,
        }
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_track_number(mut self, track_number: i32) -> Self {
        self.track_number = Some(track_number);
        self
    }

    /// Whether this record lives under the given folder prefix.
    ///
    /// Matching is done on whole path components, so `/music/rock` does not
    /// contain `/music/rockabilly/a.mp3`.
    pub fn is_under(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return self.path.starts_with('/');
        }
        match self.path.strip_prefix(prefix) {
            Some(rest) => rest.starts_with('/'),
            None => false,
        }
    }
}

/// Media index enumerator.
///
/// Implementations return complete lists; pagination, if the platform needs it,
/// is handled inside the adapter.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::source::MediaSource;
///
/// async fn count_tracks(source: &dyn MediaSource) -> bridge_traits::error::Result<usize> {
///     Ok(source.list_all().await?.len())
/// }
/// ```
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Every track the index currently knows about
    async fn list_all(&self) -> Result<Vec<TrackRecord>>;

    /// Tracks whose `modified_at` is strictly greater than `since`
    async fn list_modified_since(&self, since: i64) -> Result<Vec<TrackRecord>>;

    /// Tracks located under any of the given folder prefixes
    async fn list_under_paths(&self, paths: &[String]) -> Result<Vec<TrackRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_under_matches_whole_components() {
        let record = TrackRecord::new("/music/rock/a.mp3", "A", "Artist", "Album", 1, 1);
        assert!(record.is_under("/music"));
        assert!(record.is_under("/music/rock"));
        assert!(record.is_under("/music/rock/"));
        assert!(!record.is_under("/music/ro"));
        assert!(!record.is_under("/video"));
    }

    #[test]
    fn test_builder_helpers() {
        let record = TrackRecord::new("/a.mp3", "A", "Artist", "Album", 1000, 5)
            .with_size(42)
            .with_year(1999)
            .with_track_number(3);

        assert_eq!(record.size, 42);
        assert_eq!(record.year, Some(1999));
        assert_eq!(record.track_number, Some(3));
        assert!(record.album_id.is_none());
    }

    #[test]
    fn test_record_serialization() {
        let record = TrackRecord::new("/a.mp3", "A", "Artist", "Album", 1000, 5);
        let json = serde_json::to_string(&record).unwrap();
        let back: TrackRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
