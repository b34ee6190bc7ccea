//! Change classification for a single track.
//!
//! Field-wise comparison between the incoming index record and the stored song
//! with the same path. No I/O; the caller supplies the stored row.

use bridge_traits::TrackRecord;
use core_library::models::Song;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing one record against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// No stored song has this path
    New,
    /// At least one compared field differs
    Updated,
    /// All compared fields are equal
    Unchanged,
}

/// A field taking part in change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SongField {
    ModifiedAt,
    Title,
    Artist,
    Album,
    Duration,
}

impl fmt::Display for SongField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SongField::ModifiedAt => "modified_at",
            SongField::Title => "title",
            SongField::Artist => "artist",
            SongField::Album => "album",
            SongField::Duration => "duration_ms",
        };
        f.write_str(name)
    }
}

/// Classify an incoming record against the stored song for its path.
pub fn classify(incoming: &TrackRecord, existing: Option<&Song>) -> Classification {
    match existing {
        None => Classification::New,
        Some(song) if changed_fields(incoming, song).is_empty() => Classification::Unchanged,
        Some(_) => Classification::Updated,
    }
}

/// The compared fields that differ, in a fixed order.
pub fn changed_fields(incoming: &TrackRecord, existing: &Song) -> Vec<SongField> {
    let mut changed = Vec::new();

    if incoming.modified_at != existing.modified_at {
        changed.push(SongField::ModifiedAt);
    }
    if incoming.title != existing.title {
        changed.push(SongField::Title);
    }
    if incoming.artist != existing.artist {
        changed.push(SongField::Artist);
    }
    if incoming.album != existing.album {
        changed.push(SongField::Album);
    }
    if incoming.duration_ms != existing.duration_ms {
        changed.push(SongField::Duration);
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(record: &TrackRecord) -> Song {
        Song {
            id: 1,
            path: record.path.clone(),
            title: record.title.clone(),
            artist: record.artist.clone(),
            album: record.album.clone(),
            duration_ms: record.duration_ms,
            size: record.size,
            modified_at: record.modified_at,
            track_number: record.track_number,
            year: record.year,
            source_album_id: None,
            source_artist_id: None,
            play_count: 7,
            last_played_at: Some(100),
            is_favorite: true,
            rating: Some(5),
            added_at: 1,
            updated_at: 1,
        }
    }

    fn record() -> TrackRecord {
        TrackRecord::new("/music/a.mp3", "A", "Artist1", "Album1", 200_000, 1_000)
    }

    #[test]
    fn test_missing_is_new() {
        assert_eq!(classify(&record(), None), Classification::New);
    }

    #[test]
    fn test_identical_is_unchanged() {
        let incoming = record();
        let song = stored(&incoming);
        assert_eq!(classify(&incoming, Some(&song)), Classification::Unchanged);
        assert!(changed_fields(&incoming, &song).is_empty());
    }

    #[test]
    fn test_each_field_triggers_update() {
        let base = record();
        let song = stored(&base);

        let variants: Vec<(TrackRecord, SongField)> = vec![
            (TrackRecord { modified_at: 2_000, ..base.clone() }, SongField::ModifiedAt),
            (TrackRecord { title: "A (Remaster)".into(), ..base.clone() }, SongField::Title),
            (TrackRecord { artist: "Artist2".into(), ..base.clone() }, SongField::Artist),
            (TrackRecord { album: "Album2".into(), ..base.clone() }, SongField::Album),
            (TrackRecord { duration_ms: 199_999, ..base.clone() }, SongField::Duration),
        ];

        for (incoming, field) in variants {
            assert_eq!(classify(&incoming, Some(&song)), Classification::Updated);
            assert_eq!(changed_fields(&incoming, &song), vec![field]);
        }
    }

    #[test]
    fn test_non_compared_fields_are_ignored() {
        let base = record();
        let song = stored(&base);
        let incoming = base.with_size(999).with_year(2020).with_track_number(4);

        assert_eq!(classify(&incoming, Some(&song)), Classification::Unchanged);
    }

    #[test]
    fn test_case_difference_is_a_change() {
        let base = record();
        let song = stored(&base);
        let incoming = TrackRecord {
            artist: "artist1".into(),
            ..base
        };

        assert_eq!(classify(&incoming, Some(&song)), Classification::Updated);
    }

    #[test]
    fn test_changed_fields_order() {
        let base = record();
        let song = stored(&base);
        let incoming = TrackRecord {
            title: "B".into(),
            duration_ms: 1,
            modified_at: 5,
            ..base
        };

        assert_eq!(
            changed_fields(&incoming, &song),
            vec![SongField::ModifiedAt, SongField::Title, SongField::Duration]
        );
    }
}
