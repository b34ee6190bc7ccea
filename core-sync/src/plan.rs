//! Reconciliation plan: the writes one scan intends to make.

use crate::aggregator::{AlbumCandidate, ArtistCandidate};
use crate::report::ScanReport;
use crate::scope::ScanScope;
use crate::state::ScanStateMachine;
use core_library::models::NewSong;
use std::collections::HashSet;

/// `(album name, artist name)`
pub type AlbumKey = (String, String);

/// An existing song whose source fields changed.
///
/// Carries the album/artist the stored row pointed at before the update so
/// both the old and the new aggregates get recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongChange {
    pub song: NewSong,
    pub previous_album: String,
    pub previous_artist: String,
}

/// A stored song absent from a full enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRemoval {
    pub path: String,
    pub album: String,
    pub artist: String,
}

/// Scan-scoped, consumed once by the writer.
///
/// The insert, update and removal lists are disjoint by path.
#[derive(Debug)]
pub struct ReconciliationPlan {
    pub scope: ScanScope,
    /// Scan start time (Unix seconds); becomes the bookkeeping timestamp
    pub started_at: i64,
    pub songs_to_insert: Vec<NewSong>,
    pub songs_to_update: Vec<SongChange>,
    /// Always empty unless the scope allows removals
    pub removals: Vec<SongRemoval>,
    pub albums_to_insert: Vec<AlbumCandidate>,
    pub artists_to_insert: Vec<ArtistCandidate>,
    /// Planner counters (found, filtered, failed, unchanged)
    pub report: ScanReport,
    pub(crate) state: ScanStateMachine,
}

impl ReconciliationPlan {
    pub(crate) fn new(scope: ScanScope, started_at: i64, state: ScanStateMachine) -> Self {
        Self {
            scope,
            started_at,
            songs_to_insert: Vec::new(),
            songs_to_update: Vec::new(),
            removals: Vec::new(),
            albums_to_insert: Vec::new(),
            artists_to_insert: Vec::new(),
            report: ScanReport::default(),
            state,
        }
    }

    pub fn state(&self) -> crate::state::ScanState {
        self.state.state()
    }

    pub fn paths_to_remove(&self) -> Vec<String> {
        self.removals.iter().map(|r| r.path.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.songs_to_insert.is_empty()
            && self.songs_to_update.is_empty()
            && self.removals.is_empty()
            && self.albums_to_insert.is_empty()
            && self.artists_to_insert.is_empty()
    }

    /// Albums whose song set any write in this plan can change, in first-seen order.
    pub fn touched_albums(&self) -> Vec<AlbumKey> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut push = |album: &str, artist: &str| {
            let key = (album.to_string(), artist.to_string());
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        };

        for album in &self.albums_to_insert {
            push(&album.name, &album.artist);
        }
        for song in &self.songs_to_insert {
            push(&song.album, &song.artist);
        }
        for change in &self.songs_to_update {
            push(&change.song.album, &change.song.artist);
            push(&change.previous_album, &change.previous_artist);
        }
        for removal in &self.removals {
            push(&removal.album, &removal.artist);
        }

        keys
    }

    /// Artists whose song set any write in this plan can change, in first-seen order.
    pub fn touched_artists(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        let mut push = |artist: &str| {
            if seen.insert(artist.to_string()) {
                names.push(artist.to_string());
            }
        };

        for artist in &self.artists_to_insert {
            push(&artist.name);
        }
        for song in &self.songs_to_insert {
            push(&song.artist);
        }
        for change in &self.songs_to_update {
            push(&change.song.artist);
            push(&change.previous_artist);
        }
        for removal in &self.removals {
            push(&removal.artist);
        }

        names
    }
}
