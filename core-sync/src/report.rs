//! Scan counters returned to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters for one scan, or for several folder sub-scans merged together.
///
/// Each pipeline stage returns its own counts and the coordinator folds them
/// in; nothing mutates a report through a shared reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Records the source returned for the scope, valid or not
    pub songs_found: u64,
    /// Records dropped by the validity filter (including duplicate paths)
    pub songs_filtered: u64,
    /// Records skipped because their store lookup failed
    pub songs_failed: u64,
    pub songs_added: u64,
    pub songs_updated: u64,
    pub songs_unchanged: u64,
    pub songs_removed: u64,
    pub albums_added: u64,
    pub artists_added: u64,
    pub albums_removed: u64,
    pub artists_removed: u64,
    pub elapsed_ms: u64,
}

impl ScanReport {
    /// Add another report's counters into this one.
    pub fn merge(&mut self, other: &ScanReport) {
        self.songs_found += other.songs_found;
        self.songs_filtered += other.songs_filtered;
        self.songs_failed += other.songs_failed;
        self.songs_added += other.songs_added;
        self.songs_updated += other.songs_updated;
        self.songs_unchanged += other.songs_unchanged;
        self.songs_removed += other.songs_removed;
        self.albums_added += other.albums_added;
        self.artists_added += other.artists_added;
        self.albums_removed += other.albums_removed;
        self.artists_removed += other.artists_removed;
        self.elapsed_ms += other.elapsed_ms;
    }

    /// Writes that changed the store.
    pub fn total_changes(&self) -> u64 {
        self.songs_added
            + self.songs_updated
            + self.songs_removed
            + self.albums_added
            + self.artists_added
            + self.albums_removed
            + self.artists_removed
    }

    pub fn is_noop(&self) -> bool {
        self.total_changes() == 0
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "found {} (filtered {}, failed {}), songs +{} ~{} -{}, albums +{} -{}, artists +{} -{} in {}ms",
            self.songs_found,
            self.songs_filtered,
            self.songs_failed,
            self.songs_added,
            self.songs_updated,
            self.songs_removed,
            self.albums_added,
            self.albums_removed,
            self.artists_added,
            self.artists_removed,
            self.elapsed_ms
        )
    }
}
