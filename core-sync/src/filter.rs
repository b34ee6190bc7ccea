//! # Validity Filter
//!
//! Decides whether a track reported by the media index is eligible for the
//! library. Rejections are a policy outcome, not a fault: the planner counts
//! them and moves on.
//!
//! Checks run cheapest first, so the file system is only touched for records
//! that already pass the in-memory checks:
//!
//! 1. path is non-blank and absolute
//! 2. duration is not negative
//! 3. duration floor (only when `ignore_short_tracks` is set)
//! 4. file exists, is readable and is non-empty

use bridge_traits::{FileSystemProbe, TrackRecord};
use core_runtime::config::ScanSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Per-scan filtering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPolicy {
    pub ignore_short_tracks: bool,
    pub min_duration_ms: i64,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::from(&ScanSettings::default())
    }
}

impl From<&ScanSettings> for FilterPolicy {
    fn from(settings: &ScanSettings) -> Self {
        Self {
            ignore_short_tracks: settings.ignore_short_tracks,
            min_duration_ms: settings.min_duration_ms,
        }
    }
}

/// Why a record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Blank or relative path
    MalformedPath,
    /// Duration below zero
    InvalidDuration,
    /// Shorter than the policy floor
    TooShort,
    /// File does not exist
    Missing,
    /// File cannot be opened, or the probe itself failed
    Unreadable,
    /// Zero-byte file
    Empty,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RejectReason::MalformedPath => "malformed path",
            RejectReason::InvalidDuration => "invalid duration",
            RejectReason::TooShort => "too short",
            RejectReason::Missing => "missing",
            RejectReason::Unreadable => "unreadable",
            RejectReason::Empty => "empty",
        };
        f.write_str(reason)
    }
}

/// Validity checks backed by a file system probe.
#[derive(Clone)]
pub struct ValidityFilter {
    probe: Arc<dyn FileSystemProbe>,
}

impl ValidityFilter {
    pub fn new(probe: Arc<dyn FileSystemProbe>) -> Self {
        Self { probe }
    }

    /// Evaluate a record, returning the first failed check.
    pub fn evaluate(
        &self,
        record: &TrackRecord,
        policy: &FilterPolicy,
    ) -> std::result::Result<(), RejectReason> {
        if record.path.trim().is_empty() || !Path::new(&record.path).is_absolute() {
            return Err(RejectReason::MalformedPath);
        }

        if record.duration_ms < 0 {
            return Err(RejectReason::InvalidDuration);
        }

        if policy.ignore_short_tracks && record.duration_ms < policy.min_duration_ms {
            return Err(RejectReason::TooShort);
        }

        let path = Path::new(&record.path);

        match self.probe.exists(path) {
            Ok(true) => {}
            Ok(false) => return Err(RejectReason::Missing),
            Err(_) => return Err(RejectReason::Unreadable),
        }

        match self.probe.is_readable(path) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Err(RejectReason::Unreadable),
        }

        match self.probe.size_of(path) {
            Ok(0) => Err(RejectReason::Empty),
            Ok(_) => Ok(()),
            Err(_) => Err(RejectReason::Unreadable),
        }
    }

    /// Whether the record should be included.
    pub fn is_valid(&self, record: &TrackRecord, policy: &FilterPolicy) -> bool {
        self.evaluate(record, policy).is_ok()
    }
}

impl fmt::Debug for ValidityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidityFilter").finish_non_exhaustive()
    }
}
