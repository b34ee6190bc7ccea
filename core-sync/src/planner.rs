//! # Reconciliation Planner
//!
//! Builds the [`ReconciliationPlan`] for one scan without writing anything.
//!
//! ## Phases
//!
//! 1. **Selecting scope** - enumerate the media index for the requested scope
//! 2. **Filtering** - normalize names, drop duplicate paths and invalid records
//! 3. **Classifying** - look up each valid record by path and route it to
//!    insert, update or no-op
//! 4. **Aggregating** - propose albums and artists the store has not seen
//! 5. **Detecting removals** - full scope only: stored paths the index no
//!    longer reports
//!
//! The cancellation token is checked between phases, never inside one.
//!
//! ## Failure handling
//!
//! A failed lookup for a single record is counted in `songs_failed` and the
//! record is skipped. A lookup that finds two rows for one path is a data
//! integrity fault and aborts the plan. Enumeration failures abort with
//! `SourceUnavailable`.

use crate::aggregator::aggregate;
use crate::classifier::{classify, Classification};
use crate::error::{Result, SyncError};
use crate::filter::{FilterPolicy, ValidityFilter};
use crate::plan::{AlbumKey, ReconciliationPlan, SongChange, SongRemoval};
use crate::scope::ScanScope;
use crate::state::{ScanState, ScanStateMachine};
use crate::store::LibraryStore;
use bridge_traits::{MediaSource, TrackRecord};
use core_library::models::NewSong;
use core_library::LibraryError;
use core_runtime::logging::strip_path;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Replace blank artist or album names so the store never holds blank keys.
pub fn normalize_names(record: &mut TrackRecord) {
    if record.artist.trim().is_empty() {
        record.artist = UNKNOWN_ARTIST.to_string();
    }
    if record.album.trim().is_empty() {
        record.album = UNKNOWN_ALBUM.to_string();
    }
}

pub struct ReconciliationPlanner {
    source: Arc<dyn MediaSource>,
    filter: ValidityFilter,
    store: LibraryStore,
}

impl ReconciliationPlanner {
    pub fn new(source: Arc<dyn MediaSource>, filter: ValidityFilter, store: LibraryStore) -> Self {
        Self {
            source,
            filter,
            store,
        }
    }

    /// Compute the plan for `scope`.
    ///
    /// `started_at` is recorded on the plan and later becomes the bookkeeping
    /// timestamp.
    #[instrument(skip(self, policy, cancel), fields(scope = %scope))]
    pub async fn plan(
        &self,
        scope: ScanScope,
        policy: &FilterPolicy,
        started_at: i64,
        cancel: &CancellationToken,
    ) -> Result<ReconciliationPlan> {
        scope.validate()?;

        let mut machine = ScanStateMachine::new(scope.allows_removals());
        let result = self
            .build(&scope, policy, started_at, cancel, &mut machine)
            .await;

        if let Err(e) = &result {
            warn!("Planning stopped in {} state: {}", machine.state(), e);
        }

        result
    }

    async fn build(
        &self,
        scope: &ScanScope,
        policy: &FilterPolicy,
        started_at: i64,
        cancel: &CancellationToken,
        machine: &mut ScanStateMachine,
    ) -> Result<ReconciliationPlan> {
        // Phase 1: Selecting scope
        machine.transition(ScanState::SelectingScope)?;
        info!("Phase 1: Enumerating {} scope", scope.label());
        let records = self.enumerate(scope).await?;
        let songs_found = records.len() as u64;
        info!("Media index returned {} records", songs_found);
        check_cancelled(cancel)?;

        // Phase 2: Filtering
        machine.transition(ScanState::Filtering)?;
        info!("Phase 2: Filtering {} records", songs_found);
        let mut source_paths: HashSet<String> = HashSet::with_capacity(records.len());
        let mut valid = Vec::with_capacity(records.len());
        let mut songs_filtered = 0u64;

        for mut record in records {
            if !source_paths.insert(record.path.clone()) {
                debug!("Skipping duplicate path {}", strip_path(&record.path));
                songs_filtered += 1;
                continue;
            }

            normalize_names(&mut record);

            match self.filter.evaluate(&record, policy) {
                Ok(()) => valid.push(record),
                Err(reason) => {
                    debug!("Skipping {}: {}", strip_path(&record.path), reason);
                    songs_filtered += 1;
                }
            }
        }
        info!("{} valid, {} filtered", valid.len(), songs_filtered);
        check_cancelled(cancel)?;

        // Phase 3: Classifying
        machine.transition(ScanState::Classifying)?;
        info!("Phase 3: Classifying {} records", valid.len());
        let mut songs_to_insert = Vec::new();
        let mut songs_to_update = Vec::new();
        let mut changed_records = Vec::new();
        let mut songs_unchanged = 0u64;
        let mut songs_failed = 0u64;

        for record in valid {
            let existing = match self.store.songs.find_by_path(&record.path).await {
                Ok(existing) => existing,
                Err(LibraryError::DataIntegrity(message)) => {
                    return Err(SyncError::DataIntegrity(message));
                }
                Err(e) => {
                    warn!("Lookup failed for {}: {}", strip_path(&record.path), e);
                    songs_failed += 1;
                    continue;
                }
            };

            match classify(&record, existing.as_ref()) {
                Classification::New => {
                    songs_to_insert.push(NewSong::from(&record));
                    changed_records.push(record);
                }
                Classification::Updated => {
                    if let Some(previous) = existing {
                        songs_to_update.push(SongChange {
                            song: NewSong::from(&record),
                            previous_album: previous.album,
                            previous_artist: previous.artist,
                        });
                        changed_records.push(record);
                    }
                }
                Classification::Unchanged => songs_unchanged += 1,
            }
        }
        info!(
            "{} new, {} updated, {} unchanged, {} failed",
            songs_to_insert.len(),
            songs_to_update.len(),
            songs_unchanged,
            songs_failed
        );
        check_cancelled(cancel)?;

        // Phase 4: Aggregating
        machine.transition(ScanState::Aggregating)?;
        info!("Phase 4: Aggregating {} changed songs", changed_records.len());
        let (known_albums, known_artists) = self.known_aggregates(&changed_records).await?;
        let aggregation = aggregate(
            &changed_records,
            |name, artist| known_albums.contains(&(name.to_string(), artist.to_string())),
            |name| known_artists.contains(name),
        );
        info!(
            "{} new albums, {} new artists",
            aggregation.new_albums.len(),
            aggregation.new_artists.len()
        );
        check_cancelled(cancel)?;

        // Phase 5: Detecting removals
        let mut removals = Vec::new();
        if scope.allows_removals() {
            machine.transition(ScanState::DetectingRemovals)?;
            info!("Phase 5: Detecting removals");
            removals = self.detect_removals(&source_paths).await?;
            info!("{} songs no longer in the media index", removals.len());
            check_cancelled(cancel)?;
        }

        machine.transition(ScanState::Planned)?;

        let mut plan = ReconciliationPlan::new(scope.clone(), started_at, machine.clone());
        plan.songs_to_insert = songs_to_insert;
        plan.songs_to_update = songs_to_update;
        plan.removals = removals;
        plan.albums_to_insert = aggregation.new_albums;
        plan.artists_to_insert = aggregation.new_artists;
        plan.report.songs_found = songs_found;
        plan.report.songs_filtered = songs_filtered;
        plan.report.songs_failed = songs_failed;
        plan.report.songs_unchanged = songs_unchanged;

        Ok(plan)
    }

    async fn enumerate(&self, scope: &ScanScope) -> Result<Vec<TrackRecord>> {
        let result = match scope {
            ScanScope::Full => self.source.list_all().await,
            ScanScope::Incremental { since } => {
                let since = match since {
                    Some(ts) => *ts,
                    None => self.store.bookkeeping.get().await?.last_scan_at.unwrap_or(0),
                };
                debug!("Listing records modified since {}", since);
                self.source.list_modified_since(since).await
            }
            ScanScope::FolderScoped { paths } => self.source.list_under_paths(paths).await,
        };

        result.map_err(|e| SyncError::SourceUnavailable(e.to_string()))
    }

    /// Which album and artist keys of the batch already exist in the store.
    async fn known_aggregates(
        &self,
        songs: &[TrackRecord],
    ) -> Result<(HashSet<AlbumKey>, HashSet<String>)> {
        let mut album_keys: HashSet<AlbumKey> = HashSet::new();
        let mut artist_names: HashSet<String> = HashSet::new();
        let mut known_albums = HashSet::new();
        let mut known_artists = HashSet::new();

        for song in songs {
            let key = (song.album.clone(), song.artist.clone());
            if album_keys.insert(key.clone())
                && self
                    .store
                    .albums
                    .find_by_name_and_artist(&key.0, &key.1)
                    .await?
                    .is_some()
            {
                known_albums.insert(key);
            }

            if artist_names.insert(song.artist.clone())
                && self.store.artists.find_by_name(&song.artist).await?.is_some()
            {
                known_artists.insert(song.artist.clone());
            }
        }

        Ok((known_albums, known_artists))
    }

    async fn detect_removals(&self, source_paths: &HashSet<String>) -> Result<Vec<SongRemoval>> {
        let stored = self.store.songs.all_paths().await?;
        let mut removals = Vec::new();

        for path in stored {
            if source_paths.contains(&path) {
                continue;
            }
            if let Some(song) = self.store.songs.find_by_path(&path).await? {
                removals.push(SongRemoval {
                    path: song.path,
                    album: song.album,
                    artist: song.artist,
                });
            }
        }

        Ok(removals)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    Ok(())
}
