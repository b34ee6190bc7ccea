//! # Store Writer
//!
//! Applies a [`ReconciliationPlan`] as a fixed, ordered sequence of writes:
//!
//! 1. insert new artists
//! 2. insert new albums
//! 3. insert new songs
//! 4. update changed songs
//! 5. delete removed songs (full scope only)
//! 6. recompute statistics of every touched album and artist
//! 7. advance scan bookkeeping to the scan start time
//!
//! A failed step stops the sequence. Earlier steps stay applied; re-running
//! the scan reclassifies against the partially updated store and converges.
//!
//! Songs written by a failed apply look `Unchanged` to the next scan, so the
//! touched keys alone cannot repair their albums and artists. Before the first
//! write the writer sets the persistent `stats_dirty` marker and clears it only
//! once step 6 has finished. An apply that finds the marker already set
//! recomputes every stored album and artist, not just the touched ones.
//!
//! Step 6 fans out one recompute per entity, bounded by
//! `max_concurrent_recomputes`, and is joined before step 7. An entity whose
//! recomputed song count is zero is deleted.

use crate::error::{Result, SyncError};
use crate::plan::{AlbumKey, ReconciliationPlan};
use crate::report::ScanReport;
use crate::state::ScanState;
use crate::store::LibraryStore;
use core_library::models::{NewAlbum, NewArtist, SongUpdate};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const STEP_MARK_DIRTY: &str = "mark_stats_dirty";
const STEP_INSERT_ARTISTS: &str = "insert_artists";
const STEP_INSERT_ALBUMS: &str = "insert_albums";
const STEP_INSERT_SONGS: &str = "insert_songs";
const STEP_UPDATE_SONGS: &str = "update_songs";
const STEP_REMOVE_SONGS: &str = "remove_songs";
const STEP_RECOMPUTE: &str = "recompute_stats";
const STEP_BOOKKEEPING: &str = "update_bookkeeping";

/// What one apply changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Planner counters plus the write counters of this apply
    pub report: ScanReport,
    /// Paths deleted in step 5
    pub removed_paths: Vec<String>,
    /// Whether step 7 ran
    pub bookkeeping_advanced: bool,
    /// Whether step 6 recomputed every aggregate after an interrupted apply
    pub resynced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recompute {
    Updated,
    Inserted,
    Removed,
    Absent,
}

pub struct StoreWriter {
    store: LibraryStore,
    max_concurrent_recomputes: usize,
}

impl StoreWriter {
    pub fn new(store: LibraryStore, max_concurrent_recomputes: usize) -> Self {
        Self {
            store,
            max_concurrent_recomputes: max_concurrent_recomputes.max(1),
        }
    }

    /// Apply `plan`, consuming it.
    ///
    /// The cancellation token is checked once before the first write. Once
    /// writing starts the plan runs to completion or to its first failure.
    #[instrument(skip(self, plan, cancel), fields(scope = %plan.scope))]
    pub async fn apply(
        &self,
        mut plan: ReconciliationPlan,
        cancel: &CancellationToken,
    ) -> Result<ApplyOutcome> {
        if cancel.is_cancelled() {
            plan.state.fail();
            return Err(SyncError::Cancelled);
        }

        match self.write(&plan).await {
            Ok(outcome) => {
                plan.state.transition(ScanState::Applied)?;
                Ok(outcome)
            }
            Err(e) => {
                plan.state.fail();
                Err(e)
            }
        }
    }

    async fn write(&self, plan: &ReconciliationPlan) -> Result<ApplyOutcome> {
        let mut report = plan.report.clone();
        let resync = self.store.bookkeeping.get().await?.stats_dirty;
        let writes = !plan.is_empty();

        if resync {
            warn!("Statistics left stale by an interrupted scan, recomputing every aggregate");
        } else if writes {
            self.store
                .bookkeeping
                .set_stats_dirty(true)
                .await
                .map_err(|e| SyncError::store_write(STEP_MARK_DIRTY, e))?;
        }

        // Step 1: artists
        for candidate in &plan.artists_to_insert {
            let artist = NewArtist {
                name: candidate.name.clone(),
                song_count: candidate.song_count,
                album_count: candidate.album_count,
                total_duration_ms: candidate.total_duration_ms,
            };
            self.store
                .artists
                .insert(&artist)
                .await
                .map_err(|e| SyncError::store_write(STEP_INSERT_ARTISTS, e))?;
            report.artists_added += 1;
        }
        debug!("Step 1: inserted {} artists", plan.artists_to_insert.len());

        // Step 2: albums
        for candidate in &plan.albums_to_insert {
            let album = NewAlbum {
                name: candidate.name.clone(),
                artist: candidate.artist.clone(),
                song_count: candidate.song_count,
                total_duration_ms: candidate.total_duration_ms,
                year: candidate.year,
            };
            self.store
                .albums
                .insert(&album)
                .await
                .map_err(|e| SyncError::store_write(STEP_INSERT_ALBUMS, e))?;
            report.albums_added += 1;
        }
        debug!("Step 2: inserted {} albums", plan.albums_to_insert.len());

        // Step 3: new songs
        if !plan.songs_to_insert.is_empty() {
            report.songs_added = self
                .store
                .songs
                .insert_many(&plan.songs_to_insert)
                .await
                .map_err(|e| SyncError::store_write(STEP_INSERT_SONGS, e))?;
        }
        debug!("Step 3: inserted {} songs", report.songs_added);

        // Step 4: changed songs
        if !plan.songs_to_update.is_empty() {
            let updates: Vec<SongUpdate> =
                plan.songs_to_update.iter().map(|c| c.song.clone()).collect();
            report.songs_updated = self
                .store
                .songs
                .update_many(&updates)
                .await
                .map_err(|e| SyncError::store_write(STEP_UPDATE_SONGS, e))?;
        }
        debug!("Step 4: updated {} songs", report.songs_updated);

        // Step 5: removals
        let mut removed_paths = Vec::new();
        if plan.scope.allows_removals() && !plan.removals.is_empty() {
            removed_paths = plan.paths_to_remove();
            report.songs_removed = self
                .store
                .songs
                .delete_by_paths(&removed_paths)
                .await
                .map_err(|e| SyncError::store_write(STEP_REMOVE_SONGS, e))?;
            debug!("Step 5: removed {} songs", report.songs_removed);
        }

        // Step 6: statistics
        let (albums, artists) = if resync {
            self.all_aggregate_keys(plan).await?
        } else {
            (plan.touched_albums(), plan.touched_artists())
        };
        debug!(
            "Step 6: recomputing {} albums and {} artists",
            albums.len(),
            artists.len()
        );

        for outcome in self.recompute_albums(albums).await? {
            match outcome {
                Recompute::Inserted => report.albums_added += 1,
                Recompute::Removed => report.albums_removed += 1,
                Recompute::Updated | Recompute::Absent => {}
            }
        }
        for outcome in self.recompute_artists(artists).await? {
            match outcome {
                Recompute::Inserted => report.artists_added += 1,
                Recompute::Removed => report.artists_removed += 1,
                Recompute::Updated | Recompute::Absent => {}
            }
        }
        if writes || resync {
            self.store
                .bookkeeping
                .set_stats_dirty(false)
                .await
                .map_err(|e| SyncError::store_write(STEP_RECOMPUTE, e))?;
        }

        // Step 7: bookkeeping
        let mut bookkeeping_advanced = false;
        match plan.scope.bookkeeping_kind() {
            Some(_) if report.songs_failed > 0 => {
                warn!(
                    "{} records failed lookup, leaving scan bookkeeping unchanged",
                    report.songs_failed
                );
            }
            Some(kind) => {
                self.store
                    .bookkeeping
                    .record_scan(kind, plan.started_at)
                    .await
                    .map_err(|e| SyncError::store_write(STEP_BOOKKEEPING, e))?;
                bookkeeping_advanced = true;
                debug!("Step 7: {} scan recorded at {}", kind, plan.started_at);
            }
            None => debug!("Step 7: folder scan, bookkeeping unchanged"),
        }

        info!("Plan applied: {}", report);

        Ok(ApplyOutcome {
            report,
            removed_paths,
            bookkeeping_advanced,
            resynced: resync,
        })
    }

    /// Every album and artist the store knows, from either side: aggregate
    /// rows whose songs are gone and songs whose aggregate row is missing.
    async fn all_aggregate_keys(
        &self,
        plan: &ReconciliationPlan,
    ) -> Result<(Vec<AlbumKey>, Vec<String>)> {
        let mut albums: BTreeSet<AlbumKey> = plan.touched_albums().into_iter().collect();
        albums.extend(self.store.songs.album_keys().await?);
        albums.extend(
            self.store
                .albums
                .all()
                .await?
                .into_iter()
                .map(|album| (album.name, album.artist)),
        );

        let mut artists: BTreeSet<String> = plan.touched_artists().into_iter().collect();
        artists.extend(self.store.songs.artist_names().await?);
        artists.extend(
            self.store
                .artists
                .all()
                .await?
                .into_iter()
                .map(|artist| artist.name),
        );

        Ok((albums.into_iter().collect(), artists.into_iter().collect()))
    }

    async fn recompute_albums(&self, keys: Vec<AlbumKey>) -> Result<Vec<Recompute>> {
        let results: Vec<Result<Recompute>> = stream::iter(keys)
            .map(|(name, artist)| {
                let store = self.store.clone();
                async move {
                    recompute_album(&store, &name, &artist)
                        .await
                        .map_err(|e| SyncError::store_write(STEP_RECOMPUTE, e))
                }
            })
            .buffer_unordered(self.max_concurrent_recomputes)
            .collect()
            .await;

        results.into_iter().collect()
    }

    async fn recompute_artists(&self, names: Vec<String>) -> Result<Vec<Recompute>> {
        let results: Vec<Result<Recompute>> = stream::iter(names)
            .map(|name| {
                let store = self.store.clone();
                async move {
                    recompute_artist(&store, &name)
                        .await
                        .map_err(|e| SyncError::store_write(STEP_RECOMPUTE, e))
                }
            })
            .buffer_unordered(self.max_concurrent_recomputes)
            .collect()
            .await;

        results.into_iter().collect()
    }
}

async fn recompute_album(
    store: &LibraryStore,
    name: &str,
    artist: &str,
) -> core_library::Result<Recompute> {
    let stats = store.songs.album_stats(name, artist).await?;
    let existing = store.albums.find_by_name_and_artist(name, artist).await?;

    match existing {
        Some(album) if stats.song_count == 0 => {
            store.albums.delete(album.id).await?;
            Ok(Recompute::Removed)
        }
        Some(album) => {
            store.albums.update_stats(album.id, &stats).await?;
            Ok(Recompute::Updated)
        }
        None if stats.song_count > 0 => {
            store
                .albums
                .insert(&NewAlbum {
                    name: name.to_string(),
                    artist: artist.to_string(),
                    song_count: stats.song_count,
                    total_duration_ms: stats.total_duration_ms,
                    year: stats.first_year,
                })
                .await?;
            Ok(Recompute::Inserted)
        }
        None => Ok(Recompute::Absent),
    }
}

async fn recompute_artist(store: &LibraryStore, name: &str) -> core_library::Result<Recompute> {
    let stats = store.songs.artist_stats(name).await?;
    let existing = store.artists.find_by_name(name).await?;

    match existing {
        Some(artist) if stats.song_count == 0 => {
            store.artists.delete(artist.id).await?;
            Ok(Recompute::Removed)
        }
        Some(artist) => {
            store.artists.update_stats(artist.id, &stats).await?;
            Ok(Recompute::Updated)
        }
        None if stats.song_count > 0 => {
            store
                .artists
                .insert(&NewArtist {
                    name: name.to_string(),
                    song_count: stats.song_count,
                    album_count: stats.album_count,
                    total_duration_ms: stats.total_duration_ms,
                })
                .await?;
            Ok(Recompute::Inserted)
        }
        None => Ok(Recompute::Absent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{AlbumCandidate, ArtistCandidate};
    use crate::plan::{SongChange, SongRemoval};
    use crate::scope::ScanScope;
    use crate::state::ScanStateMachine;
    use bridge_traits::TrackRecord;
    use core_library::create_test_pool;
    use core_library::models::NewSong;

    fn song(path: &str, artist: &str, album: &str, duration_ms: i64) -> NewSong {
        NewSong::from(&TrackRecord::new(path, path, artist, album, duration_ms, 100))
    }

    fn planned(scope: ScanScope) -> ReconciliationPlan {
        let mut machine = ScanStateMachine::new(scope.allows_removals());
        let mut path = vec![
            ScanState::SelectingScope,
            ScanState::Filtering,
            ScanState::Classifying,
            ScanState::Aggregating,
        ];
        if scope.allows_removals() {
            path.push(ScanState::DetectingRemovals);
        }
        path.push(ScanState::Planned);
        for state in path {
            machine.transition(state).unwrap();
        }
        ReconciliationPlan::new(scope, 1_000, machine)
    }

    async fn writer() -> (StoreWriter, LibraryStore) {
        let store = LibraryStore::sqlite(create_test_pool().await.unwrap());
        (StoreWriter::new(store.clone(), 4), store)
    }

    fn seed_plan() -> ReconciliationPlan {
        let mut plan = planned(ScanScope::Full);
        plan.artists_to_insert.push(ArtistCandidate {
            name: "Artist1".to_string(),
            song_count: 2,
            album_count: 1,
            total_duration_ms: 380_000,
        });
        plan.albums_to_insert.push(AlbumCandidate {
            name: "Album1".to_string(),
            artist: "Artist1".to_string(),
            song_count: 2,
            total_duration_ms: 380_000,
            year: None,
        });
        plan.songs_to_insert.push(song("/m/a.mp3", "Artist1", "Album1", 200_000));
        plan.songs_to_insert.push(song("/m/b.mp3", "Artist1", "Album1", 180_000));
        plan
    }

    #[tokio::test]
    async fn test_apply_inserts_and_records_bookkeeping() {
        let (writer, store) = writer().await;

        let outcome = writer.apply(seed_plan(), &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.report.songs_added, 2);
        assert_eq!(outcome.report.albums_added, 1);
        assert_eq!(outcome.report.artists_added, 1);
        assert!(outcome.bookkeeping_advanced);

        let album = store
            .albums
            .find_by_name_and_artist("Album1", "Artist1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(album.song_count, 2);
        let bookkeeping = store.bookkeeping.get().await.unwrap();
        assert_eq!(bookkeeping.last_scan_at, Some(1_000));
        assert!(!bookkeeping.stats_dirty);
        assert!(!outcome.resynced);
    }

    #[tokio::test]
    async fn test_moving_a_song_recomputes_both_albums() {
        let (writer, store) = writer().await;
        writer.apply(seed_plan(), &CancellationToken::new()).await.unwrap();

        let mut plan = planned(ScanScope::incremental_since(0));
        plan.albums_to_insert.push(AlbumCandidate {
            name: "Album2".to_string(),
            artist: "Artist1".to_string(),
            song_count: 1,
            total_duration_ms: 200_000,
            year: None,
        });
        plan.songs_to_update.push(SongChange {
            song: song("/m/a.mp3", "Artist1", "Album2", 200_000),
            previous_album: "Album1".to_string(),
            previous_artist: "Artist1".to_string(),
        });

        let outcome = writer.apply(plan, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.report.songs_updated, 1);

        let album1 = store
            .albums
            .find_by_name_and_artist("Album1", "Artist1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(album1.song_count, 1);

        let artist = store.artists.find_by_name("Artist1").await.unwrap().unwrap();
        assert_eq!(artist.song_count, 2);
        assert_eq!(artist.album_count, 2);
    }

    #[tokio::test]
    async fn test_removing_last_song_prunes_aggregates() {
        let (writer, store) = writer().await;
        writer.apply(seed_plan(), &CancellationToken::new()).await.unwrap();

        let mut plan = planned(ScanScope::Full);
        for path in ["/m/a.mp3", "/m/b.mp3"] {
            plan.removals.push(SongRemoval {
                path: path.to_string(),
                album: "Album1".to_string(),
                artist: "Artist1".to_string(),
            });
        }

        let outcome = writer.apply(plan, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.report.songs_removed, 2);
        assert_eq!(outcome.report.albums_removed, 1);
        assert_eq!(outcome.report.artists_removed, 1);
        assert_eq!(outcome.removed_paths.len(), 2);
        assert_eq!(store.albums.count().await.unwrap(), 0);
        assert_eq!(store.artists.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_partial_scope_ignores_removals() {
        let (writer, store) = writer().await;
        writer.apply(seed_plan(), &CancellationToken::new()).await.unwrap();

        let mut plan = planned(ScanScope::folders(["/m"]));
        plan.removals.push(SongRemoval {
            path: "/m/a.mp3".to_string(),
            album: "Album1".to_string(),
            artist: "Artist1".to_string(),
        });

        let outcome = writer.apply(plan, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.report.songs_removed, 0);
        assert!(!outcome.bookkeeping_advanced);
        assert_eq!(store.songs.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_lookups_leave_bookkeeping_stale() {
        let (writer, store) = writer().await;
        let mut plan = seed_plan();
        plan.report.songs_failed = 1;

        let outcome = writer.apply(plan, &CancellationToken::new()).await.unwrap();

        assert!(!outcome.bookkeeping_advanced);
        assert_eq!(store.bookkeeping.get().await.unwrap().last_scan_at, None);
    }

    #[tokio::test]
    async fn test_cancelled_before_apply_writes_nothing() {
        let (writer, store) = writer().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = writer.apply(seed_plan(), &cancel).await;

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert_eq!(store.songs.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_names_the_step() {
        let (writer, _) = writer().await;
        let mut plan = seed_plan();
        plan.albums_to_insert.push(plan.albums_to_insert[0].clone());

        let result = writer.apply(plan, &CancellationToken::new()).await;

        match result {
            Err(SyncError::StoreWrite { step, .. }) => assert_eq!(step, STEP_INSERT_ALBUMS),
            other => panic!("expected StoreWrite, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_interrupted_apply_is_repaired_by_next_apply() {
        let (writer, store) = writer().await;
        let mut plan = seed_plan();
        plan.albums_to_insert.push(plan.albums_to_insert[0].clone());

        // Step 1 lands, step 2 fails: the artist row claims two songs that
        // were never written.
        assert!(writer.apply(plan, &CancellationToken::new()).await.is_err());
        assert!(store.bookkeeping.get().await.unwrap().stats_dirty);
        assert_eq!(store.artists.count().await.unwrap(), 1);

        let outcome = writer
            .apply(planned(ScanScope::Full), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.resynced);
        assert_eq!(outcome.report.artists_removed, 1);
        assert_eq!(outcome.report.albums_removed, 1);
        assert_eq!(store.artists.count().await.unwrap(), 0);
        assert_eq!(store.albums.count().await.unwrap(), 0);
        assert!(!store.bookkeeping.get().await.unwrap().stats_dirty);
    }

    #[tokio::test]
    async fn test_recreated_album_takes_first_song_year() {
        let (writer, store) = writer().await;
        store
            .songs
            .insert_many(&[
                NewSong::from(
                    &TrackRecord::new("/m/b.mp3", "B", "Artist1", "Album1", 200_000, 100)
                        .with_year(2004),
                ),
                NewSong::from(
                    &TrackRecord::new("/m/a.mp3", "A", "Artist1", "Album1", 200_000, 100)
                        .with_year(1999),
                ),
            ])
            .await
            .unwrap();
        store.bookkeeping.set_stats_dirty(true).await.unwrap();

        let outcome = writer
            .apply(planned(ScanScope::Full), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.report.albums_added, 1);
        assert_eq!(outcome.report.artists_added, 1);

        let album = store
            .albums
            .find_by_name_and_artist("Album1", "Artist1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(album.song_count, 2);
        assert_eq!(album.year, Some(2004));
        assert_eq!(album.min_year, Some(1999));
    }

    #[tokio::test]
    async fn test_empty_plan_leaves_marker_untouched() {
        let (writer, store) = writer().await;

        let outcome = writer
            .apply(planned(ScanScope::folders(["/m"])), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.resynced);
        assert!(outcome.report.is_noop());
        assert!(!store.bookkeeping.get().await.unwrap().stats_dirty);
    }
}
