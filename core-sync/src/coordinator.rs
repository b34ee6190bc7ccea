//! # Scan Coordinator
//!
//! Entry point for library scans. Wires the planner and the writer together,
//! bounds planning with a timeout, and reports progress on the [`EventBus`].
//!
//! The timeout never interrupts the writer: once a plan starts applying it
//! runs to completion or to its first failed step.
//!
//! ## Workflow
//!
//! 1. Acquire the scan guard (one scan at a time)
//! 2. Emit `Started`
//! 3. Plan: enumerate, filter, classify, aggregate, detect removals
//! 4. Apply the plan to the store
//! 5. Emit `Completed` (plus `SongsRemoved` when a full scan deleted songs)
//!
//! Failures emit `Failed` with a `recoverable` flag matching
//! [`SyncError::is_retryable`]; cancellation emits `Cancelled`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{FilterPolicy, ScanCoordinator, ScanScope};
//!
//! # async fn example(coordinator: ScanCoordinator) -> core_sync::Result<()> {
//! let policy = coordinator.default_policy();
//! let report = coordinator.run_scan(ScanScope::Full, &policy).await?;
//! println!("{}", report);
//!
//! let report = coordinator
//!     .run_scan_with_retry(ScanScope::incremental(), &policy)
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SyncError};
use crate::filter::{FilterPolicy, ValidityFilter};
use crate::planner::ReconciliationPlanner;
use crate::report::ScanReport;
use crate::scope::ScanScope;
use crate::state::ScanId;
use crate::store::LibraryStore;
use crate::writer::StoreWriter;
use bridge_traits::{Clock, FileSystemProbe, MediaSource};
use core_runtime::config::ScanSettings;
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, ScanEvent};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

pub struct ScanCoordinator {
    planner: ReconciliationPlanner,
    writer: StoreWriter,
    event_bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    settings: ScanSettings,
    /// Held for the duration of a scan
    scan_guard: Mutex<()>,
}

impl ScanCoordinator {
    pub fn new(
        source: Arc<dyn MediaSource>,
        probe: Arc<dyn FileSystemProbe>,
        store: LibraryStore,
        event_bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        settings: ScanSettings,
    ) -> Self {
        let planner =
            ReconciliationPlanner::new(source, ValidityFilter::new(probe), store.clone());
        let writer = StoreWriter::new(store, settings.max_concurrent_recomputes);

        Self {
            planner,
            writer,
            event_bus,
            clock,
            settings,
            scan_guard: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Filter policy derived from the configured settings.
    pub fn default_policy(&self) -> FilterPolicy {
        FilterPolicy::from(&self.settings)
    }

    /// Run one scan to completion.
    ///
    /// # Errors
    ///
    /// - `ScanInProgress` if another scan holds the guard
    /// - `SourceUnavailable` if the media index cannot be enumerated
    /// - `StoreWrite` if a write step failed (earlier steps stay applied)
    /// - `DataIntegrity` if the store holds two songs with one path
    /// - `Timeout` if planning exceeded `scan_timeout_secs` (nothing written)
    pub async fn run_scan(&self, scope: ScanScope, policy: &FilterPolicy) -> Result<ScanReport> {
        self.run_scan_with_cancel(scope, policy, CancellationToken::new())
            .await
    }

    /// Run one scan, stopping between stages once `cancel` fires.
    ///
    /// A cancelled scan writes nothing and leaves the bookkeeping untouched.
    pub async fn run_scan_with_cancel(
        &self,
        scope: ScanScope,
        policy: &FilterPolicy,
        cancel: CancellationToken,
    ) -> Result<ScanReport> {
        let _guard = self
            .scan_guard
            .try_lock()
            .map_err(|_| SyncError::ScanInProgress)?;

        self.run_guarded(scope, policy, &cancel).await
    }

    /// Run a scan, retrying retryable failures up to `max_attempts` times
    /// with linear backoff.
    pub async fn run_scan_with_retry(
        &self,
        scope: ScanScope,
        policy: &FilterPolicy,
    ) -> Result<ScanReport> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.run_scan(scope.clone(), policy).await {
                Ok(report) => return Ok(report),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.settings.backoff_for_attempt(attempt);
                    warn!(
                        "Scan attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        error!("Scan failed after {} attempts: {}", attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Run one folder-scoped sub-scan per group under a single guard and
    /// merge their reports.
    ///
    /// Stops at the first failing group; groups before it stay applied.
    pub async fn run_folder_scans(
        &self,
        groups: Vec<Vec<String>>,
        policy: &FilterPolicy,
    ) -> Result<ScanReport> {
        if groups.is_empty() {
            return Err(SyncError::InvalidInput(
                "folder scan needs at least one group".to_string(),
            ));
        }

        let _guard = self
            .scan_guard
            .try_lock()
            .map_err(|_| SyncError::ScanInProgress)?;

        let cancel = CancellationToken::new();
        let mut total = ScanReport::default();
        for paths in groups {
            let report = self
                .run_guarded(ScanScope::FolderScoped { paths }, policy, &cancel)
                .await?;
            total.merge(&report);
        }

        info!("Folder scans complete: {}", total);
        Ok(total)
    }

    #[instrument(skip(self, policy, cancel), fields(scan_id = tracing::field::Empty, scope = %scope))]
    async fn run_guarded(
        &self,
        scope: ScanScope,
        policy: &FilterPolicy,
        cancel: &CancellationToken,
    ) -> Result<ScanReport> {
        let scan_id = ScanId::new();
        tracing::Span::current().record("scan_id", tracing::field::display(&scan_id));

        self.emit(ScanEvent::Started {
            scan_id: scan_id.to_string(),
            scope: scope.label().to_string(),
        });
        info!("Starting {} scan {}", scope.label(), scan_id);

        match self.execute(scan_id, scope, policy, cancel).await {
            Ok(report) => {
                info!("Scan {} completed: {}", scan_id, report);
                self.emit(ScanEvent::Completed {
                    scan_id: scan_id.to_string(),
                    songs_found: report.songs_found,
                    songs_added: report.songs_added,
                    songs_updated: report.songs_updated,
                    songs_removed: report.songs_removed,
                    albums_added: report.albums_added,
                    artists_added: report.artists_added,
                    elapsed_ms: report.elapsed_ms,
                });
                Ok(report)
            }
            Err(SyncError::Cancelled) => {
                warn!("Scan {} cancelled", scan_id);
                self.emit(ScanEvent::Cancelled {
                    scan_id: scan_id.to_string(),
                });
                Err(SyncError::Cancelled)
            }
            Err(e) => {
                error!("Scan {} failed: {}", scan_id, e);
                self.emit(ScanEvent::Failed {
                    scan_id: scan_id.to_string(),
                    message: e.to_string(),
                    recoverable: e.is_retryable(),
                });
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        scan_id: ScanId,
        scope: ScanScope,
        policy: &FilterPolicy,
        cancel: &CancellationToken,
    ) -> Result<ScanReport> {
        let timer = Instant::now();
        // Bookkeeping stores the start time so records modified mid-scan are
        // picked up by the next incremental scan.
        let started_at = self.clock.unix_timestamp();

        let planning = self.planner.plan(scope, policy, started_at, cancel);
        let plan = match timeout(self.settings.scan_timeout(), planning).await {
            Ok(plan) => plan?,
            Err(_) => {
                warn!("Planning timed out after {}s", self.settings.scan_timeout_secs);
                return Err(SyncError::Timeout(self.settings.scan_timeout_secs));
            }
        };
        let found = plan.report.songs_found;
        self.emit(ScanEvent::Progress {
            scan_id: scan_id.to_string(),
            phase: plan.state().to_string(),
            items_processed: found,
            total_items: Some(found),
            percent: 50,
        });

        let outcome = self.writer.apply(plan, cancel).await?;
        self.emit(ScanEvent::Progress {
            scan_id: scan_id.to_string(),
            phase: "Applied".to_string(),
            items_processed: found,
            total_items: Some(found),
            percent: 100,
        });

        if !outcome.removed_paths.is_empty() {
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::SongsRemoved {
                    paths: outcome.removed_paths,
                }))
                .ok();
        }

        let mut report = outcome.report;
        report.elapsed_ms = timer.elapsed().as_millis() as u64;
        Ok(report)
    }

    fn emit(&self, event: ScanEvent) {
        // No subscribers is not an error
        self.event_bus.emit(CoreEvent::Scan(event)).ok();
    }
}
