//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges from a [`CoreConfig`] into the
//! library store and the scan engine. Desktop apps typically enable the
//! `desktop-shims` feature, which lets the configuration fall back to the
//! `std::fs` file system probe from `bridge-desktop`.
//!
//! ```rust,ignore
//! use core_service::CoreService;
//! use core_runtime::config::CoreConfig;
//! use core_sync::ScanScope;
//!
//! # async fn example(source: std::sync::Arc<dyn bridge_traits::MediaSource>) -> core_service::Result<()> {
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/medialib/library.db")
//!     .media_source(source)
//!     .build()?;
//!
//! let core = CoreService::bootstrap(config).await?;
//! let report = core.run_scan(ScanScope::Full).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_library::{create_pool, DatabaseConfig};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::logging::LoggingConfig;
use core_sync::{FilterPolicy, LibraryStore, ScanCoordinator, ScanReport, ScanScope};
use sqlx::SqlitePool;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    pool: SqlitePool,
    store: LibraryStore,
    event_bus: Arc<EventBus>,
    coordinator: Arc<ScanCoordinator>,
}

impl CoreService {
    /// Open (or create) the library database and wire the scan engine.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let pool = create_pool(DatabaseConfig::new(&config.database_path))
            .await
            .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

        info!(
            database = %config.database_path.display(),
            "Core service initialized"
        );

        Ok(Self::with_pool(config, pool))
    }

    /// Wire the scan engine over an existing pool.
    pub fn with_pool(config: CoreConfig, pool: SqlitePool) -> Self {
        let store = LibraryStore::sqlite(pool.clone());
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        let coordinator = ScanCoordinator::new(
            Arc::clone(&config.media_source),
            Arc::clone(&config.file_system_probe),
            store.clone(),
            Arc::clone(&event_bus),
            Arc::clone(&config.clock),
            config.scan_settings.clone(),
        );

        Self {
            config: Arc::new(config),
            pool,
            store,
            event_bus,
            coordinator: Arc::new(coordinator),
        }
    }

    /// Run a scan with the configured filter policy.
    pub async fn run_scan(&self, scope: ScanScope) -> Result<ScanReport> {
        let policy = self.coordinator.default_policy();
        Ok(self.coordinator.run_scan(scope, &policy).await?)
    }

    /// Run a scan with an explicit filter policy.
    pub async fn run_scan_with_policy(
        &self,
        scope: ScanScope,
        policy: &FilterPolicy,
    ) -> Result<ScanReport> {
        Ok(self.coordinator.run_scan(scope, policy).await?)
    }

    /// Run a scan, retrying transient failures per the configured settings.
    pub async fn run_scan_with_retry(&self, scope: ScanScope) -> Result<ScanReport> {
        let policy = self.coordinator.default_policy();
        Ok(self.coordinator.run_scan_with_retry(scope, &policy).await?)
    }

    /// Subscribe to scan and library events.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Repositories over the library database.
    pub fn library(&self) -> &LibraryStore {
        &self.store
    }

    pub fn coordinator(&self) -> Arc<ScanCoordinator> {
        Arc::clone(&self.coordinator)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Logging configuration that forwards to the configured host sink, if any.
    pub fn logging_config(&self) -> LoggingConfig {
        match &self.config.logger_sink {
            Some(sink) => LoggingConfig::default().with_logger_sink(Arc::clone(sink)),
            None => LoggingConfig::default(),
        }
    }

    /// Close the database pool.
    pub async fn shutdown(&self) {
        self.pool.close().await;
        info!("Core service shut down");
    }
}
