//! Host-supplied configuration for the library core.
//!
//! [`CoreConfig`] carries the bridges the scan engine talks to and the
//! [`ScanSettings`] tunables. `build()` fails at startup when a required
//! bridge is missing instead of letting the first scan find out.
//!
//! The `MediaSource` is always required. The `FileSystemProbe` is too, unless
//! the `desktop-shims` feature is on, in which case `StdFileSystemProbe`
//! fills in. The clock defaults to `SystemClock`; a `LoggerSink` is optional.
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, ScanSettings};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("library.db")
//!     .media_source(Arc::new(DeviceIndex::open()?))
//!     .scan_settings(ScanSettings::default().with_min_duration_ms(45_000))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, FileSystemProbe, LoggerSink, MediaSource, SystemClock};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Engine tunables for library scans.
///
/// Serialisable so hosts can persist them alongside other preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Drop tracks shorter than `min_duration_ms`
    pub ignore_short_tracks: bool,
    /// Duration floor in milliseconds
    pub min_duration_ms: i64,
    /// Parallel album/artist statistic recomputes
    pub max_concurrent_recomputes: usize,
    /// Attempts made by `run_scan_with_retry`
    pub max_attempts: u32,
    /// Base delay between retry attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,
    /// Upper bound for the planning phase of one scan
    pub scan_timeout_secs: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            ignore_short_tracks: true,
            min_duration_ms: 30_000,
            max_concurrent_recomputes: 4,
            max_attempts: 3,
            retry_backoff_ms: 500,
            scan_timeout_secs: 3600,
        }
    }
}

impl ScanSettings {
    pub fn with_ignore_short_tracks(mut self, enabled: bool) -> Self {
        self.ignore_short_tracks = enabled;
        self
    }

    pub fn with_min_duration_ms(mut self, min_duration_ms: i64) -> Self {
        self.min_duration_ms = min_duration_ms;
        self
    }

    pub fn with_max_concurrent_recomputes(mut self, n: usize) -> Self {
        self.max_concurrent_recomputes = n;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retry_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.retry_backoff_ms = backoff_ms;
        self
    }

    pub fn with_scan_timeout_secs(mut self, secs: u64) -> Self {
        self.scan_timeout_secs = secs;
        self
    }

    /// Scan timeout as a `Duration`
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    /// Delay before the given retry attempt (1-based)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<()> {
        if self.min_duration_ms < 0 {
            return Err(Error::Config(
                "Minimum track duration cannot be negative".to_string(),
            ));
        }

        if self.max_concurrent_recomputes == 0 {
            return Err(Error::Config(
                "max_concurrent_recomputes must be greater than 0".to_string(),
            ));
        }

        if self.max_attempts == 0 {
            return Err(Error::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.scan_timeout_secs == 0 {
            return Err(Error::Config(
                "scan_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration for the media library core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Device media index (required)
    pub media_source: Arc<dyn MediaSource>,

    /// File accessibility checks (required, desktop default available)
    pub file_system_probe: Arc<dyn FileSystemProbe>,

    /// Time source for scan start timestamps
    pub clock: Arc<dyn Clock>,

    /// Host log forwarding (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Engine tunables
    pub scan_settings: ScanSettings,

    /// Event bus buffer size
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("media_source", &"MediaSource { ... }")
            .field("file_system_probe", &"FileSystemProbe { ... }")
            .field("clock", &"Clock { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("scan_settings", &self.scan_settings)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Rejects an empty database path, a zero event buffer and unusable
    /// scan settings.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.scan_settings.validate()
    }
}

fn media_source_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaSource".to_string(),
        message: "MediaSource implementation is required to enumerate tracks. \
                 Inject an adapter over the platform media index."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system_probe() -> Result<Arc<dyn FileSystemProbe>> {
    use bridge_desktop::StdFileSystemProbe;

    let probe: Arc<dyn FileSystemProbe> = Arc::new(StdFileSystemProbe::new());
    Ok(probe)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system_probe() -> Result<Arc<dyn FileSystemProbe>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemProbe".to_string(),
        message: "FileSystemProbe implementation is required for track accessibility checks. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default StdFileSystemProbe. \
                 Mobile: inject a probe over the platform storage APIs."
            .to_string(),
    })
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    media_source: Option<Arc<dyn MediaSource>>,
    file_system_probe: Option<Arc<dyn FileSystemProbe>>,
    clock: Option<Arc<dyn Clock>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    scan_settings: Option<ScanSettings>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// SQLite file holding the library, created on first bootstrap.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Required.
    pub fn media_source(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.media_source = Some(source);
        self
    }

    pub fn file_system_probe(mut self, probe: Arc<dyn FileSystemProbe>) -> Self {
        self.file_system_probe = Some(probe);
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn scan_settings(mut self, settings: ScanSettings) -> Self {
        self.scan_settings = Some(settings);
        self
    }

    /// Defaults to `DEFAULT_EVENT_BUFFER_SIZE`.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// `CapabilityMissing` for an absent bridge, `Config` for bad values.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let media_source = self.media_source.ok_or_else(media_source_missing_error)?;

        let file_system_probe = match self.file_system_probe {
            Some(probe) => probe,
            None => provide_default_file_system_probe()?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = CoreConfig {
            database_path,
            media_source,
            file_system_probe,
            clock,
            logger_sink: self.logger_sink,
            scan_settings: self.scan_settings.unwrap_or_default(),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
