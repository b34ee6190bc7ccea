//! # Scan and Library Events
//!
//! The coordinator announces every scan's lifecycle on an [`EventBus`], and
//! announces songs a full scan pruned. Progress views and the favorites or
//! history cleanup listen here, so the engine never calls them directly.
//!
//! A scan emits `Started`, zero or more `Progress` events, then exactly one of
//! `Completed`, `Failed` or `Cancelled`, all carrying the same `scan_id`.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, ScanEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut listener = bus.subscribe();
//!
//! bus.emit(CoreEvent::Scan(ScanEvent::Cancelled {
//!     scan_id: "scan-1".to_string(),
//! }))
//! .ok();
//!
//! let event = listener.recv().await.unwrap();
//! assert_eq!(event.description(), "Scan cancelled");
//! # }
//! ```
//!
//! Emitting with nobody listening returns `SendError`; publishers ignore it.
//! A listener that falls more than the bus capacity behind gets
//! `RecvError::Lagged` once and then resumes with the newest events.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Events a listener can fall behind by before it starts lagging.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Scan(ScanEvent),
    Library(LibraryEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &'static str {
        match self {
            CoreEvent::Scan(ScanEvent::Started { .. }) => "Scan started",
            CoreEvent::Scan(ScanEvent::Progress { .. }) => "Scan in progress",
            CoreEvent::Scan(ScanEvent::Completed { .. }) => "Scan completed successfully",
            CoreEvent::Scan(ScanEvent::Failed { .. }) => "Scan failed",
            CoreEvent::Scan(ScanEvent::Cancelled { .. }) => "Scan cancelled",
            CoreEvent::Library(LibraryEvent::SongsRemoved { .. }) => "Songs removed from library",
        }
    }

    /// Whether this event ends a scan.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CoreEvent::Scan(
                ScanEvent::Completed { .. } | ScanEvent::Failed { .. } | ScanEvent::Cancelled { .. }
            )
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ScanEvent {
    Started {
        scan_id: String,
        /// `full`, `incremental` or `folder`
        scope: String,
    },
    /// Emitted after each pipeline stage
    Progress {
        scan_id: String,
        phase: String,
        items_processed: u64,
        total_items: Option<u64>,
        /// 0 to 100
        percent: u8,
    },
    Completed {
        scan_id: String,
        songs_found: u64,
        songs_added: u64,
        songs_updated: u64,
        songs_removed: u64,
        albums_added: u64,
        artists_added: u64,
        elapsed_ms: u64,
    },
    Failed {
        scan_id: String,
        message: String,
        /// Retrying the same scan may succeed
        recoverable: bool,
    },
    Cancelled {
        scan_id: String,
    },
}

impl ScanEvent {
    pub fn scan_id(&self) -> &str {
        match self {
            ScanEvent::Started { scan_id, .. }
            | ScanEvent::Progress { scan_id, .. }
            | ScanEvent::Completed { scan_id, .. }
            | ScanEvent::Failed { scan_id, .. }
            | ScanEvent::Cancelled { scan_id } => scan_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// A full scan deleted these songs. Favorites and play history keyed on
    /// the paths are stale from here on.
    SongsRemoved { paths: Vec<String> },
}

/// Broadcast channel shared by the coordinator and every listener.
///
/// Cloning shares the channel. Each [`subscribe`](Self::subscribe) call gets
/// its own receiver that sees events emitted after it subscribed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Number of listeners the event reached.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

type Predicate = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events a predicate rejects.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::default();
/// let removals = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Library(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    predicate: Option<Predicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            predicate: None,
        }
    }

    /// Replaces any earlier predicate.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Next accepted event. Lag and closure surface as `RecvError`.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.predicate.as_ref().map_or(true, |predicate| predicate(event))
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("filtered", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(scan_id: &str) -> CoreEvent {
        CoreEvent::Scan(ScanEvent::Started {
            scan_id: scan_id.to_string(),
            scope: "full".to_string(),
        })
    }

    fn completed(scan_id: &str) -> CoreEvent {
        CoreEvent::Scan(ScanEvent::Completed {
            scan_id: scan_id.to_string(),
            songs_found: 3,
            songs_added: 3,
            songs_updated: 0,
            songs_removed: 0,
            albums_added: 2,
            artists_added: 2,
            elapsed_ms: 12,
        })
    }

    #[test]
    fn test_emit_without_listeners_is_an_error() {
        let bus = EventBus::new(4);
        assert_eq!(bus.listener_count(), 0);
        assert!(bus.emit(started("scan-1")).is_err());
    }

    #[tokio::test]
    async fn test_every_listener_sees_the_event() {
        let bus = EventBus::new(4);
        let mut ui = bus.subscribe();
        let mut cleanup = bus.subscribe();

        assert_eq!(bus.emit(started("scan-1")).unwrap(), 2);
        assert_eq!(ui.recv().await.unwrap(), started("scan-1"));
        assert_eq!(cleanup.recv().await.unwrap(), started("scan-1"));
    }

    #[tokio::test]
    async fn test_stream_skips_rejected_events() {
        let bus = EventBus::new(4);
        let mut removals = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Library(_)));

        let pruned = CoreEvent::Library(LibraryEvent::SongsRemoved {
            paths: vec!["/music/a.mp3".to_string()],
        });
        bus.emit(started("scan-1")).ok();
        bus.emit(pruned.clone()).ok();
        bus.emit(completed("scan-1")).ok();

        assert_eq!(removals.recv().await.unwrap(), pruned);
    }

    #[tokio::test]
    async fn test_slow_listener_lags() {
        let bus = EventBus::new(2);
        let mut slow = bus.subscribe();

        for n in 0..5 {
            bus.emit(completed(&format!("scan-{}", n))).ok();
        }

        assert!(matches!(slow.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(slow.recv().await.unwrap(), completed("scan-3"));
    }

    #[test]
    fn test_terminal_events() {
        assert!(completed("scan-1").is_terminal());
        assert!(!started("scan-1").is_terminal());
        assert_eq!(
            ScanEvent::Cancelled {
                scan_id: "scan-9".to_string()
            }
            .scan_id(),
            "scan-9"
        );
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(completed("scan-123")).unwrap();
        assert_eq!(json["type"], "Scan");
        assert_eq!(json["payload"]["event"], "Completed");
        assert_eq!(json["payload"]["scan_id"], "scan-123");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, completed("scan-123"));
    }
}
