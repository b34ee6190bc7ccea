//! # Host Bridge Traits
//!
//! Contracts between the library core and the collaborators it does not own.
//!
//! ## Overview
//!
//! The synchronization engine never talks to the device directly. Everything it
//! needs from the outside world is expressed here as a trait, and each host
//! platform ships the concrete adapters:
//!
//! - [`MediaSource`](source::MediaSource) - device-wide media index enumerator
//! - [`FileSystemProbe`](filesystem::FileSystemProbe) - existence/readability/size checks
//! - [`Clock`](time::Clock) - time source for deterministic testing
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep the message actionable
//! (include the path or the query that failed).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across async
//! tasks behind an `Arc`.

pub mod error;
pub mod filesystem;
pub mod logging;
pub mod source;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use filesystem::FileSystemProbe;
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use source::{MediaSource, TrackRecord};
pub use time::{Clock, FixedClock, SystemClock};
