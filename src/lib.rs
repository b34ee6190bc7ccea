//! Workspace façade crate.
//!
//! Host applications can depend on `medialib-workspace` and get the core
//! service with the desktop defaults enabled, without wiring each crate
//! individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::{CoreError, CoreService, Result};
