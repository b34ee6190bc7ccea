//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media library core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the library and sync crates
//! depend on. It establishes the logging conventions, the configuration
//! builder, and the event broadcasting used to report scan progress.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
