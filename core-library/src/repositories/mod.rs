//! # Repository Pattern Implementation
//!
//! This module provides repository traits and implementations for data access.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//! - "Not found" is `Ok(None)`; errors are reserved for I/O and integrity faults
//!
//! ## Available Repositories
//!
//! - `SongRepository` - Songs, bulk scan writes, statistic queries and user state
//! - `AlbumRepository` - Albums keyed by `(name, artist)`
//! - `ArtistRepository` - Artists keyed by name
//! - `ScanBookkeepingRepository` - Last-scan timestamps

pub mod album;
pub mod artist;
pub mod bookkeeping;
pub mod song;

pub use album::{AlbumRepository, SqliteAlbumRepository};
pub use artist::{ArtistRepository, SqliteArtistRepository};
pub use bookkeeping::{ScanBookkeepingRepository, SqliteScanBookkeepingRepository};
pub use song::{SongRepository, SqliteSongRepository};
