//! # Library Store Module
//!
//! Owns the local library database: songs, albums, artists and scan
//! bookkeeping.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite connection pool, schema and migrations
//! - Domain models with validation and row mapping
//! - Repository traits with SQLite implementations
//!
//! Album and artist statistics stored here are derived data. The sync engine
//! recomputes them from the song table through [`SongRepository::album_stats`]
//! and [`SongRepository::artist_stats`] after every scan.
//!
//! [`SongRepository::album_stats`]: repositories::SongRepository::album_stats
//! [`SongRepository::artist_stats`]: repositories::SongRepository::artist_stats

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
