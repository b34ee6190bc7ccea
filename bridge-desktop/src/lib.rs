//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemProbe` using `std::fs` metadata and a read-only open
//!
//! The media index itself is always host-provided; desktop hosts typically
//! back it with their own tag database.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::StdFileSystemProbe;
//! use bridge_traits::FileSystemProbe;
//!
//! let probe = StdFileSystemProbe::new();
//! let ok = probe.exists(std::path::Path::new("/music/song.flac"))?;
//! ```

mod filesystem;

pub use filesystem::StdFileSystemProbe;
