//! File System Probe Implementation using `std::fs`

use bridge_traits::{
    error::{BridgeError, Result},
    filesystem::FileSystemProbe,
};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Blocking probe backed by `std::fs`.
///
/// Every method performs at most one `stat` or `open` call, so the cost per
/// track is bounded regardless of library size.
#[derive(Debug, Clone, Default)]
pub struct StdFileSystemProbe;

impl StdFileSystemProbe {
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError
    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

impl FileSystemProbe for StdFileSystemProbe {
    fn exists(&self, path: &Path) -> Result<bool> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io_error(e)),
        }
    }

    fn is_readable(&self, path: &Path) -> Result<bool> {
        match fs::File::open(path) {
            Ok(_) => Ok(true),
            Err(e) if matches!(e.kind(), ErrorKind::PermissionDenied | ErrorKind::NotFound) => {
                debug!(path = ?path, error = %e, "File not readable");
                Ok(false)
            }
            Err(e) => Err(Self::map_io_error(e)),
        }
    }

    fn size_of(&self, path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path).map_err(Self::map_io_error)?;
        Ok(metadata.len())
    }
}
