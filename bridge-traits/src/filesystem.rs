//! File System Probe
//!
//! Minimal, synchronous view of the file system used to decide whether a track
//! reported by the media index is actually playable.

use std::path::Path;

use crate::error::Result;

/// Per-file accessibility checks.
///
/// Each call is a bounded, synchronous check against a single path. The
/// engine never walks directories through this trait.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::filesystem::FileSystemProbe;
/// use std::path::Path;
///
/// fn playable(probe: &dyn FileSystemProbe, path: &Path) -> bool {
///     probe.exists(path).unwrap_or(false)
///         && probe.is_readable(path).unwrap_or(false)
///         && probe.size_of(path).map(|s| s > 0).unwrap_or(false)
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait FileSystemProbe: Send + Sync {
    /// Check if a file exists
    fn exists(&self, path: &Path) -> Result<bool>;

    /// Check if the current process can open the file for reading
    fn is_readable(&self, path: &Path) -> Result<bool>;

    /// Size of the file in bytes
    fn size_of(&self, path: &Path) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    #[test]
    fn test_mock_probe_is_object_safe() {
        let mut probe = MockFileSystemProbe::new();
        probe.expect_exists().returning(|_| Ok(true));
        probe.expect_is_readable().returning(|_| Ok(false));
        probe
            .expect_size_of()
            .returning(|_| Err(BridgeError::NotAvailable("size".to_string())));

        let probe: Box<dyn FileSystemProbe> = Box::new(probe);
        let path = Path::new("/music/a.mp3");
        assert!(probe.exists(path).unwrap());
        assert!(!probe.is_readable(path).unwrap());
        assert!(probe.size_of(path).is_err());
    }
}
