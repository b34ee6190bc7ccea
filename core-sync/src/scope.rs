//! Scan scope selection

use crate::error::{Result, SyncError};
use core_library::models::ScanKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which part of the media index a scan reconciles.
///
/// Exactly one scope per invocation, always chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanScope {
    /// Every record in the index. The only scope that can detect removals.
    Full,
    /// Records modified after `since`, or after the last recorded scan when
    /// no override is given.
    Incremental { since: Option<i64> },
    /// Records under the given folder prefixes.
    FolderScoped { paths: Vec<String> },
}

impl ScanScope {
    pub fn full() -> Self {
        ScanScope::Full
    }

    pub fn incremental() -> Self {
        ScanScope::Incremental { since: None }
    }

    pub fn incremental_since(since: i64) -> Self {
        ScanScope::Incremental { since: Some(since) }
    }

    pub fn folders<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScanScope::FolderScoped {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Short name used in logs and events.
    pub fn label(&self) -> &'static str {
        match self {
            ScanScope::Full => "full",
            ScanScope::Incremental { .. } => "incremental",
            ScanScope::FolderScoped { .. } => "folder",
        }
    }

    /// Removal detection needs a complete enumeration of the source.
    pub fn allows_removals(&self) -> bool {
        matches!(self, ScanScope::Full)
    }

    /// Bookkeeping column advanced by a successful scan of this scope, if any.
    ///
    /// A folder scan covers only part of the modification window, so it never
    /// advances the bookkeeping.
    pub fn bookkeeping_kind(&self) -> Option<ScanKind> {
        match self {
            ScanScope::Full => Some(ScanKind::Full),
            ScanScope::Incremental { .. } => Some(ScanKind::Incremental),
            ScanScope::FolderScoped { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let ScanScope::FolderScoped { paths } = self {
            if paths.is_empty() {
                return Err(SyncError::InvalidInput(
                    "folder-scoped scan needs at least one path".to_string(),
                ));
            }
            if paths.iter().any(|p| p.trim().is_empty()) {
                return Err(SyncError::InvalidInput(
                    "folder-scoped scan paths must not be blank".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ScanScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanScope::Full => write!(f, "full"),
            ScanScope::Incremental { since: Some(ts) } => write!(f, "incremental(since={})", ts),
            ScanScope::Incremental { since: None } => write!(f, "incremental"),
            ScanScope::FolderScoped { paths } => write!(f, "folder({})", paths.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_full_allows_removals() {
        assert!(ScanScope::full().allows_removals());
        assert!(!ScanScope::incremental().allows_removals());
        assert!(!ScanScope::incremental_since(10).allows_removals());
        assert!(!ScanScope::folders(["/music"]).allows_removals());
    }

    #[test]
    fn test_bookkeeping_kind() {
        assert_eq!(ScanScope::full().bookkeeping_kind(), Some(ScanKind::Full));
        assert_eq!(
            ScanScope::incremental().bookkeeping_kind(),
            Some(ScanKind::Incremental)
        );
        assert_eq!(ScanScope::folders(["/music"]).bookkeeping_kind(), None);
    }

    #[test]
    fn test_validate_folder_paths() {
        assert!(ScanScope::folders(["/music"]).validate().is_ok());
        assert!(matches!(
            ScanScope::folders(Vec::<String>::new()).validate(),
            Err(SyncError::InvalidInput(_))
        ));
        assert!(ScanScope::folders(["/music", " "]).validate().is_err());
        assert!(ScanScope::full().validate().is_ok());
    }

    #[test]
    fn test_display_and_serde() {
        assert_eq!(ScanScope::incremental_since(5).to_string(), "incremental(since=5)");
        assert_eq!(ScanScope::folders(["/a", "/b"]).to_string(), "folder(/a, /b)");

        let json = serde_json::to_string(&ScanScope::incremental_since(5)).unwrap();
        assert_eq!(json, r#"{"kind":"incremental","since":5}"#);
    }
}
