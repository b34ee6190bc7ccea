use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The media index could not be enumerated; nothing was written.
    #[error("Media source unavailable: {0}")]
    SourceUnavailable(String),

    /// A store read needed by the whole scan failed.
    #[error("Store read failed: {0}")]
    StoreRead(String),

    /// A write step failed; earlier steps stay applied.
    #[error("Store write failed during {step}: {message}")]
    StoreWrite { step: String, message: String },

    /// The store broke a uniqueness invariant (e.g. two songs share a path).
    #[error("Data integrity fault: {0}")]
    DataIntegrity(String),

    #[error("Scan already in progress")]
    ScanInProgress,

    #[error("Scan timeout after {0} seconds")]
    Timeout(u64),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SyncError {
    /// Whether re-running the same scan may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::SourceUnavailable(_)
                | SyncError::StoreRead(_)
                | SyncError::StoreWrite { .. }
                | SyncError::Timeout(_)
        )
    }

    pub(crate) fn store_write(step: &str, err: impl std::fmt::Display) -> Self {
        SyncError::StoreWrite {
            step: step.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<LibraryError> for SyncError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::DataIntegrity(message) => SyncError::DataIntegrity(message),
            LibraryError::InvalidInput { field, message } => {
                SyncError::InvalidInput(format!("{}: {}", field, message))
            }
            other => SyncError::StoreRead(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
