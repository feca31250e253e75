//! Station directory error types.

use crate::backend::BackendError;

/// Errors that can occur when loading the station directory.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// Fetching stations from the backend failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Backend unreachable and no usable snapshot on disk
    #[error("no stations available: {reason}")]
    Unavailable { reason: String },

    /// Snapshot read or write failed
    #[error("cache error: {message}")]
    Cache { message: String },
}
