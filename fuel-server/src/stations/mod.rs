//! Station directory.
//!
//! Provides station lookup by id and name search over every active
//! station, loaded from the backend at startup and refreshed daily. A disk
//! snapshot covers start-ups while the backend is unreachable.

mod cache;
mod directory;
mod error;

pub use cache::{StationCache, StationCacheConfig};
pub use directory::StationDirectory;
pub use error::StationError;
