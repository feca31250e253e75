//! Disk snapshot of the station directory.
//!
//! Lets the server start with a recent station list when the backend is
//! unreachable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{StationRow, convert_station, station_to_row};
use crate::domain::Station;

use super::error::StationError;

/// Default snapshot TTL: 24 hours.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Snapshot file contents.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    cached_at: DateTime<Utc>,
    stations: Vec<StationRow>,
}

/// Configuration for the station disk cache.
#[derive(Debug, Clone)]
pub struct StationCacheConfig {
    /// Path to the snapshot file.
    pub path: PathBuf,
    /// How long a snapshot remains usable.
    pub ttl: Duration,
}

impl StationCacheConfig {
    /// Create a new cache config with the given path and default TTL (24 hours).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for StationCacheConfig {
    fn default() -> Self {
        Self::new("stations_cache.json")
    }
}

/// Disk cache for the station list.
#[derive(Debug, Clone)]
pub struct StationCache {
    config: StationCacheConfig,
}

impl StationCache {
    pub fn new(config: StationCacheConfig) -> Self {
        Self { config }
    }

    /// Load stations from the snapshot.
    ///
    /// Returns `None` if the file is missing, unreadable or older than the
    /// TTL. Rows that no longer validate are dropped.
    pub fn load(&self) -> Option<Vec<Station>> {
        self.load_at(Utc::now())
    }

    fn load_at(&self, now: DateTime<Utc>) -> Option<Vec<Station>> {
        let contents = std::fs::read_to_string(&self.config.path).ok()?;
        let snapshot: Snapshot = match serde_json::from_str(&contents) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %self.config.path.display(), error = %e, "ignoring corrupt station snapshot");
                return None;
            }
        };

        // A snapshot from the future (clock change) counts as fresh.
        let age = (now - snapshot.cached_at).to_std().unwrap_or_default();
        if age >= self.config.ttl {
            debug!(age_secs = age.as_secs(), "station snapshot expired");
            return None;
        }

        Some(
            snapshot
                .stations
                .into_iter()
                .filter_map(|row| convert_station(row).ok())
                .collect(),
        )
    }

    /// Write a snapshot of `stations`.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, stations: &[Station]) -> Result<(), StationError> {
        let snapshot = Snapshot {
            cached_at: Utc::now(),
            stations: stations.iter().map(station_to_row).collect(),
        };

        if let Some(parent) = self.config.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StationError::Cache {
                message: format!("failed to create cache directory: {e}"),
            })?;
        }

        let json = serde_json::to_string(&snapshot).map_err(|e| StationError::Cache {
            message: format!("failed to serialize snapshot: {e}"),
        })?;

        std::fs::write(&self.config.path, json).map_err(|e| StationError::Cache {
            message: format!("failed to write snapshot: {e}"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }
}
