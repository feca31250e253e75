//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::CachedBackend;
use crate::listing::ListingConfig;
use crate::stations::StationDirectory;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Backend client with cached proximity reads
    pub backend: Arc<CachedBackend>,

    /// In-memory station lookup and search
    pub stations: StationDirectory,

    /// Radius and result limits for listings
    pub listing: Arc<ListingConfig>,
}

impl AppState {
    pub fn new(backend: CachedBackend, stations: StationDirectory, listing: ListingConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            stations,
            listing: Arc::new(listing),
        }
    }
}
