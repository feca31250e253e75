//! Caching layer for backend proximity reads.
//!
//! Map views and listings issue many near-identical box queries as the user
//! pans. We snap the search centre to a grid cell and round the radius up
//! to whole kilometres, then cache the box query for the whole cell. The
//! cached box is widened by the cell's half-diagonal so it still covers the
//! exact search circle of any centre inside the cell; listings apply the
//! exact radius from the real centre afterwards.
//!
//! Grid snapping bounds cache cardinality while keeping entries fresh
//! through a short TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::backend::{BackendClient, BackendError};
use crate::domain::{DoePrice, FuelType, PricedStation, Station};
use crate::geo::{BoundingBox, BoxTuning, Coordinate, distance};

/// Extra slack on the cell half-diagonal, covering float rounding.
const MARGIN_SLACK: f64 = 1.01;

/// Cache key for proximity queries: (fuel filter, grid cell, radius bucket).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub fuel: Option<FuelType>,
    pub cell_lat: i32,
    pub cell_lng: i32,
    pub radius_km: u32,
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries per query kind.
    pub max_capacity: u64,

    /// Grid cell size in degrees.
    pub grid_resolution_deg: f64,

    /// Large-radius shrink parameters for box queries.
    pub box_tuning: BoxTuning,

    /// Shrink boxes for large radii. Trades recall at the edge for smaller
    /// queries.
    pub optimize_large_radius: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_capacity: 1000,
            grid_resolution_deg: 0.01,
            box_tuning: BoxTuning::default(),
            optimize_large_radius: false,
        }
    }
}

/// Grid geometry shared by the cache and its tests.
#[derive(Debug, Clone, Copy)]
struct Grid {
    resolution: f64,
}

impl Grid {
    fn cell(&self, point: &Coordinate) -> (i32, i32) {
        (
            (point.latitude() / self.resolution).floor() as i32,
            (point.longitude() / self.resolution).floor() as i32,
        )
    }

    fn cell_center(&self, cell_lat: i32, cell_lng: i32) -> Coordinate {
        let lat = ((f64::from(cell_lat) + 0.5) * self.resolution).clamp(-90.0, 90.0);
        let lng = ((f64::from(cell_lng) + 0.5) * self.resolution).clamp(-180.0, 180.0);
        Coordinate::new_unchecked(lat, lng)
    }

    /// Distance from the cell centre to its farthest corner, plus slack.
    fn margin_km(&self, center: &Coordinate) -> f64 {
        let half = self.resolution / 2.0;
        let lng = (center.longitude() + half).clamp(-180.0, 180.0);
        [center.latitude() - half, center.latitude() + half]
            .into_iter()
            .map(|lat| {
                let corner = Coordinate::new_unchecked(lat.clamp(-90.0, 90.0), lng);
                distance(center, &corner)
            })
            .fold(0.0, f64::max)
            * MARGIN_SLACK
    }
}

/// Round a radius up to a whole-kilometre bucket (at least 1).
fn radius_bucket(radius_km: f64) -> u32 {
    radius_km.ceil().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// Backend client with caching of proximity reads.
pub struct CachedBackend {
    client: BackendClient,
    stations: MokaCache<CellKey, Arc<Vec<Station>>>,
    best_prices: MokaCache<CellKey, Arc<Vec<PricedStation>>>,
    doe: MokaCache<Option<FuelType>, Arc<Vec<DoePrice>>>,
    grid: Grid,
    box_tuning: BoxTuning,
    optimize_large_radius: bool,
}

impl CachedBackend {
    /// Create a new cached client.
    pub fn new(client: BackendClient, config: &CacheConfig) -> Self {
        Self {
            client,
            stations: build_cache(config),
            best_prices: build_cache(config),
            doe: build_cache(config),
            grid: Grid {
                resolution: config.grid_resolution_deg,
            },
            box_tuning: config.box_tuning,
            optimize_large_radius: config.optimize_large_radius,
        }
    }

    /// Cache key for a query around `center`.
    pub fn key(&self, center: &Coordinate, radius_km: f64, fuel: Option<FuelType>) -> CellKey {
        let (cell_lat, cell_lng) = self.grid.cell(center);
        CellKey {
            fuel,
            cell_lat,
            cell_lng,
            radius_km: radius_bucket(radius_km),
        }
    }

    /// The box queried for a cache key.
    pub fn query_box(&self, key: &CellKey) -> BoundingBox {
        let center = self.grid.cell_center(key.cell_lat, key.cell_lng);
        let radius = f64::from(key.radius_km) + self.grid.margin_km(&center);
        self.box_tuning
            .bounding_box(&center, radius, self.optimize_large_radius)
    }

    /// Active stations in the cached box covering `radius_km` around `center`.
    ///
    /// The result is a superset of the stations within the radius; callers
    /// filter with the exact distance.
    pub async fn stations_near_raw(
        &self,
        center: &Coordinate,
        radius_km: f64,
    ) -> Result<Arc<Vec<Station>>, BackendError> {
        let key = self.key(center, radius_km, None);

        if let Some(cached) = self.stations.get(&key).await {
            return Ok(cached);
        }

        let bbox = self.query_box(&key);
        let entry = Arc::new(self.client.stations_in_box(&bbox).await?);
        debug!(?key, rows = entry.len(), "cached stations");
        self.stations.insert(key, entry.clone()).await;

        Ok(entry)
    }

    /// Best-price rows in the cached box covering `radius_km` around `center`.
    pub async fn best_prices_near_raw(
        &self,
        center: &Coordinate,
        radius_km: f64,
        fuel: Option<FuelType>,
    ) -> Result<Arc<Vec<PricedStation>>, BackendError> {
        let key = self.key(center, radius_km, fuel);

        if let Some(cached) = self.best_prices.get(&key).await {
            return Ok(cached);
        }

        let bbox = self.query_box(&key);
        let entry = Arc::new(self.client.best_prices_in_box(&bbox, fuel).await?);
        debug!(?key, rows = entry.len(), "cached best prices");
        self.best_prices.insert(key, entry.clone()).await;

        Ok(entry)
    }

    /// DOE reference prices, optionally for one fuel.
    pub async fn doe_prices(
        &self,
        fuel: Option<FuelType>,
    ) -> Result<Arc<Vec<DoePrice>>, BackendError> {
        if let Some(cached) = self.doe.get(&fuel).await {
            return Ok(cached);
        }

        let entry = Arc::new(self.client.doe_prices(fuel).await?);
        self.doe.insert(fuel, entry.clone()).await;

        Ok(entry)
    }

    /// Access the underlying client for operations that bypass cache.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Get cache statistics.
    pub fn entry_count(&self) -> u64 {
        self.stations.entry_count() + self.best_prices.entry_count() + self.doe.entry_count()
    }

    /// Invalidate all cached entries.
    ///
    /// Called after writes so the next read sees new prices and stations.
    pub fn invalidate_all(&self) {
        self.stations.invalidate_all();
        self.best_prices.invalidate_all();
        self.doe.invalidate_all();
    }
}

fn build_cache<K, V>(config: &CacheConfig) -> MokaCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    MokaCache::builder()
        .time_to_live(config.ttl)
        .max_capacity(config.max_capacity)
        .build()
}
