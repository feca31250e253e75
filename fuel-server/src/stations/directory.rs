//! In-memory station directory.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::backend::BackendClient;
use crate::domain::{Station, StationId};

use super::cache::StationCache;
use super::error::StationError;

/// Thread-safe station lookup and search.
///
/// Holds every active station, loaded at start-up and replaced wholesale
/// by [`StationDirectory::refresh`].
#[derive(Clone)]
pub struct StationDirectory {
    inner: Arc<RwLock<HashMap<StationId, Station>>>,
    client: BackendClient,
    cache: Option<StationCache>,
}

impl StationDirectory {
    /// Fetch the station list from the backend.
    ///
    /// With a disk cache, a successful fetch is written to it and a failed
    /// fetch falls back to the snapshot. Fails only when neither source has
    /// data.
    pub async fn fetch(
        client: BackendClient,
        cache: Option<StationCache>,
    ) -> Result<Self, StationError> {
        let stations = match client.all_stations().await {
            Ok(stations) => {
                if let Some(cache) = &cache
                    && let Err(e) = cache.save(&stations)
                {
                    warn!(error = %e, "failed to write station snapshot");
                }
                stations
            }
            Err(e) => {
                let Some(snapshot) = cache.as_ref().and_then(StationCache::load) else {
                    return Err(StationError::Unavailable {
                        reason: e.to_string(),
                    });
                };
                warn!(error = %e, count = snapshot.len(), "backend unreachable, using station snapshot");
                snapshot
            }
        };

        Ok(Self::from_stations(client, cache, stations))
    }

    /// Build a directory from an already-loaded list.
    pub fn from_stations(
        client: BackendClient,
        cache: Option<StationCache>,
        stations: Vec<Station>,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(build_map(stations))),
            client,
            cache,
        }
    }

    /// Look up a station by id.
    pub async fn get(&self, id: StationId) -> Option<Station> {
        let guard = self.inner.read().await;
        guard.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    pub async fn is_empty(&self) -> bool {
        let guard = self.inner.read().await;
        guard.is_empty()
    }

    /// Case-insensitive search on name, brand and city.
    ///
    /// Stations where a field starts with the query rank before those that
    /// merely contain it; within a rank, results are alphabetical by name.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Station> {
        let guard = self.inner.read().await;
        search_stations(guard.values(), query, limit)
    }

    /// Replace the directory with a fresh list from the backend.
    ///
    /// On failure, the existing stations are kept and the error returned.
    pub async fn refresh(&self) -> Result<usize, StationError> {
        let stations = self.client.all_stations().await?;
        if let Some(cache) = &self.cache
            && let Err(e) = cache.save(&stations)
        {
            warn!(error = %e, "failed to write station snapshot");
        }

        let map = build_map(stations);
        let count = map.len();

        let mut guard = self.inner.write().await;
        *guard = map;
        info!(count, "station directory refreshed");

        Ok(count)
    }

    /// Insert or replace one station after an admin write.
    pub async fn upsert(&self, station: Station) {
        let mut guard = self.inner.write().await;
        if station.is_active {
            guard.insert(station.id, station);
        } else {
            guard.remove(&station.id);
        }
    }
}

/// Only active stations are kept.
fn build_map(stations: Vec<Station>) -> HashMap<StationId, Station> {
    stations
        .into_iter()
        .filter(|s| s.is_active)
        .map(|s| (s.id, s))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Prefix,
    Contains,
}

fn match_rank(station: &Station, query: &str) -> Option<MatchRank> {
    let fields = [
        Some(station.name.as_str()),
        Some(station.brand.as_str()),
        station.city.as_deref(),
    ];
    fields
        .into_iter()
        .flatten()
        .filter_map(|field| {
            let field = field.to_lowercase();
            if field.starts_with(query) {
                Some(MatchRank::Prefix)
            } else if field.contains(query) {
                Some(MatchRank::Contains)
            } else {
                None
            }
        })
        .min()
}

fn search_stations<'a>(
    stations: impl Iterator<Item = &'a Station>,
    query: &str,
    limit: usize,
) -> Vec<Station> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<(MatchRank, &Station)> = stations
        .filter_map(|s| match_rank(s, &query).map(|rank| (rank, s)))
        .collect();

    matches.sort_by(|(ra, a), (rb, b)| {
        ra.cmp(rb)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    });

    matches
        .into_iter()
        .take(limit)
        .map(|(_, s)| s.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendConfig;
    use crate::domain::Brand;
    use crate::geo::Coordinate;

    fn station(id: i64, brand: &str, name: &str, city: Option<&str>) -> Station {
        let mut s = Station::new(
            StationId::new(id).unwrap(),
            name,
            Brand::new(brand).unwrap(),
            Coordinate::new(14.6, 121.0).unwrap(),
        )
        .unwrap();
        s.city = city.map(str::to_string);
        s
    }

    fn sample() -> Vec<Station> {
        vec![
            station(1, "Petron", "Petron Katipunan", Some("Quezon City")),
            station(2, "Shell", "Shell Katipunan", Some("Quezon City")),
            station(3, "Caltex", "Caltex Marcos Highway", Some("Marikina")),
            station(4, "Petron", "Petron Marikina Riverbanks", Some("Marikina")),
            station(5, "Seaoil", "Seaoil Shaw", Some("Mandaluyong")),
        ]
    }

    fn unreachable_client() -> BackendClient {
        // Nothing listens on port 9; connections are refused immediately.
        let config = BackendConfig::new("http://127.0.0.1:9", "anon").with_timeout(2);
        BackendClient::new(config).unwrap()
    }

    #[test]
    fn build_map_skips_inactive() {
        let mut stations = sample();
        stations[2].is_active = false;
        let map = build_map(stations);
        assert_eq!(map.len(), 4);
        assert!(!map.contains_key(&StationId::new(3).unwrap()));
    }

    #[test]
    fn prefix_matches_rank_first() {
        let stations = sample();
        let found = search_stations(stations.iter(), "mari", 10);
        let ids: Vec<i64> = found.iter().map(|s| s.id.get()).collect();
        // Station 3 only matches through its city, but that is still a prefix
        assert_eq!(ids, vec![3, 4]);

        let found = search_stations(stations.iter(), "katipunan", 10);
        let ids: Vec<i64> = found.iter().map(|s| s.id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn prefix_before_substring() {
        let stations = vec![
            station(1, "Petron", "Petron Shaw", None),
            station(2, "Shell", "Shell Ortigas", None),
        ];
        let found = search_stations(stations.iter(), "sh", 10);
        let ids: Vec<i64> = found.iter().map(|s| s.id.get()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn search_is_case_insensitive_and_limited() {
        let stations = sample();
        assert_eq!(search_stations(stations.iter(), "  PETRON ", 10).len(), 2);
        assert_eq!(search_stations(stations.iter(), "petron", 1).len(), 1);
        assert!(search_stations(stations.iter(), "   ", 10).is_empty());
        assert!(search_stations(stations.iter(), "flying v", 10).is_empty());
    }

    #[tokio::test]
    async fn lookup_and_upsert() {
        let dir = StationDirectory::from_stations(unreachable_client(), None, sample());
        assert_eq!(dir.len().await, 5);

        let id = StationId::new(5).unwrap();
        assert_eq!(dir.get(id).await.unwrap().name, "Seaoil Shaw");

        let mut closed = dir.get(id).await.unwrap();
        closed.is_active = false;
        dir.upsert(closed).await;
        assert!(dir.get(id).await.is_none());

        dir.upsert(station(6, "Unioil", "Unioil Pasig", Some("Pasig"))).await;
        assert_eq!(dir.len().await, 5);
        assert_eq!(dir.search("unioil", 5).await.len(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stations() {
        let dir = StationDirectory::from_stations(unreachable_client(), None, sample());
        assert!(dir.refresh().await.is_err());
        assert_eq!(dir.len().await, 5);
    }

    #[tokio::test]
    async fn fetch_falls_back_to_snapshot() {
        use crate::stations::StationCacheConfig;

        let tmp = tempfile::tempdir().unwrap();
        let cache = StationCache::new(StationCacheConfig::new(tmp.path().join("s.json")));
        cache.save(&sample()).unwrap();

        let dir = StationDirectory::fetch(unreachable_client(), Some(cache))
            .await
            .unwrap();
        assert_eq!(dir.len().await, 5);
    }

    #[tokio::test]
    async fn fetch_without_snapshot_fails() {
        let result = StationDirectory::fetch(unreachable_client(), None).await;
        assert!(matches!(result, Err(StationError::Unavailable { .. })));
    }
}
