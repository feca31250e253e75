//! Prices at a user's favorite stations.
//!
//! The backend exposes an RPC that returns every favorite station with its
//! current community prices. When that RPC is unavailable we rebuild the
//! same picture from the favorites table and the best-price view. Fuels
//! with no community price at a station are filled from the DOE reference.

use std::collections::HashMap;
use std::future::Future;

use futures::future::join;
use tracing::{info, warn};

use crate::backend::{AccessToken, BackendClient, BackendError};
use crate::domain::{DoePrice, FuelPrice, FuelType, PricedStation, Station, StationId};

/// A favorite station with one price per fuel.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoritePrices {
    pub station: Station,
    /// Ordered by fuel type; at most one entry per fuel
    pub prices: Vec<FuelPrice>,
}

/// Source of favorite-station data.
///
/// Implemented by [`BackendClient`]; tests substitute an in-memory fake.
pub trait FavoriteSource: Sync {
    fn favorite_prices(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<(Station, Option<FuelPrice>)>, BackendError>> + Send;

    fn favorite_station_ids(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<StationId>, BackendError>> + Send;

    fn stations_by_ids(
        &self,
        ids: &[StationId],
    ) -> impl Future<Output = Result<Vec<Station>, BackendError>> + Send;

    fn best_prices_for_stations(
        &self,
        ids: &[StationId],
    ) -> impl Future<Output = Result<Vec<PricedStation>, BackendError>> + Send;

    fn doe_prices(&self) -> impl Future<Output = Result<Vec<DoePrice>, BackendError>> + Send;
}

impl FavoriteSource for BackendClient {
    fn favorite_prices(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<(Station, Option<FuelPrice>)>, BackendError>> + Send
    {
        BackendClient::favorite_prices(self, token)
    }

    fn favorite_station_ids(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Vec<StationId>, BackendError>> + Send {
        BackendClient::favorite_station_ids(self, token)
    }

    fn stations_by_ids(
        &self,
        ids: &[StationId],
    ) -> impl Future<Output = Result<Vec<Station>, BackendError>> + Send {
        BackendClient::stations_by_ids(self, ids)
    }

    fn best_prices_for_stations(
        &self,
        ids: &[StationId],
    ) -> impl Future<Output = Result<Vec<PricedStation>, BackendError>> + Send {
        BackendClient::best_prices_for_stations(self, ids)
    }

    fn doe_prices(&self) -> impl Future<Output = Result<Vec<DoePrice>, BackendError>> + Send {
        BackendClient::doe_prices(self, None)
    }
}

/// Merge favorites, community prices and DOE references.
///
/// For each favorite station (in the given order) and each fuel type, the
/// lowest community price at that station wins. A fuel with no community
/// price there falls back to the lowest DOE common price for that fuel.
/// Fuels with neither are omitted; stations with no prices at all are kept
/// with an empty list.
pub fn aggregate(
    favorites: Vec<Station>,
    community: impl IntoIterator<Item = (StationId, FuelPrice)>,
    doe: &[DoePrice],
) -> Vec<FavoritePrices> {
    let mut lowest: HashMap<(StationId, FuelType), FuelPrice> = HashMap::new();
    for (station, price) in community {
        lowest
            .entry((station, price.fuel))
            .and_modify(|current| {
                if price.price < current.price {
                    *current = price.clone();
                }
            })
            .or_insert(price);
    }

    let mut reference: HashMap<FuelType, &DoePrice> = HashMap::new();
    for d in doe {
        reference
            .entry(d.fuel)
            .and_modify(|current| {
                if d.common < current.common {
                    *current = d;
                }
            })
            .or_insert(d);
    }

    favorites
        .into_iter()
        .map(|station| {
            let prices = FuelType::ALL
                .iter()
                .filter_map(|fuel| {
                    lowest
                        .get(&(station.id, *fuel))
                        .cloned()
                        .or_else(|| reference.get(fuel).map(|d| d.as_fuel_price()))
                })
                .collect();
            FavoritePrices { station, prices }
        })
        .collect()
}

/// Load the caller's favorites with prices.
///
/// Tries the favorite-price RPC first. Any failure other than rejected
/// credentials triggers the table-based fallback. DOE references are
/// fetched alongside; if they fail, fuels without community prices are
/// simply left out.
pub async fn load<S: FavoriteSource>(
    source: &S,
    token: &AccessToken,
) -> Result<Vec<FavoritePrices>, BackendError> {
    let (rpc, doe) = join(source.favorite_prices(token), source.doe_prices()).await;

    let doe = doe.unwrap_or_else(|e| {
        warn!(error = %e, "DOE reference prices unavailable");
        Vec::new()
    });

    match rpc {
        Ok(rows) => Ok(from_rpc_rows(rows, &doe)),
        Err(e) if e.is_unauthorized() => Err(e),
        Err(e) => {
            warn!(error = %e, "favorite price RPC failed, using table fallback");
            let (stations, community) = load_fallback(source, token).await?;
            info!(count = stations.len(), "loaded favorites via fallback");
            Ok(aggregate(stations, community, &doe))
        }
    }
}

/// Group RPC rows by station, keeping first-seen order.
fn from_rpc_rows(rows: Vec<(Station, Option<FuelPrice>)>, doe: &[DoePrice]) -> Vec<FavoritePrices> {
    let mut stations: Vec<Station> = Vec::new();
    let mut community = Vec::new();
    for (station, price) in rows {
        if !stations.iter().any(|s| s.id == station.id) {
            stations.push(station.clone());
        }
        if let Some(price) = price {
            community.push((station.id, price));
        }
    }
    aggregate(stations, community, doe)
}

type FallbackRows = (Vec<Station>, Vec<(StationId, FuelPrice)>);

async fn load_fallback<S: FavoriteSource>(
    source: &S,
    token: &AccessToken,
) -> Result<FallbackRows, BackendError> {
    let ids = source.favorite_station_ids(token).await?;
    if ids.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let (stations, prices) = join(
        source.stations_by_ids(&ids),
        source.best_prices_for_stations(&ids),
    )
    .await;
    let stations = stations?;
    let prices = prices?;

    // Keep the favorites order; drop ids whose station row is gone.
    let mut by_id: HashMap<StationId, Station> =
        stations.into_iter().map(|s| (s.id, s)).collect();
    let ordered = ids.iter().filter_map(|id| by_id.remove(id)).collect();

    let community = prices
        .into_iter()
        .map(|p| (p.station.id, p.price))
        .collect();

    Ok((ordered, community))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Brand, Price, PriceSource};
    use crate::geo::Coordinate;
    use std::sync::Mutex;

    fn station(id: i64) -> Station {
        Station::new(
            StationId::new(id).unwrap(),
            &format!("Station {id}"),
            Brand::new("Unioil").unwrap(),
            Coordinate::new(14.6, 121.0).unwrap(),
        )
        .unwrap()
    }

    fn community(fuel: FuelType, centavos: u32) -> FuelPrice {
        FuelPrice {
            fuel,
            price: Price::from_centavos(centavos),
            source: PriceSource::Community,
            confirmations: 2,
            reported_at: None,
            report_id: Some(1),
        }
    }

    fn doe(fuel: FuelType, centavos: u32) -> DoePrice {
        DoePrice {
            fuel,
            area: None,
            min: None,
            max: None,
            common: Price::from_centavos(centavos),
            effective_date: None,
        }
    }

    fn sid(id: i64) -> StationId {
        StationId::new(id).unwrap()
    }

    #[test]
    fn lowest_community_price_wins() {
        let result = aggregate(
            vec![station(1)],
            vec![
                (sid(1), community(FuelType::Diesel, 5900)),
                (sid(1), community(FuelType::Diesel, 5750)),
                (sid(1), community(FuelType::Diesel, 6000)),
            ],
            &[],
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].prices.len(), 1);
        assert_eq!(result[0].prices[0].price.centavos(), 5750);
    }

    #[test]
    fn doe_fills_missing_fuels() {
        let result = aggregate(
            vec![station(1)],
            vec![(sid(1), community(FuelType::Diesel, 5800))],
            &[
                doe(FuelType::Diesel, 5600),
                doe(FuelType::Gasoline91, 6150),
                doe(FuelType::Gasoline91, 6050),
            ],
        );
        let prices = &result[0].prices;
        assert_eq!(prices.len(), 2);

        // Community price kept even though DOE is lower
        assert_eq!(prices[0].fuel, FuelType::Diesel);
        assert_eq!(prices[0].source, PriceSource::Community);
        assert_eq!(prices[0].price.centavos(), 5800);

        assert_eq!(prices[1].fuel, FuelType::Gasoline91);
        assert_eq!(prices[1].source, PriceSource::Doe);
        assert_eq!(prices[1].price.centavos(), 6050);
    }

    #[test]
    fn keeps_station_without_prices_and_order() {
        let result = aggregate(
            vec![station(3), station(1)],
            vec![(sid(1), community(FuelType::Lpg, 7200))],
            &[],
        );
        assert_eq!(result[0].station.id.get(), 3);
        assert!(result[0].prices.is_empty());
        assert_eq!(result[1].station.id.get(), 1);
        assert_eq!(result[1].prices.len(), 1);
    }

    #[test]
    fn ignores_prices_for_non_favorites() {
        let result = aggregate(
            vec![station(1)],
            vec![(sid(2), community(FuelType::Diesel, 5000))],
            &[],
        );
        assert!(result[0].prices.is_empty());
    }

    #[derive(Default)]
    struct FakeSource {
        rpc: Option<Vec<(Station, Option<FuelPrice>)>>,
        rpc_unauthorized: bool,
        ids: Vec<StationId>,
        stations: Vec<Station>,
        prices: Vec<PricedStation>,
        doe: Option<Vec<DoePrice>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeSource {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl FavoriteSource for FakeSource {
        async fn favorite_prices(
            &self,
            _token: &AccessToken,
        ) -> Result<Vec<(Station, Option<FuelPrice>)>, BackendError> {
            self.record("rpc");
            if self.rpc_unauthorized {
                return Err(BackendError::Unauthorized);
            }
            self.rpc.clone().ok_or(BackendError::NotFound)
        }

        async fn favorite_station_ids(
            &self,
            _token: &AccessToken,
        ) -> Result<Vec<StationId>, BackendError> {
            self.record("ids");
            Ok(self.ids.clone())
        }

        async fn stations_by_ids(&self, _ids: &[StationId]) -> Result<Vec<Station>, BackendError> {
            self.record("stations");
            Ok(self.stations.clone())
        }

        async fn best_prices_for_stations(
            &self,
            _ids: &[StationId],
        ) -> Result<Vec<PricedStation>, BackendError> {
            self.record("prices");
            Ok(self.prices.clone())
        }

        async fn doe_prices(&self) -> Result<Vec<DoePrice>, BackendError> {
            self.doe.clone().ok_or(BackendError::RateLimited)
        }
    }

    fn token() -> AccessToken {
        AccessToken::new("user-jwt").unwrap()
    }

    #[tokio::test]
    async fn uses_rpc_when_available() {
        let source = FakeSource {
            rpc: Some(vec![
                (station(2), Some(community(FuelType::Diesel, 5900))),
                (station(2), Some(community(FuelType::Gasoline95, 6400))),
                (station(1), None),
            ]),
            doe: Some(vec![doe(FuelType::Kerosene, 7000)]),
            ..Default::default()
        };

        let result = load(&source, &token()).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].station.id.get(), 2);
        assert_eq!(result[0].prices.len(), 3);
        assert_eq!(result[1].station.id.get(), 1);
        assert_eq!(result[1].prices.len(), 1);
        assert_eq!(result[1].prices[0].source, PriceSource::Doe);
        assert_eq!(*source.calls.lock().unwrap(), vec!["rpc"]);
    }

    #[tokio::test]
    async fn falls_back_to_tables_when_rpc_fails() {
        let mut priced = PricedStation {
            station: station(5),
            price: community(FuelType::Diesel, 5850),
        };
        priced.price.confirmations = 7;

        let source = FakeSource {
            rpc: None,
            ids: vec![sid(5), sid(4), sid(99)],
            stations: vec![station(4), station(5)],
            prices: vec![priced],
            doe: None,
            ..Default::default()
        };

        let result = load(&source, &token()).await.unwrap();
        let ids: Vec<i64> = result.iter().map(|f| f.station.id.get()).collect();
        // favorites order kept, missing station 99 dropped
        assert_eq!(ids, vec![5, 4]);
        assert_eq!(result[0].prices[0].confirmations, 7);
        assert!(result[1].prices.is_empty());

        let calls = source.calls.lock().unwrap().clone();
        assert_eq!(calls[0], "rpc");
        assert!(calls.contains(&"ids"));
        assert!(calls.contains(&"stations"));
        assert!(calls.contains(&"prices"));
    }

    #[tokio::test]
    async fn unauthorized_does_not_fall_back() {
        let source = FakeSource {
            rpc_unauthorized: true,
            ids: vec![sid(1)],
            doe: Some(Vec::new()),
            ..Default::default()
        };

        let err = load(&source, &token()).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(*source.calls.lock().unwrap(), vec!["rpc"]);
    }

    #[tokio::test]
    async fn fallback_with_no_favorites() {
        let source = FakeSource {
            doe: Some(Vec::new()),
            ..Default::default()
        };
        let result = load(&source, &token()).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(*source.calls.lock().unwrap(), vec!["rpc", "ids"]);
    }
}
