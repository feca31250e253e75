//! Best-price listings.
//!
//! Ranks the best-price view rows around a point, cheapest first by
//! default.

use serde::Deserialize;

use crate::domain::{FuelPrice, FuelType, PricedStation, Station};
use crate::geo::{Coordinate, distance};

/// Primary sort key for a best-price listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BestPriceSort {
    /// Cheapest first, then nearest.
    #[default]
    Price,
    /// Nearest first, then cheapest.
    Distance,
}

/// One row of a best-price listing.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPriceEntry {
    pub station: Station,
    pub price: FuelPrice,
    pub distance_km: f64,
}

/// Filter best-price rows to the exact radius and rank them.
///
/// When `fuel` is given, rows for other fuels are dropped. Ties on both
/// keys fall back to more confirmations first, then station id, so the
/// order is stable across requests.
pub fn best_prices<'a>(
    rows: impl IntoIterator<Item = &'a PricedStation>,
    center: &Coordinate,
    radius_km: f64,
    fuel: Option<FuelType>,
    sort: BestPriceSort,
    limit: usize,
) -> Vec<BestPriceEntry> {
    let mut entries: Vec<BestPriceEntry> = rows
        .into_iter()
        .filter(|r| fuel.is_none_or(|f| r.price.fuel == f))
        .filter_map(|r| {
            let d = distance(center, &r.station.location);
            (d <= radius_km).then(|| BestPriceEntry {
                station: r.station.clone(),
                price: r.price.clone(),
                distance_km: d,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        let by_price = a.price.price.cmp(&b.price.price);
        let by_distance = a.distance_km.total_cmp(&b.distance_km);
        let primary = match sort {
            BestPriceSort::Price => by_price.then(by_distance),
            BestPriceSort::Distance => by_distance.then(by_price),
        };
        primary
            .then_with(|| b.price.confirmations.cmp(&a.price.confirmations))
            .then_with(|| a.station.id.cmp(&b.station.id))
    });
    entries.truncate(limit);
    entries
}
