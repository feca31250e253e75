//! Stations near a point.

use crate::domain::Station;
use crate::geo::{Coordinate, distance};

/// A station with its distance from the search centre.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyStation {
    pub station: Station,
    pub distance_km: f64,
}

/// Filter box-query results to the exact radius and order them.
///
/// Stations are sorted nearest first, ties broken by name, and truncated to
/// `limit`. Rows outside `radius_km` (box corners) are dropped.
pub fn nearby_stations<'a>(
    stations: impl IntoIterator<Item = &'a Station>,
    center: &Coordinate,
    radius_km: f64,
    limit: usize,
) -> Vec<NearbyStation> {
    let mut nearby: Vec<NearbyStation> = stations
        .into_iter()
        .filter(|s| s.is_active)
        .filter_map(|s| {
            let d = distance(center, &s.location);
            (d <= radius_km).then(|| NearbyStation {
                station: s.clone(),
                distance_km: d,
            })
        })
        .collect();

    nearby.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.station.name.cmp(&b.station.name))
    });
    nearby.truncate(limit);
    nearby
}
