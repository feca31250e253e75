//! Data transfer objects for web requests and responses.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CycleStatus, DoePrice, FuelPrice, PriceCycle, PriceReport, PriceSource, ReportReason,
    ReportStatus, Station, UserReport,
};
use crate::geo::format_distance;
use crate::listing::{BestPriceEntry, BestPriceSort, FavoritePrices, NearbyStation};

/// Request for stations near a point.
#[derive(Debug, Deserialize)]
pub struct NearbyRequest {
    pub lat: f64,
    pub lng: f64,

    /// Search radius in km (defaults to the configured radius)
    pub radius_km: Option<f64>,

    pub limit: Option<usize>,
}

/// Request to search stations by name, brand or city.
#[derive(Debug, Deserialize)]
pub struct StationSearchRequest {
    pub q: String,
    pub limit: Option<usize>,
}

/// Request for the best-price listing around a point.
#[derive(Debug, Deserialize)]
pub struct BestPriceRequest {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,

    /// Fuel type name or alias (e.g. "diesel", "premium")
    pub fuel: Option<String>,

    #[serde(default)]
    pub sort: BestPriceSort,

    pub limit: Option<usize>,
}

/// Request for DOE reference prices.
#[derive(Debug, Deserialize)]
pub struct DoePriceRequest {
    pub fuel: Option<String>,
}

/// Body of a community price submission.
#[derive(Debug, Deserialize)]
pub struct PriceReportRequest {
    pub station_id: i64,
    pub fuel_type: String,

    /// Price in pesos, e.g. "61.45" or "₱61.45"
    pub price: String,
}

/// Body of a station problem report.
#[derive(Debug, Deserialize)]
pub struct StationReportRequest {
    pub station_id: i64,
    pub reason: ReportReason,
    pub details: Option<String>,
}

/// Body of an admin station creation.
#[derive(Debug, Deserialize)]
pub struct CreateStationRequest {
    pub name: String,
    pub brand: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct OpenCycleRequest {
    pub label: String,
}

/// Body of an admin report resolution.
#[derive(Debug, Deserialize)]
pub struct ResolveReportRequest {
    /// `resolved` or `dismissed`
    pub status: ReportStatus,
}

/// A station in responses.
#[derive(Debug, Serialize)]
pub struct StationResult {
    pub id: i64,
    pub name: String,

    /// Brand and name combined for display
    pub display_name: String,

    pub brand: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl StationResult {
    pub fn from_station(station: &Station) -> Self {
        Self {
            id: station.id.get(),
            name: station.name.clone(),
            display_name: station.display_name(),
            brand: station.brand.to_string(),
            address: station.address.clone(),
            city: station.city.clone(),
            latitude: station.location.latitude(),
            longitude: station.location.longitude(),
        }
    }
}

/// A station with its distance from the search centre.
#[derive(Debug, Serialize)]
pub struct NearbyStationResult {
    #[serde(flatten)]
    pub station: StationResult,

    /// Distance in km
    pub distance: f64,

    /// Human-readable distance, e.g. "850 m" or "3.2 km"
    pub distance_label: String,
}

impl NearbyStationResult {
    pub fn from_nearby(nearby: &NearbyStation) -> Self {
        Self {
            station: StationResult::from_station(&nearby.station),
            distance: nearby.distance_km,
            distance_label: format_distance(nearby.distance_km),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NearbyResponse {
    pub radius_km: f64,
    pub stations: Vec<NearbyStationResult>,
}

#[derive(Debug, Serialize)]
pub struct StationSearchResponse {
    pub stations: Vec<StationResult>,
}

/// One fuel price in responses.
#[derive(Debug, Serialize)]
pub struct PriceResult {
    /// Wire name, e.g. "gasoline_95"
    pub fuel_type: &'static str,

    /// Display label, e.g. "Premium (RON 95)"
    pub fuel_label: &'static str,

    /// Price in pesos
    pub price: f64,

    /// Formatted price, e.g. "₱61.45"
    pub price_label: String,

    pub source: PriceSource,
    pub confirmations: u32,
    pub reported_at: Option<DateTime<Utc>>,
    pub report_id: Option<i64>,
}

impl PriceResult {
    pub fn from_price(price: &FuelPrice) -> Self {
        Self {
            fuel_type: price.fuel.as_str(),
            fuel_label: price.fuel.label(),
            price: price.price.as_pesos(),
            price_label: price.price.to_string(),
            source: price.source,
            confirmations: price.confirmations,
            reported_at: price.reported_at,
            report_id: price.report_id,
        }
    }
}

/// One row of the best-price listing.
#[derive(Debug, Serialize)]
pub struct BestPriceResult {
    pub station: StationResult,

    #[serde(flatten)]
    pub price: PriceResult,

    pub distance: f64,
    pub distance_label: String,
}

impl BestPriceResult {
    pub fn from_entry(entry: &BestPriceEntry) -> Self {
        Self {
            station: StationResult::from_station(&entry.station),
            price: PriceResult::from_price(&entry.price),
            distance: entry.distance_km,
            distance_label: format_distance(entry.distance_km),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BestPriceResponse {
    pub radius_km: f64,
    pub prices: Vec<BestPriceResult>,
}

/// A favorite station and its prices.
#[derive(Debug, Serialize)]
pub struct FavoriteResult {
    pub station: StationResult,
    pub prices: Vec<PriceResult>,
}

impl FavoriteResult {
    pub fn from_favorite(favorite: &FavoritePrices) -> Self {
        Self {
            station: StationResult::from_station(&favorite.station),
            prices: favorite.prices.iter().map(PriceResult::from_price).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub favorites: Vec<FavoriteResult>,
}

/// A DOE reference price in responses.
#[derive(Debug, Serialize)]
pub struct DoePriceResult {
    pub fuel_type: &'static str,
    pub fuel_label: &'static str,
    pub area: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub common: f64,
    pub effective_date: Option<NaiveDate>,
}

impl DoePriceResult {
    pub fn from_doe(doe: &DoePrice) -> Self {
        Self {
            fuel_type: doe.fuel.as_str(),
            fuel_label: doe.fuel.label(),
            area: doe.area.clone(),
            min: doe.min.map(|p| p.as_pesos()),
            max: doe.max.map(|p| p.as_pesos()),
            common: doe.common.as_pesos(),
            effective_date: doe.effective_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoePriceResponse {
    pub prices: Vec<DoePriceResult>,
}

/// A stored community price report.
#[derive(Debug, Serialize)]
pub struct PriceReportResult {
    pub id: i64,
    pub station_id: i64,
    pub fuel_type: &'static str,
    pub price: f64,
    pub reported_at: DateTime<Utc>,
    pub confirmations: u32,
    pub cycle_id: Option<i64>,
}

impl PriceReportResult {
    pub fn from_report(report: &PriceReport) -> Self {
        Self {
            id: report.id,
            station_id: report.station_id.get(),
            fuel_type: report.fuel.as_str(),
            price: report.price.as_pesos(),
            reported_at: report.reported_at,
            confirmations: report.confirmations,
            cycle_id: report.cycle_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub report_id: i64,
    pub confirmations: u32,
}

/// A user report in responses.
#[derive(Debug, Serialize)]
pub struct UserReportResult {
    pub id: i64,
    pub station_id: i64,
    pub reason: ReportReason,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl UserReportResult {
    pub fn from_report(report: &UserReport) -> Self {
        Self {
            id: report.id,
            station_id: report.station_id.get(),
            reason: report.reason,
            details: report.details.clone(),
            status: report.status,
            created_at: report.created_at,
            resolved_at: report.resolved_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserReportsResponse {
    pub reports: Vec<UserReportResult>,
}

/// A price cycle in responses.
#[derive(Debug, Serialize)]
pub struct CycleResult {
    pub id: i64,
    pub label: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: CycleStatus,
}

impl CycleResult {
    pub fn from_cycle(cycle: &PriceCycle) -> Self {
        Self {
            id: cycle.id,
            label: cycle.label.clone(),
            starts_at: cycle.starts_at,
            ends_at: cycle.ends_at,
            status: cycle.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CyclesResponse {
    pub cycles: Vec<CycleResult>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Brand, FuelType, Price, StationId};
    use crate::geo::Coordinate;

    fn station() -> Station {
        Station::new(
            StationId::new(21).unwrap(),
            "EDSA Cubao",
            Brand::new("Petron").unwrap(),
            Coordinate::new(14.6191, 121.0530).unwrap(),
        )
        .unwrap()
        .with_city("Quezon City")
    }

    fn diesel() -> FuelPrice {
        FuelPrice {
            fuel: FuelType::Diesel,
            price: Price::from_centavos(5875),
            source: PriceSource::Community,
            confirmations: 3,
            reported_at: None,
            report_id: Some(900),
        }
    }

    #[test]
    fn nearby_result_flattens_station() {
        let result = NearbyStationResult::from_nearby(&NearbyStation {
            station: station(),
            distance_km: 0.42,
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["id"], 21);
        assert_eq!(json["display_name"], "Petron - EDSA Cubao");
        assert_eq!(json["city"], "Quezon City");
        assert_eq!(json["distance"], 0.42);
        assert_eq!(json["distance_label"], "420 m");
    }

    #[test]
    fn best_price_result_shape() {
        let result = BestPriceResult::from_entry(&BestPriceEntry {
            station: station(),
            price: diesel(),
            distance_km: 3.26,
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["station"]["name"], "EDSA Cubao");
        assert_eq!(json["fuel_type"], "diesel");
        assert_eq!(json["price"], 58.75);
        assert_eq!(json["price_label"], "₱58.75");
        assert_eq!(json["source"], "community");
        assert_eq!(json["confirmations"], 3);
        assert_eq!(json["distance_label"], "3.3 km");
    }

    #[test]
    fn favorite_result_lists_prices() {
        let doe = DoePrice {
            fuel: FuelType::Kerosene,
            area: None,
            min: None,
            max: None,
            common: Price::from_centavos(7010),
            effective_date: None,
        };
        let result = FavoriteResult::from_favorite(&FavoritePrices {
            station: station(),
            prices: vec![diesel(), doe.as_fuel_price()],
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["prices"].as_array().unwrap().len(), 2);
        assert_eq!(json["prices"][1]["source"], "doe");
        assert_eq!(json["prices"][1]["report_id"], serde_json::Value::Null);
    }

    #[test]
    fn best_price_request_defaults() {
        let req: BestPriceRequest =
            serde_json::from_str(r#"{"lat": 14.6, "lng": 121.0}"#).unwrap();
        assert_eq!(req.sort, BestPriceSort::Price);
        assert!(req.fuel.is_none());

        let req: BestPriceRequest =
            serde_json::from_str(r#"{"lat": 14.6, "lng": 121.0, "sort": "distance"}"#).unwrap();
        assert_eq!(req.sort, BestPriceSort::Distance);
    }

    #[test]
    fn station_report_request_reason() {
        let req: StationReportRequest =
            serde_json::from_str(r#"{"station_id": 4, "reason": "station_closed"}"#).unwrap();
        assert_eq!(req.reason, ReportReason::StationClosed);
        assert!(req.details.is_none());

        assert!(
            serde_json::from_str::<StationReportRequest>(r#"{"station_id": 4, "reason": "rude"}"#)
                .is_err()
        );
    }
}
