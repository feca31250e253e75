//! Backend row DTOs.
//!
//! These types map directly to the JSON rows returned by the REST surface
//! of the managed database (tables, views and RPCs). Nullable columns are
//! `Option`; numeric columns arrive as JSON numbers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `stations` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationRow {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Older rows predate the column and come back null
    pub is_active: Option<bool>,
}

/// Row of the `best_prices` view.
///
/// One row per station and fuel type, holding the lowest current community
/// price with the station columns inlined.
#[derive(Debug, Clone, Deserialize)]
pub struct BestPriceRow {
    pub station_id: i64,
    pub station_name: String,
    pub brand: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub fuel_type: String,
    pub price: f64,
    pub report_id: Option<i64>,
    pub confirmations: Option<i64>,
    pub reported_at: Option<DateTime<Utc>>,
}

/// Row returned by the `get_favorite_station_prices` RPC.
///
/// Favorite stations without any current price come back once with null
/// price columns.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoritePriceRow {
    pub station_id: i64,
    pub station_name: String,
    pub brand: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub fuel_type: Option<String>,
    pub price: Option<f64>,
    pub report_id: Option<i64>,
    pub confirmations: Option<i64>,
    pub reported_at: Option<DateTime<Utc>>,
}

/// Row of the `favorites` table.
#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteRow {
    pub station_id: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Row of the `doe_prices` table.
#[derive(Debug, Clone, Deserialize)]
pub struct DoePriceRow {
    pub fuel_type: String,
    pub area: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub common_price: Option<f64>,
    pub effective_date: Option<NaiveDate>,
}

/// Row of the `price_reports` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceReportRow {
    pub id: i64,
    pub station_id: i64,
    pub fuel_type: String,
    pub price: f64,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub confirmations: Option<i64>,
    pub cycle_id: Option<i64>,
}

/// Row of the `price_cycles` table.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceCycleRow {
    pub id: i64,
    pub label: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: String,
}

/// Row of the `user_reports` table.
#[derive(Debug, Clone, Deserialize)]
pub struct UserReportRow {
    pub id: i64,
    pub station_id: i64,
    pub reason: String,
    pub details: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Insert payload for `price_reports`.
#[derive(Debug, Clone, Serialize)]
pub struct PriceReportInsert {
    pub station_id: i64,
    pub fuel_type: &'static str,
    pub price: f64,
}

/// Insert payload for `user_reports`.
#[derive(Debug, Clone, Serialize)]
pub struct UserReportInsert {
    pub station_id: i64,
    pub reason: &'static str,
    pub details: Option<String>,
}

/// Insert payload for `stations`.
#[derive(Debug, Clone, Serialize)]
pub struct StationInsert {
    pub name: String,
    pub brand: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
}

/// Insert payload for `price_cycles`.
#[derive(Debug, Clone, Serialize)]
pub struct PriceCycleInsert {
    pub label: String,
    pub starts_at: DateTime<Utc>,
    pub status: &'static str,
}

/// Argument object for the `confirm_price` RPC.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmPriceArgs {
    pub p_report_id: i64,
}
