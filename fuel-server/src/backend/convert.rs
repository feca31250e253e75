//! Conversion from backend rows to domain types.
//!
//! Rows that fail validation are skipped with a warning rather than failing
//! the whole listing.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{
    Brand, CycleStatus, DoePrice, FuelPrice, FuelType, Price, PriceCycle, PriceReport,
    PriceSource, PricedStation, ReportReason, ReportStatus, Station, StationId, UserReport,
};
use crate::geo::Coordinate;

use super::types::{
    BestPriceRow, DoePriceRow, FavoritePriceRow, PriceCycleRow, PriceReportRow, StationRow,
    UserReportRow,
};

/// Brand used when a station row has none.
const UNBRANDED: &str = "Independent";

/// Error during row to domain conversion.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConversionError {
    #[error("invalid station id: {0}")]
    InvalidStationId(i64),

    #[error("invalid station: {0}")]
    InvalidStation(String),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid fuel type: {0}")]
    InvalidFuelType(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid value for {field}: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Convert every row with `f`, logging and skipping rows that fail.
pub fn convert_all<R, T>(
    rows: Vec<R>,
    what: &'static str,
    f: impl Fn(R) -> Result<T, ConversionError>,
) -> Vec<T> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match f(row) {
            Ok(v) => out.push(v),
            Err(e) => warn!(kind = what, error = %e, "skipping invalid row"),
        }
    }
    out
}

fn station_id(id: i64) -> Result<StationId, ConversionError> {
    StationId::new(id).map_err(|_| ConversionError::InvalidStationId(id))
}

fn fuel_type(s: &str) -> Result<FuelType, ConversionError> {
    FuelType::parse(s).map_err(|_| ConversionError::InvalidFuelType(s.to_string()))
}

fn price(pesos: f64) -> Result<Price, ConversionError> {
    Price::from_pesos(pesos).map_err(|e| ConversionError::InvalidPrice(e.to_string()))
}

fn confirmations(n: Option<i64>) -> u32 {
    n.and_then(|n| u32::try_from(n).ok()).unwrap_or(0)
}

#[allow(clippy::too_many_arguments)]
fn build_station(
    id: i64,
    name: &str,
    brand: Option<&str>,
    address: Option<String>,
    city: Option<String>,
    latitude: f64,
    longitude: f64,
    is_active: bool,
) -> Result<Station, ConversionError> {
    let id = station_id(id)?;
    let location = Coordinate::new(latitude, longitude)
        .map_err(|e| ConversionError::InvalidCoordinate(e.to_string()))?;
    let brand = brand
        .and_then(|b| Brand::new(b).ok())
        .map_or_else(|| Brand::new(UNBRANDED), Ok)
        .map_err(|e| ConversionError::InvalidStation(e.to_string()))?;

    let mut station = Station::new(id, name, brand, location)
        .map_err(|e| ConversionError::InvalidStation(e.to_string()))?;
    station.address = address.filter(|a| !a.trim().is_empty());
    station.city = city.filter(|c| !c.trim().is_empty());
    station.is_active = is_active;
    Ok(station)
}

/// Convert a `stations` row.
pub fn convert_station(row: StationRow) -> Result<Station, ConversionError> {
    build_station(
        row.id,
        &row.name,
        row.brand.as_deref(),
        row.address,
        row.city,
        row.latitude,
        row.longitude,
        row.is_active.unwrap_or(true),
    )
}

/// Inverse of [`convert_station`], used for on-disk snapshots.
pub fn station_to_row(station: &Station) -> StationRow {
    StationRow {
        id: station.id.get(),
        name: station.name.clone(),
        brand: Some(station.brand.as_str().to_string()),
        address: station.address.clone(),
        city: station.city.clone(),
        latitude: station.location.latitude(),
        longitude: station.location.longitude(),
        is_active: Some(station.is_active),
    }
}

/// Convert a `best_prices` row.
pub fn convert_best_price(row: BestPriceRow) -> Result<PricedStation, ConversionError> {
    let station = build_station(
        row.station_id,
        &row.station_name,
        row.brand.as_deref(),
        row.address,
        row.city,
        row.latitude,
        row.longitude,
        true,
    )?;

    Ok(PricedStation {
        station,
        price: FuelPrice {
            fuel: fuel_type(&row.fuel_type)?,
            price: price(row.price)?,
            source: PriceSource::Community,
            confirmations: confirmations(row.confirmations),
            reported_at: row.reported_at,
            report_id: row.report_id,
        },
    })
}

/// Convert a favorite-price RPC row.
///
/// Returns the station and, when the row carries a usable one, its price.
/// Only a bad station fails the row; a bad price is logged and dropped so
/// the favorite stays listed.
pub fn convert_favorite_price(
    row: FavoritePriceRow,
) -> Result<(Station, Option<FuelPrice>), ConversionError> {
    let station = build_station(
        row.station_id,
        &row.station_name,
        row.brand.as_deref(),
        row.address,
        row.city,
        row.latitude,
        row.longitude,
        true,
    )?;

    let fuel_price = match favorite_fuel_price(
        row.fuel_type.as_deref(),
        row.price,
        row.confirmations,
        row.reported_at,
        row.report_id,
    ) {
        Ok(fuel_price) => fuel_price,
        Err(e) => {
            warn!(station_id = row.station_id, error = %e, "skipping unconvertible favorite price");
            None
        }
    };

    Ok((station, fuel_price))
}

fn favorite_fuel_price(
    fuel: Option<&str>,
    amount: Option<f64>,
    confirmation_count: Option<i64>,
    reported_at: Option<DateTime<Utc>>,
    report_id: Option<i64>,
) -> Result<Option<FuelPrice>, ConversionError> {
    match (fuel, amount) {
        (Some(fuel), Some(amount)) => Ok(Some(FuelPrice {
            fuel: fuel_type(fuel)?,
            price: price(amount)?,
            source: PriceSource::Community,
            confirmations: confirmations(confirmation_count),
            reported_at,
            report_id,
        })),
        (None, None) => Ok(None),
        (None, Some(_)) => Err(ConversionError::MissingField("fuel_type")),
        (Some(_), None) => Err(ConversionError::MissingField("price")),
    }
}

/// Convert a `doe_prices` row.
///
/// Uses the common price, falling back to the midpoint of the range.
pub fn convert_doe_price(row: DoePriceRow) -> Result<DoePrice, ConversionError> {
    let fuel = fuel_type(&row.fuel_type)?;
    let min = row.min_price.map(price).transpose()?;
    let max = row.max_price.map(price).transpose()?;

    let common = match (row.common_price, min, max) {
        (Some(c), _, _) => price(c)?,
        (None, Some(lo), Some(hi)) => {
            Price::from_centavos((lo.centavos() + hi.centavos()) / 2)
        }
        (None, Some(only), None) | (None, None, Some(only)) => only,
        (None, None, None) => return Err(ConversionError::MissingField("common_price")),
    };

    Ok(DoePrice {
        fuel,
        area: row.area,
        min,
        max,
        common,
        effective_date: row.effective_date,
    })
}

/// Convert a `price_reports` row.
pub fn convert_price_report(row: PriceReportRow) -> Result<PriceReport, ConversionError> {
    Ok(PriceReport {
        id: row.id,
        station_id: station_id(row.station_id)?,
        fuel: fuel_type(&row.fuel_type)?,
        price: price(row.price)?,
        reporter_id: row.user_id,
        reported_at: row.created_at,
        confirmations: confirmations(row.confirmations),
        cycle_id: row.cycle_id,
    })
}

pub fn cycle_status_str(status: CycleStatus) -> &'static str {
    match status {
        CycleStatus::Active => "active",
        CycleStatus::Closed => "closed",
    }
}

/// Convert a `price_cycles` row.
pub fn convert_price_cycle(row: PriceCycleRow) -> Result<PriceCycle, ConversionError> {
    let status = match row.status.as_str() {
        "active" => CycleStatus::Active,
        "closed" => CycleStatus::Closed,
        other => {
            return Err(ConversionError::InvalidEnum {
                field: "status",
                value: other.to_string(),
            });
        }
    };

    Ok(PriceCycle {
        id: row.id,
        label: row.label,
        starts_at: row.starts_at,
        ends_at: row.ends_at,
        status,
    })
}

pub fn report_reason_str(reason: ReportReason) -> &'static str {
    match reason {
        ReportReason::WrongPrice => "wrong_price",
        ReportReason::StationClosed => "station_closed",
        ReportReason::WrongLocation => "wrong_location",
        ReportReason::Other => "other",
    }
}

pub fn report_status_str(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Pending => "pending",
        ReportStatus::Resolved => "resolved",
        ReportStatus::Dismissed => "dismissed",
    }
}

/// Convert a `user_reports` row.
pub fn convert_user_report(row: UserReportRow) -> Result<UserReport, ConversionError> {
    let reason = match row.reason.as_str() {
        "wrong_price" => ReportReason::WrongPrice,
        "station_closed" => ReportReason::StationClosed,
        "wrong_location" => ReportReason::WrongLocation,
        "other" => ReportReason::Other,
        other => {
            return Err(ConversionError::InvalidEnum {
                field: "reason",
                value: other.to_string(),
            });
        }
    };
    let status = match row.status.as_str() {
        "pending" => ReportStatus::Pending,
        "resolved" => ReportStatus::Resolved,
        "dismissed" => ReportStatus::Dismissed,
        other => {
            return Err(ConversionError::InvalidEnum {
                field: "status",
                value: other.to_string(),
            });
        }
    };

    Ok(UserReport {
        id: row.id,
        station_id: station_id(row.station_id)?,
        reason,
        details: row.details,
        status,
        created_at: row.created_at,
        resolved_at: row.resolved_at,
    })
}
