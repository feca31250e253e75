//! Peso price amounts.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::{FuelType, Station};

/// Error returned when a price cannot be parsed or is out of range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid price: {reason}")]
pub struct InvalidPrice {
    reason: &'static str,
}

impl InvalidPrice {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Lowest per-litre price a community report may carry, in centavos.
pub const MIN_REPORTABLE_CENTAVOS: u32 = 20_00;

/// Highest per-litre price a community report may carry, in centavos.
pub const MAX_REPORTABLE_CENTAVOS: u32 = 200_00;

/// A per-litre price in Philippine pesos, stored as whole centavos.
///
/// # Examples
///
/// ```
/// use fuel_server::domain::Price;
///
/// let p = Price::parse("61.45").unwrap();
/// assert_eq!(p.centavos(), 6145);
/// assert_eq!(p.to_string(), "₱61.45");
///
/// // More than two decimal places is rejected
/// assert!(Price::parse("61.455").is_err());
/// assert!(Price::from_pesos(-1.0).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Price(u32);

impl Price {
    pub const fn from_centavos(centavos: u32) -> Self {
        Price(centavos)
    }

    /// Build from a peso amount as returned by the backend's numeric columns.
    pub fn from_pesos(pesos: f64) -> Result<Self, InvalidPrice> {
        if !pesos.is_finite() {
            return Err(InvalidPrice::new("must be a finite number"));
        }
        if pesos < 0.0 {
            return Err(InvalidPrice::new("cannot be negative"));
        }

        let scaled = pesos * 100.0;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > 1e-6 {
            return Err(InvalidPrice::new("at most two decimal places"));
        }
        if rounded > f64::from(u32::MAX) {
            return Err(InvalidPrice::new("too large"));
        }

        Ok(Price(rounded as u32))
    }

    /// Parse a decimal peso string such as `"61.45"`, `"₱61.45"` or `"61"`.
    pub fn parse(s: &str) -> Result<Self, InvalidPrice> {
        let s = s.trim();
        let s = s.strip_prefix('₱').unwrap_or(s).trim_start();

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidPrice::new("expected digits before the decimal point"));
        }
        if s.contains('.') && frac.is_empty() {
            return Err(InvalidPrice::new("expected digits after the decimal point"));
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidPrice::new("at most two decimal places"));
        }

        let pesos: u32 = whole
            .parse()
            .map_err(|_| InvalidPrice::new("too large"))?;
        let centavos: u32 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u32>().unwrap_or(0) * 10,
            _ => frac.parse::<u32>().unwrap_or(0),
        };

        pesos
            .checked_mul(100)
            .and_then(|p| p.checked_add(centavos))
            .map(Price)
            .ok_or_else(|| InvalidPrice::new("too large"))
    }

    pub fn centavos(&self) -> u32 {
        self.0
    }

    pub fn as_pesos(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Check the price is plausible for a community report.
    pub fn validate_reportable(self) -> Result<Self, InvalidPrice> {
        if self.0 < MIN_REPORTABLE_CENTAVOS {
            return Err(InvalidPrice::new("below the reportable minimum of ₱20.00"));
        }
        if self.0 > MAX_REPORTABLE_CENTAVOS {
            return Err(InvalidPrice::new("above the reportable maximum of ₱200.00"));
        }
        Ok(self)
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price({}.{:02})", self.0 / 100, self.0 % 100)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₱{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_pesos())
    }
}

/// Where a displayed price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Submitted and confirmed by users.
    Community,
    /// Department of Energy published reference price.
    Doe,
}

/// The current price of one fuel at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelPrice {
    pub fuel: FuelType,
    pub price: Price,
    pub source: PriceSource,
    /// Confirmations on the underlying community report (0 for DOE prices)
    pub confirmations: u32,
    pub reported_at: Option<DateTime<Utc>>,
    /// Community report backing this price, if any
    pub report_id: Option<i64>,
}

/// A station paired with one of its prices.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedStation {
    pub station: Station,
    pub price: FuelPrice,
}

/// A DOE published reference price for one fuel.
///
/// DOE publishes a range per area; `common` is the most prevalent retail
/// price in that range.
#[derive(Debug, Clone, PartialEq)]
pub struct DoePrice {
    pub fuel: FuelType,
    pub area: Option<String>,
    pub min: Option<Price>,
    pub max: Option<Price>,
    pub common: Price,
    pub effective_date: Option<NaiveDate>,
}

impl DoePrice {
    /// Present this reference price as a station price.
    pub fn as_fuel_price(&self) -> FuelPrice {
        FuelPrice {
            fuel: self.fuel,
            price: self.common,
            source: PriceSource::Doe,
            confirmations: 0,
            reported_at: None,
            report_id: None,
        }
    }
}
