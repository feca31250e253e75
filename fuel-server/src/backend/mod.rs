//! Managed backend data-access client.
//!
//! All durable state lives in a remote PostgREST-compatible database:
//! station rows, community price reports, DOE reference prices, favorites,
//! price cycles and user reports. Server-side views and RPCs do the heavy
//! aggregation (best price per station, confirmation counting).
//!
//! Key characteristics:
//! - Authorization is row-level security on the backend; this client only
//!   forwards the caller's bearer token
//! - Prices are numeric columns in pesos, converted to whole centavos here
//! - Rows that fail validation are dropped with a warning, never fail a list

mod client;
mod convert;
mod error;
mod types;

pub use client::{AccessToken, BackendClient, BackendConfig};
pub use convert::{ConversionError, convert_station, station_to_row};
pub use error::BackendError;
pub use types::{
    BestPriceRow, DoePriceRow, FavoritePriceRow, PriceCycleRow, PriceReportRow, StationInsert,
    StationRow, UserReportRow,
};
