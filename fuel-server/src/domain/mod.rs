//! Domain types for the fuel price service.
//!
//! This module contains the core domain model types that represent
//! validated station and price data. All types enforce their invariants
//! at construction time, so code that receives these types can trust
//! their validity.

mod cycle;
mod error;
mod fuel;
mod price;
mod report;
mod station;

pub use cycle::{CycleStatus, PriceCycle, ensure_can_open, validate_label};
pub use error::DomainError;
pub use fuel::{FuelType, InvalidFuelType};
pub use price::{
    DoePrice, FuelPrice, InvalidPrice, MAX_REPORTABLE_CENTAVOS, MIN_REPORTABLE_CENTAVOS, Price,
    PriceSource, PricedStation,
};
pub use report::{
    MAX_DETAILS_LEN, NewPriceReport, NewUserReport, PriceReport, ReportReason, ReportStatus,
    UserReport,
};
pub use station::{Brand, InvalidStation, Station, StationId};
