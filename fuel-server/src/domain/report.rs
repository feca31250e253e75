//! Community price reports and user-submitted station reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::{FuelType, Price, StationId};

/// A price submitted by a user for one fuel at one station.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceReport {
    pub id: i64,
    pub station_id: StationId,
    pub fuel: FuelType,
    pub price: Price,
    /// Auth user id of the reporter (opaque to this service)
    pub reporter_id: Option<String>,
    pub reported_at: DateTime<Utc>,
    /// Number of other users who confirmed this price
    pub confirmations: u32,
    pub cycle_id: Option<i64>,
}

impl PriceReport {
    /// Whether this report is younger than `max_age` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now.signed_duration_since(self.reported_at) <= max_age
    }
}

/// A price the caller wants to submit. Validated before it reaches the
/// backend.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPriceReport {
    pub station_id: StationId,
    pub fuel: FuelType,
    pub price: Price,
}

impl NewPriceReport {
    pub fn new(station_id: StationId, fuel: FuelType, price: Price) -> Result<Self, DomainError> {
        let price = price.validate_reportable()?;
        Ok(Self {
            station_id,
            fuel,
            price,
        })
    }
}

/// Why a user flagged a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    WrongPrice,
    StationClosed,
    WrongLocation,
    Other,
}

/// Moderation state of a user report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn is_closed(&self) -> bool {
        !matches!(self, ReportStatus::Pending)
    }
}

/// A user report about a station, reviewed by administrators.
#[derive(Debug, Clone, PartialEq)]
pub struct UserReport {
    pub id: i64,
    pub station_id: StationId,
    pub reason: ReportReason,
    pub details: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl UserReport {
    /// Transition a pending report to `Resolved` or `Dismissed`.
    pub fn close(&mut self, status: ReportStatus, at: DateTime<Utc>) -> Result<(), DomainError> {
        if status == ReportStatus::Pending {
            return Err(DomainError::InvalidTransition(
                "a report can only be closed as resolved or dismissed",
            ));
        }
        if self.status.is_closed() {
            return Err(DomainError::ReportAlreadyClosed(self.id));
        }
        self.status = status;
        self.resolved_at = Some(at);
        Ok(())
    }
}

/// Maximum length of the free-text details on a user report.
pub const MAX_DETAILS_LEN: usize = 500;

/// A station report the caller wants to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserReport {
    pub station_id: StationId,
    pub reason: ReportReason,
    pub details: Option<String>,
}

impl NewUserReport {
    /// Blank details are dropped. `Other` requires details.
    pub fn new(
        station_id: StationId,
        reason: ReportReason,
        details: Option<&str>,
    ) -> Result<Self, DomainError> {
        let details = details
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        if let Some(d) = &details
            && d.chars().count() > MAX_DETAILS_LEN
        {
            return Err(DomainError::DetailsTooLong(MAX_DETAILS_LEN));
        }
        if reason == ReportReason::Other && details.is_none() {
            return Err(DomainError::MissingDetails);
        }

        Ok(Self {
            station_id,
            reason,
            details,
        })
    }
}
