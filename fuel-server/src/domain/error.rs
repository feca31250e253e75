//! Domain error types.
//!
//! These errors represent validation failures and invalid state changes
//! in the domain layer. They are distinct from API/IO errors.

use crate::geo::InvalidCoordinate;

use super::{InvalidFuelType, InvalidPrice, InvalidStation};

/// Domain-level errors for validation and state transitions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    #[error(transparent)]
    InvalidPrice(#[from] InvalidPrice),

    #[error(transparent)]
    InvalidFuelType(#[from] InvalidFuelType),

    #[error(transparent)]
    InvalidStation(#[from] InvalidStation),

    #[error(transparent)]
    InvalidCoordinate(#[from] InvalidCoordinate),

    /// Opening a cycle while another is still active
    #[error("price cycle {0} is still active")]
    CycleAlreadyActive(i64),

    /// Closing a cycle that is not active
    #[error("price cycle {0} is not active")]
    CycleNotActive(i64),

    /// Resolving a report that was already resolved or dismissed
    #[error("report {0} is already closed")]
    ReportAlreadyClosed(i64),

    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    #[error("details are required for this report reason")]
    MissingDetails,

    #[error("details must be at most {0} characters")]
    DetailsTooLong(usize),
}
