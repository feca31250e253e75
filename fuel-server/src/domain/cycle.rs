//! Price-reporting cycles.
//!
//! Community reports are grouped into cycles, usually one per weekly DOE
//! price adjustment. At most one cycle is active at a time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Active,
    Closed,
}

/// A price-reporting cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceCycle {
    pub id: i64,
    /// Admin-facing label, e.g. "Week of Mar 10"
    pub label: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: CycleStatus,
}

impl PriceCycle {
    pub fn is_active(&self) -> bool {
        self.status == CycleStatus::Active
    }

    /// Close an active cycle at `at`.
    pub fn close(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::CycleNotActive(self.id));
        }
        if at < self.starts_at {
            return Err(DomainError::InvalidTransition(
                "a cycle cannot end before it starts",
            ));
        }
        self.status = CycleStatus::Closed;
        self.ends_at = Some(at);
        Ok(())
    }
}

/// Check a new cycle may be opened given the cycles already known.
pub fn ensure_can_open(existing: &[PriceCycle]) -> Result<(), DomainError> {
    match existing.iter().find(|c| c.is_active()) {
        Some(active) => Err(DomainError::CycleAlreadyActive(active.id)),
        None => Ok(()),
    }
}

/// Validate an admin-supplied cycle label.
pub fn validate_label(label: &str) -> Result<String, DomainError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(DomainError::InvalidTransition("cycle label cannot be empty"));
    }
    Ok(label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 0, 0, 0).unwrap()
    }

    fn cycle(id: i64, status: CycleStatus) -> PriceCycle {
        PriceCycle {
            id,
            label: format!("cycle {id}"),
            starts_at: at(10),
            ends_at: None,
            status,
        }
    }

    #[test]
    fn close_active_cycle() {
        let mut c = cycle(1, CycleStatus::Active);
        c.close(at(17)).unwrap();
        assert_eq!(c.status, CycleStatus::Closed);
        assert_eq!(c.ends_at, Some(at(17)));
    }

    #[test]
    fn cannot_close_closed_cycle() {
        let mut c = cycle(2, CycleStatus::Closed);
        assert!(matches!(c.close(at(17)), Err(DomainError::CycleNotActive(2))));
    }

    #[test]
    fn cannot_end_before_start() {
        let mut c = cycle(3, CycleStatus::Active);
        assert!(c.close(at(9)).is_err());
        assert!(c.is_active());
    }

    #[test]
    fn only_one_active_cycle() {
        let cycles = vec![cycle(1, CycleStatus::Closed), cycle(2, CycleStatus::Active)];
        assert!(matches!(
            ensure_can_open(&cycles),
            Err(DomainError::CycleAlreadyActive(2))
        ));
        assert!(ensure_can_open(&cycles[..1]).is_ok());
        assert!(ensure_can_open(&[]).is_ok());
    }

    #[test]
    fn label_validation() {
        assert_eq!(validate_label("  Week 11 ").unwrap(), "Week 11");
        assert!(validate_label(" ").is_err());
    }
}
