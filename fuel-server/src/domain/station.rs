//! Gas station types.

use std::fmt;

use crate::geo::Coordinate;

/// Error returned when building an invalid station identifier or name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station: {reason}")]
pub struct InvalidStation {
    reason: &'static str,
}

/// Primary key of a station row.
///
/// Always positive.
///
/// # Examples
///
/// ```
/// use fuel_server::domain::StationId;
///
/// let id = StationId::new(42).unwrap();
/// assert_eq!(id.get(), 42);
///
/// assert!(StationId::new(0).is_err());
/// assert!(StationId::new(-3).is_err());
/// assert_eq!(StationId::parse("17").unwrap().get(), 17);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId(i64);

impl StationId {
    pub fn new(id: i64) -> Result<Self, InvalidStation> {
        if id <= 0 {
            return Err(InvalidStation {
                reason: "station id must be positive",
            });
        }
        Ok(StationId(id))
    }

    /// Parse a station id from a decimal string.
    pub fn parse(s: &str) -> Result<Self, InvalidStation> {
        let id = s.trim().parse::<i64>().map_err(|_| InvalidStation {
            reason: "station id must be an integer",
        })?;
        Self::new(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fuel retail brand (e.g. "Petron", "Shell", "Seaoil").
///
/// Trimmed and non-empty.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Brand(String);

impl Brand {
    pub fn new(s: &str) -> Result<Self, InvalidStation> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(InvalidStation {
                reason: "brand cannot be empty",
            });
        }
        Ok(Brand(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Brand({})", self.0)
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A gas station with a validated location.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub brand: Brand,
    /// Street address as entered by the admin who created the station
    pub address: Option<String>,
    /// Municipality or city (e.g. "Quezon City")
    pub city: Option<String>,
    pub location: Coordinate,
    pub is_active: bool,
}

impl Station {
    /// Create a new active station.
    ///
    /// The name is trimmed and must be non-empty.
    pub fn new(
        id: StationId,
        name: &str,
        brand: Brand,
        location: Coordinate,
    ) -> Result<Self, InvalidStation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InvalidStation {
                reason: "station name cannot be empty",
            });
        }
        Ok(Self {
            id,
            name: name.to_string(),
            brand,
            address: None,
            city: None,
            location,
            is_active: true,
        })
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Display label combining brand and name, e.g. "Petron - EDSA Cubao".
    pub fn display_name(&self) -> String {
        if self
            .name
            .to_lowercase()
            .starts_with(&self.brand.as_str().to_lowercase())
        {
            self.name.clone()
        } else {
            format!("{} - {}", self.brand, self.name)
        }
    }
}
