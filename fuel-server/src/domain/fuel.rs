//! Fuel product types sold at Philippine stations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown fuel type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fuel type: {0:?}")]
pub struct InvalidFuelType(String);

/// A fuel product.
///
/// The backend stores these as snake_case names (`diesel`, `gasoline_91`,
/// ...). Parsing also accepts the names printed on pump signage.
///
/// # Examples
///
/// ```
/// use fuel_server::domain::FuelType;
///
/// assert_eq!(FuelType::parse("diesel").unwrap(), FuelType::Diesel);
/// assert_eq!(FuelType::parse("Premium").unwrap(), FuelType::Gasoline95);
/// assert_eq!(FuelType::Gasoline91.as_str(), "gasoline_91");
/// assert!(FuelType::parse("jet_a1").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Diesel,
    #[serde(rename = "gasoline_91")]
    Gasoline91,
    #[serde(rename = "gasoline_95")]
    Gasoline95,
    #[serde(rename = "gasoline_97")]
    Gasoline97,
    Kerosene,
    Lpg,
}

impl FuelType {
    pub const ALL: [FuelType; 6] = [
        FuelType::Diesel,
        FuelType::Gasoline91,
        FuelType::Gasoline95,
        FuelType::Gasoline97,
        FuelType::Kerosene,
        FuelType::Lpg,
    ];

    /// Parse a fuel type, case-insensitively.
    pub fn parse(s: &str) -> Result<Self, InvalidFuelType> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        let fuel = match normalized.as_str() {
            "diesel" => FuelType::Diesel,
            "gasoline_91" | "regular" | "unleaded" | "ron91" | "ron_91" => FuelType::Gasoline91,
            "gasoline_95" | "premium" | "ron95" | "ron_95" => FuelType::Gasoline95,
            "gasoline_97" | "super_premium" | "ron97" | "ron_97" => FuelType::Gasoline97,
            "kerosene" | "gaas" => FuelType::Kerosene,
            "lpg" | "autogas" => FuelType::Lpg,
            _ => return Err(InvalidFuelType(s.to_string())),
        };
        Ok(fuel)
    }

    /// Backend column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Diesel => "diesel",
            FuelType::Gasoline91 => "gasoline_91",
            FuelType::Gasoline95 => "gasoline_95",
            FuelType::Gasoline97 => "gasoline_97",
            FuelType::Kerosene => "kerosene",
            FuelType::Lpg => "lpg",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            FuelType::Diesel => "Diesel",
            FuelType::Gasoline91 => "Regular (RON 91)",
            FuelType::Gasoline95 => "Premium (RON 95)",
            FuelType::Gasoline97 => "Super Premium (RON 97)",
            FuelType::Kerosene => "Kerosene",
            FuelType::Lpg => "LPG",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
