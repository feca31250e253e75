//! Listing configuration.

/// Error for listing parameters supplied by the caller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ListingError {
    /// Radius is zero, negative or not a number
    #[error("radius must be a positive number of kilometres, got {0}")]
    InvalidRadius(f64),
}

/// Configuration parameters for distance-ranked listings.
#[derive(Debug, Clone)]
pub struct ListingConfig {
    /// Radius used when the caller does not give one (km).
    pub default_radius_km: f64,

    /// Largest radius a caller may request (km). Larger values are capped.
    pub max_radius_km: f64,

    /// Maximum number of entries returned by one listing.
    pub max_results: usize,
}

impl ListingConfig {
    /// Resolve the radius for a request.
    ///
    /// `None` yields the default; values above the maximum are capped.
    pub fn clamp_radius(&self, requested: Option<f64>) -> Result<f64, ListingError> {
        let radius = requested.unwrap_or(self.default_radius_km);
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ListingError::InvalidRadius(radius));
        }
        Ok(radius.min(self.max_radius_km))
    }

    /// Resolve the result limit for a request.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.max_results)
            .clamp(1, self.max_results)
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_radius_km: 10.0,
            max_radius_km: 50.0,
            max_results: 50,
        }
    }
}
