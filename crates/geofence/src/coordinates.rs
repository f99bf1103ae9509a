use core::str::FromStr;
use serde::{Deserialize, Serialize};

use teashop_core::{DomainError, DomainResult, ValueObject};

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl ValueObject for LatLng {}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> DomainResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(DomainError::validation(format!("latitude out of range: {lat}")));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(DomainError::validation(format!("longitude out of range: {lng}")));
        }
        Ok(Self { lat, lng })
    }
}

impl core::fmt::Display for LatLng {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Parses the checkout wire form `"lat,lng"` (whitespace around parts is ignored).
impl FromStr for LatLng {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| DomainError::validation("coordinates must look like \"lat,lng\""))?;

        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid latitude '{}'", lat.trim())))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid longitude '{}'", lng.trim())))?;

        Self::new(lat, lng)
    }
}
