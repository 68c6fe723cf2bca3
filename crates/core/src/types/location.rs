//! Pickup coordinates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors for out-of-range coordinates.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// Latitude outside [-90, 90].
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(Decimal),
    /// Longitude outside [-180, 180].
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(Decimal),
}

/// A WGS84 point stored as exact decimals.
///
/// Coordinates are kept as `Decimal` so that what the requester submitted is
/// exactly what helpers see; on the wire they are strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub lat: Decimal,
    /// Longitude in degrees.
    pub lng: Decimal,
}

impl Location {
    /// Build a location, checking both coordinates are in range.
    ///
    /// # Errors
    ///
    /// Returns `LocationError` when either coordinate is out of range.
    pub fn new(lat: Decimal, lng: Decimal) -> Result<Self, LocationError> {
        if lat < Decimal::from(-90) || lat > Decimal::from(90) {
            return Err(LocationError::Latitude(lat));
        }
        if lng < Decimal::from(-180) || lng > Decimal::from(180) {
            return Err(LocationError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_accepts_bounds() {
        assert!(Location::new(dec("51.5074"), dec("-0.1278")).is_ok());
        assert!(Location::new(dec("-90"), dec("180")).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert_eq!(
            Location::new(dec("90.0001"), dec("0")),
            Err(LocationError::Latitude(dec("90.0001")))
        );
        assert_eq!(
            Location::new(dec("0"), dec("-180.5")),
            Err(LocationError::Longitude(dec("-180.5")))
        );
    }
}
