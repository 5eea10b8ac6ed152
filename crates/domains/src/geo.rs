//! # Geographic primitives
//!
//! Points and great-circle distance shared by the gazetteer, the filter
//! evaluator and the location post-processing helpers.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for Haversine distances, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Standard Haversine distance between two coordinates, in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Rounds a distance to one decimal place for display.
pub fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(haversine_km(53.4808, -2.2426, 53.4808, -2.2426), 0.0);
    }

    #[test]
    fn london_to_manchester_is_about_262_km() {
        let km = haversine_km(51.5074, -0.1278, 53.4808, -2.2426);
        assert!((km - 262.0).abs() < 2.0, "got {km}");
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(round_km(12.345), 12.3);
        assert_eq!(round_km(12.36), 12.4);
    }
}
