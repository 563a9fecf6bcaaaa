//! Geographic helpers for mock agent placement

use serde::{Deserialize, Serialize};

/// Earth's radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPosition {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Offset this position by an arc distance (radians) along a bearing angle
    /// (radians, measured from north).
    ///
    /// Equirectangular approximation: the latitude offset is the arc converted
    /// to degrees, the longitude offset is additionally divided by
    /// `cos(latitude)` to correct for meridian convergence. Only accurate for
    /// the few kilometres the simulation uses.
    pub fn offset_equirectangular(&self, arc_radians: f64, angle_radians: f64) -> GeoPosition {
        let lat_offset = (arc_radians * angle_radians.cos()).to_degrees();
        let lng_offset =
            (arc_radians * angle_radians.sin()).to_degrees() / self.latitude.to_radians().cos();

        GeoPosition::new(self.latitude + lat_offset, self.longitude + lng_offset)
    }

    /// Shift by raw degree deltas
    pub fn shifted(&self, d_lat: f64, d_lng: f64) -> GeoPosition {
        GeoPosition::new(self.latitude + d_lat, self.longitude + d_lng)
    }

    /// Great-circle distance in kilometers (Haversine)
    pub fn distance_to(&self, other: &GeoPosition) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lng = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    /// Convert to `[latitude, longitude]`
    pub fn to_array(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

impl From<[f64; 2]> for GeoPosition {
    fn from(coords: [f64; 2]) -> Self {
        Self::new(coords[0], coords[1])
    }
}

// ============================================================================
// TESTS
// ============================================================================
