//! Great-circle distance on a spherical Earth.

use serde::{Deserialize, Serialize};

/// Mean Earth radius (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, String> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {} is outside [-90, 90]", lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(format!("longitude {} is outside [-180, 180]", lng));
        }
        Ok(Self { lat, lng })
    }
}

/// Haversine distance. Works across the antimeridian and at the poles because only
/// sines of half-deltas are used.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

/// Lower bound of the great-circle distance: the meridian arc between the two latitudes.
pub fn latitude_gap_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    (b.lat - a.lat).to_radians().abs() * EARTH_RADIUS_METERS
}
