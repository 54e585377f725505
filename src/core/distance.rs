use crate::models::{BoundingBox, Coordinates};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Earth's radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree used by the planar approximation (equatorial value)
pub const KM_PER_DEGREE: f64 = 111.319;

/// How distances between two coordinates are computed.
///
/// A deployment picks one mode and keeps it; the two are not numerically
/// interchangeable near a radius boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMode {
    /// Great-circle distance, accurate at every latitude
    #[default]
    Haversine,
    /// Flat-earth approximation with a fixed 111.319 km per degree on both axes
    Planar,
}

impl DistanceMode {
    /// Distance in kilometers between two points under this mode
    #[inline]
    pub fn distance(self, from: Coordinates, to: Coordinates) -> f64 {
        match self {
            DistanceMode::Haversine => {
                haversine_distance(from.latitude, from.longitude, to.latitude, to.longitude)
            }
            DistanceMode::Planar => {
                planar_distance(from.latitude, from.longitude, to.latitude, to.longitude)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DistanceMode::Haversine => "haversine",
            DistanceMode::Planar => "planar",
        }
    }
}

impl fmt::Display for DistanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haversine" => Ok(DistanceMode::Haversine),
            "planar" => Ok(DistanceMode::Planar),
            other => Err(format!("unknown distance mode '{}'", other)),
        }
    }
}

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Planar (Pythagorean) distance in kilometers.
///
/// Treats one degree as 111.319 km on both axes, so it overestimates east-west
/// distances away from the equator. Only meaningful for small radii.
#[inline]
pub fn planar_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dy = (lat2 - lat1) * KM_PER_DEGREE;
    let dx = (lon2 - lon1) * KM_PER_DEGREE;
    (dy * dy + dx * dx).sqrt()
}

/// Calculate a bounding box around a center point
///
/// The box contains every point within `radius_km` under either distance mode,
/// so it is safe as a SQL pre-filter. Latitude is clamped to the poles; when
/// the longitude span would wrap past ±180° (or the box touches a pole) the
/// longitude range covers the whole globe.
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    // 1 degree latitude is at least ~111 km
    let lat_delta = radius_km / 111.0;

    let min_lat = (lat - lat_delta).max(-90.0);
    let max_lat = (lat + lat_delta).min(90.0);

    // 1 degree longitude shrinks with latitude; size it for the widest row in the box
    let widest_lat = min_lat.abs().max(max_lat.abs());
    let lon_delta = radius_km / (111.0 * widest_lat.to_radians().cos().abs());

    let (min_lon, max_lon) = if !lon_delta.is_finite()
        || lon - lon_delta < -180.0
        || lon + lon_delta > 180.0
    {
        (-180.0, 180.0)
    } else {
        (lon - lon_delta, lon + lon_delta)
    };

    BoundingBox {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(lat: f64, lon: f64, bbox: &BoundingBox) -> bool {
    lat >= bbox.min_lat && lat <= bbox.max_lat && lon >= bbox.min_lon && lon <= bbox.max_lon
}
