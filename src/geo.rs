//! Great-circle distances and radius search.
//!
//! The treatment plant table holds hundreds of rows, so proximity queries are
//! a linear scan over the table rather than a spatial index.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CalWaterError, Result};
use crate::records::TreatmentPlantRecord;

/// Earth's mean radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points given in decimal degrees,
/// computed with the haversine formula
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// A validated query coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point, rejecting non-finite or out-of-range coordinates
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CalWaterError::validation(
                "lat",
                format!("latitude must be between -90 and 90, got {}", latitude),
            ));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CalWaterError::validation(
                "lng",
                format!("longitude must be between -180 and 180, got {}", longitude),
            ));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_distance_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// A row with a position
pub trait Located {
    /// (latitude, longitude) in decimal degrees
    fn location(&self) -> (f64, f64);
}

impl<L: Located + ?Sized> Located for &L {
    fn location(&self) -> (f64, f64) {
        (**self).location()
    }
}

impl Located for TreatmentPlantRecord {
    fn location(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// A row found by [`find_within_radius`] together with its distance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nearby<R> {
    #[serde(flatten)]
    pub record: R,
    pub distance_km: f64,
}

/// Rows within `radius_km` of (`lat`, `lon`), nearest first.
///
/// Rows at equal distance keep their table order.
pub fn find_within_radius<R: Located + Clone>(
    rows: &[R],
    lat: f64,
    lon: f64,
    radius_km: f64,
) -> Vec<Nearby<R>> {
    let mut found: Vec<Nearby<R>> = rows
        .iter()
        .filter_map(|row| {
            let (row_lat, row_lon) = row.location();
            let distance_km = haversine_distance_km(lat, lon, row_lat, row_lon);
            (distance_km <= radius_km).then(|| Nearby {
                record: row.clone(),
                distance_km,
            })
        })
        .collect();

    found.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    found
}
