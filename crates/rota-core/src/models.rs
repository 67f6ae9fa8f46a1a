//! Core data models shared by the parser, router and exporter.

use serde::{Deserialize, Serialize};

/// A route vertex in routing-service order: longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<(f64, f64)> for LonLat {
    fn from((lon, lat): (f64, f64)) -> Self {
        Self { lon, lat }
    }
}

/// A named waypoint. The order of a `Vec<PointRecord>` is the visiting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl PointRecord {
    /// Build a record, rejecting coordinates outside the WGS84 ranges.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Option<Self> {
        if !in_range(latitude, longitude) {
            return None;
        }
        Some(Self {
            name: name.into(),
            latitude,
            longitude,
        })
    }

    /// Coordinates as a `(lat, lon)` pair.
    pub fn lat_lon(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    pub fn to_lon_lat(&self) -> LonLat {
        LonLat::new(self.longitude, self.latitude)
    }
}

/// Latitude in [-90, 90] and longitude in [-180, 180]. NaN is never in range.
pub fn in_range(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

/// Outcome of one routing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Vertices exactly as the routing service returned them.
    pub geometry: Vec<LonLat>,
}
