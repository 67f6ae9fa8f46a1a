//! Great-circle distance helpers.

use crate::models::PointRecord;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters (Haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Sum of straight-line legs along the waypoint chain, in visiting order.
pub fn straight_line_length(points: &[PointRecord]) -> f64 {
    points
        .windows(2)
        .map(|leg| {
            haversine_distance(
                leg[0].latitude,
                leg[0].longitude,
                leg[1].latitude,
                leg[1].longitude,
            )
        })
        .sum()
}
