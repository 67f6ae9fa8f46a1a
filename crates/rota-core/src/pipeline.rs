//! Orchestration: ordered points -> routing service -> KMZ bytes.

use crate::coords::CoordinateError;
use crate::kmz::{export_kmz, ExportError};
use crate::models::{PointRecord, RouteResult};
use crate::parsers::ParseError;
use crate::routing::{Overview, Profile, RouteProvider, RoutingError};
use crate::spatial::straight_line_length;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_ROUTE_NAME: &str = "Rota OSRM";
const ORIGIN_FALLBACK: &str = "Origem";
const DESTINATION_FALLBACK: &str = "Destino";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Coordinates(#[from] CoordinateError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Per-request options. Nothing here outlives one call.
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub profile: Profile,
    pub overview: Overview,
    pub route_name: String,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            overview: Overview::default(),
            route_name: DEFAULT_ROUTE_NAME.to_string(),
        }
    }
}

/// Figures shown next to the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_min: f64,
    pub waypoints: usize,
    pub straight_line_km: f64,
}

/// Everything a presentation layer needs after a successful request.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    pub route: RouteResult,
    pub origin: PointRecord,
    pub destination: PointRecord,
    pub summary: RouteSummary,
    pub kmz: Vec<u8>,
}

fn marker(point: &PointRecord, fallback: &str) -> PointRecord {
    let mut marker = point.clone();
    if marker.name.trim().is_empty() {
        marker.name = fallback.to_string();
    }
    marker
}

/// Route through `points` in order and export the result as KMZ.
///
/// Origin and destination markers are the first and last points. Any failure
/// aborts the whole request; no partial plan is returned.
pub fn plan_route(
    provider: &dyn RouteProvider,
    points: &[PointRecord],
    options: &RouteOptions,
) -> Result<RoutePlan, PipelineError> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Err(RoutingError::InsufficientPoints(0).into());
    };

    let coordinates: Vec<(f64, f64)> = points.iter().map(PointRecord::lat_lon).collect();
    let route = provider.route(&coordinates, options.profile, options.overview)?;

    let summary = RouteSummary {
        distance_km: route.distance_meters / 1000.0,
        duration_min: route.duration_seconds / 60.0,
        waypoints: points.len(),
        straight_line_km: straight_line_length(points) / 1000.0,
    };

    let origin = marker(first, ORIGIN_FALLBACK);
    let destination = marker(last, DESTINATION_FALLBACK);
    let description = format!("{} - {:.2} km", options.profile, summary.distance_km);

    let kmz = export_kmz(
        &route.geometry,
        &origin,
        &destination,
        &options.route_name,
        &description,
    )?;

    tracing::info!(
        profile = %options.profile,
        waypoints = summary.waypoints,
        distance_km = summary.distance_km,
        duration_min = summary.duration_min,
        "route planned"
    );

    Ok(RoutePlan {
        route,
        origin,
        destination,
        summary,
        kmz,
    })
}
