pub mod coords;
pub mod kmz;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod routing;
pub mod spatial;

pub use coords::{parse_lat_lon, parse_pair, parse_pair_labeled, CoordinateError};
pub use kmz::{build_kml, export_kmz, package_kmz, ExportError, KMZ_MIME_TYPE};
pub use models::{LonLat, PointRecord, RouteResult};
pub use parsers::{parse_points, ParseError, PointFormat};
pub use pipeline::{plan_route, PipelineError, RouteOptions, RoutePlan, RouteSummary};
pub use routing::{Overview, Profile, RouteProvider, RoutingError};
pub use spatial::haversine_distance;
