//! OSRM route service HTTP client.

use rota_core::models::in_range;
use rota_core::{LonLat, Overview, Profile, RouteProvider, RouteResult, RoutingError};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// The only place the client touches the network. One call, no retries.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

/// Blocking reqwest transport with a bounded request timeout.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, RoutingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rota/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| RoutingError::ServiceUnavailable(err.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let response = self.client.get(url).send().map_err(|err| err.to_string())?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|err| err.to_string())?;
        Ok(HttpResponse { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    geometry: Option<OsrmGeometry>,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Client for `{base_url}/route/v1/{profile}/...`.
///
/// Holds only the base URL and transport; profile and overview travel with
/// each call.
pub struct OsrmClient<T: HttpTransport = ReqwestTransport> {
    base_url: String,
    transport: T,
}

impl OsrmClient<ReqwestTransport> {
    /// Create a client with the default 30 s timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RoutingError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        Ok(Self::with_transport(base_url, ReqwestTransport::new(timeout)?))
    }
}

impl<T: HttpTransport> OsrmClient<T> {
    pub fn with_transport(base_url: impl Into<String>, transport: T) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the multi-waypoint route URL. `points` are `(lat, lon)` pairs.
    pub fn route_url(&self, points: &[(f64, f64)], profile: Profile, overview: Overview) -> String {
        let coordinates = points
            .iter()
            .map(|(lat, lon)| format!("{},{}", lon, lat))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/route/v1/{}/{}?overview={}&geometries=geojson&annotations=distance,duration",
            self.base_url, profile, coordinates, overview
        )
    }

    /// Route through every point in the given order.
    pub fn route_multi(
        &self,
        points: &[(f64, f64)],
        profile: Profile,
        overview: Overview,
    ) -> Result<RouteResult, RoutingError> {
        if points.len() < 2 {
            return Err(RoutingError::InsufficientPoints(points.len()));
        }

        let url = self.route_url(points, profile, overview);
        tracing::debug!(%url, waypoints = points.len(), "requesting OSRM route");

        let response = self.transport.get(&url).map_err(|err| {
            tracing::warn!("OSRM request failed: {}", err);
            RoutingError::ServiceUnavailable(err)
        })?;

        if !(200..300).contains(&response.status) {
            tracing::warn!(status = response.status, "OSRM returned non-success status");
            return Err(RoutingError::ServiceUnavailable(format!(
                "HTTP {}: {}",
                response.status,
                truncate(&response.body, 512)
            )));
        }

        parse_route_response(&response.body)
    }
}

impl<T: HttpTransport> RouteProvider for OsrmClient<T> {
    fn route(
        &self,
        points: &[(f64, f64)],
        profile: Profile,
        overview: Overview,
    ) -> Result<RouteResult, RoutingError> {
        self.route_multi(points, profile, overview)
    }
}

/// Interpret a 2xx OSRM body. Non-"Ok" codes and empty route lists are
/// reported with the raw payload.
pub fn parse_route_response(body: &str) -> Result<RouteResult, RoutingError> {
    let payload: Value = serde_json::from_str(body).map_err(|err| {
        RoutingError::MalformedResponse(format!("invalid JSON ({}): {}", err, truncate(body, 512)))
    })?;

    let code = payload.get("code").and_then(Value::as_str);
    let has_routes = payload
        .get("routes")
        .and_then(Value::as_array)
        .map(|routes| !routes.is_empty())
        .unwrap_or(false);
    if code != Some("Ok") || !has_routes {
        tracing::warn!(?code, "OSRM reported no route");
        return Err(RoutingError::NoRouteFound { payload });
    }

    let first = payload["routes"][0].clone();
    let route: OsrmRoute = serde_json::from_value(first)
        .map_err(|err| RoutingError::MalformedResponse(err.to_string()))?;

    if !route.distance.is_finite() || route.distance < 0.0 {
        return Err(RoutingError::MalformedResponse(format!(
            "route distance must be a non-negative number, got {}",
            route.distance
        )));
    }
    if !route.duration.is_finite() || route.duration < 0.0 {
        return Err(RoutingError::MalformedResponse(format!(
            "route duration must be a non-negative number, got {}",
            route.duration
        )));
    }

    let geometry: Vec<LonLat> = route
        .geometry
        .map(|geometry| {
            geometry
                .coordinates
                .into_iter()
                .map(|[lon, lat]| LonLat::new(lon, lat))
                .collect()
        })
        .unwrap_or_default();

    // Overview "false" answers carry no geometry and end up here too.
    if geometry.len() < 2 {
        return Err(RoutingError::MalformedResponse(format!(
            "route geometry needs at least 2 vertices, got {}",
            geometry.len()
        )));
    }
    if let Some(vertex) = geometry.iter().find(|v| !in_range(v.lat, v.lon)) {
        return Err(RoutingError::MalformedResponse(format!(
            "route vertex out of range: {},{}",
            vertex.lon, vertex.lat
        )));
    }

    tracing::debug!(
        distance_m = route.distance,
        duration_s = route.duration,
        vertices = geometry.len(),
        "OSRM route received"
    );

    Ok(RouteResult {
        distance_meters: route.distance,
        duration_seconds: route.duration,
        geometry,
    })
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoNetwork;

    impl HttpTransport for NoNetwork {
        fn get(&self, _url: &str) -> Result<HttpResponse, String> {
            Err("network disabled".to_string())
        }
    }

    #[test]
    fn test_route_url_format() {
        let client = OsrmClient::with_transport("https://router.example.org/ ", NoNetwork);
        let url = client.route_url(
            &[(-5.79448, -35.211), (-5.8129, -35.2374), (-5.8, -35.22)],
            Profile::Cycling,
            Overview::Full,
        );
        assert_eq!(
            url,
            "https://router.example.org/route/v1/cycling/-35.211,-5.79448;-35.2374,-5.8129;-35.22,-5.8\
             ?overview=full&geometries=geojson&annotations=distance,duration"
        );
    }

    #[test]
    fn test_parse_ok_response() {
        let body = r#"{"code":"Ok","routes":[{"distance":1500.5,"duration":120.0,
            "geometry":{"type":"LineString","coordinates":[[-35.21,-5.79],[-35.22,-5.80],[-35.23,-5.81]]}}],
            "waypoints":[]}"#;
        let route = parse_route_response(body).unwrap();
        assert_eq!(route.distance_meters, 1500.5);
        assert_eq!(route.duration_seconds, 120.0);
        assert_eq!(
            route.geometry,
            vec![
                LonLat::new(-35.21, -5.79),
                LonLat::new(-35.22, -5.80),
                LonLat::new(-35.23, -5.81)
            ]
        );
    }

    #[test]
    fn test_parse_no_route() {
        let body = r#"{"code":"NoRoute","message":"Impossible route between points","routes":[]}"#;
        match parse_route_response(body) {
            Err(RoutingError::NoRouteFound { payload }) => {
                assert_eq!(payload["code"], "NoRoute");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ok_without_routes() {
        assert!(matches!(
            parse_route_response(r#"{"code":"Ok","routes":[]}"#),
            Err(RoutingError::NoRouteFound { .. })
        ));
        assert!(matches!(
            parse_route_response(r#"{"code":"Ok"}"#),
            Err(RoutingError::NoRouteFound { .. })
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_route_response("<html>busy</html>"),
            Err(RoutingError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_missing_geometry_is_malformed() {
        // What overview=false returns.
        let body = r#"{"code":"Ok","routes":[{"distance":10.0,"duration":2.0}]}"#;
        assert!(matches!(
            parse_route_response(body),
            Err(RoutingError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_single_vertex_geometry_is_malformed() {
        let body = r#"{"code":"Ok","routes":[{"distance":10.0,"duration":2.0,
            "geometry":{"coordinates":[[-35.21,-5.79]]}}]}"#;
        match parse_route_response(body) {
            Err(RoutingError::MalformedResponse(reason)) => assert!(reason.contains("2 vertices")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_negative_distance_or_duration_is_malformed() {
        let negative_distance = r#"{"code":"Ok","routes":[{"distance":-5.0,"duration":2.0,
            "geometry":{"coordinates":[[-35.21,-5.79],[-35.22,-5.80]]}}]}"#;
        let negative_duration = r#"{"code":"Ok","routes":[{"distance":5.0,"duration":-1.0,
            "geometry":{"coordinates":[[-35.21,-5.79],[-35.22,-5.80]]}}]}"#;
        assert!(matches!(
            parse_route_response(negative_distance),
            Err(RoutingError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_route_response(negative_duration),
            Err(RoutingError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_out_of_range_vertex_is_malformed() {
        let body = r#"{"code":"Ok","routes":[{"distance":5.0,"duration":1.0,
            "geometry":{"coordinates":[[-35.21,-5.79],[200.0,95.0]]}}]}"#;
        assert!(matches!(
            parse_route_response(body),
            Err(RoutingError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("ação", 2), "aç");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
