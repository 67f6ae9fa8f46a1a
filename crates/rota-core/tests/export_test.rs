//! KMZ export round-trips and the two-coordinate end-to-end path.

use quick_xml::events::Event;
use quick_xml::Reader;
use rota_core::parsers::{read_features, Feature, Geometry};
use rota_core::{
    export_kmz, parse_pair, plan_route, LonLat, Overview, PointRecord, Profile, RouteOptions,
    RouteProvider, RouteResult, RoutingError,
};
use std::io::{Cursor, Read};

/// Unzip and return `(entry name, KML text)` of every entry.
fn unzip(kmz: &[u8]) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(kmz)).unwrap();
    (0..archive.len())
        .map(|idx| {
            let mut entry = archive.by_index(idx).unwrap();
            let mut text = String::new();
            entry.read_to_string(&mut text).unwrap();
            (entry.name().to_string(), text)
        })
        .collect()
}

/// Coordinates of every LineString, as parsed `(lon, lat)` tuples.
fn line_strings(kml: &str) -> Vec<Vec<(f64, f64)>> {
    let mut reader = Reader::from_str(kml);
    reader.config_mut().trim_text(true);
    let mut lines = Vec::new();
    let mut in_line = false;
    let mut in_coordinates = false;
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.local_name().as_ref() == b"LineString" => in_line = true,
            Event::End(e) if e.local_name().as_ref() == b"LineString" => in_line = false,
            Event::Start(e) if e.local_name().as_ref() == b"coordinates" => in_coordinates = true,
            Event::End(e) if e.local_name().as_ref() == b"coordinates" => in_coordinates = false,
            Event::Text(t) if in_line && in_coordinates => {
                let text = t.unescape().unwrap();
                lines.push(
                    text.split_whitespace()
                        .map(|tuple| {
                            let mut parts = tuple.split(',');
                            let lon = parts.next().unwrap().parse().unwrap();
                            let lat = parts.next().unwrap().parse().unwrap();
                            (lon, lat)
                        })
                        .collect(),
                );
            }
            Event::Eof => break,
            _ => {}
        }
    }
    lines
}

/// `(name, raw coordinates)` of every Point placemark.
fn point_placemarks(features: &[Feature], out: &mut Vec<(String, String)>) {
    for feature in features {
        match feature {
            Feature::Container { children, .. } => point_placemarks(children, out),
            Feature::Placemark {
                name,
                geometry: Some(Geometry::Point(coordinates)),
            } => out.push((name.clone().unwrap_or_default(), coordinates.clone())),
            Feature::Placemark { .. } => {}
        }
    }
}

#[test]
fn test_kmz_round_trip() {
    let geometry = vec![
        LonLat::new(-35.21, -5.79),
        LonLat::new(-35.22, -5.80),
        LonLat::new(-35.237, -5.8129),
    ];
    let origin = PointRecord::new("A", -5.79, -35.21).unwrap();
    let destination = PointRecord::new("B", -5.8129, -35.2374).unwrap();

    let kmz = export_kmz(&geometry, &origin, &destination, "Rota OSRM", "driving").unwrap();
    let entries = unzip(&kmz);
    assert_eq!(entries.len(), 1);
    assert!(entries[0].0.ends_with(".kml"));
    let kml = &entries[0].1;

    let lines = line_strings(kml);
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0],
        vec![(-35.21, -5.79), (-35.22, -5.80), (-35.237, -5.8129)]
    );

    let features = read_features(kml.as_bytes()).unwrap();
    let mut points = Vec::new();
    point_placemarks(&features, &mut points);
    assert_eq!(
        points,
        vec![
            ("A".to_string(), "-35.21,-5.79".to_string()),
            ("B".to_string(), "-35.2374,-5.8129".to_string()),
        ]
    );
}

#[test]
fn test_export_is_idempotent() {
    let geometry = vec![LonLat::new(-35.21, -5.79), LonLat::new(-35.237, -5.8129)];
    let origin = PointRecord::new("A", -5.79, -35.21).unwrap();
    let destination = PointRecord::new("B", -5.8129, -35.2374).unwrap();

    let first = export_kmz(&geometry, &origin, &destination, "Rota", "desc").unwrap();
    let second = export_kmz(&geometry, &origin, &destination, "Rota", "desc").unwrap();
    assert_eq!(unzip(&first), unzip(&second));
}

/// Returns a straight two-vertex line between the first and last points.
struct StraightLineProvider;

impl RouteProvider for StraightLineProvider {
    fn route(
        &self,
        points: &[(f64, f64)],
        _profile: Profile,
        _overview: Overview,
    ) -> Result<RouteResult, RoutingError> {
        if points.len() < 2 {
            return Err(RoutingError::InsufficientPoints(points.len()));
        }
        let (lat_a, lon_a) = points[0];
        let (lat_b, lon_b) = points[points.len() - 1];
        Ok(RouteResult {
            distance_meters: 1500.0,
            duration_seconds: 120.0,
            geometry: vec![LonLat::new(lon_a, lat_a), LonLat::new(lon_b, lat_b)],
        })
    }
}

#[test]
fn test_two_typed_coordinates_end_to_end() {
    let points = parse_pair("-5.79448, -35.21100", "-5.81290, -35.23740").unwrap();
    let plan = plan_route(&StraightLineProvider, &points, &RouteOptions::default()).unwrap();

    assert_eq!(plan.summary.distance_km, 1.5);
    assert_eq!(plan.summary.duration_min, 2.0);

    let entries = unzip(&plan.kmz);
    assert_eq!(entries.len(), 1);
    let kml = &entries[0].1;
    assert_eq!(
        line_strings(kml),
        vec![vec![(-35.211, -5.79448), (-35.2374, -5.8129)]]
    );
    assert!(kml.contains("<description>driving - 1.50 km</description>"));

    let features = read_features(kml.as_bytes()).unwrap();
    let mut markers = Vec::new();
    point_placemarks(&features, &mut markers);
    let names: Vec<&str> = markers.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
}
