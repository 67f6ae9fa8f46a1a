//! KMZ export: one styled route line plus origin/destination markers.
//!
//! The KML is built in memory and zipped into a single DEFLATE entry. The
//! entry timestamp is pinned, so identical inputs give identical archives.

use crate::models::{in_range, LonLat, PointRecord};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt::Display;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

pub const KMZ_MIME_TYPE: &str = "application/vnd.google-earth.kmz";
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Name of the single entry inside the archive.
pub const KML_ENTRY: &str = "doc.kml";

const ROUTE_STYLE_ID: &str = "routeStyle";
/// aabbggrr, opaque green.
const ROUTE_COLOR: &str = "ff00ff00";
const ROUTE_WIDTH: f64 = 4.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot serialize route: {0}")]
    Serialization(String),
}

fn serialization(err: impl Display) -> ExportError {
    ExportError::Serialization(err.to_string())
}

struct KmlWriter {
    writer: Writer<Vec<u8>>,
}

impl KmlWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), ExportError> {
        self.writer.write_event(event).map_err(serialization)
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), ExportError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.emit(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<(), ExportError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn leaf(&mut self, name: &str, text: &str) -> Result<(), ExportError> {
        self.open(name, &[])?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn point_placemark(&mut self, id: &str, marker: &PointRecord) -> Result<(), ExportError> {
        self.open("Placemark", &[("id", id)])?;
        self.leaf("name", &marker.name)?;
        self.open("Point", &[])?;
        self.leaf(
            "coordinates",
            &format_tuple(LonLat::new(marker.longitude, marker.latitude)),
        )?;
        self.close("Point")?;
        self.close("Placemark")
    }

    fn finish(self) -> Result<String, ExportError> {
        String::from_utf8(self.writer.into_inner()).map_err(serialization)
    }
}

fn format_tuple(vertex: LonLat) -> String {
    format!("{},{}", vertex.lon, vertex.lat)
}

fn check_marker(role: &str, marker: &PointRecord) -> Result<(), ExportError> {
    if in_range(marker.latitude, marker.longitude) {
        Ok(())
    } else {
        Err(ExportError::Serialization(format!(
            "{} marker {:?} has invalid coordinates ({}, {})",
            role, marker.name, marker.latitude, marker.longitude
        )))
    }
}

/// Build the KML document text. Vertex order is kept exactly as given.
pub fn build_kml(
    geometry: &[LonLat],
    origin: &PointRecord,
    destination: &PointRecord,
    route_name: &str,
    description: &str,
) -> Result<String, ExportError> {
    if geometry.len() < 2 {
        return Err(ExportError::Serialization(format!(
            "route line needs at least 2 vertices, got {}",
            geometry.len()
        )));
    }
    if let Some(bad) = geometry.iter().find(|v| !in_range(v.lat, v.lon)) {
        return Err(ExportError::Serialization(format!(
            "route vertex ({}, {}) is not a valid lon/lat",
            bad.lon, bad.lat
        )));
    }
    check_marker("origin", origin)?;
    check_marker("destination", destination)?;

    let line = geometry
        .iter()
        .map(|v| format_tuple(*v))
        .collect::<Vec<_>>()
        .join(" ");

    let mut kml = KmlWriter::new();
    kml.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    kml.open("kml", &[("xmlns", KML_NAMESPACE)])?;
    kml.open("Document", &[("id", "docid")])?;
    kml.leaf("name", route_name)?;
    kml.leaf("description", description)?;

    kml.open("Style", &[("id", ROUTE_STYLE_ID)])?;
    kml.open("LineStyle", &[])?;
    kml.leaf("color", ROUTE_COLOR)?;
    kml.leaf("width", &format!("{:.1}", ROUTE_WIDTH))?;
    kml.close("LineStyle")?;
    kml.close("Style")?;

    kml.open("Folder", &[("id", "fid")])?;
    kml.leaf("name", route_name)?;

    kml.open("Placemark", &[("id", "route")])?;
    kml.leaf("name", route_name)?;
    kml.leaf("description", description)?;
    kml.leaf("styleUrl", &format!("#{}", ROUTE_STYLE_ID))?;
    kml.open("LineString", &[])?;
    kml.leaf("tessellate", "1")?;
    kml.leaf("altitudeMode", "clampToGround")?;
    kml.leaf("coordinates", &line)?;
    kml.close("LineString")?;
    kml.close("Placemark")?;

    kml.point_placemark("start", origin)?;
    kml.point_placemark("end", destination)?;

    kml.close("Folder")?;
    kml.close("Document")?;
    kml.close("kml")?;
    kml.finish()
}

/// Zip a KML document into a single-entry KMZ archive.
pub fn package_kmz(kml: &str) -> Result<Vec<u8>, ExportError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(KML_ENTRY, options).map_err(serialization)?;
    zip.write_all(kml.as_bytes()).map_err(serialization)?;
    let cursor = zip.finish().map_err(serialization)?;
    Ok(cursor.into_inner())
}

/// Build the route KML and package it as KMZ bytes.
pub fn export_kmz(
    geometry: &[LonLat],
    origin: &PointRecord,
    destination: &PointRecord,
    route_name: &str,
    description: &str,
) -> Result<Vec<u8>, ExportError> {
    let kml = build_kml(geometry, origin, destination, route_name, description)?;
    let kmz = package_kmz(&kml)?;
    tracing::info!(
        vertices = geometry.len(),
        kml_bytes = kml.len(),
        kmz_bytes = kmz.len(),
        "exported route KMZ"
    );
    Ok(kmz)
}
