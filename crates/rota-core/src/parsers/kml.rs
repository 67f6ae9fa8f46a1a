//! KML feature tree and KMZ unpacking.

use super::table::{records_from_table, Row, Table};
use super::{ParseError, UNNAMED};
use crate::models::PointRecord;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};

/// A node of the KML feature tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    /// `Document` or `Folder`.
    Container {
        name: Option<String>,
        children: Vec<Feature>,
    },
    Placemark {
        name: Option<String>,
        geometry: Option<Geometry>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Raw `<coordinates>` text of a Point.
    Point(String),
    /// Any other geometry element (LineString, Polygon, MultiGeometry, ...).
    Other(String),
}

const GEOMETRIES: &[&str] = &[
    "Point",
    "LineString",
    "LinearRing",
    "Polygon",
    "MultiGeometry",
    "Model",
    "Track",
    "MultiTrack",
];

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn malformed(reason: impl ToString) -> ParseError {
    ParseError::MalformedDocument {
        format: "KML",
        reason: reason.to_string(),
    }
}

#[derive(Default)]
struct ContainerFrame {
    name: Option<String>,
    children: Vec<Feature>,
}

struct PlacemarkFrame {
    depth: usize,
    name: Option<String>,
    geometry: Option<Geometry>,
}

/// Tree builder fed by XML events.
#[derive(Default)]
struct TreeBuilder {
    path: Vec<String>,
    containers: Vec<ContainerFrame>,
    placemark: Option<PlacemarkFrame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            containers: vec![ContainerFrame::default()],
            ..Self::default()
        }
    }

    fn open(&mut self, name: String) {
        match name.as_str() {
            "Document" | "Folder" => self.containers.push(ContainerFrame::default()),
            "Placemark" => {
                self.placemark = Some(PlacemarkFrame {
                    depth: self.path.len(),
                    name: None,
                    geometry: None,
                })
            }
            _ => {
                if let Some(placemark) = self.placemark.as_mut() {
                    // Only the geometry directly under the placemark counts.
                    if self.path.len() == placemark.depth + 1
                        && placemark.geometry.is_none()
                        && GEOMETRIES.contains(&name.as_str())
                    {
                        placemark.geometry = Some(if name == "Point" {
                            Geometry::Point(String::new())
                        } else {
                            Geometry::Other(name.clone())
                        });
                    }
                }
            }
        }
        self.path.push(name);
    }

    fn close(&mut self) {
        let Some(name) = self.path.pop() else {
            return;
        };
        match name.as_str() {
            "Document" | "Folder" => {
                if self.containers.len() > 1 {
                    if let Some(frame) = self.containers.pop() {
                        self.push_feature(Feature::Container {
                            name: frame.name,
                            children: frame.children,
                        });
                    }
                }
            }
            "Placemark" => {
                if let Some(frame) = self.placemark.take() {
                    self.push_feature(Feature::Placemark {
                        name: frame.name,
                        geometry: frame.geometry,
                    });
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let depth = self.path.len();
        let (Some(current), Some(parent)) = (
            self.path.last(),
            depth.checked_sub(2).and_then(|idx| self.path.get(idx)),
        ) else {
            return;
        };

        if current == "name" {
            if parent == "Placemark" {
                if let Some(placemark) = self.placemark.as_mut() {
                    placemark.name = Some(text.to_string());
                }
            } else if parent == "Document" || parent == "Folder" {
                if let Some(frame) = self.containers.last_mut() {
                    frame.name = Some(text.to_string());
                }
            }
        } else if current == "coordinates" && parent == "Point" {
            if let Some(PlacemarkFrame {
                depth: placemark_depth,
                geometry: Some(Geometry::Point(coordinates)),
                ..
            }) = self.placemark.as_mut()
            {
                // coordinates -> Point -> Placemark
                if depth == *placemark_depth + 3 {
                    coordinates.push_str(text);
                }
            }
        }
    }

    fn push_feature(&mut self, feature: Feature) {
        if let Some(frame) = self.containers.last_mut() {
            frame.children.push(feature);
        }
    }

    fn finish(mut self) -> Vec<Feature> {
        // Unclosed containers are folded into their parents.
        while self.containers.len() > 1 {
            if let Some(frame) = self.containers.pop() {
                self.push_feature(Feature::Container {
                    name: frame.name,
                    children: frame.children,
                });
            }
        }
        self.containers.pop().map(|root| root.children).unwrap_or_default()
    }
}

/// Read the top-level features of a KML document.
pub fn read_features(kml: &[u8]) -> Result<Vec<Feature>, ParseError> {
    let mut reader = Reader::from_reader(kml);
    reader.config_mut().trim_text(true);

    let mut builder = TreeBuilder::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(malformed)? {
            Event::Start(ref e) => builder.open(local_name(e)),
            Event::Empty(ref e) => {
                builder.open(local_name(e));
                builder.close();
            }
            Event::End(_) => builder.close(),
            Event::Text(ref e) => {
                let text = e.unescape().map_err(malformed)?;
                builder.text(&text);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                builder.text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(builder.finish())
}

/// Depth-first walk yielding `(name, raw coordinates)` of Point placemarks in
/// document order.
fn collect_points<'a>(features: &'a [Feature], out: &mut Vec<(Option<&'a str>, &'a str)>) {
    for feature in features {
        match feature {
            Feature::Container { children, .. } => collect_points(children, out),
            Feature::Placemark {
                name,
                geometry: Some(Geometry::Point(coordinates)),
            } => out.push((name.as_deref(), coordinates.as_str())),
            Feature::Placemark { .. } => {}
        }
    }
}

/// Split the first `lon,lat[,alt]` tuple of a coordinates string.
fn first_tuple(coordinates: &str) -> Option<(&str, &str)> {
    let tuple = coordinates.split_whitespace().next()?;
    let mut parts = tuple.split(',');
    let lon = parts.next()?;
    let lat = parts.next()?;
    Some((lon, lat))
}

pub fn parse_kml(kml: &[u8]) -> Result<Vec<PointRecord>, ParseError> {
    let features = read_features(kml)?;

    let mut points = Vec::new();
    collect_points(&features, &mut points);
    if points.is_empty() {
        return Err(ParseError::NoPointsFound);
    }

    let mut rows = Vec::with_capacity(points.len());
    for (idx, (name, coordinates)) in points.into_iter().enumerate() {
        let (lon, lat) = first_tuple(coordinates).ok_or_else(|| ParseError::RowParse {
            row: idx + 1,
            column: "coordinates".to_string(),
            value: coordinates.to_string(),
            reason: "expected lon,lat[,alt]".to_string(),
        })?;
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNNAMED);
        rows.push(Row {
            number: idx + 1,
            cells: vec![name.to_string(), lat.to_string(), lon.to_string()],
        });
    }

    let table = Table {
        headers: vec![
            "NOME".to_string(),
            "LATITUDE".to_string(),
            "LONGITUDE".to_string(),
        ],
        rows,
    };
    records_from_table(&table)
}

/// Unpack the first `.kml` entry of a KMZ archive and parse it.
pub fn parse_kmz(kmz: &[u8]) -> Result<Vec<PointRecord>, ParseError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(kmz))
        .map_err(|err| ParseError::InvalidContainer(err.to_string()))?;

    let mut kml = None;
    for idx in 0..archive.len() {
        let mut entry = archive
            .by_index(idx)
            .map_err(|err| ParseError::InvalidContainer(err.to_string()))?;
        if entry.name().to_ascii_lowercase().ends_with(".kml") {
            tracing::debug!(entry = entry.name(), "using KMZ entry");
            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|err| ParseError::InvalidContainer(err.to_string()))?;
            kml = Some(bytes);
            break;
        }
    }

    let kml = kml.ok_or_else(|| ParseError::InvalidContainer("no .kml entry".to_string()))?;
    parse_kml(&kml)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Doc</name>
    <Folder>
      <name>Outer</name>
      <Placemark><name>P1</name><Point><coordinates>-35.21,-5.79,0</coordinates></Point></Placemark>
      <Folder>
        <Placemark><name>P2</name><Point><coordinates> -35.22,-5.80 </coordinates></Point></Placemark>
      </Folder>
    </Folder>
    <Placemark><Point><coordinates>-35.23,-5.81</coordinates></Point></Placemark>
  </Document>
</kml>"#;

    #[test]
    fn test_feature_tree_shape() {
        let features = read_features(NESTED.as_bytes()).unwrap();
        assert_eq!(features.len(), 1);
        let Feature::Container { name, children } = &features[0] else {
            panic!("expected document container");
        };
        assert_eq!(name.as_deref(), Some("Doc"));
        assert_eq!(children.len(), 2);
        assert!(matches!(
            &children[0],
            Feature::Container { name: Some(n), children } if n == "Outer" && children.len() == 2
        ));
    }

    #[test]
    fn test_nested_points_in_document_order() {
        let records = parse_kml(NESTED.as_bytes()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["P1", "P2", UNNAMED]);
        assert_eq!(records[1].latitude, -5.80);
        assert_eq!(records[1].longitude, -35.22);
    }

    #[test]
    fn test_prefixed_elements_and_cdata_name() {
        let kml = r#"<kml:kml xmlns:kml="http://www.opengis.net/kml/2.2">
<kml:Placemark><kml:name><![CDATA[Praça & Co]]></kml:name>
<kml:Point><kml:coordinates>10,20</kml:coordinates></kml:Point></kml:Placemark>
</kml:kml>"#;
        let records = parse_kml(kml.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Praça & Co");
        assert_eq!(records[0].lat_lon(), (20.0, 10.0));
    }

    #[test]
    fn test_multigeometry_point_is_not_collected() {
        let kml = r#"<kml><Placemark><name>M</name><MultiGeometry>
<Point><coordinates>1,2</coordinates></Point></MultiGeometry></Placemark></kml>"#;
        assert!(matches!(
            parse_kml(kml.as_bytes()),
            Err(ParseError::NoPointsFound)
        ));
    }

    #[test]
    fn test_bad_point_coordinates_fail() {
        let kml = r#"<kml><Placemark><name>Bad</name><Point><coordinates>oops</coordinates></Point></Placemark></kml>"#;
        assert!(matches!(
            parse_kml(kml.as_bytes()),
            Err(ParseError::RowParse { row: 1, .. })
        ));
    }

    #[test]
    fn test_unbalanced_xml_is_malformed() {
        assert!(matches!(
            parse_kml(b"<kml><Placemark></Point></kml>"),
            Err(ParseError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_kmz_without_kml_entry() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            writer
                .start_file("readme.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            std::io::Write::write_all(&mut writer, b"hello").unwrap();
            writer.finish().unwrap();
        }
        assert!(matches!(
            parse_kmz(buf.get_ref()),
            Err(ParseError::InvalidContainer(_))
        ));
        assert!(matches!(
            parse_kmz(b"not a zip"),
            Err(ParseError::InvalidContainer(_))
        ));
    }

    #[test]
    fn test_kmz_deflated_entry_reads_fully() {
        let mut kml = String::from(r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document>"#);
        for idx in 0..500 {
            kml.push_str(&format!(
                "<Placemark><name>P{}</name><Point><coordinates>-35.2,-5.8</coordinates></Point></Placemark>",
                idx
            ));
        }
        kml.push_str("</Document></kml>");

        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            writer.start_file("doc.kml", options).unwrap();
            std::io::Write::write_all(&mut writer, kml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        let records = parse_kmz(buf.get_ref()).unwrap();
        assert_eq!(records.len(), 500);
        assert_eq!(records[499].name, "P499");
    }
}
