//! Point-source parsing: spreadsheet, KML and KMZ inputs into ordered waypoints.
//!
//! Every path ends in the same column normalization so the records a caller
//! receives have one shape regardless of where they came from. Record order
//! always follows the source (row order or document order).

mod kml;
mod table;

use crate::models::PointRecord;
use std::path::Path;
use thiserror::Error;

pub use kml::{parse_kml, parse_kmz, read_features, Feature, Geometry};
pub use table::{canonical_column, parse_csv, parse_xlsx, REQUIRED_COLUMNS};

/// Fallback display name for placemarks without a `<name>`.
pub const UNNAMED: &str = "Sem Nome";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing columns: {}; expected NOME, LATITUDE, LONGITUDE", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("columns {first:?} and {second:?} both map to {canonical}")]
    AmbiguousColumns {
        canonical: String,
        first: String,
        second: String,
    },

    #[error("unsupported point file format: {0:?}")]
    UnsupportedFormat(String),

    #[error("no Point placemarks found in KML")]
    NoPointsFound,

    #[error("invalid KMZ container: {0}")]
    InvalidContainer(String),

    #[error("row {row}, column {column}: cannot read {value:?} ({reason})")]
    RowParse {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    #[error("malformed {format} document: {reason}")]
    MalformedDocument { format: &'static str, reason: String },
}

/// Declared format of an uploaded point file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointFormat {
    Csv,
    Xlsx,
    Kml,
    Kmz,
}

impl PointFormat {
    /// Resolve a format from a file extension (with or without the dot).
    pub fn from_extension(extension: &str) -> Result<Self, ParseError> {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "kml" => Ok(Self::Kml),
            "kmz" => Ok(Self::Kmz),
            _ => Err(ParseError::UnsupportedFormat(extension.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| ParseError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_extension(extension)
    }
}

/// Parse raw file bytes of the declared format into ordered waypoints.
pub fn parse_points(bytes: &[u8], format: PointFormat) -> Result<Vec<PointRecord>, ParseError> {
    let records = match format {
        PointFormat::Csv => parse_csv(bytes)?,
        PointFormat::Xlsx => parse_xlsx(bytes)?,
        PointFormat::Kml => parse_kml(bytes)?,
        PointFormat::Kmz => parse_kmz(bytes)?,
    };
    tracing::debug!(?format, count = records.len(), "parsed point source");
    Ok(records)
}
