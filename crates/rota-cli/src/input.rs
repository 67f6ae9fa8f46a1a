//! Loading waypoints from files or typed coordinates.

use anyhow::{Context, Result};
use rota_core::{parse_pair, parse_points, PointFormat, PointRecord};
use std::path::Path;

/// Read a `.csv`, `.xlsx`, `.kml` or `.kmz` file, format chosen by extension.
pub fn load_points_file(path: &Path) -> Result<Vec<PointRecord>> {
    let format = PointFormat::from_path(path)?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let points = parse_points(&bytes, format)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        count = points.len(),
        "loaded points; file order is the visiting order"
    );
    Ok(points)
}

/// Two typed `"lat, lon"` coordinates, labelled A and B.
pub fn typed_points(from: &str, to: &str) -> Result<Vec<PointRecord>> {
    parse_pair(from, to).context("Invalid coordinates")
}
