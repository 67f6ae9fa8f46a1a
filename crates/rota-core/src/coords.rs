//! Manual "lat, lon" entry for the two-point path.

use crate::models::{in_range, PointRecord};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("expected \"lat, lon\", got {input:?}: {reason}")]
    Format { input: String, reason: String },

    #[error("coordinate out of range: lat {latitude}, lon {longitude}")]
    Range { latitude: f64, longitude: f64 },
}

/// Parse one `"latitude, longitude"` string.
pub fn parse_lat_lon(input: &str) -> Result<(f64, f64), CoordinateError> {
    let parts: Vec<&str> = input.split(',').collect();
    if parts.len() != 2 {
        return Err(CoordinateError::Format {
            input: input.to_string(),
            reason: format!("expected 2 comma-separated parts, found {}", parts.len()),
        });
    }

    let latitude = parse_part(input, parts[0])?;
    let longitude = parse_part(input, parts[1])?;

    if !in_range(latitude, longitude) {
        return Err(CoordinateError::Range {
            latitude,
            longitude,
        });
    }
    Ok((latitude, longitude))
}

fn parse_part(input: &str, part: &str) -> Result<f64, CoordinateError> {
    part.trim()
        .parse::<f64>()
        .map_err(|err| CoordinateError::Format {
            input: input.to_string(),
            reason: format!("{:?} is not a number ({})", part.trim(), err),
        })
}

/// Parse the two typed coordinates into waypoints labelled "A" and "B".
pub fn parse_pair(first: &str, second: &str) -> Result<Vec<PointRecord>, CoordinateError> {
    parse_pair_labeled(first, second, ("A", "B"))
}

/// Same as [`parse_pair`] with caller-supplied labels.
pub fn parse_pair_labeled(
    first: &str,
    second: &str,
    labels: (&str, &str),
) -> Result<Vec<PointRecord>, CoordinateError> {
    let (lat_a, lon_a) = parse_lat_lon(first)?;
    let (lat_b, lon_b) = parse_lat_lon(second)?;
    Ok(vec![
        PointRecord {
            name: labels.0.to_string(),
            latitude: lat_a,
            longitude: lon_a,
        },
        PointRecord {
            name: labels.1.to_string(),
            latitude: lat_b,
            longitude: lon_b,
        },
    ])
}
