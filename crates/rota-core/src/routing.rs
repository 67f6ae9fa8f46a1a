//! Routing seam: travel profiles, geometry detail and the provider trait.
//!
//! The network-facing implementation lives in `rota-osrm`; everything in the
//! core only talks to [`RouteProvider`], so tests can swap in a stub.

use crate::models::RouteResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("at least 2 points are required to route, got {0}")]
    InsufficientPoints(usize),

    #[error("routing service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service answered but reported no usable route. Carries the raw payload.
    #[error("no route found: {payload}")]
    NoRouteFound { payload: serde_json::Value },

    #[error("unexpected routing service response: {0}")]
    MalformedResponse(String),
}

/// Travel mode handed to the routing service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Driving,
    Cycling,
    Foot,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Driving => "driving",
            Profile::Cycling => "cycling",
            Profile::Foot => "foot",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driving" => Ok(Profile::Driving),
            "cycling" => Ok(Profile::Cycling),
            "foot" => Ok(Profile::Foot),
            other => Err(format!(
                "unknown profile {:?} (expected driving, cycling or foot)",
                other
            )),
        }
    }
}

/// Geometry simplification level requested from the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overview {
    /// No simplification.
    #[default]
    Full,
    Simplified,
    /// No geometry at all.
    False,
}

impl Overview {
    pub fn as_str(&self) -> &'static str {
        match self {
            Overview::Full => "full",
            Overview::Simplified => "simplified",
            Overview::False => "false",
        }
    }
}

impl fmt::Display for Overview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Overview {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Overview::Full),
            "simplified" => Ok(Overview::Simplified),
            "false" => Ok(Overview::False),
            other => Err(format!(
                "unknown overview {:?} (expected full, simplified or false)",
                other
            )),
        }
    }
}

pub trait RouteProvider: Send + Sync {
    /// Route through `points` (`(lat, lon)` pairs) in the given order.
    ///
    /// Implementations must fail with [`RoutingError::InsufficientPoints`]
    /// before any I/O when fewer than two points are given, and must not retry.
    fn route(
        &self,
        points: &[(f64, f64)],
        profile: Profile,
        overview: Overview,
    ) -> Result<RouteResult, RoutingError>;
}
