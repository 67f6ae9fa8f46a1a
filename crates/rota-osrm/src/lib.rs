//! OSRM routing client.
//!
//! Sends the ordered waypoints to a public (or self-hosted) OSRM instance and
//! maps the answer onto [`rota_core::RouteResult`].

pub mod client;

pub use client::{
    parse_route_response, HttpResponse, HttpTransport, OsrmClient, ReqwestTransport,
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
};
