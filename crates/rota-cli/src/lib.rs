//! Rota CLI - terminal front end for the route export pipeline.
//!
//! - `rota points`: parse a points file and print the records
//! - `rota route`: route through the points and write a KMZ

pub mod config;
pub mod input;

pub use config::Config;
pub use input::{load_points_file, typed_points};
