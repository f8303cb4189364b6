//! The geotemporal correlation engine.
//!
//! This module holds the logic that turns noisy vehicle position data into
//! answers: which bus is next at a stop, and how long a bus took to travel
//! between two points. Everything here is pure over data handed in by the
//! providers and the fix store; no IO happens below this module boundary.

pub mod crossing;
pub mod geo;
pub mod selector;
pub mod stops;

pub use geo::{haversine_distance, Point};

/// Distance threshold in meters for considering a vehicle "at" a reference
/// point when scanning position history.
pub const CROSSING_TOLERANCE_METERS: f64 = 90.0;
