use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A (latitude, longitude) pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance between two points in meters.
pub fn haversine_distance(p1: Point, p2: Point) -> f64 {
    let lat1_rad = p1.lat.to_radians();
    let lat2_rad = p2.lat.to_radians();
    let delta_lat = (p2.lat - p1.lat).to_radians();
    let delta_lon = (p2.lon - p1.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        let p = Point::new(-34.9011, -56.1645);
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn known_distance_across_montevideo() {
        // Plaza Independencia to Tres Cruces terminal, roughly 2.9 km
        let plaza = Point::new(-34.9066, -56.2031);
        let tres_cruces = Point::new(-34.8941, -56.1663);
        let d = haversine_distance(plaza, tres_cruces);
        assert!(d > 2_500.0 && d < 3_900.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Point::new(-34.88, -56.18);
        let b = Point::new(-34.91, -56.15);
        let d1 = haversine_distance(a, b);
        let d2 = haversine_distance(b, a);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn short_distance_is_accurate() {
        // ~100m of latitude is about 0.0009 degrees
        let a = Point::new(-34.9000, -56.1600);
        let b = Point::new(-34.9009, -56.1600);
        let d = haversine_distance(a, b);
        assert!((d - 100.0).abs() < 5.0, "got {d}");
    }
}
