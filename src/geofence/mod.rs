//! Service-area admission check.
//!
//! Ride requests may only originate inside the configured service polygon.
//! The test is the standard even-odd ray cast: count how many polygon
//! edges a horizontal ray from the point crosses; an odd count means the
//! point is inside. Points exactly on an edge or vertex are not guaranteed
//! a particular side, but the result is deterministic for identical input.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Ray-casting point-in-polygon test. The polygon is an ordered ring of
/// vertices; a duplicated closing vertex is tolerated. Rings with fewer
/// than three distinct vertices contain nothing.
pub fn is_inside_service_area(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        let crosses = (a.lng > point.lng) != (b.lng > point.lng)
            && point.lat
                < (b.lat - a.lat) * (point.lng - a.lng) / (b.lng - a.lng) + a.lat;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}
