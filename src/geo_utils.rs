//! # Geographic Utilities
//!
//! Distance computations shared by the trail store, the checkpoint snapper and
//! the arrival check.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance_km`] | Geodesic distance between two GPS points in kilometers |
//! | [`distance_meters`] | Geodesic distance between two GPS points in meters |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`round_to`] | Round a value to a number of decimal places |
//!
//! ## Example
//!
//! ```rust
//! use stride_quest::{GpsPoint, geo_utils};
//!
//! let trailhead = GpsPoint::new(37.8, -122.4);
//! let user = GpsPoint::new(37.81, -122.4);
//!
//! let km = geo_utils::distance_km(&trailhead, &user);
//! assert!((km - 1.11).abs() < 0.01);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances are measured on the WGS84 ellipsoid (Karney's geodesic algorithm,
//! via `geo::Geodesic`), which agrees with a spherical haversine to within ~0.3%.
//!
//! All functions expect WGS84 coordinates in degrees.

use crate::GpsPoint;
use geo::{Distance, Geodesic, Point};

// =============================================================================
// Distance Functions
// =============================================================================

/// Geodesic distance between two GPS points in meters.
///
/// Symmetric, and exactly `0.0` for identical points.
#[inline]
pub fn distance_meters(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    if p1 == p2 {
        return 0.0;
    }
    // Fixed argument order keeps the result bit-identical in both directions.
    let (a, b) = if (p1.latitude, p1.longitude) <= (p2.latitude, p2.longitude) {
        (p1, p2)
    } else {
        (p2, p1)
    };
    Geodesic::distance(to_point(a), to_point(b))
}

/// Geodesic distance between two GPS points in kilometers.
///
/// # Example
///
/// ```rust
/// use stride_quest::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let km = geo_utils::distance_km(&london, &paris);
/// assert!((km - 343.9).abs() < 2.0);
/// ```
#[inline]
pub fn distance_km(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    distance_meters(p1, p2) / 1000.0
}

/// Total length of a polyline (GPS track) in meters.
///
/// Empty or single-point tracks return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| distance_meters(&w[0], &w[1]))
        .sum()
}

/// Round `value` to `decimals` decimal places.
///
/// ```rust
/// use stride_quest::geo_utils::round_to;
/// assert_eq!(round_to(1.23456, 2), 1.23);
/// assert_eq!(round_to(0.04951, 3), 0.05);
/// ```
#[inline]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[inline]
fn to_point(p: &GpsPoint) -> Point<f64> {
    Point::new(p.longitude, p.latitude)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_distance_same_point() {
        let p = GpsPoint::new(37.8, -122.4);
        assert_eq!(distance_km(&p, &p), 0.0);
        assert_eq!(distance_meters(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_symmetric() {
        let a = GpsPoint::new(32.1670, 34.8045);
        let b = GpsPoint::new(32.1001, 34.8123);
        assert_eq!(distance_km(&a, &b), distance_km(&b, &a));
    }

    #[test]
    fn test_distance_known_value() {
        // London to Paris is approximately 344 km
        let london = GpsPoint::new(51.5074, -0.1278);
        let paris = GpsPoint::new(48.8566, 2.3522);
        assert!(approx_eq(distance_km(&london, &paris), 343.9, 2.0));
    }

    #[test]
    fn test_geodesic_close_to_haversine() {
        let a = GpsPoint::new(37.8, -122.4);
        let b = GpsPoint::new(37.9, -122.3);
        let geodesic = distance_meters(&a, &b);
        let spherical = geo::Haversine::distance(to_point(&a), to_point(&b));
        assert!((geodesic - spherical).abs() / geodesic < 0.005);
    }

    #[test]
    fn test_polyline_length() {
        let empty: Vec<GpsPoint> = vec![];
        assert_eq!(polyline_length(&empty), 0.0);

        let track = vec![
            GpsPoint::new(51.5074, -0.1278),
            GpsPoint::new(51.5080, -0.1280),
        ];
        let length = polyline_length(&track);
        assert!(length > 0.0);
        assert!(length < 100.0); // Should be about 68m
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(0.0004, 3), 0.0);
        assert_eq!(round_to(-1.005, 0), -1.0);
    }
}
