//! Geographic utilities shared by clustering and duplicate detection.
//!
//! Distances are great-circle (Haversine) on a sphere of radius 6371 km,
//! which is precise enough for the sub-kilometer distinctions made here.

use crate::error::{GeoEngineError, Result};
use crate::GeoPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// Great-circle distance between two points in meters.
///
/// Coordinates are not range-checked; use [`validate_point`] first when the
/// input comes from outside.
///
/// # Example
/// ```
/// use hotspotmatch::GeoPoint;
/// use hotspotmatch::geo_utils::haversine_distance;
///
/// let a = GeoPoint::new(6.7578, 125.3572);
/// assert_eq!(haversine_distance(&a, &a), 0.0);
/// ```
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    // Absolute deltas keep the result bitwise symmetric in its arguments
    let dlat = (p2.latitude - p1.latitude).abs().to_radians();
    let dlng = (p2.longitude - p1.longitude).abs().to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // Clamp guards against a > 1 from rounding on antipodal pairs
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

/// Check that a point is finite and within latitude/longitude range.
pub fn validate_point(point: &GeoPoint, field: &str) -> Result<()> {
    if !point.latitude.is_finite() || !point.longitude.is_finite() {
        return Err(GeoEngineError::invalid_input(
            field,
            format!(
                "non-finite coordinates ({}, {})",
                point.latitude, point.longitude
            ),
        ));
    }
    if !point.is_valid() {
        return Err(GeoEngineError::invalid_input(
            field,
            format!(
                "coordinates out of range ({}, {})",
                point.latitude, point.longitude
            ),
        ));
    }
    Ok(())
}

/// Arithmetic mean of latitudes and longitudes.
///
/// A flat-plane centroid; fine at city scale, wrong across the antimeridian.
pub fn compute_center(points: &[GeoPoint]) -> GeoPoint {
    if points.is_empty() {
        return GeoPoint::new(0.0, 0.0);
    }
    let n = points.len() as f64;
    let (lat_sum, lng_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.latitude, lng + p.longitude));
    GeoPoint::new(lat_sum / n, lng_sum / n)
}

/// Convert a distance in meters to degrees of longitude at `latitude`.
///
/// Always at least the latitude-degree equivalent, so a square envelope of
/// this half-width contains every point within `meters`.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let cos_lat = latitude.to_radians().cos().abs().max(0.01);
    meters / (METERS_PER_DEGREE * cos_lat)
}
