//! Clustering parameter suggestions from the data distribution.
//!
//! Uses the k-distance heuristic: the distance from each point to its k-th
//! nearest neighbor, sorted, bends sharply where dense regions end. Taking the
//! 75th percentile approximates that knee without plotting it.

use serde::{Deserialize, Serialize};

use super::ClusterParameters;
use crate::geo_utils::haversine_distance;
use crate::GeoPoint;

/// Epsilon used when the data cannot support an estimate (meters).
pub const FALLBACK_EPSILON_METERS: f64 = 10.0;

/// Minimum points used when the data cannot support an estimate.
pub const FALLBACK_MIN_POINTS: usize = 3;

/// Neighbor rank for the k-distance profile.
pub const DEFAULT_K: usize = 4;

/// Percentile of the sorted k-distances taken as epsilon.
pub const KNEE_PERCENTILE: f64 = 0.75;

/// Sorted k-th nearest neighbor distances of a point set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KDistanceProfile {
    pub k: usize,
    /// Ascending k-distances in meters, one per point
    pub distances: Vec<f64>,
}

impl KDistanceProfile {
    /// Compute the profile with `k = min(4, n - 1)`. `None` for fewer than 2 points.
    pub fn compute(points: &[GeoPoint]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let k = DEFAULT_K.min(points.len() - 1);

        let mut distances: Vec<f64> = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut to_others: Vec<f64> = points
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, q)| haversine_distance(p, q))
                    .collect();
                to_others.sort_by(f64::total_cmp);
                to_others[k - 1]
            })
            .collect();
        distances.sort_by(f64::total_cmp);

        Some(Self { k, distances })
    }

    /// Value at `floor(len * fraction)`, clamped to the last element.
    pub fn percentile(&self, fraction: f64) -> Option<f64> {
        if self.distances.is_empty() {
            return None;
        }
        let idx = ((self.distances.len() as f64 * fraction).floor() as usize)
            .min(self.distances.len() - 1);
        Some(self.distances[idx])
    }
}

/// Suggest clustering parameters for `points`.
///
/// Fewer than 2 points gives the fallback (10 m, 3). Otherwise epsilon is the
/// 75th-percentile k-distance rounded to whole meters (at least 1 m, or the
/// fallback if every point coincides) and `min_points` is `n / 10` clamped
/// to 3..=10.
///
/// # Example
/// ```
/// use hotspotmatch::{suggest_parameters, GeoPoint};
///
/// let params = suggest_parameters(&[GeoPoint::new(6.75, 125.35)]);
/// assert_eq!(params.min_points, 3);
/// ```
pub fn suggest_parameters(points: &[GeoPoint]) -> ClusterParameters {
    let Some(profile) = KDistanceProfile::compute(points) else {
        return ClusterParameters::default();
    };

    let epsilon_meters = match profile.percentile(KNEE_PERCENTILE) {
        Some(d) if d.is_finite() && d > 0.0 => d.round().max(1.0),
        _ => FALLBACK_EPSILON_METERS,
    };
    let min_points = (points.len() / 10).clamp(3, 10);

    ClusterParameters {
        epsilon_meters,
        min_points,
    }
}
