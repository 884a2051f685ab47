//! Neighborhood queries for density clustering.
//!
//! The exhaustive scan checks every point against every other (O(n²) per
//! run). The R-tree strategy narrows each query with a conservative
//! degree envelope before the exact Haversine test, so both strategies
//! return identical, ascending neighbor lists.

use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::geo_utils::{haversine_distance, meters_to_degrees, METERS_PER_DEGREE};
use crate::GeoPoint;

/// Slack applied to search envelopes so rounding never drops a neighbor.
const ENVELOPE_MARGIN: f64 = 1.1;

/// How neighborhoods are computed during a clustering run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborStrategy {
    /// Compare every pair. Fine for the low thousands of points.
    #[default]
    Exhaustive,
    /// Pre-filter with an R-tree over the coordinates.
    RTree,
}

/// A point with its input index for R-tree queries.
#[derive(Debug, Clone, Copy)]
pub struct IndexedPoint {
    pub idx: usize,
    pub lat: f64,
    pub lng: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

/// Build an R-tree from points for spatial queries.
pub fn build_rtree(points: &[GeoPoint]) -> RTree<IndexedPoint> {
    let indexed: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .map(|(i, p)| IndexedPoint {
            idx: i,
            lat: p.latitude,
            lng: p.longitude,
        })
        .collect();
    RTree::bulk_load(indexed)
}

/// Neighborhood index over one clustering input.
pub(crate) enum NeighborIndex<'a> {
    Exhaustive(&'a [GeoPoint]),
    RTree {
        points: &'a [GeoPoint],
        tree: RTree<IndexedPoint>,
    },
}

impl<'a> NeighborIndex<'a> {
    pub(crate) fn build(points: &'a [GeoPoint], strategy: NeighborStrategy) -> Self {
        match strategy {
            NeighborStrategy::Exhaustive => Self::Exhaustive(points),
            NeighborStrategy::RTree => Self::RTree {
                points,
                tree: build_rtree(points),
            },
        }
    }

    /// Indices of all other points within `radius_meters` of `idx`, ascending.
    pub(crate) fn within(&self, idx: usize, radius_meters: f64) -> Vec<usize> {
        self.within_filtered(idx, radius_meters, |_| true)
    }

    /// Like [`within`](Self::within) but only keeps indices accepted by `accept`.
    pub(crate) fn within_filtered<F>(&self, idx: usize, radius_meters: f64, accept: F) -> Vec<usize>
    where
        F: Fn(usize) -> bool,
    {
        match self {
            Self::Exhaustive(points) => scan(points, idx, radius_meters, accept),
            Self::RTree { points, tree } => {
                let origin = &points[idx];
                let Some(envelope) = search_envelope(origin, radius_meters) else {
                    // Envelope would wrap a pole or the antimeridian
                    return scan(points, idx, radius_meters, accept);
                };
                let mut found: Vec<usize> = tree
                    .locate_in_envelope(&envelope)
                    .map(|p| p.idx)
                    .filter(|&j| {
                        j != idx
                            && accept(j)
                            && haversine_distance(origin, &points[j]) <= radius_meters
                    })
                    .collect();
                found.sort_unstable();
                found
            }
        }
    }
}

fn scan<F>(points: &[GeoPoint], idx: usize, radius_meters: f64, accept: F) -> Vec<usize>
where
    F: Fn(usize) -> bool,
{
    let origin = &points[idx];
    points
        .iter()
        .enumerate()
        .filter(|&(j, p)| j != idx && accept(j) && haversine_distance(origin, p) <= radius_meters)
        .map(|(j, _)| j)
        .collect()
}

/// Conservative lat/lng box containing every point within `radius_meters`.
fn search_envelope(origin: &GeoPoint, radius_meters: f64) -> Option<AABB<[f64; 2]>> {
    let dlat = radius_meters / METERS_PER_DEGREE * ENVELOPE_MARGIN;
    let max_abs_lat = origin.latitude.abs() + dlat;
    if max_abs_lat >= 89.0 {
        return None;
    }
    let dlng = meters_to_degrees(radius_meters, max_abs_lat) * ENVELOPE_MARGIN;
    if origin.longitude - dlng < -180.0 || origin.longitude + dlng > 180.0 {
        return None;
    }
    Some(AABB::from_corners(
        [origin.latitude - dlat, origin.longitude - dlng],
        [origin.latitude + dlat, origin.longitude + dlng],
    ))
}
