//! # Density-Based Hotspot Clustering
//!
//! Groups complaint locations into hotspots with DBSCAN and derives per-cluster
//! statistics (centroid, radius, density) for map markers and reports.
//!
//! ## Algorithm
//!
//! Points are visited in input order. A point whose epsilon-neighborhood,
//! counting the point itself, holds at least `min_points` points is a core
//! point and seeds a cluster; the cluster then grows breadth-first through the
//! neighborhoods of every core point it reaches. Points reached but not core
//! join as border points. Everything never assigned is noise.
//!
//! ## Order dependence
//!
//! A border point within epsilon of core points from two different clusters
//! joins whichever cluster's expansion reaches it first, so reordering the
//! input can move it. Cluster identity is run-local: ids are creation order
//! within one call, not stable complaint-tracking identifiers.

pub mod adaptive;
pub mod advisor;
pub mod neighbors;

use std::collections::VecDeque;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{GeoEngineError, Result};
use crate::geo_utils::{compute_center, haversine_distance};
use crate::{GeoPoint, ReportPoint};

use advisor::suggest_parameters;
use neighbors::{NeighborIndex, NeighborStrategy};

/// Area floor in km² for density, so single or coincident points stay finite.
pub const MIN_CLUSTER_AREA_KM2: f64 = 0.01;

/// Parameters for a clustering run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterParameters {
    /// Neighborhood radius in meters (must be positive and finite).
    pub epsilon_meters: f64,
    /// Minimum points, including the point itself, for a core point (>= 1).
    ///
    /// Set to 1 when a single report must surface as its own hotspot.
    pub min_points: usize,
}

impl Default for ClusterParameters {
    fn default() -> Self {
        Self {
            epsilon_meters: advisor::FALLBACK_EPSILON_METERS,
            min_points: advisor::FALLBACK_MIN_POINTS,
        }
    }
}

impl ClusterParameters {
    /// Create validated parameters.
    pub fn new(epsilon_meters: f64, min_points: usize) -> Result<Self> {
        let params = Self {
            epsilon_meters,
            min_points,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.epsilon_meters.is_finite() || self.epsilon_meters <= 0.0 {
            return Err(GeoEngineError::configuration(
                "epsilon_meters",
                format!("must be positive and finite, got {}", self.epsilon_meters),
            ));
        }
        if self.min_points < 1 {
            return Err(GeoEngineError::configuration(
                "min_points",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// A hotspot: a density-connected group of input points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Run-local id (creation order, starting at 0)
    pub id: usize,
    /// Input indices of the members, ascending
    pub member_indices: Vec<usize>,
    /// Centroid (mean latitude/longitude)
    pub center: GeoPoint,
    /// Maximum member distance from the centroid in meters
    pub radius_meters: f64,
    /// Members per km² of the circle implied by the radius
    pub density: f64,
}

impl Cluster {
    /// Build a cluster and its statistics from member indices.
    pub fn from_members(id: usize, mut member_indices: Vec<usize>, points: &[GeoPoint]) -> Self {
        member_indices.sort_unstable();
        let members: Vec<GeoPoint> = member_indices.iter().map(|&i| points[i]).collect();
        let (center, radius_meters, density) = cluster_statistics(&members);
        Self {
            id,
            member_indices,
            center,
            radius_meters,
            density,
        }
    }

    pub fn size(&self) -> usize {
        self.member_indices.len()
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.member_indices.binary_search(&idx).is_ok()
    }

    /// One-line description for reports and map tooltips.
    pub fn describe(&self) -> String {
        format!(
            "{} reports clustered near {:.5},{:.5}",
            self.size(),
            self.center.latitude,
            self.center.longitude
        )
    }
}

/// Output of a clustering run: clusters plus unassigned (noise) indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterResult {
    pub clusters: Vec<Cluster>,
    /// Noise indices, ascending
    pub noise: Vec<usize>,
}

impl ClusterResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cluster id for each input index, `None` for noise.
    pub fn labels(&self, point_count: usize) -> Vec<Option<usize>> {
        let mut labels = vec![None; point_count];
        for cluster in &self.clusters {
            for &idx in &cluster.member_indices {
                if idx < point_count {
                    labels[idx] = Some(cluster.id);
                }
            }
        }
        labels
    }

    /// The cluster containing `idx`, if any.
    pub fn cluster_of(&self, idx: usize) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.contains(idx))
    }

    /// True if every index in `0..point_count` is in exactly one cluster or noise.
    pub fn is_partition_of(&self, point_count: usize) -> bool {
        let mut seen = vec![0u32; point_count];
        let all = self
            .clusters
            .iter()
            .flat_map(|c| c.member_indices.iter())
            .chain(self.noise.iter());
        for &idx in all {
            match seen.get_mut(idx) {
                Some(count) => *count += 1,
                None => return false,
            }
        }
        seen.iter().all(|&count| count == 1)
    }

    pub fn summary(&self) -> ClusterSummary {
        let clustered: usize = self.clusters.iter().map(Cluster::size).sum();
        let total_points = clustered + self.noise.len();
        ClusterSummary {
            total_points,
            cluster_count: self.clusters.len(),
            noise_count: self.noise.len(),
            largest_cluster_size: self.clusters.iter().map(Cluster::size).max().unwrap_or(0),
            clustered_fraction: if total_points == 0 {
                0.0
            } else {
                clustered as f64 / total_points as f64
            },
        }
    }
}

/// Aggregate figures for analytics dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub total_points: usize,
    pub cluster_count: usize,
    pub noise_count: usize,
    pub largest_cluster_size: usize,
    /// Share of points that ended up in a cluster (0.0-1.0)
    pub clustered_fraction: f64,
}

/// Clustering engine holding parameters and the neighbor search strategy.
///
/// Without parameters the engine asks the advisor for them on every run.
#[derive(Debug, Clone, Default)]
pub struct ClusteringEngine {
    params: Option<ClusterParameters>,
    strategy: NeighborStrategy,
}

impl ClusteringEngine {
    /// Engine with fixed, validated parameters.
    pub fn new(params: ClusterParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params: Some(params),
            strategy: NeighborStrategy::default(),
        })
    }

    /// Engine that derives parameters from each input.
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: NeighborStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn params(&self) -> Option<&ClusterParameters> {
        self.params.as_ref()
    }

    /// Parameters that would be used for `points`.
    pub fn resolve_params(&self, points: &[GeoPoint]) -> ClusterParameters {
        self.params.unwrap_or_else(|| suggest_parameters(points))
    }

    pub fn cluster(&self, points: &[GeoPoint]) -> Result<ClusterResult> {
        validate_points(points)?;
        let params = self.resolve_params(points);
        params.validate()?;
        Ok(run_dbscan(points, &params, self.strategy))
    }

    pub fn cluster_reports(&self, reports: &[ReportPoint]) -> Result<ClusterResult> {
        let points: Vec<GeoPoint> = reports.iter().map(|r| r.point).collect();
        self.cluster(&points)
    }
}

/// Cluster points with explicit parameters.
///
/// # Example
/// ```
/// use hotspotmatch::{cluster_points, ClusterParameters, GeoPoint};
///
/// let points = vec![GeoPoint::new(6.7578, 125.3572), GeoPoint::new(6.75784, 125.3572)];
/// let result = cluster_points(&points, &ClusterParameters::new(50.0, 2).unwrap()).unwrap();
/// assert_eq!(result.clusters.len(), 1);
/// assert!(result.noise.is_empty());
/// ```
pub fn cluster_points(points: &[GeoPoint], params: &ClusterParameters) -> Result<ClusterResult> {
    params.validate()?;
    validate_points(points)?;
    Ok(run_dbscan(points, params, NeighborStrategy::default()))
}

/// Cluster reports, carrying their references alongside by index.
pub fn cluster_reports(
    reports: &[ReportPoint],
    params: &ClusterParameters,
) -> Result<ClusterResult> {
    let points: Vec<GeoPoint> = reports.iter().map(|r| r.point).collect();
    cluster_points(&points, params)
}

/// Cluster with parameters suggested from the data itself.
pub fn cluster_points_auto(points: &[GeoPoint]) -> Result<(ClusterParameters, ClusterResult)> {
    validate_points(points)?;
    let params = suggest_parameters(points);
    let result = cluster_points(points, &params)?;
    Ok((params, result))
}

/// Cluster independent batches (e.g. one per map tile) in parallel.
#[cfg(feature = "parallel")]
pub fn cluster_batches_parallel(
    batches: &[Vec<GeoPoint>],
    params: &ClusterParameters,
) -> Vec<Result<ClusterResult>> {
    use rayon::prelude::*;

    batches
        .par_iter()
        .map(|points| cluster_points(points, params))
        .collect()
}

/// Centroid, radius in meters and density (members per km²) of a point set.
pub fn cluster_statistics(members: &[GeoPoint]) -> (GeoPoint, f64, f64) {
    let center = compute_center(members);
    let radius_meters = members
        .iter()
        .map(|p| haversine_distance(&center, p))
        .fold(0.0, f64::max);
    let radius_km = radius_meters / 1000.0;
    let area_km2 = (std::f64::consts::PI * radius_km * radius_km).max(MIN_CLUSTER_AREA_KM2);
    let density = members.len() as f64 / area_km2;
    (center, radius_meters, density)
}

fn validate_points(points: &[GeoPoint]) -> Result<()> {
    match points.iter().position(|p| !p.is_valid()) {
        Some(index) => Err(GeoEngineError::InvalidPoint {
            index,
            latitude: points[index].latitude,
            longitude: points[index].longitude,
        }),
        None => Ok(()),
    }
}

fn run_dbscan(
    points: &[GeoPoint],
    params: &ClusterParameters,
    strategy: NeighborStrategy,
) -> ClusterResult {
    if points.is_empty() {
        return ClusterResult::empty();
    }

    let index = NeighborIndex::build(points, strategy);
    let groups = expand_clusters(
        points.len(),
        |i| index.within(i, params.epsilon_meters),
        |_, neighbor_count| neighbor_count + 1 >= params.min_points,
    );

    let result = assemble_result(points, groups);
    info!(
        "[Clustering] {} points, eps={:.1}m minPts={} -> {} clusters, {} noise",
        points.len(),
        params.epsilon_meters,
        params.min_points,
        result.clusters.len(),
        result.noise.len()
    );
    result
}

/// Core DBSCAN loop shared by fixed-parameter and category-adaptive runs.
///
/// `region_query(i)` returns the neighbors of `i` (excluding `i`) and
/// `is_core(i, neighbor_count)` decides whether `i` seeds expansion.
/// Returns member lists in assignment order.
pub(crate) fn expand_clusters<Q, C>(
    point_count: usize,
    mut region_query: Q,
    is_core: C,
) -> Vec<Vec<usize>>
where
    Q: FnMut(usize) -> Vec<usize>,
    C: Fn(usize, usize) -> bool,
{
    let mut visited = vec![false; point_count];
    let mut assigned = vec![false; point_count];
    let mut clusters = Vec::new();

    for i in 0..point_count {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let neighbors = region_query(i);
        if !is_core(i, neighbors.len()) {
            // Provisional noise; a later expansion may claim it as a border point
            continue;
        }

        let mut members = vec![i];
        assigned[i] = true;
        let mut queue: VecDeque<usize> = neighbors.into();

        while let Some(j) = queue.pop_front() {
            if !visited[j] {
                visited[j] = true;
                let next = region_query(j);
                if is_core(j, next.len()) {
                    // Already-assigned points would be no-ops when popped
                    queue.extend(next.into_iter().filter(|&k| !assigned[k]));
                }
            }
            if !assigned[j] {
                assigned[j] = true;
                members.push(j);
            }
        }

        clusters.push(members);
    }

    clusters
}

fn assemble_result(points: &[GeoPoint], groups: Vec<Vec<usize>>) -> ClusterResult {
    let mut in_cluster = vec![false; points.len()];
    let clusters: Vec<Cluster> = groups
        .into_iter()
        .enumerate()
        .map(|(id, members)| {
            for &m in &members {
                in_cluster[m] = true;
            }
            let cluster = Cluster::from_members(id, members, points);
            debug!(
                "[Clustering] cluster {}: {} members, radius {:.1}m, density {:.1}/km2",
                cluster.id,
                cluster.size(),
                cluster.radius_meters,
                cluster.density
            );
            cluster
        })
        .collect();

    let noise = (0..points.len()).filter(|&i| !in_cluster[i]).collect();
    ClusterResult { clusters, noise }
}
