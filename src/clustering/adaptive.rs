//! Category-adaptive clustering.
//!
//! Each report is clustered with its own category's tier parameters, and a
//! neighborhood only contains reports whose category is related, so a pothole
//! five meters from a fire never joins the fire's hotspot. Critical tiers use
//! `min_points = 1`, which makes a single fire report its own hotspot.

use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};

use super::neighbors::{NeighborIndex, NeighborStrategy};
use super::{expand_clusters, Cluster};
use crate::dedup::registry::CategoryRegistry;
use crate::error::{GeoEngineError, Result};
use crate::GeoPoint;

/// A report with the category used to pick its clustering tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedReport {
    pub reference: String,
    pub point: GeoPoint,
    /// Empty when unknown; unknown categories relate to everything
    pub category_id: String,
}

impl CategorizedReport {
    pub fn new(
        reference: impl Into<String>,
        latitude: f64,
        longitude: f64,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            reference: reference.into(),
            point: GeoPoint::new(latitude, longitude),
            category_id: category_id.into(),
        }
    }
}

/// A hotspot with the category most of its reports share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveCluster {
    pub cluster: Cluster,
    /// Most frequent category; on a tie, the one that reached the top count first
    pub dominant_category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveClusterResult {
    pub clusters: Vec<AdaptiveCluster>,
    /// Noise indices, ascending
    pub noise: Vec<usize>,
}

/// Cluster reports with per-category tiers and semantic neighborhoods.
pub fn cluster_by_category(
    reports: &[CategorizedReport],
    registry: &CategoryRegistry,
) -> Result<AdaptiveClusterResult> {
    if let Some(index) = reports.iter().position(|r| !r.point.is_valid()) {
        return Err(GeoEngineError::InvalidPoint {
            index,
            latitude: reports[index].point.latitude,
            longitude: reports[index].point.longitude,
        });
    }
    if reports.is_empty() {
        return Ok(AdaptiveClusterResult::default());
    }

    let points: Vec<GeoPoint> = reports.iter().map(|r| r.point).collect();
    let tiers: Vec<_> = reports
        .iter()
        .map(|r| registry.tier(&r.category_id).params())
        .collect();
    let related = |a: &str, b: &str| a.is_empty() || b.is_empty() || registry.are_related(a, b);

    let index = NeighborIndex::build(&points, NeighborStrategy::Exhaustive);
    let groups = expand_clusters(
        reports.len(),
        |i| {
            let category = reports[i].category_id.as_str();
            index.within_filtered(i, tiers[i].epsilon_meters, |j| {
                related(category, &reports[j].category_id)
            })
        },
        |i, neighbor_count| neighbor_count + 1 >= tiers[i].min_points,
    );

    let mut in_cluster = vec![false; reports.len()];
    let clusters: Vec<AdaptiveCluster> = groups
        .into_iter()
        .enumerate()
        .map(|(id, members)| {
            for &m in &members {
                in_cluster[m] = true;
            }
            let dominant_category = dominant_category(reports, &members);
            AdaptiveCluster {
                cluster: Cluster::from_members(id, members, &points),
                dominant_category,
            }
        })
        .collect();
    let noise: Vec<usize> = (0..reports.len()).filter(|&i| !in_cluster[i]).collect();

    info!(
        "[Clustering] Adaptive run over {} reports -> {} clusters, {} noise",
        reports.len(),
        clusters.len(),
        noise.len()
    );

    Ok(AdaptiveClusterResult { clusters, noise })
}

fn dominant_category(reports: &[CategorizedReport], members: &[usize]) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut best = "";
    let mut best_count = 0;
    for &m in members {
        let category = reports[m].category_id.as_str();
        let count = counts.entry(category).or_insert(0);
        *count += 1;
        if *count > best_count {
            best_count = *count;
            best = category;
        }
    }
    best.to_string()
}
