//! # Hotspot Match
//!
//! Geospatial analysis engine for municipal complaint intake.
//!
//! This library provides:
//! - Great-circle distance and shared geometry helpers
//! - Density-based clustering (DBSCAN) of complaint locations into hotspots
//! - Parameter estimation from the data distribution (k-distance heuristic)
//! - Category-adaptive clustering driven by a category registry
//! - Three-layer duplicate detection (spatial, temporal, semantic)
//!
//! ## Features
//!
//! - **`parallel`** - Parallel batch processing across independent runs with rayon
//! - **`synthetic`** - Seeded synthetic complaint generator for tests and benchmarks
//!
//! ## Quick Start
//!
//! ```rust
//! use hotspotmatch::{cluster_points, ClusterParameters, GeoPoint};
//!
//! let points = vec![
//!     GeoPoint::new(6.75780, 125.35720),
//!     GeoPoint::new(6.75783, 125.35722),
//!     GeoPoint::new(6.76900, 125.36900),
//! ];
//!
//! let params = ClusterParameters::new(50.0, 2).unwrap();
//! let result = cluster_points(&points, &params).unwrap();
//!
//! assert_eq!(result.clusters.len(), 1);
//! assert_eq!(result.noise, vec![2]);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{GeoEngineError, OptionExt, Result};

// Geographic utilities (distance, bounds, center calculations)
pub mod geo_utils;
pub use geo_utils::haversine_distance;

// Density-based clustering, parameter advice, adaptive tiers
pub mod clustering;
#[cfg(feature = "parallel")]
pub use clustering::cluster_batches_parallel;
pub use clustering::{
    advisor::{suggest_parameters, KDistanceProfile},
    adaptive::{cluster_by_category, AdaptiveCluster, AdaptiveClusterResult, CategorizedReport},
    cluster_points, cluster_points_auto, cluster_reports, neighbors::NeighborStrategy, Cluster,
    ClusterParameters, ClusterResult, ClusterSummary, ClusteringEngine,
};

// Duplicate detection and the category registry
pub mod dedup;
pub use dedup::{
    registry::{CategoryProfile, CategoryRegistry, ClusterTier},
    CandidateMatch, ComplaintSnapshot, DedupConfig, DuplicateFilter, DuplicateVerdict,
    FailedLayer,
};

// Synthetic complaint data for stress testing
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude in degrees.
///
/// # Example
/// ```
/// use hotspotmatch::GeoPoint;
/// let point = GeoPoint::new(6.7578, 125.3572);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A complaint location paired with an opaque caller reference.
///
/// The reference (typically a complaint ID) travels alongside the point so
/// callers can map cluster member indices back to records. The clustering
/// algorithm never reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPoint {
    pub reference: String,
    pub point: GeoPoint,
}

impl ReportPoint {
    pub fn new(reference: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            reference: reference.into(),
            point: GeoPoint::new(latitude, longitude),
        }
    }
}
