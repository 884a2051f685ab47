//! Synthetic complaint data generator for stress testing and benchmarking.
//!
//! Generates complaint locations around known hotspots plus scattered
//! background reports, providing ground truth for validating clustering.
//!
//! Feature-gated behind `synthetic` - not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use hotspotmatch::synthetic::{HotspotConfig, SyntheticCity};
//! use hotspotmatch::GeoPoint;
//!
//! let city = SyntheticCity {
//!     origin: GeoPoint::new(6.7578, 125.3572),
//!     hotspots: vec![HotspotConfig {
//!         offset_north_meters: 0.0,
//!         offset_east_meters: 0.0,
//!         report_count: 20,
//!         spread_meters: 15.0,
//!     }],
//!     scattered_reports: 10,
//!     scatter_radius_meters: 3_000.0,
//!     seed: 42,
//! };
//!
//! let dataset = city.generate();
//! assert_eq!(dataset.reports.len(), 30);
//! ```

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo_utils::METERS_PER_DEGREE;
use crate::{GeoPoint, ReportPoint};

// ============================================================================
// Types
// ============================================================================

/// A hotspot: many reports around one location.
#[derive(Debug, Clone)]
pub struct HotspotConfig {
    /// Offset of the hotspot center from the city origin, northwards.
    pub offset_north_meters: f64,
    /// Offset of the hotspot center from the city origin, eastwards.
    pub offset_east_meters: f64,
    /// Number of reports placed around the center.
    pub report_count: usize,
    /// Gaussian spread (sigma) of report positions in meters.
    pub spread_meters: f64,
}

/// Ground truth for one generated hotspot.
#[derive(Debug, Clone)]
pub struct ExpectedHotspot {
    pub center: GeoPoint,
    /// Indices into `SyntheticDataset::reports`
    pub report_indices: Vec<usize>,
}

/// A generated dataset with ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    /// Hotspot reports first, in hotspot order, then scattered reports.
    pub reports: Vec<ReportPoint>,
    pub expected: Vec<ExpectedHotspot>,
}

impl SyntheticDataset {
    pub fn points(&self) -> Vec<GeoPoint> {
        self.reports.iter().map(|r| r.point).collect()
    }
}

/// Scenario configuration for generating synthetic data.
#[derive(Debug, Clone)]
pub struct SyntheticCity {
    /// Center of the city.
    pub origin: GeoPoint,
    pub hotspots: Vec<HotspotConfig>,
    /// Background reports placed uniformly in a disk around the origin.
    pub scattered_reports: usize,
    /// Radius of the background disk in meters.
    pub scatter_radius_meters: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

// ============================================================================
// Coordinate Helpers
// ============================================================================

/// Move a point by north/east offsets in meters.
fn offset(origin: &GeoPoint, north_meters: f64, east_meters: f64) -> GeoPoint {
    let dlat = north_meters / METERS_PER_DEGREE;
    let meters_per_deg_lng = METERS_PER_DEGREE * origin.latitude.to_radians().cos();
    let dlng = if meters_per_deg_lng.abs() < 1e-10 {
        0.0
    } else {
        east_meters / meters_per_deg_lng
    };
    GeoPoint::new(origin.latitude + dlat, origin.longitude + dlng)
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(0.0001..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

// ============================================================================
// Generation
// ============================================================================

impl SyntheticCity {
    pub fn generate(&self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut reports = Vec::new();
        let mut expected = Vec::with_capacity(self.hotspots.len());

        for (h, hotspot) in self.hotspots.iter().enumerate() {
            let center = offset(
                &self.origin,
                hotspot.offset_north_meters,
                hotspot.offset_east_meters,
            );
            let start = reports.len();
            for i in 0..hotspot.report_count {
                let north = gaussian(&mut rng) * hotspot.spread_meters;
                let east = gaussian(&mut rng) * hotspot.spread_meters;
                let p = offset(&center, north, east);
                reports.push(ReportPoint {
                    reference: format!("hotspot-{h}-{i}"),
                    point: p,
                });
            }
            expected.push(ExpectedHotspot {
                center,
                report_indices: (start..reports.len()).collect(),
            });
        }

        for i in 0..self.scattered_reports {
            // sqrt keeps the disk uniformly filled
            let r = self.scatter_radius_meters * rng.gen_range(0.0..1.0f64).sqrt();
            let theta = rng.gen_range(0.0..2.0 * PI);
            let p = offset(&self.origin, r * theta.sin(), r * theta.cos());
            reports.push(ReportPoint {
                reference: format!("scatter-{i}"),
                point: p,
            });
        }

        SyntheticDataset { reports, expected }
    }

    // ========================================================================
    // Presets
    // ========================================================================

    /// Three tight hotspots and light background noise in a mid-size city.
    pub fn downtown() -> Self {
        Self {
            origin: GeoPoint::new(6.7578, 125.3572),
            hotspots: vec![
                HotspotConfig {
                    offset_north_meters: 0.0,
                    offset_east_meters: 0.0,
                    report_count: 40,
                    spread_meters: 12.0,
                },
                HotspotConfig {
                    offset_north_meters: 1_500.0,
                    offset_east_meters: -800.0,
                    report_count: 25,
                    spread_meters: 10.0,
                },
                HotspotConfig {
                    offset_north_meters: -1_200.0,
                    offset_east_meters: 1_800.0,
                    report_count: 15,
                    spread_meters: 8.0,
                },
            ],
            scattered_reports: 20,
            scatter_radius_meters: 5_000.0,
            seed: 42,
        }
    }

    /// Only background reports, no hotspots.
    pub fn scattered(count: usize) -> Self {
        Self {
            origin: GeoPoint::new(6.7578, 125.3572),
            hotspots: Vec::new(),
            scattered_reports: count,
            scatter_radius_meters: 10_000.0,
            seed: 7,
        }
    }

    /// `hotspot_count` evenly spaced hotspots totalling about `report_count` reports.
    pub fn with_report_count(report_count: usize, hotspot_count: usize) -> Self {
        let hotspot_count = hotspot_count.max(1);
        let per_hotspot = report_count * 4 / 5 / hotspot_count;
        let hotspots = (0..hotspot_count)
            .map(|i| {
                let angle = i as f64 * 2.0 * PI / hotspot_count as f64;
                HotspotConfig {
                    offset_north_meters: 2_000.0 * angle.sin(),
                    offset_east_meters: 2_000.0 * angle.cos(),
                    report_count: per_hotspot,
                    spread_meters: 15.0,
                }
            })
            .collect();
        Self {
            origin: GeoPoint::new(6.7578, 125.3572),
            hotspots,
            scattered_reports: report_count - per_hotspot * hotspot_count,
            scatter_radius_meters: 6_000.0,
            seed: 1234,
        }
    }
}
