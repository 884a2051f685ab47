//! # Duplicate Complaint Detection
//!
//! Decides whether a newly submitted complaint plausibly describes the same
//! incident as an existing one. Three layers run in fixed order and the first
//! failure ends the check:
//!
//! 1. **Spatial** - distance within the category's radius
//! 2. **Temporal** - submitted within the time window (48 h by default)
//! 3. **Semantic** - same category, or categories related in the registry
//!
//! Each layer is a hard gate; there is no blended similarity score. A failed
//! layer is an ordinary negative verdict. Only malformed input (missing or
//! out-of-range coordinates, a missing timestamp on an existing complaint) is
//! an error.

pub mod registry;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{GeoEngineError, OptionExt, Result};
use crate::geo_utils::{haversine_distance, validate_point};
use crate::GeoPoint;

use registry::CategoryRegistry;

/// The layer that rejected a pair, or `None` for a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailedLayer {
    Spatial,
    Temporal,
    Semantic,
    None,
}

impl fmt::Display for FailedLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Spatial => "spatial",
            Self::Temporal => "temporal",
            Self::Semantic => "semantic",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// The fields of a complaint that duplicate detection reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplaintSnapshot {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub category_id: String,
    /// Free-text category name, used only when the registry has no radius
    #[serde(default)]
    pub category_name: Option<String>,
    /// Submission time; for a not-yet-stored complaint `None` means now
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ComplaintSnapshot {
    pub fn new(latitude: f64, longitude: f64, category_id: impl Into<String>) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            category_id: category_id.into(),
            category_name: None,
            submitted_at: None,
        }
    }

    pub fn with_category_name(mut self, name: impl Into<String>) -> Self {
        self.category_name = Some(name.into());
        self
    }

    pub fn submitted_at(mut self, at: DateTime<Utc>) -> Self {
        self.submitted_at = Some(at);
        self
    }

    /// Validated location of the complaint.
    pub fn location(&self, field: &str) -> Result<GeoPoint> {
        let latitude = self.latitude.ok_or_missing(&format!("{field}.latitude"))?;
        let longitude = self.longitude.ok_or_missing(&format!("{field}.longitude"))?;
        let point = GeoPoint::new(latitude, longitude);
        validate_point(&point, field)?;
        Ok(point)
    }
}

/// Outcome of one pairwise comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateVerdict {
    pub is_match: bool,
    pub failed_layer: FailedLayer,
    /// Distance between the complaints in meters, once computed
    pub distance_meters: Option<f64>,
    /// Radius the spatial layer compared against
    pub radius_meters: Option<f64>,
    /// 1.0 for a match, 0.0 otherwise
    pub confidence: f64,
}

impl DuplicateVerdict {
    fn matched(distance_meters: f64, radius_meters: f64) -> Self {
        Self {
            is_match: true,
            failed_layer: FailedLayer::None,
            distance_meters: Some(distance_meters),
            radius_meters: Some(radius_meters),
            confidence: 1.0,
        }
    }

    fn rejected(layer: FailedLayer, distance_meters: f64, radius_meters: f64) -> Self {
        Self {
            is_match: false,
            failed_layer: layer,
            distance_meters: Some(distance_meters),
            radius_meters: Some(radius_meters),
            confidence: 0.0,
        }
    }
}

/// A positive verdict and the index of the candidate it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub index: usize,
    pub verdict: DuplicateVerdict,
}

/// Thresholds for duplicate detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Radius for categories with no registry radius and no keyword hit.
    /// Default: 50.0 meters
    pub default_radius_meters: f64,

    /// Radius for area-wide incidents matched by keyword (floods, outages).
    /// Default: 500.0 meters
    pub large_radius_meters: f64,

    /// Radius for pinpoint incidents matched by keyword (potholes, parking).
    /// Default: 20.0 meters
    pub small_radius_meters: f64,

    /// Maximum submission time difference.
    /// Default: 48 hours
    pub time_window_hours: u32,

    /// Lower-case substrings of a category name that mark area-wide incidents.
    pub area_wide_keywords: Vec<String>,

    /// Lower-case substrings of a category name that mark pinpoint incidents.
    pub pinpoint_keywords: Vec<String>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: 50.0,
            large_radius_meters: 500.0,
            small_radius_meters: 20.0,
            time_window_hours: 48,
            area_wide_keywords: vec!["flood".into(), "blackout".into(), "outage".into()],
            pinpoint_keywords: vec!["pothole".into(), "parking".into(), "trash".into()],
        }
    }
}

impl DedupConfig {
    /// Radii must be positive and finite, the window at least one hour.
    pub fn validate(&self) -> Result<()> {
        let radii = [
            ("default_radius_meters", self.default_radius_meters),
            ("large_radius_meters", self.large_radius_meters),
            ("small_radius_meters", self.small_radius_meters),
        ];
        for (parameter, radius) in radii {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(GeoEngineError::configuration(
                    parameter,
                    format!("must be positive and finite, got {radius}"),
                ));
            }
        }
        if self.time_window_hours == 0 {
            return Err(GeoEngineError::configuration(
                "time_window_hours",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Three-layer duplicate filter over an injected category registry.
#[derive(Debug, Clone)]
pub struct DuplicateFilter {
    registry: Arc<CategoryRegistry>,
    config: DedupConfig,
}

impl DuplicateFilter {
    /// Filter with validated thresholds.
    pub fn new(registry: Arc<CategoryRegistry>, config: DedupConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    /// Filter with the default thresholds.
    pub fn with_registry(registry: Arc<CategoryRegistry>) -> Self {
        Self {
            registry,
            config: DedupConfig::default(),
        }
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Spatial radius for a complaint's category.
    ///
    /// The registry radius wins. Unregistered categories fall back to keyword
    /// matching on the advisory name, then to the default radius.
    pub fn radius_for(&self, complaint: &ComplaintSnapshot) -> f64 {
        if let Some(radius) = self.registry.dedup_radius(&complaint.category_id) {
            return radius;
        }
        let name = complaint
            .category_name
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let hit = |keywords: &[String]| keywords.iter().any(|k| name.contains(k.as_str()));

        if hit(&self.config.area_wide_keywords) {
            self.config.large_radius_meters
        } else if hit(&self.config.pinpoint_keywords) {
            self.config.small_radius_meters
        } else {
            self.config.default_radius_meters
        }
    }

    /// Compare a new complaint against an existing one, with "now" as the
    /// new complaint's time if it has none.
    pub fn check(
        &self,
        new: &ComplaintSnapshot,
        existing: &ComplaintSnapshot,
    ) -> Result<DuplicateVerdict> {
        self.check_at(new, existing, Utc::now())
    }

    /// Like [`check`](Self::check) with an explicit reference time.
    pub fn check_at(
        &self,
        new: &ComplaintSnapshot,
        existing: &ComplaintSnapshot,
        now: DateTime<Utc>,
    ) -> Result<DuplicateVerdict> {
        let new_location = new.location("new")?;
        let existing_location = existing.location("existing")?;
        let existing_at = existing
            .submitted_at
            .ok_or_missing("existing.submitted_at")?;
        let new_at = new.submitted_at.unwrap_or(now);

        // Layer 1: spatial
        let radius = self.radius_for(new);
        let distance = haversine_distance(&new_location, &existing_location);
        if distance > radius {
            return Ok(DuplicateVerdict::rejected(FailedLayer::Spatial, distance, radius));
        }

        // Layer 2: temporal
        let gap = if new_at >= existing_at {
            new_at - existing_at
        } else {
            existing_at - new_at
        };
        if gap > Duration::hours(i64::from(self.config.time_window_hours)) {
            return Ok(DuplicateVerdict::rejected(FailedLayer::Temporal, distance, radius));
        }

        // Layer 3: semantic
        if !self
            .registry
            .are_related(&new.category_id, &existing.category_id)
        {
            return Ok(DuplicateVerdict::rejected(FailedLayer::Semantic, distance, radius));
        }

        Ok(DuplicateVerdict::matched(distance, radius))
    }

    /// One verdict per candidate, in order.
    ///
    /// The caller is expected to pre-filter candidates to a recent, nearby
    /// window. A malformed candidate fails the whole call, and the error
    /// names it as `candidates[index]`.
    pub fn check_all(
        &self,
        new: &ComplaintSnapshot,
        candidates: &[ComplaintSnapshot],
    ) -> Result<Vec<DuplicateVerdict>> {
        let now = Utc::now();
        candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                self.check_at(new, candidate, now)
                    .map_err(|e| name_candidate(e, index))
            })
            .collect()
    }

    /// Parallel [`check_all`](Self::check_all) for long candidate lists.
    #[cfg(feature = "parallel")]
    pub fn check_all_parallel(
        &self,
        new: &ComplaintSnapshot,
        candidates: &[ComplaintSnapshot],
    ) -> Result<Vec<DuplicateVerdict>> {
        use rayon::prelude::*;

        let now = Utc::now();
        candidates
            .par_iter()
            .enumerate()
            .map(|(index, candidate)| {
                self.check_at(new, candidate, now)
                    .map_err(|e| name_candidate(e, index))
            })
            .collect()
    }

    /// The closest positive match among the candidates, if any.
    pub fn closest_match(
        &self,
        new: &ComplaintSnapshot,
        candidates: &[ComplaintSnapshot],
    ) -> Result<Option<CandidateMatch>> {
        let verdicts = self.check_all(new, candidates)?;
        Ok(closest(verdicts.into_iter().enumerate()))
    }

    /// Fail-safe screening for the intake path.
    ///
    /// Never errors: a malformed new complaint yields `None` (allow the
    /// submission) and malformed candidates are skipped. Both are logged.
    pub fn screen(
        &self,
        new: &ComplaintSnapshot,
        candidates: &[ComplaintSnapshot],
    ) -> Option<CandidateMatch> {
        if let Err(e) = new.location("new") {
            warn!("[Duplicates] Skipping duplicate check, new complaint invalid: {e}");
            return None;
        }

        let now = Utc::now();
        let verdicts = candidates
            .iter()
            .enumerate()
            .filter_map(|(index, candidate)| match self.check_at(new, candidate, now) {
                Ok(verdict) => Some((index, verdict)),
                Err(e) => {
                    warn!("[Duplicates] Skipping candidate {index}: {e}");
                    None
                }
            });

        let best = closest(verdicts);
        if let Some(m) = &best {
            debug!(
                "[Duplicates] Candidate {} matches at {:.1}m",
                m.index,
                m.verdict.distance_meters.unwrap_or_default()
            );
        }
        best
    }
}

/// Rewrite `existing...` field names as `candidates[index]...`.
fn name_candidate(err: GeoEngineError, index: usize) -> GeoEngineError {
    match err {
        GeoEngineError::InvalidInput { field, reason } => match field.strip_prefix("existing") {
            Some(rest) => GeoEngineError::InvalidInput {
                field: format!("candidates[{index}]{rest}"),
                reason,
            },
            None => GeoEngineError::InvalidInput { field, reason },
        },
        other => other,
    }
}

fn closest<I>(verdicts: I) -> Option<CandidateMatch>
where
    I: Iterator<Item = (usize, DuplicateVerdict)>,
{
    verdicts
        .filter(|(_, v)| v.is_match)
        .min_by(|(_, a), (_, b)| {
            let da = a.distance_meters.unwrap_or(f64::INFINITY);
            let db = b.distance_meters.unwrap_or(f64::INFINITY);
            da.total_cmp(&db)
        })
        .map(|(index, verdict)| CandidateMatch { index, verdict })
}
