//! Category registry: which complaint categories are related, how far apart
//! two reports of a category may be and still describe one incident, and which
//! clustering tier a category belongs to.
//!
//! The registry is plain configuration, keyed by stable category id. It is
//! built once (usually from JSON) and shared read-only, e.g. behind an `Arc`.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::clustering::ClusterParameters;
use crate::error::{GeoEngineError, Result};

/// Registry bundled with the crate, covering the common municipal categories.
const BUILTIN_REGISTRY: &str = include_str!("../../data/categories.json");

/// Clustering tier: how tight and how corroborated a hotspot must be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterTier {
    /// Life-threatening (fire, crime): a single report is a hotspot
    Critical,
    /// High priority (accident, flooding)
    High,
    /// Infrastructure (pothole, broken light)
    #[default]
    Infrastructure,
    /// Quality of life (noise, trash)
    QualityOfLife,
    /// Everything else
    Minor,
}

impl ClusterTier {
    pub fn params(self) -> ClusterParameters {
        let (epsilon_meters, min_points) = match self {
            Self::Critical => (20.0, 1),
            Self::High => (30.0, 2),
            Self::Infrastructure => (40.0, 3),
            Self::QualityOfLife => (50.0, 4),
            Self::Minor => (60.0, 5),
        };
        ClusterParameters {
            epsilon_meters,
            min_points,
        }
    }
}

/// Configuration for one complaint category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    /// Stable identifier (database id or slug)
    pub id: String,
    /// Display name, advisory only
    #[serde(default)]
    pub name: String,
    /// Ids of categories considered the same incident type for deduplication.
    /// Relationships are symmetric; listing one direction is enough.
    #[serde(default)]
    pub related: Vec<String>,
    /// Spatial duplicate radius in meters (None = filter default)
    #[serde(default)]
    pub dedup_radius_meters: Option<f64>,
    /// Clustering tier (None = Infrastructure)
    #[serde(default)]
    pub tier: Option<ClusterTier>,
}

impl CategoryProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            related: Vec::new(),
            dedup_radius_meters: None,
            tier: None,
        }
    }

    pub fn related_to<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_radius(mut self, meters: f64) -> Self {
        self.dedup_radius_meters = Some(meters);
        self
    }

    pub fn with_tier(mut self, tier: ClusterTier) -> Self {
        self.tier = Some(tier);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(GeoEngineError::configuration("category.id", "must not be empty"));
        }
        if let Some(radius) = self.dedup_radius_meters {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(GeoEngineError::configuration(
                    format!("category {}.dedup_radius_meters", self.id),
                    format!("must be positive and finite, got {radius}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RegistryFile {
    categories: Vec<CategoryProfile>,
}

/// Read-only lookup of category profiles and relationships.
#[derive(Debug, Clone, Default)]
pub struct CategoryRegistry {
    profiles: HashMap<String, CategoryProfile>,
    related: HashMap<String, HashSet<String>>,
}

impl CategoryRegistry {
    /// Empty registry: only identical categories are related.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles<I>(profiles: I) -> Result<Self>
    where
        I: IntoIterator<Item = CategoryProfile>,
    {
        let mut registry = Self::new();
        for profile in profiles {
            registry.insert(profile)?;
        }
        Ok(registry)
    }

    /// Parse `{"categories": [...]}` JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Self::from_profiles(file.categories)
    }

    /// The registry shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_REGISTRY)
    }

    /// Add or replace a profile. Intended for setup, before sharing.
    pub fn insert(&mut self, profile: CategoryProfile) -> Result<()> {
        profile.validate()?;
        // Links declared by other profiles towards this id live in their sets
        let links = self.related.entry(profile.id.clone()).or_default();
        links.clear();
        links.extend(profile.related.iter().filter(|id| !id.is_empty()).cloned());
        self.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    /// True if the ids are identical or either lists the other as related.
    ///
    /// Empty ids (a complaint with no category) are never related.
    pub fn are_related(&self, a: &str, b: &str) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        if a == b {
            return true;
        }
        self.lists(a, b) || self.lists(b, a)
    }

    fn lists(&self, from: &str, to: &str) -> bool {
        self.related.get(from).is_some_and(|set| set.contains(to))
    }

    pub fn profile(&self, id: &str) -> Option<&CategoryProfile> {
        self.profiles.get(id)
    }

    pub fn dedup_radius(&self, id: &str) -> Option<f64> {
        self.profiles.get(id).and_then(|p| p.dedup_radius_meters)
    }

    /// Clustering tier for a category, Infrastructure when unknown.
    pub fn tier(&self, id: &str) -> ClusterTier {
        self.profiles
            .get(id)
            .and_then(|p| p.tier)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
