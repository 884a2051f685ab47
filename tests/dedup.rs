//! Tests for duplicate complaint detection

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use hotspotmatch::{
    CategoryProfile, CategoryRegistry, ComplaintSnapshot, DedupConfig, DuplicateFilter,
    FailedLayer, GeoEngineError,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 15, 9, 30, 0).unwrap()
}

/// Filter without registry radii, so category names drive the radius.
fn keyword_filter() -> DuplicateFilter {
    DuplicateFilter::with_registry(Arc::new(CategoryRegistry::new()))
}

fn builtin_filter() -> DuplicateFilter {
    DuplicateFilter::with_registry(Arc::new(CategoryRegistry::builtin().unwrap()))
}

fn complaint(lat: f64, lng: f64, category: &str, name: &str) -> ComplaintSnapshot {
    ComplaintSnapshot::new(lat, lng, category).with_category_name(name)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_flood_reports_300m_apart_match() {
    let filter = keyword_filter();
    let existing = complaint(6.7578, 125.3572, "4", "Flood Report").submitted_at(now() - Duration::hours(2));
    let new = complaint(6.7608, 125.3572, "4", "Flood Report").submitted_at(now());

    let verdict = filter.check_at(&new, &existing, now()).unwrap();
    assert!(verdict.is_match);
    assert_eq!(verdict.failed_layer, FailedLayer::None);
    assert_eq!(verdict.radius_meters, Some(500.0));
    assert_eq!(verdict.confidence, 1.0);
    let d = verdict.distance_meters.unwrap();
    assert!((d - 333.58).abs() < 0.5, "got {d}");
}

#[test]
fn test_pothole_reports_300m_apart_fail_spatial() {
    let filter = keyword_filter();
    let existing = complaint(6.7578, 125.3572, "9", "Pothole Repair").submitted_at(now());
    let new = complaint(6.7608, 125.3572, "9", "Pothole Repair").submitted_at(now());

    let verdict = filter.check_at(&new, &existing, now()).unwrap();
    assert!(!verdict.is_match);
    assert_eq!(verdict.failed_layer, FailedLayer::Spatial);
    assert_eq!(verdict.radius_meters, Some(20.0));
    assert_eq!(verdict.confidence, 0.0);
}

#[test]
fn test_reports_50_hours_apart_fail_temporal() {
    let filter = keyword_filter();
    let existing = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(now() - Duration::hours(50));
    let new = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(now());

    let verdict = filter.check_at(&new, &existing, now()).unwrap();
    assert!(!verdict.is_match);
    assert_eq!(verdict.failed_layer, FailedLayer::Temporal);
    assert_eq!(verdict.distance_meters, Some(0.0));
}

// ============================================================================
// Layer behavior
// ============================================================================

#[test]
fn test_spatial_layer_checked_first() {
    // Fails every layer; only the first failure is reported
    let filter = keyword_filter();
    let existing = complaint(6.7578, 125.3572, "1", "Noise").submitted_at(now() - Duration::days(30));
    let new = complaint(6.8, 125.4, "2", "Trash").submitted_at(now());

    let verdict = filter.check_at(&new, &existing, now()).unwrap();
    assert_eq!(verdict.failed_layer, FailedLayer::Spatial);
}

#[test]
fn test_temporal_window_is_inclusive_and_symmetric() {
    let filter = keyword_filter();
    let base = complaint(6.7578, 125.3572, "1", "Streetlight");

    let existing = base.clone().submitted_at(now() - Duration::hours(48));
    let verdict = filter.check_at(&base.clone().submitted_at(now()), &existing, now()).unwrap();
    assert!(verdict.is_match);

    // Existing complaint later than the new one
    let existing = base.clone().submitted_at(now() + Duration::hours(49));
    let verdict = filter.check_at(&base.clone().submitted_at(now()), &existing, now()).unwrap();
    assert_eq!(verdict.failed_layer, FailedLayer::Temporal);
}

#[test]
fn test_semantic_layer_uses_registry() {
    let filter = builtin_filter();
    let existing = ComplaintSnapshot::new(6.7578, 125.3572, "drainage").submitted_at(now());
    let flood = ComplaintSnapshot::new(6.75785, 125.3572, "flooding").submitted_at(now());
    let noise = ComplaintSnapshot::new(6.75785, 125.3572, "noise").submitted_at(now());

    assert!(filter.check_at(&flood, &existing, now()).unwrap().is_match);
    // Reverse direction: relationship is symmetric, drainage radius is 50 m
    assert!(filter.check_at(&existing, &flood, now()).unwrap().is_match);

    let verdict = filter.check_at(&noise, &existing, now()).unwrap();
    assert_eq!(verdict.failed_layer, FailedLayer::Semantic);
}

#[test]
fn test_missing_category_fails_semantic() {
    let filter = builtin_filter();
    let existing = ComplaintSnapshot::new(6.7578, 125.3572, "").submitted_at(now());
    let new = ComplaintSnapshot::new(6.7578, 125.3572, "").submitted_at(now());
    let verdict = filter.check_at(&new, &existing, now()).unwrap();
    assert_eq!(verdict.failed_layer, FailedLayer::Semantic);
}

#[test]
fn test_registry_radius_overrides_name() {
    let registry = CategoryRegistry::from_profiles([
        CategoryProfile::new("9", "Pothole Repair").with_radius(400.0),
    ])
    .unwrap();
    let filter = DuplicateFilter::with_registry(Arc::new(registry));

    let new = complaint(6.7608, 125.3572, "9", "Pothole Repair");
    assert_eq!(filter.radius_for(&new), 400.0);

    let existing = complaint(6.7578, 125.3572, "9", "Pothole Repair").submitted_at(now());
    assert!(filter.check_at(&new.submitted_at(now()), &existing, now()).unwrap().is_match);
}

#[test]
fn test_radius_keywords() {
    let filter = keyword_filter();
    let radius = |name: &str| filter.radius_for(&complaint(0.0, 0.0, "x", name));

    assert_eq!(radius("Flash Flooding"), 500.0);
    assert_eq!(radius("BLACKOUT"), 500.0);
    assert_eq!(radius("Power Outage"), 500.0);
    assert_eq!(radius("Pothole"), 20.0);
    assert_eq!(radius("Illegal Parking"), 20.0);
    assert_eq!(radius("Trash Collection"), 20.0);
    assert_eq!(radius("Streetlight"), 50.0);
    assert_eq!(filter.radius_for(&ComplaintSnapshot::new(0.0, 0.0, "x")), 50.0);
}

#[test]
fn test_custom_config() {
    let config = DedupConfig {
        default_radius_meters: 75.0,
        time_window_hours: 2,
        ..DedupConfig::default()
    };
    let filter = DuplicateFilter::new(Arc::new(CategoryRegistry::new()), config).unwrap();
    assert_eq!(filter.config().time_window_hours, 2);

    let existing = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(now() - Duration::hours(3));
    let new = complaint(6.7583, 125.3572, "1", "Streetlight").submitted_at(now());
    let verdict = filter.check_at(&new, &existing, now()).unwrap();
    assert_eq!(verdict.radius_meters, Some(75.0));
    assert_eq!(verdict.failed_layer, FailedLayer::Temporal);
}

#[test]
fn test_new_complaint_without_time_uses_now() {
    let filter = keyword_filter();
    let existing = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(now() - Duration::hours(47));
    let new = complaint(6.7578, 125.3572, "1", "Streetlight");

    assert!(filter.check_at(&new, &existing, now()).unwrap().is_match);
    let later = now() + Duration::hours(2);
    assert_eq!(
        filter.check_at(&new, &existing, later).unwrap().failed_layer,
        FailedLayer::Temporal
    );

    // Wall-clock check against a just-submitted complaint
    let fresh = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(Utc::now());
    assert!(filter.check(&new, &fresh).unwrap().is_match);
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_malformed_input_is_an_error() {
    let filter = keyword_filter();
    let good = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(now());

    let mut missing_lat = good.clone();
    missing_lat.latitude = None;
    let err = filter.check_at(&missing_lat, &good, now()).unwrap_err();
    assert!(matches!(err, GeoEngineError::InvalidInput { ref field, .. } if field == "new.latitude"));

    let out_of_range = complaint(123.0, 125.3572, "1", "Streetlight").submitted_at(now());
    let err = filter.check_at(&good, &out_of_range, now()).unwrap_err();
    assert!(matches!(err, GeoEngineError::InvalidInput { ref field, .. } if field == "existing"));

    let no_time = complaint(6.7578, 125.3572, "1", "Streetlight");
    let err = filter.check_at(&good, &no_time, now()).unwrap_err();
    assert!(matches!(err, GeoEngineError::InvalidInput { .. }));
    assert!(err.to_string().contains("existing.submitted_at"));
}

#[test]
fn test_invalid_config_rejected() {
    let registry = Arc::new(CategoryRegistry::new());
    let bad_configs = [
        DedupConfig {
            default_radius_meters: f64::NAN,
            ..DedupConfig::default()
        },
        DedupConfig {
            large_radius_meters: f64::INFINITY,
            ..DedupConfig::default()
        },
        DedupConfig {
            small_radius_meters: -20.0,
            ..DedupConfig::default()
        },
        DedupConfig {
            default_radius_meters: 0.0,
            ..DedupConfig::default()
        },
        DedupConfig {
            time_window_hours: 0,
            ..DedupConfig::default()
        },
    ];
    for config in bad_configs {
        assert!(config.validate().is_err());
        let err = DuplicateFilter::new(Arc::clone(&registry), config).unwrap_err();
        assert!(matches!(err, GeoEngineError::Configuration { .. }));
    }
    assert!(DedupConfig::default().validate().is_ok());
}

#[test]
fn test_nan_radius_cannot_disable_spatial_layer() {
    // A radius that fails to validate must never reach the spatial layer
    let config = DedupConfig {
        default_radius_meters: f64::NAN,
        ..DedupConfig::default()
    };
    assert!(DuplicateFilter::new(Arc::new(CategoryRegistry::new()), config).is_err());

    let filter = keyword_filter();
    let existing = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(now());
    let new = complaint(7.7578, 125.3572, "1", "Streetlight").submitted_at(now());
    let verdict = filter.check_at(&new, &existing, now()).unwrap();
    assert!(!verdict.is_match);
    assert_eq!(verdict.failed_layer, FailedLayer::Spatial);
}

// ============================================================================
// Candidate lists
// ============================================================================

fn candidates(at: DateTime<Utc>) -> Vec<ComplaintSnapshot> {
    vec![
        // 0: too far
        complaint(6.7700, 125.3572, "1", "Streetlight").submitted_at(at),
        // 1: match at ~22 m
        complaint(6.7580, 125.3572, "1", "Streetlight").submitted_at(at),
        // 2: match at ~11 m
        complaint(6.7579, 125.3572, "1", "Streetlight").submitted_at(at),
        // 3: too old
        complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(at - Duration::days(5)),
    ]
}

#[test]
fn test_check_all_keeps_order() {
    let filter = keyword_filter();
    let at = Utc::now();
    let new = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(at);
    let list = candidates(at);

    let verdicts = filter.check_all(&new, &list).unwrap();
    let layers: Vec<FailedLayer> = verdicts.iter().map(|v| v.failed_layer).collect();
    assert_eq!(
        layers,
        vec![FailedLayer::Spatial, FailedLayer::None, FailedLayer::None, FailedLayer::Temporal]
    );

    let best = filter.closest_match(&new, &list).unwrap().unwrap();
    assert_eq!(best.index, 2);
    assert!(best.verdict.distance_meters.unwrap() < 12.0);
}

#[test]
fn test_closest_match_none_and_errors() {
    let filter = keyword_filter();
    let new = complaint(6.9, 125.3572, "1", "Streetlight").submitted_at(Utc::now());
    assert!(filter.closest_match(&new, &[]).unwrap().is_none());
    assert!(filter
        .closest_match(&new, &[complaint(6.7578, 125.3572, "1", "x").submitted_at(Utc::now())])
        .unwrap()
        .is_none());

    let broken = vec![complaint(6.7578, 125.3572, "1", "x")];
    assert!(filter.closest_match(&new, &broken).is_err());
}

#[test]
fn test_check_all_names_malformed_candidate() {
    let filter = keyword_filter();
    let at = Utc::now();
    let new = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(at);
    let mut list = candidates(at);
    list[2].submitted_at = None;
    list[3].latitude = Some(f64::NAN);

    let err = filter.check_all(&new, &list).unwrap_err();
    assert!(matches!(
        err,
        GeoEngineError::InvalidInput { ref field, .. } if field == "candidates[2].submitted_at"
    ));

    list[2].submitted_at = Some(at);
    let err = filter.check_all(&new, &list).unwrap_err();
    assert!(matches!(
        err,
        GeoEngineError::InvalidInput { ref field, .. } if field == "candidates[3]"
    ));
}

#[test]
fn test_screen_is_fail_safe() {
    let filter = keyword_filter();
    let new = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(Utc::now());
    let list = vec![
        // Malformed candidate is skipped
        complaint(6.7578, 125.3572, "1", "Streetlight"),
        complaint(6.7579, 125.3572, "1", "Streetlight").submitted_at(Utc::now()),
    ];

    let hit = filter.screen(&new, &list).unwrap();
    assert_eq!(hit.index, 1);

    let mut invalid = new.clone();
    invalid.longitude = Some(f64::NAN);
    assert!(filter.screen(&invalid, &list).is_none());
}

#[test]
fn test_verdict_serializes_layer_names() {
    let filter = keyword_filter();
    let existing = complaint(6.7578, 125.3572, "1", "Pothole").submitted_at(now());
    let new = complaint(6.7608, 125.3572, "1", "Pothole").submitted_at(now());
    let verdict = filter.check_at(&new, &existing, now()).unwrap();

    let json = serde_json::to_value(&verdict).unwrap();
    assert_eq!(json["failed_layer"], "spatial");
    assert_eq!(json["is_match"], false);
    assert_eq!(FailedLayer::Semantic.to_string(), "semantic");
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_check_matches_sequential() {
    let filter = keyword_filter();
    let new = complaint(6.7578, 125.3572, "1", "Streetlight").submitted_at(Utc::now());
    let list: Vec<ComplaintSnapshot> = (0..200)
        .map(|i| {
            complaint(6.7578 + i as f64 * 0.00005, 125.3572, "1", "Streetlight")
                .submitted_at(Utc::now())
        })
        .collect();

    let sequential = filter.check_all(&new, &list).unwrap();
    let parallel = filter.check_all_parallel(&new, &list).unwrap();
    assert_eq!(sequential, parallel);
}
