//! Tests for GeoBounds labelling and extents.

use cloud_common::bbox::{GeoBounds, FALLBACK_BOUNDS};

// ============================================================================
// location_label tests
// ============================================================================

#[test]
fn test_label_southern_western() {
    let bounds = GeoBounds::new(-100.0, -60.0, -30.0, -10.0);
    assert_eq!(bounds.location_label(), "20.0°S, 80.0°W");
}

#[test]
fn test_label_equator_is_south() {
    // A center exactly on the equator or prime meridian is not "positive".
    let bounds = GeoBounds::new(-10.0, 10.0, -5.0, 5.0);
    assert_eq!(bounds.location_label(), "0.0°S, 0.0°W");
}

#[test]
fn test_label_rounds_to_one_decimal() {
    let bounds = GeoBounds::new(72.33, 88.11, 4.26, 25.0);
    assert_eq!(bounds.location_label(), "14.6°N, 80.2°E");
}

// ============================================================================
// extent tests
// ============================================================================

#[test]
fn test_fallback_extent_order() {
    assert_eq!(FALLBACK_BOUNDS.extent(), [70.0, 90.0, 5.0, 25.0]);
}

#[test]
fn test_center() {
    let bounds = GeoBounds::new(60.0, 100.0, -10.0, 30.0);
    assert_eq!(bounds.center(), (10.0, 80.0));
}
