//! End-to-end detection over synthetic scenes.

use cloud_common::{Grid, FALLBACK_BOUNDS};
use cloud_detection::{
    detect, Connectivity, DetectionConfig, DetectionMode, DetectionOutput, DetectionParams,
};
use test_utils::{assert_approx_eq, SyntheticScene, COLD_BT};

fn run(scene: &SyntheticScene, params: &DetectionParams) -> DetectionOutput {
    let s = scene.clone();
    detect(
        Grid::from_vec(s.height, s.width, s.bt).unwrap(),
        Grid::from_vec(s.height, s.width, s.lat).unwrap(),
        Grid::from_vec(s.height, s.width, s.lon).unwrap(),
        params,
    )
    .unwrap()
}

/// A large cold disk plus a 600-pixel cold block in a 100x100 warm scene.
fn two_cluster_scene() -> SyntheticScene {
    SyntheticScene::tropical(100, 100)
        .paint_disk(45.0, 50.0, 30.0, COLD_BT)
        .paint_block(88, 0, 600, 60, COLD_BT)
}

#[test]
fn test_large_cluster_retained_small_dropped() {
    let scene = two_cluster_scene();
    let disk_only = SyntheticScene::tropical(100, 100).paint_disk(45.0, 50.0, 30.0, COLD_BT);
    let disk_pixels = disk_only.count_colder_than(218.0);

    let out = run(&scene, &DetectionParams::default());
    let stats = &out.statistics;

    assert_eq!(stats.total_pixels, 10_000);
    assert_eq!(stats.cloud_pixels, disk_pixels);
    assert_eq!(stats.cluster_count, 1);
    assert_approx_eq!(
        stats.coverage_percentage,
        disk_pixels as f64 / 100.0,
        1e-9
    );
    assert_eq!(out.regions.len(), 2);
    assert_eq!(out.regions.iter().filter(|r| r.retained).count(), 1);
    assert_eq!(stats.min_temperature, Some(COLD_BT as f64));
    assert_eq!(stats.max_temperature, Some(280.0));
    assert!(!stats.bounds_fallback);
    assert_eq!(stats.location, "15.0°N, 80.0°E");
}

#[test]
fn test_cluster_count_matches_retained_regions() {
    let scene = SyntheticScene::tropical(100, 200)
        .paint_disk(50.0, 50.0, 30.0, COLD_BT)
        .paint_disk(50.0, 150.0, 30.0, COLD_BT)
        .paint_block(88, 0, 600, 60, COLD_BT);

    let out = run(&scene, &DetectionParams::default());
    let retained: Vec<_> = out.regions.iter().filter(|r| r.retained).collect();

    assert_eq!(out.regions.len(), 3);
    assert_eq!(retained.len(), 2);
    assert_eq!(out.statistics.cluster_count, 2);
    assert_eq!(
        out.statistics.cloud_pixels,
        retained.iter().map(|r| r.area).sum::<usize>()
    );
    assert_eq!(out.final_mask.count_nonzero(), out.statistics.cloud_pixels);
}

#[test]
fn test_large_file_mode_keeps_smaller_clusters() {
    let config = DetectionConfig::default();
    let params = config.params_for_file_size(config.large_file.threshold_bytes + 1);
    assert_eq!(params.mode, DetectionMode::LargeFile);

    let out = run(&two_cluster_scene(), &params);
    assert_eq!(out.statistics.cluster_count, 2);
    assert_eq!(out.params.mode, DetectionMode::LargeFile);
}

#[test]
fn test_detection_is_deterministic() {
    let scene = two_cluster_scene();
    let params = DetectionParams::default();
    let first = run(&scene, &params);
    let second = run(&scene, &params);

    assert_eq!(first.final_mask, second.final_mask);
    assert_eq!(first.statistics, second.statistics);
    assert_eq!(first.regions, second.regions);
}

#[test]
fn test_invalid_geolocation_uses_fallback_bounds() {
    let scene = two_cluster_scene().invalidate_geolocation();
    let out = run(&scene, &DetectionParams::default());

    // No latitude means no pixel can be classified
    assert_eq!(out.statistics.cloud_pixels, 0);
    assert!(out.statistics.bounds_fallback);
    assert_eq!(out.statistics.bounds, FALLBACK_BOUNDS);
    assert_eq!(out.statistics.min_temperature, Some(COLD_BT as f64));
}

#[test]
fn test_invalid_bt_yields_empty_mask_and_no_temperatures() {
    let scene = SyntheticScene::tropical(20, 20).invalidate_bt();
    let out = run(&scene, &DetectionParams::default());
    assert_eq!(out.final_mask.count_nonzero(), 0);
    assert_eq!(out.statistics.min_temperature, None);
    assert_eq!(out.statistics.avg_temperature, None);
}

#[test]
fn test_southern_hemisphere_threshold() {
    // 220 K is cold enough south of the equator but not north of it
    let south = SyntheticScene::at_latitude(60, 60, -10.0).paint_disk(30.0, 30.0, 29.0, 220.0);
    let north = SyntheticScene::at_latitude(60, 60, 10.0).paint_disk(30.0, 30.0, 29.0, 220.0);

    assert_eq!(run(&south, &DetectionParams::default()).statistics.cluster_count, 1);
    assert_eq!(run(&north, &DetectionParams::default()).statistics.cluster_count, 0);
}

#[test]
fn test_final_mask_is_subset_of_candidates() {
    let scene = two_cluster_scene().paint_pixel(0, 99, COLD_BT);
    let out = run(&scene, &DetectionParams::default());
    for (m, bt) in out.final_mask.as_slice().iter().zip(scene.bt.iter()) {
        if *m == 1 {
            assert!(*bt < 218.0);
        }
    }
}

#[test]
fn test_connectivity_is_applied_consistently() {
    // Two 1300-pixel blocks touching at one corner: only one cluster of
    // sufficient size when corners connect.
    let scene = SyntheticScene::at_latitude(100, 100, 10.0)
        .paint_block(0, 0, 1300, 26, COLD_BT)
        .paint_block(50, 26, 1300, 26, COLD_BT);

    let mut params = DetectionParams::default();
    params.connectivity = Connectivity::Eight;
    assert_eq!(run(&scene, &params).statistics.cluster_count, 1);

    params.connectivity = Connectivity::Four;
    assert_eq!(run(&scene, &params).statistics.cluster_count, 0);
}

#[test]
fn test_partial_yaml_config_keeps_defaults() {
    let yaml = "min_radius_km: 80.0\nconnectivity: four\nlarge_file:\n  threshold_bytes: 1024\n";
    let config: DetectionConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.min_radius_km, 80.0);
    assert_eq!(config.connectivity, Connectivity::Four);
    assert_eq!(config.large_file.threshold_bytes, 1024);
    assert_eq!(config.large_file.min_size_pixels, 200);
    assert_eq!(config.pixel_resolution_km, 4.0);
    assert_eq!(config.thresholds.north_threshold_k, 218.0);
}
