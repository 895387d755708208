//! The staged detection pipeline.
//!
//! Stages run in a fixed order: bounds, classify, noise filter, radius
//! filter, aggregate. Each stage consumes the grid it replaces so
//! intermediates are released at stage boundaries; only the BT grid is
//! carried through to the output for persistence.

use std::time::{Duration, Instant};

use cloud_common::{GeoBounds, Grid};
use tracing::{debug, info};

use crate::config::DetectionParams;
use crate::error::{DetectionError, DetectionResult, Stage};
use crate::noise::remove_small_regions;
use crate::radius::{filter_by_radius, RadiusFilterOutput, RegionSummary};
use crate::statistics::{aggregate, StatisticsRecord};
use crate::threshold::classify;

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct DetectionOutput {
    /// `1` for pixels of retained clusters.
    pub final_mask: Grid<u8>,
    /// The input BT grid, returned for persistence.
    pub bt: Grid<f32>,
    pub statistics: StatisticsRecord,
    pub regions: Vec<RegionSummary>,
    pub params: DetectionParams,
    /// Wall time of each stage, in execution order.
    pub stage_timings: Vec<(Stage, Duration)>,
}

/// Run detection over one decoded scene.
pub fn detect(
    bt: Grid<f32>,
    lat: Grid<f32>,
    lon: Grid<f32>,
    params: &DetectionParams,
) -> DetectionResult<DetectionOutput> {
    params.validate().map_err(DetectionError::InvalidParameters)?;
    let mut timings = Vec::with_capacity(5);

    // Bounds: reduce longitude to a box, then release it
    let start = Instant::now();
    if !lat.same_shape(&lon) {
        return Err(DetectionError::shape_mismatch(
            Stage::Bounds,
            lat.shape(),
            lon.shape(),
        ));
    }
    let bounds = GeoBounds::from_samples(lat.as_slice(), lon.as_slice());
    drop(lon);
    timings.push((Stage::Bounds, start.elapsed()));

    let start = Instant::now();
    let candidates = classify(&bt, lat, &params.thresholds)?;
    timings.push((Stage::Classify, start.elapsed()));
    debug!(candidates = candidates.count_true(), "Classified candidate pixels");

    let start = Instant::now();
    let cleaned = remove_small_regions(candidates, params.min_size_pixels, params.connectivity);
    timings.push((Stage::NoiseFilter, start.elapsed()));

    let start = Instant::now();
    let filtered = filter_by_radius(
        cleaned,
        params.pixel_resolution_km,
        params.min_radius_km,
        params.connectivity,
    );
    timings.push((Stage::RadiusFilter, start.elapsed()));

    // Pixel sets are released here, before aggregation allocates anything
    let RadiusFilterOutput {
        mask: final_mask,
        regions,
    } = filtered;
    let regions: Vec<RegionSummary> = regions.into_iter().map(|r| r.summary()).collect();
    let cluster_count = regions.iter().filter(|r| r.retained).count();

    let start = Instant::now();
    let statistics = aggregate(&final_mask, &bt, bounds, cluster_count)?;
    timings.push((Stage::Aggregate, start.elapsed()));

    info!(
        mode = %params.mode,
        cloud_pixels = statistics.cloud_pixels,
        coverage = statistics.coverage_percentage,
        clusters = statistics.cluster_count,
        bounds_fallback = statistics.bounds_fallback,
        "Detection complete"
    );

    Ok(DetectionOutput {
        final_mask,
        bt,
        statistics,
        regions,
        params: params.clone(),
        stage_timings: timings,
    })
}
