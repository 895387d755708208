//! Latitude-dependent brightness temperature thresholding.

use cloud_common::Grid;
use rayon::prelude::*;

use crate::config::ThresholdConfig;
use crate::error::{DetectionError, DetectionResult, Stage};

/// Classify every pixel as a cold-cloud candidate or not.
///
/// Takes latitude by value: it is not needed after this stage and is dropped
/// on return. Pixels with `NaN` BT or latitude, or outside both latitude
/// bands, are never candidates.
pub fn classify(
    bt: &Grid<f32>,
    lat: Grid<f32>,
    thresholds: &ThresholdConfig,
) -> DetectionResult<Grid<bool>> {
    if !bt.same_shape(&lat) {
        return Err(DetectionError::shape_mismatch(
            Stage::Classify,
            bt.shape(),
            lat.shape(),
        ));
    }

    let (height, width) = bt.shape();
    let candidates: Vec<bool> = bt
        .as_slice()
        .par_iter()
        .zip(lat.as_slice().par_iter())
        .map(|(&b, &l)| thresholds.is_candidate(b, l))
        .collect();

    Ok(Grid::from_vec(height, width, candidates)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_one(bt: f32, lat: f32) -> bool {
        let bt = Grid::filled(1, 1, bt);
        let lat = Grid::filled(1, 1, lat);
        let mask = classify(&bt, lat, &ThresholdConfig::default()).unwrap();
        mask.as_slice()[0]
    }

    #[test]
    fn test_northern_band() {
        assert!(classify_one(217.0, 10.0));
        assert!(!classify_one(219.0, 10.0));
        assert!(!classify_one(218.0, 10.0));
    }

    #[test]
    fn test_southern_band() {
        assert!(classify_one(220.0, -10.0));
        assert!(!classify_one(222.0, -10.0));
        assert!(!classify_one(221.0, -10.0));
    }

    #[test]
    fn test_equator_uses_northern_threshold() {
        assert!(!classify_one(219.0, 0.0));
        assert!(classify_one(219.0, -0.1));
    }

    #[test]
    fn test_outside_tropics_never_candidate() {
        assert!(!classify_one(150.0, 31.0));
        assert!(!classify_one(150.0, -31.0));
    }

    #[test]
    fn test_invalid_samples_never_candidate() {
        assert!(!classify_one(f32::NAN, 10.0));
        assert!(!classify_one(200.0, f32::NAN));
    }

    #[test]
    fn test_shape_mismatch() {
        let bt = Grid::filled(2, 2, 200.0f32);
        let lat = Grid::filled(2, 3, 10.0f32);
        let err = classify(&bt, lat, &ThresholdConfig::default()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Classify));
    }
}
