//! Summary statistics of a detection run.

use std::fmt;

use cloud_common::{GeoBounds, Grid, FALLBACK_BOUNDS};
use serde::{Deserialize, Serialize};

use crate::error::{DetectionError, DetectionResult, Stage};

/// Qualitative sky condition derived from cloud coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    #[serde(rename = "Clear Sky")]
    ClearSky,
    #[serde(rename = "Partly Cloudy")]
    PartlyCloudy,
    #[serde(rename = "Mostly Cloudy")]
    MostlyCloudy,
    #[serde(rename = "Overcast")]
    Overcast,
}

impl WeatherCondition {
    pub fn from_coverage(coverage_percentage: f64) -> Self {
        if coverage_percentage < 20.0 {
            WeatherCondition::ClearSky
        } else if coverage_percentage < 50.0 {
            WeatherCondition::PartlyCloudy
        } else if coverage_percentage < 80.0 {
            WeatherCondition::MostlyCloudy
        } else {
            WeatherCondition::Overcast
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::ClearSky => "Clear Sky",
            WeatherCondition::PartlyCloudy => "Partly Cloudy",
            WeatherCondition::MostlyCloudy => "Mostly Cloudy",
            WeatherCondition::Overcast => "Overcast",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Clear Sky" => Some(WeatherCondition::ClearSky),
            "Partly Cloudy" => Some(WeatherCondition::PartlyCloudy),
            "Mostly Cloudy" => Some(WeatherCondition::MostlyCloudy),
            "Overcast" => Some(WeatherCondition::Overcast),
            _ => None,
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate results of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub total_pixels: usize,
    pub cloud_pixels: usize,
    pub coverage_percentage: f64,
    pub cluster_count: usize,
    /// Kelvin, over valid BT samples; `None` when there are none.
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub avg_temperature: Option<f64>,
    pub bounds: GeoBounds,
    /// True when `bounds` is the fixed fallback region.
    pub bounds_fallback: bool,
    pub location: String,
    pub weather: WeatherCondition,
}

/// Min, max and mean of the non-`NaN` values.
fn temperature_range(bt: &[f32]) -> Option<(f64, f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0f64;
    let mut count = 0usize;

    for &v in bt.iter().filter(|v| !v.is_nan()) {
        let v = v as f64;
        min = min.min(v);
        max = max.max(v);
        sum += v;
        count += 1;
    }

    if count == 0 {
        None
    } else {
        Some((min, max, sum / count as f64))
    }
}

/// Compute the statistics record for a final mask.
///
/// `bounds` is the box of valid geolocation samples, computed before the
/// geolocation grids were released; `None` selects the fallback region.
/// `cluster_count` is the number of regions the radius filter retained, so
/// the final mask is not labeled again.
pub fn aggregate(
    final_mask: &Grid<u8>,
    bt: &Grid<f32>,
    bounds: Option<GeoBounds>,
    cluster_count: usize,
) -> DetectionResult<StatisticsRecord> {
    if !final_mask.same_shape(bt) {
        return Err(DetectionError::shape_mismatch(
            Stage::Aggregate,
            bt.shape(),
            final_mask.shape(),
        ));
    }

    let total_pixels = final_mask.len();
    let cloud_pixels = final_mask.count_nonzero();
    let coverage_percentage = if total_pixels == 0 {
        0.0
    } else {
        cloud_pixels as f64 / total_pixels as f64 * 100.0
    };

    let temps = temperature_range(bt.as_slice());

    let (bounds, bounds_fallback) = match bounds {
        Some(b) => (b, false),
        None => (FALLBACK_BOUNDS, true),
    };

    Ok(StatisticsRecord {
        total_pixels,
        cloud_pixels,
        coverage_percentage,
        cluster_count,
        min_temperature: temps.map(|t| t.0),
        max_temperature: temps.map(|t| t.1),
        avg_temperature: temps.map(|t| t.2),
        location: bounds.location_label(),
        bounds,
        bounds_fallback,
        weather: WeatherCondition::from_coverage(coverage_percentage),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_all_cloud_coverage() {
        let mask = Grid::filled(4, 5, 1u8);
        let bt = Grid::filled(4, 5, 200.0f32);
        let stats = aggregate(&mask, &bt, None, 1).unwrap();
        assert_eq!(stats.coverage_percentage, 100.0);
        assert_eq!(stats.cluster_count, 1);
        assert_eq!(stats.weather, WeatherCondition::Overcast);
    }

    #[test]
    fn test_all_clear_coverage() {
        let mask = Grid::filled(4, 5, 0u8);
        let bt = Grid::filled(4, 5, 290.0f32);
        let stats = aggregate(&mask, &bt, None, 0).unwrap();
        assert_eq!(stats.coverage_percentage, 0.0);
        assert_eq!(stats.cluster_count, 0);
        assert_eq!(stats.weather, WeatherCondition::ClearSky);
    }

    #[test]
    fn test_empty_grid_has_zero_coverage() {
        let mask = Grid::filled(0, 0, 0u8);
        let bt = Grid::filled(0, 0, 0.0f32);
        let stats = aggregate(&mask, &bt, None, 0).unwrap();
        assert_eq!(stats.total_pixels, 0);
        assert_eq!(stats.coverage_percentage, 0.0);
        assert_eq!(stats.min_temperature, None);
    }

    #[test]
    fn test_temperatures_skip_nan() {
        let mask = Grid::filled(1, 4, 0u8);
        let bt = Grid::from_vec(1, 4, vec![200.0f32, f32::NAN, 300.0, 250.0]).unwrap();
        let stats = aggregate(&mask, &bt, None, 0).unwrap();
        assert_eq!(stats.min_temperature, Some(200.0));
        assert_eq!(stats.max_temperature, Some(300.0));
        assert_approx_eq!(stats.avg_temperature.unwrap(), 250.0, 1e-9);
    }

    #[test]
    fn test_all_nan_temperature_is_none() {
        let mask = Grid::filled(2, 2, 0u8);
        let bt = Grid::filled(2, 2, f32::NAN);
        let stats = aggregate(&mask, &bt, None, 0).unwrap();
        assert_eq!(stats.min_temperature, None);
        assert_eq!(stats.max_temperature, None);
        assert_eq!(stats.avg_temperature, None);
    }

    #[test]
    fn test_fallback_bounds() {
        let mask = Grid::filled(2, 2, 0u8);
        let bt = Grid::filled(2, 2, 280.0f32);
        let stats = aggregate(&mask, &bt, None, 0).unwrap();
        assert!(stats.bounds_fallback);
        assert_eq!(stats.bounds, FALLBACK_BOUNDS);
        assert_eq!(stats.location, "15.0°N, 80.0°E");
    }

    #[test]
    fn test_measured_bounds() {
        let mask = Grid::filled(2, 2, 0u8);
        let bt = Grid::filled(2, 2, 280.0f32);
        let bounds = GeoBounds::new(60.0, 70.0, -20.0, -10.0);
        let stats = aggregate(&mask, &bt, Some(bounds), 0).unwrap();
        assert!(!stats.bounds_fallback);
        assert_eq!(stats.location, "15.0°S, 65.0°E");
    }

    #[test]
    fn test_cluster_count_is_taken_as_given() {
        let mask = Grid::from_vec(2, 2, vec![1u8, 0, 0, 1]).unwrap();
        let bt = Grid::filled(2, 2, 200.0f32);
        let stats = aggregate(&mask, &bt, None, 2).unwrap();
        assert_eq!(stats.cluster_count, 2);
        assert_eq!(stats.cloud_pixels, 2);
        assert_eq!(stats.coverage_percentage, 50.0);
        assert_eq!(stats.weather, WeatherCondition::MostlyCloudy);
    }

    #[test]
    fn test_weather_labels() {
        assert_eq!(WeatherCondition::from_coverage(19.9), WeatherCondition::ClearSky);
        assert_eq!(WeatherCondition::from_coverage(20.0), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_coverage(49.9), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_coverage(50.0), WeatherCondition::MostlyCloudy);
        assert_eq!(WeatherCondition::from_coverage(80.0), WeatherCondition::Overcast);
        assert_eq!(WeatherCondition::parse("Overcast"), Some(WeatherCondition::Overcast));
    }

    #[test]
    fn test_shape_mismatch() {
        let mask = Grid::filled(2, 2, 0u8);
        let bt = Grid::filled(3, 2, 280.0f32);
        let err = aggregate(&mask, &bt, None, 0).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Aggregate));
    }
}
