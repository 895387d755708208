//! Geographic bounding boxes for processed scenes.

use serde::{Deserialize, Serialize};

/// Region used when a scene has no valid geolocation samples
/// (Indian subcontinent, 70-90°E, 5-25°N).
pub const FALLBACK_BOUNDS: GeoBounds = GeoBounds {
    min_lon: 70.0,
    max_lon: 90.0,
    min_lat: 5.0,
    max_lat: 25.0,
};

/// A latitude/longitude bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    pub fn new(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        }
    }

    /// Bounds of the valid (non-NaN) samples of two geolocation arrays.
    ///
    /// Returns `None` when either array has no valid sample.
    pub fn from_samples(lat: &[f32], lon: &[f32]) -> Option<Self> {
        let (min_lat, max_lat) = finite_range(lat)?;
        let (min_lon, max_lon) = finite_range(lon)?;
        Some(Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        })
    }

    /// Center point as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Human-readable hemisphere-tagged label of the box center,
    /// e.g. `"15.0°N, 80.0°E"`.
    pub fn location_label(&self) -> String {
        let (lat, lon) = self.center();
        let lat_dir = if lat > 0.0 { "N" } else { "S" };
        let lon_dir = if lon > 0.0 { "E" } else { "W" };
        format!(
            "{:.1}°{}, {:.1}°{}",
            lat.abs(),
            lat_dir,
            lon.abs(),
            lon_dir
        )
    }

    /// Plot extent in `[left, right, bottom, top]` order.
    pub fn extent(&self) -> [f64; 4] {
        [self.min_lon, self.max_lon, self.min_lat, self.max_lat]
    }
}

/// Min and max over the non-NaN values of a slice.
fn finite_range(values: &[f32]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, &v| {
            let v = v as f64;
            match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples_skips_nan() {
        let lat = [f32::NAN, 10.0, -5.0, 20.0];
        let lon = [75.0, f32::NAN, 85.0, 80.0];
        let bounds = GeoBounds::from_samples(&lat, &lon).unwrap();
        assert_eq!(bounds, GeoBounds::new(75.0, 85.0, -5.0, 20.0));
    }

    #[test]
    fn test_from_samples_all_invalid() {
        let lat = [f32::NAN; 4];
        let lon = [80.0; 4];
        assert!(GeoBounds::from_samples(&lat, &lon).is_none());
        assert!(GeoBounds::from_samples(&[], &[]).is_none());
    }

    #[test]
    fn test_fallback_label() {
        assert_eq!(FALLBACK_BOUNDS.location_label(), "15.0°N, 80.0°E");
    }
}
