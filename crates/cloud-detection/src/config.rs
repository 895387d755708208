//! Detection parameters and the large-file policy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pixel adjacency used when grouping mask pixels into regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Edge neighbours only
    Four,
    /// Edge and corner neighbours
    #[default]
    Eight,
}

impl Connectivity {
    /// Parse connectivity from string ("4"/"four", "8"/"eight").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "4" | "four" => Some(Connectivity::Four),
            "8" | "eight" => Some(Connectivity::Eight),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Connectivity::Four => "four",
            Connectivity::Eight => "eight",
        }
    }

    /// `(row, col)` offsets of the neighbours of a pixel.
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        const FOUR: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
        const EIGHT: [(isize, isize); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];
        match self {
            Connectivity::Four => &FOUR,
            Connectivity::Eight => &EIGHT,
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Latitude-banded brightness temperature thresholds.
///
/// The northern band is inclusive at both ends. The southern band excludes
/// its upper limit so the equator belongs to the northern band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub north_min_lat: f32,
    pub north_max_lat: f32,
    /// Kelvin
    pub north_threshold_k: f32,
    pub south_min_lat: f32,
    pub south_max_lat: f32,
    /// Kelvin
    pub south_threshold_k: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            north_min_lat: 0.0,
            north_max_lat: 30.0,
            north_threshold_k: 218.0,
            south_min_lat: -30.0,
            south_max_lat: 0.0,
            south_threshold_k: 221.0,
        }
    }
}

impl ThresholdConfig {
    /// BT threshold that applies at `lat`, or `None` outside both bands.
    #[inline]
    pub fn threshold_for(&self, lat: f32) -> Option<f32> {
        if lat >= self.north_min_lat && lat <= self.north_max_lat {
            Some(self.north_threshold_k)
        } else if lat >= self.south_min_lat && lat < self.south_max_lat {
            Some(self.south_threshold_k)
        } else {
            // NaN lands here too
            None
        }
    }

    /// Whether a pixel is a cold-cloud candidate.
    #[inline]
    pub fn is_candidate(&self, bt: f32, lat: f32) -> bool {
        match self.threshold_for(lat) {
            Some(threshold) => bt < threshold,
            None => false,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let finite = [
            self.north_min_lat,
            self.north_max_lat,
            self.north_threshold_k,
            self.south_min_lat,
            self.south_max_lat,
            self.south_threshold_k,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err("threshold values must be finite".to_string());
        }
        if self.north_min_lat > self.north_max_lat {
            return Err("north_min_lat must be <= north_max_lat".to_string());
        }
        if self.south_min_lat >= self.south_max_lat {
            return Err("south_min_lat must be < south_max_lat".to_string());
        }
        if self.north_threshold_k <= 0.0 || self.south_threshold_k <= 0.0 {
            return Err("thresholds must be positive Kelvin values".to_string());
        }
        Ok(())
    }
}

/// Parameter substitutions for oversized input files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LargeFilePolicy {
    /// Files strictly larger than this use the substituted parameters.
    pub threshold_bytes: u64,
    pub min_radius_km: f64,
    pub min_size_pixels: usize,
}

impl Default for LargeFilePolicy {
    fn default() -> Self {
        Self {
            threshold_bytes: 50 * 1024 * 1024,
            min_radius_km: 50.0,
            min_size_pixels: 200,
        }
    }
}

/// Which parameter set a run used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    #[default]
    Standard,
    LargeFile,
}

impl DetectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMode::Standard => "standard",
            DetectionMode::LargeFile => "large_file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "standard" => Some(DetectionMode::Standard),
            "large_file" => Some(DetectionMode::LargeFile),
            _ => None,
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for cluster detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Ground size of one pixel edge.
    pub pixel_resolution_km: f64,

    /// Regions with a smaller equivalent radius are dropped.
    pub min_radius_km: f64,

    /// Regions with fewer pixels are treated as noise.
    pub min_size_pixels: usize,

    pub connectivity: Connectivity,

    pub thresholds: ThresholdConfig,

    pub large_file: LargeFilePolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            pixel_resolution_km: 4.0,
            min_radius_km: 111.0,
            min_size_pixels: 100,
            connectivity: Connectivity::Eight,
            thresholds: ThresholdConfig::default(),
            large_file: LargeFilePolicy::default(),
        }
    }
}

impl DetectionConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `TCC_*` environment overrides to this configuration.
    ///
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = parsed("TCC_PIXEL_RESOLUTION_KM") {
            self.pixel_resolution_km = v;
        }
        if let Some(v) = parsed("TCC_MIN_RADIUS_KM") {
            self.min_radius_km = v;
        }
        if let Some(v) = parsed("TCC_MIN_SIZE_PIXELS") {
            self.min_size_pixels = v;
        }
        if let Some(v) = std::env::var("TCC_CONNECTIVITY")
            .ok()
            .and_then(|v| Connectivity::parse(&v))
        {
            self.connectivity = v;
        }
        if let Some(v) = parsed("TCC_NORTH_THRESHOLD_K") {
            self.thresholds.north_threshold_k = v;
        }
        if let Some(v) = parsed("TCC_SOUTH_THRESHOLD_K") {
            self.thresholds.south_threshold_k = v;
        }
        if let Some(v) = parsed("TCC_LARGE_FILE_THRESHOLD_BYTES") {
            self.large_file.threshold_bytes = v;
        }
        if let Some(v) = parsed("TCC_LARGE_FILE_MIN_RADIUS_KM") {
            self.large_file.min_radius_km = v;
        }
        if let Some(v) = parsed("TCC_LARGE_FILE_MIN_SIZE_PIXELS") {
            self.large_file.min_size_pixels = v;
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.pixel_resolution_km.is_finite() && self.pixel_resolution_km > 0.0) {
            return Err("pixel_resolution_km must be > 0".to_string());
        }
        if !(self.min_radius_km.is_finite() && self.min_radius_km >= 0.0) {
            return Err("min_radius_km must be >= 0".to_string());
        }
        if !(self.large_file.min_radius_km.is_finite() && self.large_file.min_radius_km >= 0.0) {
            return Err("large_file.min_radius_km must be >= 0".to_string());
        }
        self.thresholds.validate()
    }

    /// Resolve the parameters for an input file of `file_size` bytes.
    pub fn params_for_file_size(&self, file_size: u64) -> DetectionParams {
        if file_size > self.large_file.threshold_bytes {
            DetectionParams {
                mode: DetectionMode::LargeFile,
                pixel_resolution_km: self.pixel_resolution_km,
                min_radius_km: self.large_file.min_radius_km,
                min_size_pixels: self.large_file.min_size_pixels,
                connectivity: self.connectivity,
                thresholds: self.thresholds.clone(),
            }
        } else {
            self.standard_params()
        }
    }

    /// Parameters of the standard mode.
    pub fn standard_params(&self) -> DetectionParams {
        DetectionParams {
            mode: DetectionMode::Standard,
            pixel_resolution_km: self.pixel_resolution_km,
            min_radius_km: self.min_radius_km,
            min_size_pixels: self.min_size_pixels,
            connectivity: self.connectivity,
            thresholds: self.thresholds.clone(),
        }
    }
}

/// Fully resolved parameters for one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    pub mode: DetectionMode,
    pub pixel_resolution_km: f64,
    pub min_radius_km: f64,
    pub min_size_pixels: usize,
    pub connectivity: Connectivity,
    pub thresholds: ThresholdConfig,
}

impl Default for DetectionParams {
    fn default() -> Self {
        DetectionConfig::default().standard_params()
    }
}

impl DetectionParams {
    /// Checked by [`crate::detect`] before any stage runs.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.pixel_resolution_km.is_finite() && self.pixel_resolution_km > 0.0) {
            return Err(format!(
                "pixel_resolution_km must be > 0, got {}",
                self.pixel_resolution_km
            ));
        }
        if !(self.min_radius_km.is_finite() && self.min_radius_km >= 0.0) {
            return Err(format!("min_radius_km must be >= 0, got {}", self.min_radius_km));
        }
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{large_file, standard};

    #[test]
    fn test_default_config() {
        let config = DetectionConfig::default();
        assert_eq!(config.pixel_resolution_km, standard::PIXEL_RESOLUTION_KM);
        assert_eq!(config.min_radius_km, standard::MIN_RADIUS_KM);
        assert_eq!(config.min_size_pixels, standard::MIN_SIZE_PIXELS);
        assert_eq!(config.connectivity, Connectivity::Eight);
        assert_eq!(config.large_file.threshold_bytes, large_file::THRESHOLD_BYTES);
        assert_eq!(config.large_file.threshold_bytes, 52_428_800);
        assert_eq!(config.large_file.min_radius_km, large_file::MIN_RADIUS_KM);
        assert_eq!(config.large_file.min_size_pixels, large_file::MIN_SIZE_PIXELS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = DetectionConfig::default();
        config.pixel_resolution_km = 0.0;
        assert!(config.validate().is_err());

        config = DetectionConfig::default();
        config.min_radius_km = f64::NAN;
        assert!(config.validate().is_err());

        config = DetectionConfig::default();
        config.thresholds.south_min_lat = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_large_file_switch_is_strict() {
        let config = DetectionConfig::default();
        let at = config.params_for_file_size(config.large_file.threshold_bytes);
        assert_eq!(at.mode, DetectionMode::Standard);
        assert_eq!(at.min_radius_km, 111.0);
        assert_eq!(at.min_size_pixels, 100);

        let above = config.params_for_file_size(config.large_file.threshold_bytes + 1);
        assert_eq!(above.mode, DetectionMode::LargeFile);
        assert_eq!(above.min_radius_km, 50.0);
        assert_eq!(above.min_size_pixels, 200);
        assert_eq!(above.pixel_resolution_km, 4.0);
    }

    #[test]
    fn test_params_validation() {
        assert!(DetectionParams::default().validate().is_ok());

        let mut params = DetectionParams::default();
        params.min_radius_km = -1.0;
        assert!(params.validate().is_err());

        params = DetectionConfig::default().params_for_file_size(u64::MAX);
        assert!(params.validate().is_ok());
        params.thresholds.north_threshold_k = f32::INFINITY;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_threshold_bands() {
        let t = ThresholdConfig::default();
        assert_eq!(t.threshold_for(0.0), Some(218.0));
        assert_eq!(t.threshold_for(30.0), Some(218.0));
        assert_eq!(t.threshold_for(-0.01), Some(221.0));
        assert_eq!(t.threshold_for(-30.0), Some(221.0));
        assert_eq!(t.threshold_for(30.5), None);
        assert_eq!(t.threshold_for(-30.5), None);
        assert_eq!(t.threshold_for(f32::NAN), None);
    }

    #[test]
    fn test_connectivity_parse() {
        assert_eq!(Connectivity::parse("4"), Some(Connectivity::Four));
        assert_eq!(Connectivity::parse("Eight"), Some(Connectivity::Eight));
        assert_eq!(Connectivity::parse("six"), None);
        assert_eq!(Connectivity::Four.offsets().len(), 4);
        assert_eq!(Connectivity::Eight.offsets().len(), 8);
    }

    #[test]
    fn test_mode_strings() {
        for mode in [DetectionMode::Standard, DetectionMode::LargeFile] {
            assert_eq!(DetectionMode::parse(mode.as_str()), Some(mode));
        }
    }
}
