//! Common test fixtures for cloud detection tests.
//!
//! Pixel-area boundaries for the cluster radius filter, derived from
//! `radius = sqrt(area / π) * pixel_resolution_km`.

/// Standard mode: 4 km pixels, 111 km minimum radius.
pub mod standard {
    pub const PIXEL_RESOLUTION_KM: f64 = 4.0;
    pub const MIN_RADIUS_KM: f64 = 111.0;
    pub const MIN_SIZE_PIXELS: usize = 100;

    /// Largest area whose equivalent radius is still below 111 km.
    pub const LARGEST_DROPPED_AREA: usize = 2419;

    /// Smallest area whose equivalent radius reaches 111 km.
    pub const SMALLEST_KEPT_AREA: usize = 2420;
}

/// Large-file mode: 4 km pixels, 50 km minimum radius.
pub mod large_file {
    pub const MIN_RADIUS_KM: f64 = 50.0;
    pub const MIN_SIZE_PIXELS: usize = 200;

    /// `π * 12.5² ≈ 490.9`
    pub const LARGEST_DROPPED_AREA: usize = 490;
    pub const SMALLEST_KEPT_AREA: usize = 491;

    /// 50 MiB
    pub const THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radius(area: usize, resolution: f64) -> f64 {
        (area as f64 / std::f64::consts::PI).sqrt() * resolution
    }

    #[test]
    fn test_standard_boundary() {
        let res = standard::PIXEL_RESOLUTION_KM;
        assert!(radius(standard::LARGEST_DROPPED_AREA, res) < standard::MIN_RADIUS_KM);
        assert!(radius(standard::SMALLEST_KEPT_AREA, res) >= standard::MIN_RADIUS_KM);
    }

    #[test]
    fn test_large_file_boundary() {
        let res = standard::PIXEL_RESOLUTION_KM;
        assert!(radius(large_file::LARGEST_DROPPED_AREA, res) < large_file::MIN_RADIUS_KM);
        assert!(radius(large_file::SMALLEST_KEPT_AREA, res) >= large_file::MIN_RADIUS_KM);
    }
}
