//! Physical-size filtering of cloud regions.
//!
//! A region's size is expressed as the radius of a circle with the same
//! area: `sqrt(area / π) * pixel_resolution_km`.

use cloud_common::Grid;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Connectivity;
use crate::labeling::find_regions;

/// Equivalent circular radius of a region of `area` pixels.
#[inline]
pub fn equivalent_radius_km(area: usize, pixel_resolution_km: f64) -> f64 {
    (area as f64 / std::f64::consts::PI).sqrt() * pixel_resolution_km
}

/// A measured region and whether it passed the radius criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDescriptor {
    pub label: u32,
    pub area: usize,
    /// Flat row-major pixel indices
    pub pixels: Vec<usize>,
    pub equivalent_radius_km: f64,
    pub retained: bool,
}

impl RegionDescriptor {
    /// Descriptor without its pixel set.
    pub fn summary(&self) -> RegionSummary {
        RegionSummary {
            label: self.label,
            area: self.area,
            equivalent_radius_km: self.equivalent_radius_km,
            retained: self.retained,
        }
    }
}

/// Pixel-free view of a [`RegionDescriptor`], cheap to keep after masking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub label: u32,
    pub area: usize,
    pub equivalent_radius_km: f64,
    pub retained: bool,
}

/// Final mask plus the descriptor of every region that was measured.
#[derive(Debug, Clone)]
pub struct RadiusFilterOutput {
    /// `1` for pixels of retained regions, `0` elsewhere.
    pub mask: Grid<u8>,
    pub regions: Vec<RegionDescriptor>,
}

impl RadiusFilterOutput {
    pub fn retained_count(&self) -> usize {
        self.regions.iter().filter(|r| r.retained).count()
    }
}

/// Keep only regions whose equivalent radius is at least `min_radius_km`.
///
/// Regions are kept or dropped whole. The input mask is consumed.
pub fn filter_by_radius(
    mask: Grid<bool>,
    pixel_resolution_km: f64,
    min_radius_km: f64,
    connectivity: Connectivity,
) -> RadiusFilterOutput {
    let (height, width) = mask.shape();
    let found = find_regions(&mask, connectivity, |&v| v);
    drop(mask);

    let mut final_mask = Grid::filled(height, width, 0u8);
    let cells = final_mask.as_mut_slice();

    let regions: Vec<RegionDescriptor> = found
        .into_iter()
        .map(|region| {
            let radius = equivalent_radius_km(region.area, pixel_resolution_km);
            let retained = radius >= min_radius_km;
            if retained {
                for &idx in &region.pixels {
                    cells[idx] = 1;
                }
            }
            RegionDescriptor {
                label: region.label,
                area: region.area,
                pixels: region.pixels,
                equivalent_radius_km: radius,
                retained,
            }
        })
        .collect();

    let output = RadiusFilterOutput {
        mask: final_mask,
        regions,
    };
    debug!(
        regions = output.regions.len(),
        retained = output.retained_count(),
        min_radius_km = min_radius_km,
        "Applied cluster radius filter"
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{block_mask, large_file, standard};

    fn block(area: usize) -> Grid<bool> {
        Grid::from_vec(80, 80, block_mask(80, 80, 0, 0, area, 60)).unwrap()
    }

    fn filter(area: usize) -> RadiusFilterOutput {
        filter_by_radius(
            block(area),
            standard::PIXEL_RESOLUTION_KM,
            standard::MIN_RADIUS_KM,
            Connectivity::Eight,
        )
    }

    #[test]
    fn test_equivalent_radius() {
        let r = equivalent_radius_km(2420, 4.0);
        assert!(r >= 111.0 && r < 111.1, "radius {}", r);
        assert!(equivalent_radius_km(2419, 4.0) < 111.0);
        assert_eq!(equivalent_radius_km(0, 4.0), 0.0);
    }

    #[test]
    fn test_area_boundary() {
        assert_eq!(filter(2399).mask.count_nonzero(), 0);
        assert_eq!(filter(standard::LARGEST_DROPPED_AREA).mask.count_nonzero(), 0);

        let kept = filter(standard::SMALLEST_KEPT_AREA);
        assert_eq!(kept.mask.count_nonzero(), 2420);
        assert_eq!(kept.retained_count(), 1);
        assert!(kept.regions[0].retained);
    }

    #[test]
    fn test_large_file_area_boundary() {
        let run = |area| {
            filter_by_radius(
                block(area),
                standard::PIXEL_RESOLUTION_KM,
                large_file::MIN_RADIUS_KM,
                Connectivity::Eight,
            )
        };

        let dropped = run(large_file::LARGEST_DROPPED_AREA);
        assert_eq!(dropped.mask.count_nonzero(), 0);
        assert!(dropped.regions[0].equivalent_radius_km < 50.0);

        let kept = run(large_file::SMALLEST_KEPT_AREA);
        assert_eq!(kept.mask.count_nonzero(), large_file::SMALLEST_KEPT_AREA);
        assert_eq!(kept.retained_count(), 1);
    }

    #[test]
    fn test_descriptors_cover_dropped_regions() {
        let out = filter(2399);
        assert_eq!(out.regions.len(), 1);
        assert!(!out.regions[0].retained);
        assert_eq!(out.regions[0].area, 2399);
        assert_eq!(out.regions[0].pixels.len(), 2399);

        let summary = out.regions[0].summary();
        assert_eq!(summary.area, 2399);
        assert!(!summary.retained);
    }

    #[test]
    fn test_regions_kept_or_dropped_whole() {
        let mut data = block_mask(80, 80, 0, 0, 2500, 50);
        // Small second region far away
        data[79 * 80 + 79] = true;
        let mask = Grid::from_vec(80, 80, data).unwrap();

        let out = filter_by_radius(mask, 4.0, 111.0, Connectivity::Eight);
        assert_eq!(out.mask.count_nonzero(), 2500);
        assert_eq!(out.mask.get(79, 79), Some(&0));
    }

    #[test]
    fn test_smaller_minimum_keeps_more() {
        let strict = filter_by_radius(block(600), 4.0, 111.0, Connectivity::Eight);
        let loose = filter_by_radius(block(600), 4.0, 50.0, Connectivity::Eight);
        assert_eq!(strict.mask.count_nonzero(), 0);
        assert_eq!(loose.mask.count_nonzero(), 600);
    }
}
