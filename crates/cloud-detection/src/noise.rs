//! Removal of noise-sized candidate regions.

use cloud_common::Grid;
use tracing::debug;

use crate::config::Connectivity;
use crate::labeling::find_regions;

/// Clear every connected region with fewer than `min_size_pixels` pixels.
///
/// Regions of exactly `min_size_pixels` survive. The mask is consumed and
/// updated in place.
pub fn remove_small_regions(
    mut mask: Grid<bool>,
    min_size_pixels: usize,
    connectivity: Connectivity,
) -> Grid<bool> {
    let regions = find_regions(&mask, connectivity, |&v| v);
    let total = regions.len();

    let cells = mask.as_mut_slice();
    let mut removed = 0usize;
    for region in regions.iter().filter(|r| r.area < min_size_pixels) {
        for &idx in &region.pixels {
            cells[idx] = false;
        }
        removed += 1;
    }

    debug!(
        regions = total,
        removed = removed,
        min_size_pixels = min_size_pixels,
        "Removed small candidate regions"
    );

    mask
}
