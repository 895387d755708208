//! Connected-component labeling of binary masks.
//!
//! Regions are discovered in row-major scan order, so labels are
//! deterministic for a given mask and connectivity. The flood fill uses an
//! explicit stack; recursion depth would otherwise grow with region size.

use cloud_common::Grid;

use crate::config::Connectivity;

/// One connected region of set pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// 1-based label, in discovery order.
    pub label: u32,
    /// Number of pixels
    pub area: usize,
    /// Flat row-major indices of the region's pixels, ascending.
    pub pixels: Vec<usize>,
}

/// A label grid (0 = background) with its regions.
#[derive(Debug, Clone)]
pub struct Labeling {
    pub labels: Grid<u32>,
    pub regions: Vec<Region>,
}

impl Labeling {
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

/// Find the connected regions of a mask without materializing a label grid.
pub fn find_regions<T, F>(mask: &Grid<T>, connectivity: Connectivity, is_set: F) -> Vec<Region>
where
    F: Fn(&T) -> bool,
{
    let (height, width) = mask.shape();
    let cells = mask.as_slice();
    let offsets = connectivity.offsets();

    let mut visited = vec![false; cells.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut regions = Vec::new();

    for start in 0..cells.len() {
        if visited[start] || !is_set(&cells[start]) {
            continue;
        }

        let label = regions.len() as u32 + 1;
        let mut pixels = Vec::new();
        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            pixels.push(idx);
            let row = (idx / width) as isize;
            let col = (idx % width) as isize;

            for &(dr, dc) in offsets {
                let r = row + dr;
                let c = col + dc;
                if r < 0 || c < 0 || r >= height as isize || c >= width as isize {
                    continue;
                }
                let n = r as usize * width + c as usize;
                if !visited[n] && is_set(&cells[n]) {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }

        pixels.sort_unstable();
        regions.push(Region {
            label,
            area: pixels.len(),
            pixels,
        });
    }

    regions
}

/// Label the connected regions of a boolean mask.
pub fn label_regions(mask: &Grid<bool>, connectivity: Connectivity) -> Labeling {
    let regions = find_regions(mask, connectivity, |&v| v);

    let mut labels = Grid::filled(mask.height(), mask.width(), 0u32);
    let cells = labels.as_mut_slice();
    for region in &regions {
        for &idx in &region.pixels {
            cells[idx] = region.label;
        }
    }

    Labeling { labels, regions }
}
