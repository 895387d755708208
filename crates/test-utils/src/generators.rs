//! Synthetic satellite scenes for detection and job tests.
//!
//! Scenes are plain row-major `Vec<f32>` buffers so this crate does not
//! depend on the workspace's grid types.

/// Brightness temperature of clear, warm background pixels (Kelvin).
pub const WARM_BT: f32 = 280.0;

/// Brightness temperature of deep convective cloud tops (Kelvin).
pub const COLD_BT: f32 = 200.0;

/// A synthetic BT + geolocation scene.
#[derive(Debug, Clone)]
pub struct SyntheticScene {
    pub height: usize,
    pub width: usize,
    pub bt: Vec<f32>,
    pub lat: Vec<f32>,
    pub lon: Vec<f32>,
}

impl SyntheticScene {
    /// A warm scene with latitude decreasing linearly from `lat_top` (row 0)
    /// to `lat_bottom` (last row) and longitude spanning 70-90°E.
    pub fn with_latitudes(height: usize, width: usize, lat_top: f32, lat_bottom: f32) -> Self {
        let mut lat = Vec::with_capacity(height * width);
        let mut lon = Vec::with_capacity(height * width);
        for row in 0..height {
            let t = if height > 1 {
                row as f32 / (height - 1) as f32
            } else {
                0.0
            };
            let row_lat = lat_top + (lat_bottom - lat_top) * t;
            for col in 0..width {
                let s = if width > 1 {
                    col as f32 / (width - 1) as f32
                } else {
                    0.0
                };
                lat.push(row_lat);
                lon.push(70.0 + 20.0 * s);
            }
        }
        Self {
            height,
            width,
            bt: vec![WARM_BT; height * width],
            lat,
            lon,
        }
    }

    /// A warm scene inside the northern tropical band (25°N to 5°N).
    pub fn tropical(height: usize, width: usize) -> Self {
        Self::with_latitudes(height, width, 25.0, 5.0)
    }

    /// A warm scene where every pixel has the same latitude.
    pub fn at_latitude(height: usize, width: usize, lat: f32) -> Self {
        Self::with_latitudes(height, width, lat, lat)
    }

    /// Paint exactly `area` pixels with `bt`, as a compact block starting at
    /// `(row, col)` filled row by row, `block_width` pixels per row.
    ///
    /// The block is 4-connected as long as it fits inside the scene.
    pub fn paint_block(
        mut self,
        row: usize,
        col: usize,
        area: usize,
        block_width: usize,
        bt: f32,
    ) -> Self {
        for (r, c) in block_cells(row, col, area, block_width) {
            assert!(
                r < self.height && c < self.width,
                "block pixel ({}, {}) outside {}x{} scene",
                r,
                c,
                self.height,
                self.width
            );
            self.bt[r * self.width + c] = bt;
        }
        self
    }

    /// Paint every pixel whose center lies within `radius` of the given center.
    pub fn paint_disk(mut self, center_row: f64, center_col: f64, radius: f64, bt: f32) -> Self {
        for row in 0..self.height {
            for col in 0..self.width {
                let dr = row as f64 - center_row;
                let dc = col as f64 - center_col;
                if dr * dr + dc * dc <= radius * radius {
                    self.bt[row * self.width + col] = bt;
                }
            }
        }
        self
    }

    /// Set a single pixel's brightness temperature.
    pub fn paint_pixel(mut self, row: usize, col: usize, bt: f32) -> Self {
        self.bt[row * self.width + col] = bt;
        self
    }

    /// Mark every geolocation sample invalid.
    pub fn invalidate_geolocation(mut self) -> Self {
        self.lat.iter_mut().for_each(|v| *v = f32::NAN);
        self.lon.iter_mut().for_each(|v| *v = f32::NAN);
        self
    }

    /// Mark every brightness temperature sample invalid.
    pub fn invalidate_bt(mut self) -> Self {
        self.bt.iter_mut().for_each(|v| *v = f32::NAN);
        self
    }

    /// Number of pixels colder than `threshold`.
    pub fn count_colder_than(&self, threshold: f32) -> usize {
        self.bt.iter().filter(|&&v| v < threshold).count()
    }
}

/// Cells of a compact block of exactly `area` pixels (see [`SyntheticScene::paint_block`]).
pub fn block_cells(row: usize, col: usize, area: usize, block_width: usize) -> Vec<(usize, usize)> {
    assert!(block_width > 0, "block_width must be > 0");
    (0..area)
        .map(|i| (row + i / block_width, col + i % block_width))
        .collect()
}

/// A boolean mask with one compact block of exactly `area` pixels set.
pub fn block_mask(
    height: usize,
    width: usize,
    row: usize,
    col: usize,
    area: usize,
    block_width: usize,
) -> Vec<bool> {
    let mut mask = vec![false; height * width];
    for (r, c) in block_cells(row, col, area, block_width) {
        mask[r * width + c] = true;
    }
    mask
}
