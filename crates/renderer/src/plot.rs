//! Side-by-side brightness temperature and cluster mask plot.
//!
//! The left panel is the BT field on an inferno ramp (cold clouds dark), the
//! right panel is the final mask in greys (clusters black). Large grids are
//! decimated so neither panel exceeds [`PlotOptions::max_panel_edge`].
//! The geographic extent is written to the PNG as a `tEXt` chunk.

use cloud_common::Grid;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::gradient::{greys_color, inferno_color, scaled_color, value_range, Color};
use crate::png::create_png_with_text;

/// `tEXt` keyword holding `min_lon,max_lon,min_lat,max_lat`.
pub const EXTENT_KEYWORD: &str = "extent";

/// Layout options for the cluster plot.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// Longest panel edge in pixels.
    pub max_panel_edge: usize,
    /// White margin around and between panels.
    pub margin: usize,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            max_panel_edge: 900,
            margin: 12,
        }
    }
}

/// Panel dimensions and decimation stride for a grid.
fn panel_layout(height: usize, width: usize, max_edge: usize) -> (usize, usize, usize) {
    let longest = height.max(width);
    let stride = longest.div_ceil(max_edge.max(1)).max(1);
    (height.div_ceil(stride), width.div_ceil(stride), stride)
}

/// Format an extent for the `tEXt` chunk.
pub fn format_extent(extent: [f64; 4]) -> String {
    format!(
        "{:.4},{:.4},{:.4},{:.4}",
        extent[0], extent[1], extent[2], extent[3]
    )
}

/// Parse an extent written by [`format_extent`].
pub fn parse_extent(s: &str) -> Option<[f64; 4]> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse().ok())
        .collect::<Option<Vec<_>>>()?;
    match values.as_slice() {
        [a, b, c, d] => Some([*a, *b, *c, *d]),
        _ => None,
    }
}

/// Render the BT heatmap and final mask side by side as a PNG.
///
/// `extent` is `[min_lon, max_lon, min_lat, max_lat]`.
pub fn render_cluster_plot(
    bt: &Grid<f32>,
    mask: &Grid<u8>,
    extent: [f64; 4],
    options: &PlotOptions,
) -> RenderResult<Vec<u8>> {
    if !bt.same_shape(mask) {
        return Err(RenderError::InvalidDimensions(format!(
            "BT {:?} and mask {:?} differ",
            bt.shape(),
            mask.shape()
        )));
    }
    if bt.is_empty() {
        return Err(RenderError::InvalidDimensions("empty grid".to_string()));
    }

    let (height, width) = bt.shape();
    let (panel_h, panel_w, stride) = panel_layout(height, width, options.max_panel_edge);
    let margin = options.margin;
    let canvas_w = 2 * panel_w + 3 * margin;
    let canvas_h = panel_h + 2 * margin;

    let (bt_min, bt_max) = value_range(bt.as_slice()).unwrap_or((0.0, 1.0));
    let bt_cells = bt.as_slice();
    let mask_cells = mask.as_slice();

    let mut pixels = vec![255u8; canvas_w * canvas_h * 4];
    pixels
        .par_chunks_mut(canvas_w * 4)
        .enumerate()
        .skip(margin)
        .take(panel_h)
        .for_each(|(y, row)| {
            let src_row = (y - margin) * stride;
            for px in 0..panel_w {
                let src = src_row * width + px * stride;

                let bt_color = scaled_color(bt_cells[src], bt_min, bt_max, inferno_color);
                let left = (margin + px) * 4;
                row[left..left + 4].copy_from_slice(&bt_color.to_array());

                let mask_color = if mask_cells[src] != 0 {
                    greys_color(1.0)
                } else {
                    Color::WHITE
                };
                let right = (2 * margin + panel_w + px) * 4;
                row[right..right + 4].copy_from_slice(&mask_color.to_array());
            }
        });

    debug!(
        grid_height = height,
        grid_width = width,
        stride = stride,
        plot_width = canvas_w,
        plot_height = canvas_h,
        "Rendered cluster plot"
    );

    let extent_text = format_extent(extent);
    create_png_with_text(
        &pixels,
        canvas_w,
        canvas_h,
        &[(EXTENT_KEYWORD, extent_text.as_str())],
    )
}
