//! Image rendering for cloud detection results.
//!
//! - Inferno and greyscale color ramps
//! - Side-by-side BT heatmap and cluster mask plot
//! - Thumbnails for previews
//! - PNG encoding with `tEXt` metadata

pub mod error;
pub mod gradient;
pub mod plot;
pub mod png;
pub mod thumbnail;

pub use error::{RenderError, RenderResult};
pub use plot::{parse_extent, render_cluster_plot, PlotOptions, EXTENT_KEYWORD};
pub use thumbnail::{default_thumbnail, make_thumbnail, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH};
