//! Common types and utilities shared across the cloud detection workspace.

pub mod bbox;
pub mod grid;

pub use bbox::{GeoBounds, FALLBACK_BOUNDS};
pub use grid::{Grid, GridShapeError};
