//! The grid loader seam and the decoded scene it produces.

use std::path::Path;

use cloud_common::Grid;

use crate::error::{SensorError, SensorResult};

/// One decoded scene: brightness temperature plus pixel-aligned geolocation.
///
/// All three grids share the same shape and use `NaN` for invalid samples.
#[derive(Debug, Clone)]
pub struct SensorGrids {
    /// Brightness temperature in Kelvin
    pub bt: Grid<f32>,
    /// Latitude in degrees
    pub lat: Grid<f32>,
    /// Longitude in degrees
    pub lon: Grid<f32>,
}

impl SensorGrids {
    /// Assemble a scene, checking that it is non-empty and consistently shaped.
    pub fn new(bt: Grid<f32>, lat: Grid<f32>, lon: Grid<f32>) -> SensorResult<Self> {
        if bt.is_empty() {
            return Err(SensorError::EmptyGrid(format!(
                "brightness temperature grid is {}x{}",
                bt.height(),
                bt.width()
            )));
        }
        if !bt.same_shape(&lat) || !bt.same_shape(&lon) {
            return Err(SensorError::ShapeMismatch(format!(
                "BT {:?}, latitude {:?}, longitude {:?}",
                bt.shape(),
                lat.shape(),
                lon.shape()
            )));
        }
        Ok(Self { bt, lat, lon })
    }

    /// `(height, width)` of the scene.
    pub fn shape(&self) -> (usize, usize) {
        self.bt.shape()
    }

    /// Approximate resident size of the three grids in bytes.
    pub fn size_bytes(&self) -> usize {
        3 * self.bt.len() * std::mem::size_of::<f32>()
    }
}

/// Decodes a sensor file into a [`SensorGrids`] scene.
///
/// Implementations are synchronous and are expected to be called from a
/// blocking context.
pub trait GridLoader: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Load and decode the scene stored at `path`.
    fn load(&self, path: &Path) -> SensorResult<SensorGrids>;
}

/// Fail early with a typed error if `path` is missing or not a file.
pub fn ensure_readable(path: &Path) -> SensorResult<u64> {
    if !path.exists() {
        return Err(SensorError::FileNotFound(path.display().to_string()));
    }
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(SensorError::InvalidFormat(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    Ok(metadata.len())
}
