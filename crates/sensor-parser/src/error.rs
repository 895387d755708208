//! Error types for sensor file loading.

use cloud_common::GridShapeError;
use thiserror::Error;

/// Result type for sensor parser operations.
pub type SensorResult<T> = Result<T, SensorError>;

/// Error types for sensor file loading.
#[derive(Error, Debug)]
pub enum SensorError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Input file does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Missing required dataset or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Dataset dimensions are inconsistent
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The grid has no cells
    #[error("Empty grid: {0}")]
    EmptyGrid(String),

    /// No native reader was compiled in
    #[error("Sensor file loader unavailable: {0}")]
    LoaderUnavailable(String),
}

impl From<GridShapeError> for SensorError {
    fn from(err: GridShapeError) -> Self {
        SensorError::ShapeMismatch(err.to_string())
    }
}
