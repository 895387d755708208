//! Error types for the detection pipeline.

use std::fmt;

use cloud_common::GridShapeError;
use thiserror::Error;

/// A step of the detection pipeline, used to give errors and timings context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Bounds,
    Classify,
    NoiseFilter,
    RadiusFilter,
    Aggregate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Bounds => "bounds",
            Stage::Classify => "classify",
            Stage::NoiseFilter => "noise_filter",
            Stage::RadiusFilter => "radius_filter",
            Stage::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during detection.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// Two grids that must be pixel-aligned are not.
    #[error("{stage}: grid shape mismatch, expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        stage: Stage,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Detection parameters are out of range.
    #[error("invalid detection parameters: {0}")]
    InvalidParameters(String),

    #[error(transparent)]
    Grid(#[from] GridShapeError),
}

impl DetectionError {
    /// Stage at which the error occurred, if it is stage-specific.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            DetectionError::ShapeMismatch { stage, .. } => Some(*stage),
            DetectionError::InvalidParameters(_) | DetectionError::Grid(_) => None,
        }
    }

    pub(crate) fn shape_mismatch(
        stage: Stage,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        Self::ShapeMismatch {
            stage,
            expected,
            actual,
        }
    }
}

/// Result type for detection operations.
pub type DetectionResult<T> = std::result::Result<T, DetectionError>;
