//! Error types for rendering.

use thiserror::Error;

/// Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Errors that can occur while rendering plots and thumbnails.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
