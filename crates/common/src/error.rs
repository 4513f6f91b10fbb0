//! Common error types.

use thiserror::Error;

/// Main error type for the compositing engine.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Pixel ({x}, {y}) is outside a {width}x{height} buffer")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    #[error("Pixel data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Buffer {0} released while not checked out")]
    DoubleRelease(u64),

    #[error("Coordinate ({x}, {y}) is outside the drawable range")]
    CoordinateRange { x: i64, y: i64 },

    #[error("Change log is no longer recording")]
    LogSealed,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RasterResult<T> = Result<T, RasterError>;

impl RasterError {
    pub fn out_of_bounds(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    pub fn invalid_dimensions(width: impl Into<i64>, height: impl Into<i64>) -> Self {
        Self::InvalidDimensions {
            width: width.into(),
            height: height.into(),
        }
    }

    pub fn coordinate_range(x: impl Into<i64>, y: impl Into<i64>) -> Self {
        Self::CoordinateRange {
            x: x.into(),
            y: y.into(),
        }
    }

    pub fn size_mismatch(expected: usize, actual: usize) -> Self {
        Self::SizeMismatch { expected, actual }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
