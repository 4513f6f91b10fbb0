//! Common types shared across the compositing engine.

pub mod color;
pub mod error;
pub mod geometry;

pub use color::{Color, ColorF32, Pixel};
pub use error::{RasterError, RasterResult};
pub use geometry::{CellKey, IntPoint, PixelRect, COORDINATE_LIMIT};
