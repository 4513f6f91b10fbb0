//! Rasterization primitives.
//!
//! This crate handles:
//! - Bresenham line enumeration
//! - Filled midpoint circles
//! - Brush construction and sweeping a brush along a line

pub mod brush;
pub mod circle;
pub mod line;

pub use brush::{line_stroke, rectangle, sweep, Stroke};
pub use circle::{circle, circle_spans, circle_stamp, Span};
pub use line::{line, Line};
