//! Brush construction and sweeping.

use crate::circle::circle_stamp;
use crate::line::line;
use common::color::Pixel;
use common::error::{RasterError, RasterResult};
use common::geometry::IntPoint;
use texture::{Blend, BufferPool, View};

/// A straight stroke as handed in by a drawing tool.
#[derive(Clone, Debug)]
pub struct Stroke<P: Pixel> {
    pub start: IntPoint,
    pub end: IntPoint,
    pub value: P,
    pub thickness: u32,
    /// How the finished stroke is composited onto its target.
    pub blend: Blend<P>,
}

impl<P: Pixel> Stroke<P> {
    pub fn new(start: IntPoint, end: IntPoint, value: P) -> Self {
        Self {
            start,
            end,
            value,
            thickness: 1,
            blend: Blend::Alpha,
        }
    }

    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_blend(mut self, blend: Blend<P>) -> Self {
        self.blend = blend;
        self
    }
}

/// A pooled solid rectangle.
pub fn rectangle<P: Pixel>(
    pool: &mut BufferPool<P>,
    width: u32,
    height: u32,
    value: P,
    pivot: IntPoint,
) -> RasterResult<View<P>> {
    let mut view = pool.acquire_view(width, height, pivot)?;
    view.clear(value);
    Ok(view)
}

/// Stamp `brush` at every point of the line `start..=end`.
///
/// The result covers the line's bounding box grown by the brush size. Its
/// pivot is chosen so that blending it at the origin puts each stamp where
/// blending `brush` directly at that line point would. Both endpoints must be
/// drawable coordinates.
pub fn sweep<P: Pixel>(
    pool: &mut BufferPool<P>,
    brush: &View<P>,
    start: IntPoint,
    end: IntPoint,
    blend: &Blend<P>,
    background: P,
) -> RasterResult<View<P>> {
    for point in [start, end] {
        if !point.is_drawable() {
            return Err(RasterError::coordinate_range(point.x, point.y));
        }
    }

    let top_left = start.min(end);
    let extent = end - start;
    let width = extent.x.unsigned_abs() + brush.width();
    let height = extent.y.unsigned_abs() + brush.height();

    let mut swept = pool.acquire_view(width, height, brush.pivot() - top_left)?;
    swept.clear(background);

    for point in line(start, end) {
        tracing::trace!("stamp at ({}, {})", point.x, point.y);
        swept.blend(brush, blend, point, IntPoint::ZERO);
    }

    Ok(swept)
}

/// Build the view for a stroke: a circular brush of the stroke's thickness
/// swept from start to end.
///
/// Stamps inside the sweep are masked rather than blended, so a translucent
/// value comes out uniform instead of darkening where stamps overlap. The
/// stroke's own blend applies once, when the result is composited.
pub fn line_stroke<P: Pixel>(pool: &mut BufferPool<P>, stroke: &Stroke<P>) -> RasterResult<View<P>> {
    let thickness = stroke.thickness.max(1);
    let brush = circle_stamp(pool, thickness, stroke.value, P::CLEAR)?;

    let swept = sweep(pool, &brush, stroke.start, stroke.end, &Blend::Mask, P::CLEAR);
    pool.release_view(brush)?;
    swept
}
