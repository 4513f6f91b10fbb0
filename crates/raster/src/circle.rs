//! Filled midpoint circles.

use common::color::Pixel;
use common::error::RasterResult;
use common::geometry::IntPoint;
use smallvec::SmallVec;
use texture::{BufferPool, View};

/// One horizontal run of a filled shape, `x0..=x1` on row `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub y: i32,
    pub x0: i32,
    pub x1: i32,
}

impl Span {
    #[inline]
    const fn new(y: i32, x0: i32, x1: i32) -> Self {
        Self { y, x0, x1 }
    }
}

/// Spans covering a filled disk of `diameter` in a `diameter`-sized square
/// anchored at the origin.
///
/// Even diameters have no center pixel, so the lower and right halves are
/// pushed out by one and the gap row is filled separately. Spans may
/// overlap.
pub fn circle_spans(diameter: u32) -> SmallVec<[Span; 32]> {
    let mut spans = SmallVec::new();
    if diameter == 0 {
        return spans;
    }

    let d = diameter as i32;
    let radius = (d - 1) / 2;
    let offset = if d % 2 == 0 { 1 } else { 0 };
    let center = radius;

    let mut x = radius;
    let mut y = 0;
    let mut radius_error = 1 - x;

    while x >= y {
        let yoff = if y > 0 { offset } else { 0 };
        let xoff = if x > 0 { offset } else { 0 };

        spans.push(Span::new(center + y + yoff, center - x, center + x + offset));
        spans.push(Span::new(center - y, center - x, center + x + offset));
        spans.push(Span::new(center + x + xoff, center - y, center + y + offset));
        spans.push(Span::new(center - x, center - y, center + y + offset));

        y += 1;
        if radius_error < 0 {
            radius_error += 2 * y + 1;
        } else {
            x -= 1;
            radius_error += 2 * (y - x) + 1;
        }
    }

    if offset > 0 {
        spans.push(Span::new(center + 1, 0, d - 1));
    }

    spans
}

/// Fill a disk of `diameter` into the top-left of `view`.
pub fn circle<P: Pixel>(view: &mut View<P>, diameter: u32, value: P) {
    for span in circle_spans(diameter) {
        view.fill_span_absolute(span.y, span.x0, span.x1, value);
    }
}

/// A pooled circular brush, pivot at its center.
pub fn circle_stamp<P: Pixel>(
    pool: &mut BufferPool<P>,
    diameter: u32,
    value: P,
    background: P,
) -> RasterResult<View<P>> {
    let half = (diameter / 2) as i32;
    let mut view = pool.acquire_view(diameter, diameter, IntPoint::splat(half))?;
    view.clear(background);
    circle(&mut view, diameter, value);
    Ok(view)
}
