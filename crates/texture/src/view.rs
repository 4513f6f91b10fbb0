//! Pivot-anchored views onto pixel buffers.
//!
//! A view owns the buffer it draws into, so a buffer can never be reachable
//! from two live views, and returning a view to the pool moves the buffer
//! out of the caller's hands.
//!
//! Coordinate frames:
//! - *buffer space*: raw buffer coordinates.
//! - *absolute*: relative to the top-left corner of the view's rect.
//! - *local*: relative to the pivot, so `(0, 0)` is the pivot pixel.

use crate::blend::Blend;
use crate::buffer::PixelBuffer;
use common::color::Pixel;
use common::error::{RasterError, RasterResult};
use common::geometry::{IntPoint, PixelRect};

/// A rectangular window onto a buffer.
#[derive(Clone, Debug)]
pub struct View<P: Pixel> {
    buffer: PixelBuffer<P>,
    rect: PixelRect,
    pivot: IntPoint,
}

impl<P: Pixel> View<P> {
    /// Create a view over `rect` of `buffer`.
    pub fn new(buffer: PixelBuffer<P>, rect: PixelRect, pivot: IntPoint) -> RasterResult<Self> {
        check_rect(&buffer, &rect)?;
        Ok(Self {
            buffer,
            rect,
            pivot,
        })
    }

    /// A view covering the whole buffer, pivot at the top-left corner.
    pub fn full(buffer: PixelBuffer<P>) -> Self {
        let rect = buffer.bounds();
        Self {
            buffer,
            rect,
            pivot: IntPoint::ZERO,
        }
    }

    /// Point the view at a new region of its buffer.
    pub fn reset(&mut self, rect: PixelRect, pivot: IntPoint) -> RasterResult<()> {
        check_rect(&self.buffer, &rect)?;
        self.rect = rect;
        self.pivot = pivot;
        Ok(())
    }

    #[inline]
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    #[inline]
    pub fn pivot(&self) -> IntPoint {
        self.pivot
    }

    #[inline]
    pub fn set_pivot(&mut self, pivot: IntPoint) {
        self.pivot = pivot;
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.rect.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.rect.height
    }

    #[inline]
    pub fn buffer(&self) -> &PixelBuffer<P> {
        &self.buffer
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut PixelBuffer<P> {
        &mut self.buffer
    }

    /// Give up the view, returning its buffer.
    pub fn into_buffer(self) -> PixelBuffer<P> {
        self.buffer
    }

    /// Fill the view's own rect with `value`.
    pub fn clear(&mut self, value: P) {
        let rect = self.rect;
        let stride = self.buffer.width() as usize;
        let pixels = self.buffer.pixels_mut();

        for y in rect.y..rect.bottom() {
            let start = y as usize * stride + rect.x as usize;
            pixels[start..start + rect.width as usize].fill(value);
        }
    }

    #[inline]
    fn absolute_in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.rect.width && (y as u32) < self.rect.height
    }

    /// Read relative to the rect's top-left corner, ignoring the pivot.
    pub fn get_pixel_absolute(&self, x: i32, y: i32) -> RasterResult<P> {
        if !self.absolute_in_bounds(x, y) {
            return Err(RasterError::out_of_bounds(x, y, self.rect.width, self.rect.height));
        }
        self.buffer.get(self.rect.x + x, self.rect.y + y)
    }

    /// Write relative to the rect's top-left corner, ignoring the pivot.
    pub fn set_pixel_absolute(&mut self, x: i32, y: i32, value: P) -> RasterResult<()> {
        if !self.absolute_in_bounds(x, y) {
            return Err(RasterError::out_of_bounds(x, y, self.rect.width, self.rect.height));
        }
        self.buffer.set(self.rect.x + x, self.rect.y + y, value)
    }

    /// Fill absolute columns `x0..=x1` of row `y`, clipped to the view.
    pub fn fill_span_absolute(&mut self, y: i32, x0: i32, x1: i32, value: P) {
        if y < 0 || y >= self.rect.height as i32 {
            return;
        }
        let x0 = x0.max(0);
        let x1 = x1.min(self.rect.width as i32 - 1);
        if x1 < x0 {
            return;
        }

        let stride = self.buffer.width() as usize;
        let start = (self.rect.y + y) as usize * stride + (self.rect.x + x0) as usize;
        let len = (x1 - x0 + 1) as usize;
        self.buffer.pixels_mut()[start..start + len].fill(value);
    }

    /// Read relative to the pivot.
    pub fn get_pixel(&self, x: i32, y: i32) -> RasterResult<P> {
        self.get_pixel_absolute(x + self.pivot.x, y + self.pivot.y)
    }

    /// Write relative to the pivot.
    pub fn set_pixel(&mut self, x: i32, y: i32, value: P) -> RasterResult<()> {
        self.set_pixel_absolute(x + self.pivot.x, y + self.pivot.y, value)
    }

    /// Composite `source` onto this view.
    ///
    /// Source pixel `s` (absolute in the source rect) lands on the canvas at
    /// `brush_position - source.pivot + s`. This view's pivot sits at
    /// `canvas_position` on the same canvas. Pixels outside the overlap are
    /// skipped. Returns whether any destination pixel changed.
    pub fn blend(
        &mut self,
        source: &View<P>,
        blend: &Blend<P>,
        brush_position: IntPoint,
        canvas_position: IntPoint,
    ) -> bool {
        composite(
            &mut self.buffer,
            self.rect,
            self.pivot,
            source,
            blend,
            brush_position,
            canvas_position,
        )
    }

    /// Composite a region of this view onto itself.
    ///
    /// `src_rect` is absolute within this view and `src_pivot` is the pivot
    /// of that region. The region is copied first, so overlapping source and
    /// destination behave as if the source were a separate view.
    pub fn blend_within(
        &mut self,
        src_rect: PixelRect,
        src_pivot: IntPoint,
        blend: &Blend<P>,
        brush_position: IntPoint,
        canvas_position: IntPoint,
    ) -> RasterResult<bool> {
        let own = PixelRect::from_size(self.rect.width, self.rect.height);
        if src_rect.is_empty() || !own.contains_rect(&src_rect) {
            return Err(RasterError::invalid(format!(
                "source region {src_rect:?} is not inside a {}x{} view",
                self.rect.width, self.rect.height
            )));
        }

        let mut copy = PixelBuffer::new(src_rect.width, src_rect.height)?;
        {
            let stride = self.buffer.width() as usize;
            let pixels = self.buffer.pixels();
            let out = copy.pixels_mut();
            for row in 0..src_rect.height as usize {
                let y = (self.rect.y + src_rect.y) as usize + row;
                let start = y * stride + (self.rect.x + src_rect.x) as usize;
                let width = src_rect.width as usize;
                out[row * width..(row + 1) * width]
                    .copy_from_slice(&pixels[start..start + width]);
            }
        }

        let region = PixelRect::from_size(src_rect.width, src_rect.height);
        let source = View::new(copy, region, src_pivot)?;
        Ok(self.blend(&source, blend, brush_position, canvas_position))
    }
}

fn check_rect<P: Pixel>(buffer: &PixelBuffer<P>, rect: &PixelRect) -> RasterResult<()> {
    if rect.is_empty() {
        return Err(RasterError::invalid_dimensions(rect.width, rect.height));
    }
    if !buffer.bounds().contains_rect(rect) {
        return Err(RasterError::out_of_bounds(
            rect.right() - 1,
            rect.bottom() - 1,
            buffer.width(),
            buffer.height(),
        ));
    }
    Ok(())
}

/// Composite `source` into a destination region of a raw buffer.
///
/// `dst_rect`/`dst_pivot` describe the destination the same way a [`View`]
/// does; canvas cells use the full buffer with a zero pivot.
pub fn composite<P: Pixel>(
    dst: &mut PixelBuffer<P>,
    dst_rect: PixelRect,
    dst_pivot: IntPoint,
    source: &View<P>,
    blend: &Blend<P>,
    brush_position: IntPoint,
    canvas_position: IntPoint,
) -> bool {
    // Anything whose offset leaves i32 cannot overlap a real buffer.
    let offset = |b: i32, p: i32, d: i32, c: i32| {
        i32::try_from(b as i64 - p as i64 + d as i64 - c as i64).ok()
    };
    let (Some(sx), Some(sy)) = (
        offset(brush_position.x, source.pivot.x, dst_pivot.x, canvas_position.x),
        offset(brush_position.y, source.pivot.y, dst_pivot.y, canvas_position.y),
    ) else {
        return false;
    };
    let shift = IntPoint::new(sx, sy);

    let landing = PixelRect::new(shift.x, shift.y, source.rect.width, source.rect.height);
    let Some(overlap) = landing.intersection(&PixelRect::from_size(dst_rect.width, dst_rect.height))
    else {
        return false;
    };

    let src_stride = source.buffer.width() as usize;
    let dst_stride = dst.width() as usize;
    let src_pixels = source.buffer.pixels();

    let mut changed = false;
    let dst_pixels = dst.pixels_untracked();

    for y in overlap.y..overlap.bottom() {
        let sy = (source.rect.y + y - shift.y) as usize;
        let dy = (dst_rect.y + y) as usize;

        for x in overlap.x..overlap.right() {
            let sx = (source.rect.x + x - shift.x) as usize;
            let dx = (dst_rect.x + x) as usize;

            let d = &mut dst_pixels[dy * dst_stride + dx];
            let blended = blend.apply(*d, src_pixels[sy * src_stride + sx]);
            if blended != *d {
                *d = blended;
                changed = true;
            }
        }
    }

    if changed {
        dst.mark_dirty();
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::color::{Color, ColorF32};

    fn view(width: u32, height: u32, pivot: IntPoint) -> View<Color> {
        let buffer = PixelBuffer::new(width, height).unwrap();
        View::new(buffer, PixelRect::from_size(width, height), pivot).unwrap()
    }

    #[test]
    fn test_rect_must_fit_buffer() {
        let buffer = PixelBuffer::<u8>::new(8, 8).unwrap();
        assert!(View::new(buffer.clone(), PixelRect::new(4, 4, 4, 4), IntPoint::ZERO).is_ok());
        assert!(View::new(buffer.clone(), PixelRect::new(4, 4, 5, 4), IntPoint::ZERO).is_err());
        assert!(View::new(buffer, PixelRect::new(0, 0, 0, 4), IntPoint::ZERO).is_err());
    }

    #[test]
    fn test_clear_only_touches_rect() {
        let buffer = PixelBuffer::<u8>::new(4, 4).unwrap();
        let mut sub = View::new(buffer, PixelRect::new(1, 1, 2, 2), IntPoint::ZERO).unwrap();
        sub.clear(9);

        let buffer = sub.into_buffer();
        let nines = buffer.pixels().iter().filter(|p| **p == 9).count();
        assert_eq!(nines, 4);
        assert_eq!(buffer.get(0, 0).unwrap(), 0);
        assert_eq!(buffer.get(2, 2).unwrap(), 9);
        assert_eq!(buffer.get(3, 3).unwrap(), 0);
    }

    #[test]
    fn test_pivot_relative_access() {
        let mut v = view(5, 5, IntPoint::new(2, 2));
        v.set_pixel(0, 0, Color::RED).unwrap();
        assert_eq!(v.get_pixel_absolute(2, 2).unwrap(), Color::RED);
        assert_eq!(v.get_pixel(-2, -2).unwrap(), Color::TRANSPARENT);
        assert!(v.get_pixel(3, 0).is_err());
    }

    #[test]
    fn test_replace_blend_copies_overlap() {
        let mut dst = view(4, 4, IntPoint::ZERO);
        let mut src = view(2, 2, IntPoint::ZERO);
        src.clear(Color::BLUE);
        src.set_pixel_absolute(1, 1, Color::RED).unwrap();

        assert!(dst.blend(&src, &Blend::Replace, IntPoint::new(1, 2), IntPoint::ZERO));

        for y in 0..4 {
            for x in 0..4 {
                let got = dst.get_pixel_absolute(x, y).unwrap();
                let expected = if (1..3).contains(&x) && (2..4).contains(&y) {
                    src.get_pixel_absolute(x - 1, y - 2).unwrap()
                } else {
                    Color::TRANSPARENT
                };
                assert_eq!(got, expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_blend_clips_silently() {
        let mut dst = view(4, 4, IntPoint::ZERO);
        let mut src = view(3, 3, IntPoint::new(1, 1));
        src.clear(Color::WHITE);

        // brush centred on the top-left corner: only a 2x2 quadrant lands
        assert!(dst.blend(&src, &Blend::Replace, IntPoint::ZERO, IntPoint::ZERO));
        let painted = dst.buffer().pixels().iter().filter(|p| **p == Color::WHITE).count();
        assert_eq!(painted, 4);

        // entirely off the destination
        assert!(!dst.blend(&src, &Blend::Replace, IntPoint::new(50, -50), IntPoint::ZERO));
    }

    #[test]
    fn test_extreme_positions_clip() {
        let mut dst = view(4, 4, IntPoint::ZERO);
        let mut src = view(3, 3, IntPoint::new(i32::MIN + 1, 0));
        src.clear(Color::WHITE);

        assert!(!dst.blend(&src, &Blend::Replace, IntPoint::new(i32::MAX, 0), IntPoint::ZERO));
        assert!(!dst.blend(&src, &Blend::Replace, IntPoint::new(i32::MAX - 1, 0), IntPoint::new(i32::MIN, 0)));
        assert!(dst.buffer().pixels().iter().all(|p| *p == Color::TRANSPARENT));

        // large but cancelling offsets still land
        src.set_pivot(IntPoint::new(i32::MAX - 1, 0));
        assert!(dst.blend(&src, &Blend::Replace, IntPoint::new(i32::MAX, 0), IntPoint::ZERO));
        assert_eq!(dst.get_pixel_absolute(0, 0).unwrap(), Color::TRANSPARENT);
        assert_eq!(dst.get_pixel_absolute(1, 0).unwrap(), Color::WHITE);
    }

    #[test]
    fn test_canvas_position_offsets_destination() {
        let mut dst = view(4, 4, IntPoint::ZERO);
        let mut src = view(1, 1, IntPoint::ZERO);
        src.clear(Color::RED);

        // destination covers canvas pixels 8..12
        dst.blend(&src, &Blend::Replace, IntPoint::new(9, 10), IntPoint::new(8, 8));
        assert_eq!(dst.get_pixel_absolute(1, 2).unwrap(), Color::RED);
    }

    #[test]
    fn test_alpha_opaque_equals_replace_and_transparent_is_noop() {
        let mut base = view(3, 3, IntPoint::ZERO);
        base.clear(Color::rgba(9, 8, 7, 200));

        let mut opaque = view(3, 3, IntPoint::ZERO);
        opaque.clear(Color::rgb(1, 2, 3));

        let mut replaced = base.clone();
        replaced.blend(&opaque, &Blend::Replace, IntPoint::ZERO, IntPoint::ZERO);
        let mut alphaed = base.clone();
        alphaed.blend(&opaque, &Blend::Alpha, IntPoint::ZERO, IntPoint::ZERO);
        assert_eq!(replaced.buffer().pixels(), alphaed.buffer().pixels());

        let mut clear = view(3, 3, IntPoint::ZERO);
        clear.clear(Color::rgba(1, 2, 3, 0));
        let mut untouched = base.clone();
        assert!(!untouched.blend(&clear, &Blend::Alpha, IntPoint::ZERO, IntPoint::ZERO));
        assert_eq!(untouched.buffer().pixels(), base.buffer().pixels());
    }

    #[test]
    fn test_blend_within_overlapping_region() {
        let buffer = PixelBuffer::<u8>::from_pixels(4, 1, vec![1, 2, 3, 4]).unwrap();
        let mut v = View::full(buffer);

        // shift the first three pixels one to the right
        let changed = v
            .blend_within(
                PixelRect::new(0, 0, 3, 1),
                IntPoint::ZERO,
                &Blend::Replace,
                IntPoint::new(1, 0),
                IntPoint::ZERO,
            )
            .unwrap();
        assert!(changed);
        assert_eq!(v.buffer().pixels(), &[1, 1, 2, 3]);
    }

    #[test]
    fn test_float_alpha_blend_matches_replace() {
        let mut base = View::full(PixelBuffer::filled(3, 3, ColorF32::new(0.7, 0.9, 0.2, 0.6)).unwrap());
        let src = View::full(PixelBuffer::filled(2, 2, ColorF32::new(0.1, 0.33, 0.8, 1.0)).unwrap());

        let mut replaced = base.clone();
        replaced.blend(&src, &Blend::Replace, IntPoint::new(1, 1), IntPoint::ZERO);
        assert!(base.blend(&src, &Blend::Alpha, IntPoint::new(1, 1), IntPoint::ZERO));
        assert_eq!(base.buffer().pixels(), replaced.buffer().pixels());
    }

    #[test]
    fn test_fill_span_clips() {
        let mut v = View::full(PixelBuffer::<u8>::new(4, 2).unwrap());
        v.fill_span_absolute(1, -3, 1, 5);
        v.fill_span_absolute(7, 0, 3, 5);
        assert_eq!(v.buffer().pixels(), &[0, 0, 0, 0, 5, 5, 0, 0]);
    }
}
