//! Pixel buffers.

use common::color::{Color, Pixel};
use common::error::{RasterError, RasterResult};
use common::geometry::PixelRect;
use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a pixel buffer, assigned at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// Receiver of committed pixel data, e.g. a texture upload on the host side.
pub trait DisplaySink<P> {
    fn upload(&mut self, id: BufferId, width: u32, height: u32, pixels: &[P]);

    /// The buffer is gone and anything shown for it should be released.
    /// Ids that were never uploaded may arrive here too.
    fn remove(&mut self, _id: BufferId) {}
}

/// Sink that discards every upload.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl<P> DisplaySink<P> for NullSink {
    fn upload(&mut self, _id: BufferId, _width: u32, _height: u32, _pixels: &[P]) {}
}

/// Sink that keeps the last upload of every live buffer.
#[derive(Clone, Debug)]
pub struct CaptureSink<P> {
    pub uploads: HashMap<BufferId, (u32, u32, Vec<P>)>,
    pub upload_count: usize,
    pub remove_count: usize,
}

impl<P> CaptureSink<P> {
    pub fn new() -> Self {
        Self {
            uploads: HashMap::new(),
            upload_count: 0,
            remove_count: 0,
        }
    }

    /// Last uploaded pixels for a buffer.
    pub fn pixels(&self, id: BufferId) -> Option<&[P]> {
        self.uploads.get(&id).map(|(_, _, pixels)| pixels.as_slice())
    }
}

impl<P> Default for CaptureSink<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone> DisplaySink<P> for CaptureSink<P> {
    fn upload(&mut self, id: BufferId, width: u32, height: u32, pixels: &[P]) {
        self.uploads.insert(id, (width, height, pixels.to_vec()));
        self.upload_count += 1;
    }

    fn remove(&mut self, id: BufferId) {
        self.uploads.remove(&id);
        self.remove_count += 1;
    }
}

/// A width x height array of pixels, row-major.
pub struct PixelBuffer<P: Pixel> {
    id: BufferId,
    width: u32,
    height: u32,
    pixels: Vec<P>,
    dirty: bool,
}

impl<P: Pixel> PixelBuffer<P> {
    /// Create a buffer filled with `P::CLEAR`.
    pub fn new(width: u32, height: u32) -> RasterResult<Self> {
        Self::filled(width, height, P::CLEAR)
    }

    /// Create a buffer filled with `value`.
    pub fn filled(width: u32, height: u32, value: P) -> RasterResult<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::invalid_dimensions(width, height));
        }

        Ok(Self {
            id: BufferId::next(),
            width,
            height,
            pixels: vec![value; width as usize * height as usize],
            dirty: true,
        })
    }

    /// Create a buffer from externally decoded pixels.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<P>) -> RasterResult<Self> {
        let mut buffer = Self::new(width, height)?;
        if pixels.len() != buffer.pixels.len() {
            return Err(RasterError::size_mismatch(buffer.pixels.len(), pixels.len()));
        }
        buffer.pixels = pixels;
        Ok(buffer)
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn bounds(&self) -> PixelRect {
        PixelRect::from_size(self.width, self.height)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    /// Mutable access to the raw pixels. Marks the buffer dirty.
    pub fn pixels_mut(&mut self) -> &mut [P] {
        self.dirty = true;
        &mut self.pixels
    }

    /// Raw pixels without touching the dirty flag; callers mark dirty
    /// themselves once they know something changed.
    #[inline]
    pub(crate) fn pixels_untracked(&mut self) -> &mut [P] {
        &mut self.pixels
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    pub(crate) fn index(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.in_bounds(x, y), "({x}, {y}) outside {}x{}", self.width, self.height);
        y as usize * self.width as usize + x as usize
    }

    /// Get pixel at position.
    pub fn get(&self, x: i32, y: i32) -> RasterResult<P> {
        if !self.in_bounds(x, y) {
            return Err(RasterError::out_of_bounds(x, y, self.width, self.height));
        }
        Ok(self.pixels[self.index(x, y)])
    }

    /// Set pixel at position.
    pub fn set(&mut self, x: i32, y: i32, value: P) -> RasterResult<()> {
        if !self.in_bounds(x, y) {
            return Err(RasterError::out_of_bounds(x, y, self.width, self.height));
        }
        let index = self.index(x, y);
        self.pixels[index] = value;
        self.dirty = true;
        Ok(())
    }

    /// Fill with a value.
    pub fn fill(&mut self, value: P) {
        self.pixels.fill(value);
        self.dirty = true;
    }

    /// Clear to `P::CLEAR`.
    pub fn clear(&mut self) {
        self.fill(P::CLEAR);
    }

    /// Replace every pixel with externally supplied data.
    pub fn load_external(&mut self, raw: &[P]) -> RasterResult<()> {
        if raw.len() != self.pixels.len() {
            return Err(RasterError::size_mismatch(self.pixels.len(), raw.len()));
        }
        self.pixels.copy_from_slice(raw);
        self.dirty = true;
        Ok(())
    }

    /// Independent copy of the pixel array.
    pub fn snapshot(&self) -> Vec<P> {
        self.pixels.clone()
    }

    /// Restore a snapshot taken with [`PixelBuffer::snapshot`].
    pub fn restore(&mut self, snapshot: &[P]) -> RasterResult<()> {
        self.load_external(snapshot)
    }

    /// Publish pixels to the sink if anything changed since the last commit.
    ///
    /// Returns whether an upload happened.
    pub fn commit<S: DisplaySink<P> + ?Sized>(&mut self, sink: &mut S) -> bool {
        if !self.dirty {
            return false;
        }

        sink.upload(self.id, self.width, self.height, &self.pixels);
        self.dirty = false;
        true
    }

    /// Approximate heap size of the pixel data.
    pub fn memory_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<P>()
    }
}

/// Cloning produces an independent buffer with its own identity.
impl<P: Pixel> Clone for PixelBuffer<P> {
    fn clone(&self) -> Self {
        Self {
            id: BufferId::next(),
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
            dirty: true,
        }
    }
}

impl<P: Pixel> fmt::Debug for PixelBuffer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PixelBuffer<Color> {
    /// Load a decoded RGBA image.
    pub fn from_rgba_image(image: &RgbaImage) -> RasterResult<Self> {
        let pixels = image.pixels().map(|p| Color::from_array(p.0)).collect();
        Self::from_pixels(image.width(), image.height(), pixels)
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            Rgba(self.pixels[y as usize * self.width as usize + x as usize].to_array())
        })
    }
}

impl PixelBuffer<u8> {
    /// Load the alpha channel of a decoded RGBA image as coverage.
    pub fn from_rgba_alpha(image: &RgbaImage) -> RasterResult<Self> {
        let pixels = image.pixels().map(|p| p.0[3]).collect();
        Self::from_pixels(image.width(), image.height(), pixels)
    }

    pub fn to_luma_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([self.pixels[y as usize * self.width as usize + x as usize]])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_buffer() {
        let buffer = PixelBuffer::<Color>::new(100, 50).unwrap();
        assert_eq!(buffer.width(), 100);
        assert_eq!(buffer.height(), 50);
        assert_eq!(buffer.pixels().len(), 100 * 50);
        assert!(buffer.pixels().iter().all(|p| *p == Color::TRANSPARENT));

        let bytes = PixelBuffer::<u8>::new(3, 7).unwrap();
        assert_eq!(bytes.pixels().len(), 21);
        assert!(bytes.pixels().iter().all(|p| *p == 0));
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(matches!(
            PixelBuffer::<u8>::new(0, 4),
            Err(RasterError::InvalidDimensions { .. })
        ));
        assert!(PixelBuffer::<u8>::new(4, 0).is_err());
    }

    #[test]
    fn test_get_set_bounds() {
        let mut buffer = PixelBuffer::<u8>::new(4, 4).unwrap();
        buffer.set(3, 2, 9).unwrap();
        assert_eq!(buffer.get(3, 2).unwrap(), 9);
        assert!(matches!(buffer.get(4, 0), Err(RasterError::OutOfBounds { .. })));
        assert!(matches!(buffer.set(-1, 0, 1), Err(RasterError::OutOfBounds { .. })));
    }

    #[test]
    fn test_commit_only_when_dirty() {
        let mut buffer = PixelBuffer::<u8>::new(2, 2).unwrap();
        let mut sink = CaptureSink::new();

        assert!(buffer.commit(&mut sink));
        assert!(!buffer.is_dirty());
        assert!(!buffer.commit(&mut sink));
        assert_eq!(sink.upload_count, 1);

        buffer.set(1, 1, 200).unwrap();
        assert!(buffer.commit(&mut sink));
        assert_eq!(sink.pixels(buffer.id()), Some(&[0, 0, 0, 200][..]));
    }

    #[test]
    fn test_load_external() {
        let mut buffer = PixelBuffer::<u8>::new(2, 2).unwrap();
        buffer.commit(&mut NullSink);

        buffer.load_external(&[1, 2, 3, 4]).unwrap();
        assert!(buffer.is_dirty());
        assert_eq!(buffer.get(0, 1).unwrap(), 3);

        assert!(matches!(
            buffer.load_external(&[1, 2, 3]),
            Err(RasterError::SizeMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_clone_gets_new_identity() {
        let buffer = PixelBuffer::<u8>::filled(2, 2, 5).unwrap();
        let copy = buffer.clone();
        assert_ne!(buffer.id(), copy.id());
        assert_eq!(buffer.pixels(), copy.pixels());
    }

    #[test]
    fn test_image_round_trip() {
        let mut image = RgbaImage::new(3, 2);
        image.put_pixel(2, 1, Rgba([10, 20, 30, 40]));

        let colors = PixelBuffer::from_rgba_image(&image).unwrap();
        assert_eq!(colors.get(2, 1).unwrap(), Color::rgba(10, 20, 30, 40));
        assert_eq!(colors.to_rgba_image(), image);

        let mask = PixelBuffer::from_rgba_alpha(&image).unwrap();
        assert_eq!(mask.get(2, 1).unwrap(), 40);
        assert_eq!(mask.to_luma_image().get_pixel(2, 1).0, [40]);
    }
}
