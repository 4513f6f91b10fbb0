//! Buffer pooling for short-lived drawing operations.

use crate::buffer::{BufferId, PixelBuffer};
use crate::view::View;
use common::color::Pixel;
use common::error::{RasterError, RasterResult};
use common::geometry::{IntPoint, PixelRect};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Side length of the buffers a pool allocates by default.
pub const DEFAULT_BUFFER_SIZE: u32 = 256;

const DEFAULT_CAPACITY: usize = 64;

/// Pool accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers ever allocated by the pool.
    pub constructed: usize,
    /// Buffers currently checked out.
    pub live: usize,
    /// Buffers waiting in the free list.
    pub free: usize,
}

/// Reuses fixed-footprint pixel buffers.
///
/// Checked-out buffers are tracked by [`BufferId`], so a buffer can only be
/// returned once per acquisition.
pub struct BufferPool<P: Pixel> {
    free: Vec<PixelBuffer<P>>,
    checked_out: HashSet<BufferId>,
    buffer_size: u32,
    capacity: usize,
    constructed: usize,
}

impl<P: Pixel> BufferPool<P> {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: u32) -> Self {
        Self {
            free: Vec::new(),
            checked_out: HashSet::new(),
            buffer_size: buffer_size.max(1),
            capacity: DEFAULT_CAPACITY,
            constructed: 0,
        }
    }

    /// Limit how many free buffers are retained.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Check out a buffer of at least `width` x `height` pixels.
    ///
    /// Contents are whatever the previous user left behind.
    pub fn acquire_buffer(&mut self, width: u32, height: u32) -> RasterResult<PixelBuffer<P>> {
        if width == 0 || height == 0 {
            return Err(RasterError::invalid_dimensions(width, height));
        }

        let fits = self
            .free
            .iter()
            .rposition(|b| b.width() >= width && b.height() >= height);

        let buffer = match fits {
            Some(index) => self.free.swap_remove(index),
            None => {
                if !self.free.is_empty() {
                    tracing::debug!(
                        "no free buffer fits {}x{}, allocating",
                        width,
                        height
                    );
                }
                self.constructed += 1;
                PixelBuffer::new(width.max(self.buffer_size), height.max(self.buffer_size))?
            }
        };

        self.checked_out.insert(buffer.id());
        Ok(buffer)
    }

    /// Return a buffer to the free list.
    ///
    /// Buffers grown past the pool's footprint for an oversized request are
    /// dropped rather than retained.
    pub fn release_buffer(&mut self, buffer: PixelBuffer<P>) -> RasterResult<()> {
        let id = buffer.id();
        if !self.checked_out.remove(&id) {
            tracing::warn!("rejected release of {} which is not checked out", id);
            return Err(RasterError::DoubleRelease(id.as_u64()));
        }

        if buffer.width() > self.buffer_size || buffer.height() > self.buffer_size {
            tracing::debug!(
                "dropping oversized {} ({}x{})",
                id,
                buffer.width(),
                buffer.height()
            );
        } else if self.free.len() < self.capacity {
            self.free.push(buffer);
        } else {
            tracing::debug!("pool full, dropping {}", id);
        }
        Ok(())
    }

    /// Check out a view of exactly `width` x `height` at the buffer's
    /// top-left corner.
    pub fn acquire_view(&mut self, width: u32, height: u32, pivot: IntPoint) -> RasterResult<View<P>> {
        let buffer = self.acquire_buffer(width, height)?;
        View::new(buffer, PixelRect::from_size(width, height), pivot)
    }

    /// Return a view's buffer to the pool.
    pub fn release_view(&mut self, view: View<P>) -> RasterResult<()> {
        self.release_buffer(view.into_buffer())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            constructed: self.constructed,
            live: self.checked_out.len(),
            free: self.free.len(),
        }
    }

    /// Drop every free buffer.
    pub fn clear(&mut self) {
        self.free.clear();
    }
}

impl<P: Pixel> Default for BufferPool<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`BufferPool`] behind a mutex, for pools shared between threads.
pub struct SyncBufferPool<P: Pixel> {
    inner: Mutex<BufferPool<P>>,
}

impl<P: Pixel> SyncBufferPool<P> {
    pub fn new(pool: BufferPool<P>) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    pub fn acquire_buffer(&self, width: u32, height: u32) -> RasterResult<PixelBuffer<P>> {
        self.inner.lock().acquire_buffer(width, height)
    }

    pub fn release_buffer(&self, buffer: PixelBuffer<P>) -> RasterResult<()> {
        self.inner.lock().release_buffer(buffer)
    }

    pub fn acquire_view(&self, width: u32, height: u32, pivot: IntPoint) -> RasterResult<View<P>> {
        self.inner.lock().acquire_view(width, height, pivot)
    }

    pub fn release_view(&self, view: View<P>) -> RasterResult<()> {
        self.inner.lock().release_view(view)
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.lock().stats()
    }

    /// Run `f` with exclusive access to the pool.
    pub fn with<R>(&self, f: impl FnOnce(&mut BufferPool<P>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<P: Pixel> Default for SyncBufferPool<P> {
    fn default() -> Self {
        Self::new(BufferPool::new())
    }
}
