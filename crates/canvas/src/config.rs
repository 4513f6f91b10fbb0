//! Canvas configuration.

use common::color::Pixel;
use common::error::{RasterError, RasterResult};
use serde::{Deserialize, Serialize};
use texture::{BufferPool, DEFAULT_BUFFER_SIZE};

/// Canvas configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Side length of each canvas cell in pixels.
    pub cell_size: u32,
    /// Side length of buffers the brush pool allocates.
    pub pool_buffer_size: u32,
    /// Maximum number of free buffers the pool keeps around.
    pub pool_capacity: usize,
}

impl CanvasConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Small cells and buffers, handy for tests and tiny documents.
    pub fn small_tiles() -> Self {
        Self {
            cell_size: 8,
            pool_buffer_size: 32,
            ..Self::default()
        }
    }

    /// Set cell size.
    pub fn with_cell_size(mut self, cell_size: u32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Set pool buffer size.
    pub fn with_pool_buffer_size(mut self, size: u32) -> Self {
        self.pool_buffer_size = size;
        self
    }

    /// Set pool capacity.
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Reject sizes no canvas can be built with.
    pub fn validate(&self) -> RasterResult<()> {
        if self.cell_size == 0 {
            return Err(RasterError::invalid_dimensions(self.cell_size, self.cell_size));
        }
        if self.pool_buffer_size == 0 {
            return Err(RasterError::invalid_dimensions(
                self.pool_buffer_size,
                self.pool_buffer_size,
            ));
        }
        Ok(())
    }

    /// A brush pool sized by this configuration.
    pub fn build_pool<P: Pixel>(&self) -> BufferPool<P> {
        BufferPool::with_buffer_size(self.pool_buffer_size).with_capacity(self.pool_capacity)
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            cell_size: 64,
            pool_buffer_size: DEFAULT_BUFFER_SIZE,
            pool_capacity: 64,
        }
    }
}
