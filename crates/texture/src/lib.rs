//! Pixel storage and compositing.
//!
//! This crate handles:
//! - Pixel buffers with dirty tracking and deferred publication
//! - Pooling of buffers for short-lived drawing operations
//! - Pivot-anchored views and view-to-view compositing
//! - The blend operator library

pub mod blend;
pub mod buffer;
pub mod pool;
pub mod view;

pub use blend::Blend;
pub use buffer::{BufferId, CaptureSink, DisplaySink, NullSink, PixelBuffer};
pub use pool::{BufferPool, PoolStats, SyncBufferPool, DEFAULT_BUFFER_SIZE};
pub use view::View;
