//! Tiled canvases with transactional undo.
//!
//! This crate handles:
//! - An unbounded grid of lazily allocated cells
//! - Routing brush views across the cells they overlap
//! - Recording cell snapshots for undo and redo

pub mod config;
pub mod history;
pub mod tiled;

pub use config::CanvasConfig;
pub use history::{CanvasChange, ChangeLog, LogState};
pub use tiled::{CanvasId, CanvasSet, CanvasStore, TiledCanvas};
