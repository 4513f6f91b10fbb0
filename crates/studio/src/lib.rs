//! Tilepaint - painting documents on tiled canvases.
//!
//! This crate ties the engine together:
//! - A document owning a canvas, a brush pool and undo history
//! - Studio configuration loaded from JSON
//! - The `tilepaint` command line tool

pub mod config;
pub mod document;

pub use config::StudioConfig;
pub use document::Document;

/// Tilepaint version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
