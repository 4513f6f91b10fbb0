//! Studio configuration.

use canvas::CanvasConfig;
use common::color::Color;
use common::error::{RasterError, RasterResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Document-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Canvas and brush pool settings.
    pub canvas: CanvasConfig,
    /// Maximum number of undo steps kept.
    pub history_limit: usize,
    /// Optional cap on memory held by undo steps, in bytes.
    pub history_memory_limit: Option<usize>,
    /// Color used for unpainted areas on export.
    pub background: Color,
}

impl StudioConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> RasterResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RasterError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> RasterResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("loaded config from {}", path.as_ref().display());
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> RasterResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RasterError::config(e.to_string()))
    }

    pub fn validate(&self) -> RasterResult<()> {
        self.canvas.validate()?;
        if self.history_limit == 0 {
            return Err(RasterError::config("history_limit must be at least 1"));
        }
        Ok(())
    }

    /// Set canvas configuration.
    pub fn with_canvas(mut self, canvas: CanvasConfig) -> Self {
        self.canvas = canvas;
        self
    }

    /// Set history limit.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Set background color.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            history_limit: 64,
            history_memory_limit: Some(256 * 1024 * 1024), // 256MB
            background: Color::TRANSPARENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_partial() {
        let config = StudioConfig::from_json_str(
            r#"{ "canvas": { "cell_size": 32 }, "history_limit": 5 }"#,
        )
        .unwrap();
        assert_eq!(config.canvas.cell_size, 32);
        assert_eq!(config.canvas.pool_buffer_size, 256);
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.background, Color::TRANSPARENT);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            StudioConfig::from_json_str("{ not json"),
            Err(RasterError::Config(_))
        ));
        assert!(StudioConfig::from_json_str(r#"{ "history_limit": 0 }"#).is_err());
        assert!(StudioConfig::from_json_str(r#"{ "canvas": { "cell_size": 0 } }"#).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = StudioConfig::new()
            .with_history_limit(3)
            .with_background(Color::WHITE);
        let parsed = StudioConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            StudioConfig::load("/definitely/not/here.json"),
            Err(RasterError::Io(_))
        ));
    }
}
