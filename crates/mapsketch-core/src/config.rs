//! Tool configuration.

use crate::geometry::SpatialReference;
use crate::style::{ExtrusionStyle, LineStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings shared by the drawing and analysis tools.
///
/// Every field is optional in JSON; missing ones take the defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Spatial reference stamped on drawn geometry.
    pub spatial_reference: SpatialReference,
    /// Symbol for the live drawing preview.
    pub preview: LineStyle,
    /// Symbol for committed buildings.
    pub extrusion: ExtrusionStyle,
}

impl ToolConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
