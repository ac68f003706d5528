//! Application configuration.

use mapsketch_core::{ConfigError, ToolConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    pub tools: ToolConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "MapSketch".to_string(),
            tools: ToolConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "tools": { "extrusion": { "height": 20.0 } } }"#)
            .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.title, "MapSketch");
        assert_eq!(config.tools.extrusion.height, 20.0);
        assert_eq!(config.tools.preview, ToolConfig::default().preview);
    }
}
