//! MapSketch Application
//!
//! Headless scene shell: wires the tools to an engine and replays scripted
//! user input against it.

mod config;
mod scene;
mod script;

pub use config::AppConfig;
pub use scene::{AnalysisSummary, BuildingSummary, MapScene, SceneSummary};
pub use script::{Script, ScriptAction, ScriptError};

use mapsketch_core::ConfigError;
use std::path::Path;
use thiserror::Error;

/// Errors that stop a run before it starts.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
}

/// Build the scene from `config_path` (or defaults) and replay
/// `script_path` (or the built-in demo).
pub fn run(config_path: Option<&Path>, script_path: Option<&Path>) -> Result<SceneSummary, AppError> {
    let config = match config_path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let script = match script_path {
        Some(path) => Script::load(path)?,
        None => Script::demo(),
    };

    log::info!("Opening scene \"{}\"", config.title);
    let mut scene = MapScene::new(&config);
    Ok(scene.run_script(&script))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_json(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_run_with_files() {
        let config = temp_json(r#"{ "title": "Harbor", "tools": { "extrusion": { "height": 12.0 } } }"#);
        let script = temp_json(
            r#"{ "actions": [
                { "action": "start", "tool": "building" },
                { "action": "add_vertex", "x": 0.0, "y": 0.0 },
                { "action": "add_vertex", "x": 3.0, "y": 0.0 },
                { "action": "add_vertex", "x": 3.0, "y": 3.0 },
                { "action": "undo" },
                { "action": "complete" }
            ] }"#,
        );

        let summary = run(Some(config.path()), Some(script.path())).unwrap();
        assert_eq!(summary.title, "Harbor");
        // Undo left a two-vertex polyline, which is silently discarded.
        assert!(summary.buildings.is_empty());
        assert!(summary.preview.is_none());
    }

    #[test]
    fn test_run_reports_bad_inputs() {
        let broken = temp_json("{");
        assert!(matches!(run(Some(broken.path()), None), Err(AppError::Config(_))));
        assert!(matches!(run(None, Some(broken.path())), Err(AppError::Script(_))));
    }
}
