//! Scripted user input for headless runs.
//!
//! A script is a JSON list of actions replayed in order against a
//! [`MapScene`](crate::MapScene):
//! ```json
//! { "actions": [
//!     { "action": "start", "tool": "building" },
//!     { "action": "add_vertex", "x": 0.0, "y": 0.0 },
//!     { "action": "complete" }
//! ] }
//! ```

use mapsketch_core::ToolKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Script loading errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptAction {
    /// Press a tool's start button.
    Start { tool: ToolKind },
    Cancel { tool: ToolKind },
    AddVertex { x: f64, y: f64 },
    RemoveVertex,
    MoveCursor { x: f64, y: f64 },
    Undo,
    Redo,
    /// Finish the shape being drawn.
    Complete,
    /// The engine answers the oldest pending analysis handshake.
    ResolveHandshake,
    /// The engine rejects the oldest pending analysis handshake.
    FailHandshake { reason: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Script {
    pub actions: Vec<ScriptAction>,
}

impl Script {
    pub fn from_json_str(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Built-in walkthrough: one building, an abandoned footprint, and two
    /// viewshed starts racing on the engine handshake.
    pub fn demo() -> Self {
        use ScriptAction::*;

        Self {
            actions: vec![
                Start { tool: ToolKind::Building },
                AddVertex { x: 0.0, y: 0.0 },
                AddVertex { x: 40.0, y: 0.0 },
                MoveCursor { x: 40.0, y: 25.0 },
                AddVertex { x: 40.0, y: 30.0 },
                AddVertex { x: 0.0, y: 30.0 },
                Complete,
                Start { tool: ToolKind::Building },
                AddVertex { x: 100.0, y: 100.0 },
                Start { tool: ToolKind::Building },
                Cancel { tool: ToolKind::Building },
                Start { tool: ToolKind::Viewshed },
                Start { tool: ToolKind::Viewshed },
                ResolveHandshake,
            ],
        }
    }
}
