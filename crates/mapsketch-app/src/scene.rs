//! Scene composition: one engine, its drawing layer, and the tools.

use crate::config::AppConfig;
use crate::script::{Script, ScriptAction};
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use kurbo::{Point, Rect};
use log::{debug, error, info};
use mapsketch_core::engine::{AnalysisId, AnalysisKind};
use mapsketch_core::{
    Artifact, ArtifactId, EngineError, MemoryEngine, PreviewGeometry, SessionStatus, ToolKind,
    ToolManager, accumulate,
};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// A committed building as reported by the scene.
#[derive(Debug, Clone, Serialize)]
pub struct BuildingSummary {
    pub id: ArtifactId,
    pub vertices: usize,
    pub height: f64,
    pub bounds: Option<Rect>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub id: AnalysisId,
    pub kind: AnalysisKind,
    pub interactive: bool,
    pub creating: bool,
}

/// Observable state of the scene after a run.
#[derive(Debug, Clone, Serialize)]
pub struct SceneSummary {
    pub title: String,
    pub buildings: Vec<BuildingSummary>,
    pub analyses: Vec<AnalysisSummary>,
    pub preview: Option<PreviewGeometry>,
    pub building_tool: SessionStatus,
    pub viewshed_tool: SessionStatus,
    /// Setup failures reported by `start`.
    pub failures: Vec<String>,
}

/// Headless scene view hosting the building and viewshed tools.
pub struct MapScene {
    title: String,
    engine: Rc<MemoryEngine>,
    tools: Rc<ToolManager>,
    /// Runs `start` calls, which may wait on engine handshakes.
    pool: LocalPool,
    failures: Rc<RefCell<Vec<String>>>,
}

impl MapScene {
    pub fn new(config: &AppConfig) -> Self {
        let engine = Rc::new(MemoryEngine::new());
        let tools = Rc::new(ToolManager::new(engine.clone(), &config.tools));
        Self {
            title: config.title.clone(),
            engine,
            tools,
            pool: LocalPool::new(),
            failures: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }

    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    /// Press a tool's start button. Setup keeps running in the background
    /// until the engine answers.
    pub fn start(&mut self, tool: ToolKind) {
        let tools = Rc::clone(&self.tools);
        let failures = Rc::clone(&self.failures);
        let spawned = self.pool.spawner().spawn_local(async move {
            match tools.start(tool).await {
                Ok(session) => debug!("{:?} start settled: {:?}", tool, session.status()),
                Err(err) => {
                    error!("{:?} tool failed to start: {}", tool, err);
                    failures.borrow_mut().push(err.to_string());
                }
            }
        });
        if let Err(err) = spawned {
            error!("Could not schedule {:?} start: {}", tool, err);
        }
        self.pool.run_until_stalled();
    }

    /// Apply one user action and let pending work settle.
    pub fn apply(&mut self, action: &ScriptAction) {
        debug!("Applying {:?}", action);
        let engine = Rc::clone(&self.engine);
        match action {
            ScriptAction::Start { tool } => {
                self.start(*tool);
                return;
            }
            ScriptAction::Cancel { tool } => {
                self.tools.cancel(*tool);
            }
            ScriptAction::AddVertex { x, y } => {
                engine.add_vertex(Point::new(*x, *y));
            }
            ScriptAction::RemoveVertex => {
                engine.remove_vertex();
            }
            ScriptAction::MoveCursor { x, y } => {
                engine.move_cursor(Point::new(*x, *y));
            }
            ScriptAction::Undo => {
                engine.undo();
            }
            ScriptAction::Redo => {
                engine.redo();
            }
            ScriptAction::Complete => {
                engine.complete();
            }
            ScriptAction::ResolveHandshake => {
                engine.resolve_next();
            }
            ScriptAction::FailHandshake { reason } => {
                engine.fail_next(EngineError::Refused(reason.clone()));
            }
        }
        self.pool.run_until_stalled();
    }

    /// Replay a whole script.
    pub fn run_script(&mut self, script: &Script) -> SceneSummary {
        info!("Replaying {} actions", script.actions.len());
        for action in &script.actions {
            self.apply(action);
        }
        self.summary()
    }

    pub fn summary(&self) -> SceneSummary {
        let buildings = self
            .engine
            .artifacts()
            .into_iter()
            .map(|artifact| match artifact {
                Artifact::Extrusion(extrusion) => BuildingSummary {
                    id: extrusion.id,
                    vertices: extrusion.ring.len(),
                    height: extrusion.style.height,
                    bounds: accumulate(&extrusion.ring).bounds(),
                },
            })
            .collect();
        let analyses = self
            .engine
            .analyses()
            .into_iter()
            .map(|record| AnalysisSummary {
                id: record.id,
                kind: record.kind,
                interactive: record.interactive,
                creating: record.is_creating(),
            })
            .collect();

        SceneSummary {
            title: self.title.clone(),
            buildings,
            analyses,
            preview: self.engine.preview(),
            building_tool: self.tools.status(ToolKind::Building),
            viewshed_tool: self.tools.status(ToolKind::Viewshed),
            failures: self.failures.borrow().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> MapScene {
        MapScene::new(&AppConfig::default())
    }

    #[test]
    fn test_demo_script() {
        let mut scene = scene();
        let summary = scene.run_script(&Script::demo());

        assert_eq!(summary.title, "MapSketch");
        assert_eq!(summary.buildings.len(), 1);
        let building = &summary.buildings[0];
        assert_eq!(building.vertices, 4);
        assert_eq!(building.height, 50.0);
        assert_eq!(building.bounds, Some(Rect::new(0.0, 0.0, 40.0, 30.0)));

        assert!(summary.preview.is_none());
        assert_eq!(summary.building_tool, SessionStatus::Idle);

        assert_eq!(summary.analyses.len(), 1);
        assert!(summary.analyses[0].interactive);
        assert!(summary.analyses[0].creating);
        assert_eq!(summary.viewshed_tool, SessionStatus::Active);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn test_viewshed_waits_for_handshake() {
        let mut scene = scene();
        scene.apply(&ScriptAction::Start { tool: ToolKind::Viewshed });

        assert_eq!(scene.tools().status(ToolKind::Viewshed), SessionStatus::Active);
        assert!(!scene.tools().viewshed.is_interactive());

        scene.apply(&ScriptAction::ResolveHandshake);
        assert!(scene.tools().viewshed.is_interactive());
    }

    #[test]
    fn test_failed_handshake_is_reported() {
        let mut scene = scene();
        scene.apply(&ScriptAction::Start { tool: ToolKind::Viewshed });
        scene.apply(&ScriptAction::FailHandshake { reason: "no terrain".to_string() });

        let summary = scene.summary();
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].contains("no terrain"));
        assert_eq!(summary.viewshed_tool, SessionStatus::Idle);
        assert!(summary.analyses.is_empty());
    }

    #[test]
    fn test_abandoned_footprint_leaves_nothing() {
        let mut scene = scene();
        scene.apply(&ScriptAction::Start { tool: ToolKind::Building });
        scene.apply(&ScriptAction::AddVertex { x: 0.0, y: 0.0 });
        scene.apply(&ScriptAction::AddVertex { x: 5.0, y: 0.0 });
        assert!(scene.summary().preview.is_some());

        scene.apply(&ScriptAction::Start { tool: ToolKind::Building });
        let summary = scene.summary();
        assert!(summary.preview.is_none());
        assert!(summary.buildings.is_empty());
        assert_eq!(summary.building_tool, SessionStatus::Active);
    }
}
