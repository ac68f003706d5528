//! Tool system for the scene.
//!
//! Each tool is a [`SessionController`] bound to its committer. Tools are
//! independent surfaces: starting one never cancels the other.

use crate::committer::{AnalysisRegistrationCommitter, ExtrusionCommitter};
use crate::config::ToolConfig;
use crate::engine::{AnalysisEngine, AnalysisKind, SceneLayer, TransientGraphics, VertexSource};
use crate::session::{
    DrawingSurface, InteractionSession, SessionController, SessionResult, SessionStatus,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Draw a footprint and extrude it into a building.
    Building,
    /// Place a viewshed analysis interactively.
    Viewshed,
}

/// Draws building footprints and commits them as extrusions.
pub struct BuildingTool {
    controller: SessionController,
}

impl BuildingTool {
    pub fn new(
        source: Rc<dyn VertexSource>,
        graphics: Rc<dyn TransientGraphics>,
        layer: Rc<dyn SceneLayer>,
        config: &ToolConfig,
    ) -> Self {
        let committer = ExtrusionCommitter::new(layer, config.extrusion.clone());
        let controller = SessionController::new(Rc::new(committer))
            .with_drawing(DrawingSurface {
                source,
                graphics,
                style: config.preview.clone(),
            })
            .with_spatial_reference(config.spatial_reference);
        Self { controller }
    }

    /// Start drawing a new building, aborting any unfinished one.
    pub async fn start(&self) -> SessionResult<InteractionSession> {
        self.controller.start().await
    }

    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    pub fn status(&self) -> SessionStatus {
        self.controller.status()
    }

    pub fn current(&self) -> Option<InteractionSession> {
        self.controller.current()
    }
}

/// Registers viewshed analyses whose placement the engine drives.
pub struct ViewshedTool {
    controller: SessionController,
    committer: Rc<AnalysisRegistrationCommitter>,
}

impl ViewshedTool {
    pub fn new(engine: Rc<dyn AnalysisEngine>) -> Self {
        let committer = Rc::new(AnalysisRegistrationCommitter::new(
            engine,
            AnalysisKind::Viewshed,
        ));
        let controller = SessionController::new(committer.clone());
        Self {
            controller,
            committer,
        }
    }

    /// Start placing a new viewshed, aborting any pending or active one.
    pub async fn start(&self) -> SessionResult<InteractionSession> {
        self.controller.start().await
    }

    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    pub fn status(&self) -> SessionStatus {
        self.controller.status()
    }

    pub fn current(&self) -> Option<InteractionSession> {
        self.controller.current()
    }

    /// Whether a viewshed is currently interactive in the view.
    pub fn is_interactive(&self) -> bool {
        self.committer.is_live()
    }
}

/// Manages the scene's tools.
pub struct ToolManager {
    pub building: BuildingTool,
    pub viewshed: ViewshedTool,
}

impl ToolManager {
    /// Wire both tools to one engine.
    pub fn new<E>(engine: Rc<E>, config: &ToolConfig) -> Self
    where
        E: VertexSource + TransientGraphics + SceneLayer + AnalysisEngine + 'static,
    {
        Self {
            building: BuildingTool::new(engine.clone(), engine.clone(), engine.clone(), config),
            viewshed: ViewshedTool::new(engine),
        }
    }

    pub async fn start(&self, tool: ToolKind) -> SessionResult<InteractionSession> {
        match tool {
            ToolKind::Building => self.building.start().await,
            ToolKind::Viewshed => self.viewshed.start().await,
        }
    }

    pub fn cancel(&self, tool: ToolKind) -> bool {
        match tool {
            ToolKind::Building => self.building.cancel(),
            ToolKind::Viewshed => self.viewshed.cancel(),
        }
    }

    pub fn status(&self, tool: ToolKind) -> SessionStatus {
        match tool {
            ToolKind::Building => self.building.status(),
            ToolKind::Viewshed => self.viewshed.status(),
        }
    }

    /// Check if any tool interaction is live.
    pub fn is_active(&self) -> bool {
        self.building.status().is_live() || self.viewshed.status().is_live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, MemoryEngine};
    use crate::session::SessionError;
    use kurbo::Point;

    fn setup() -> (Rc<MemoryEngine>, ToolManager) {
        let engine = Rc::new(MemoryEngine::new());
        let tools = ToolManager::new(engine.clone(), &ToolConfig::default());
        (engine, tools)
    }

    #[test]
    fn test_viewshed_handshake() {
        let (engine, tools) = setup();

        let session = pollster::block_on(async {
            let mut start = std::pin::pin!(tools.viewshed.start());
            assert!(futures::poll!(start.as_mut()).is_pending());
            assert_eq!(tools.viewshed.status(), SessionStatus::Active);
            assert!(!tools.viewshed.is_interactive());

            engine.resolve_next();
            start.await
        })
        .unwrap();

        assert_eq!(session.status(), SessionStatus::Active);
        assert!(tools.viewshed.is_interactive());
        let analyses = engine.analyses();
        assert_eq!(analyses.len(), 1);
        assert!(analyses[0].interactive);
        assert!(analyses[0].creation.as_ref().unwrap().same_as(session.token()));
    }

    #[test]
    fn test_racing_viewshed_starts() {
        let (engine, tools) = setup();

        let (first, second) = pollster::block_on(async {
            let mut first = std::pin::pin!(tools.viewshed.start());
            assert!(futures::poll!(first.as_mut()).is_pending());
            let mut second = std::pin::pin!(tools.viewshed.start());
            assert!(futures::poll!(second.as_mut()).is_pending());

            assert_eq!(engine.pending_registrations(), 2);
            engine.resolve_all();
            (first.await, second.await)
        });
        let first = first.unwrap();
        let second = second.unwrap();

        assert_eq!(first.status(), SessionStatus::Cancelled);
        assert_eq!(second.status(), SessionStatus::Active);

        // Only the second handshake produced an analysis, and only it was
        // ever made interactive.
        let analyses = engine.analyses();
        assert_eq!(analyses.len(), 1);
        assert_eq!(engine.interactive_calls(), vec![(analyses[0].id, true)]);
        assert!(analyses[0].is_creating());
    }

    #[test]
    fn test_first_handshake_resolving_late_has_no_effect() {
        let (engine, tools) = setup();

        let (first, second) = pollster::block_on(async {
            let mut first = std::pin::pin!(tools.viewshed.start());
            assert!(futures::poll!(first.as_mut()).is_pending());
            let mut second = std::pin::pin!(tools.viewshed.start());
            assert!(futures::poll!(second.as_mut()).is_pending());

            // The second handshake settles first; the first never does.
            engine.resolve_next();
            let second = second.await;
            let first = first.await;
            (first, second)
        });

        assert_eq!(first.unwrap().status(), SessionStatus::Cancelled);
        assert_eq!(second.unwrap().status(), SessionStatus::Active);
        assert_eq!(engine.analyses().len(), 1);
        assert_eq!(engine.interactive_calls().len(), 1);
    }

    #[test]
    fn test_viewshed_setup_failure_leaves_tool_idle() {
        let (engine, tools) = setup();

        let result = pollster::block_on(async {
            let mut start = std::pin::pin!(tools.viewshed.start());
            assert!(futures::poll!(start.as_mut()).is_pending());
            engine.fail_next(EngineError::Refused("analysis view unavailable".to_string()));
            start.await
        });

        assert!(matches!(result, Err(SessionError::SetupFailed(EngineError::Refused(_)))));
        assert_eq!(tools.viewshed.status(), SessionStatus::Idle);
        assert!(tools.viewshed.current().is_none());
        assert!(engine.analyses().is_empty());
    }

    #[test]
    fn test_restarting_viewshed_releases_previous_analysis() {
        let (engine, tools) = setup();

        let start_resolved = || {
            pollster::block_on(async {
                let mut start = std::pin::pin!(tools.viewshed.start());
                assert!(futures::poll!(start.as_mut()).is_pending());
                engine.resolve_next();
                start.await
            })
            .unwrap()
        };
        let first = start_resolved();
        let second = start_resolved();

        assert_eq!(first.status(), SessionStatus::Cancelled);
        assert_eq!(second.status(), SessionStatus::Active);

        let analyses = engine.analyses();
        assert_eq!(analyses.len(), 2);
        assert!(!analyses[0].interactive);
        assert!(!analyses[0].is_creating());
        assert!(analyses[1].interactive);

        assert!(tools.viewshed.cancel());
        assert!(!tools.viewshed.is_interactive());
        assert!(!engine.analyses()[1].is_creating());
    }

    #[test]
    fn test_tools_are_independent() {
        let (engine, tools) = setup();

        let building = pollster::block_on(tools.start(ToolKind::Building)).unwrap();
        engine.add_vertex(Point::new(0.0, 0.0));
        engine.add_vertex(Point::new(1.0, 0.0));

        let viewshed = pollster::block_on(async {
            let mut start = std::pin::pin!(tools.start(ToolKind::Viewshed));
            assert!(futures::poll!(start.as_mut()).is_pending());
            engine.resolve_next();
            start.await
        })
        .unwrap();

        assert_eq!(building.status(), SessionStatus::Active);
        assert_eq!(viewshed.status(), SessionStatus::Active);
        assert!(engine.preview().is_some());
        assert!(tools.is_active());

        assert!(tools.cancel(ToolKind::Building));
        assert_eq!(tools.status(ToolKind::Building), SessionStatus::Idle);
        assert_eq!(tools.status(ToolKind::Viewshed), SessionStatus::Active);
    }

    #[test]
    fn test_building_uses_configured_styles() {
        let engine = Rc::new(MemoryEngine::new());
        let mut config = ToolConfig::default();
        config.preview.width = 1.0;
        config.extrusion.height = 8.0;
        config.spatial_reference.wkid = 4326;
        let tools = ToolManager::new(engine.clone(), &config);

        pollster::block_on(tools.building.start()).unwrap();
        engine.add_vertex(Point::new(0.0, 0.0));
        assert_eq!(engine.preview_style().unwrap().width, 1.0);
        engine.add_vertex(Point::new(1.0, 0.0));
        engine.add_vertex(Point::new(1.0, 1.0));
        engine.complete();

        let artifacts = engine.artifacts();
        let crate::committer::Artifact::Extrusion(extrusion) = &artifacts[0];
        assert_eq!(extrusion.style.height, 8.0);
        assert_eq!(extrusion.spatial_reference.wkid, 4326);
    }
}
