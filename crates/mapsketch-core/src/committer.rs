//! Turning a finished interaction into a persistent artifact.

use crate::cancel::CancellationToken;
use crate::engine::{
    AnalysisEngine, AnalysisKind, BoxFuture, EngineResult, InteractiveHandle, SceneLayer,
};
use crate::geometry::{GeometryKind, PreviewGeometry, SpatialReference};
use crate::style::ExtrusionStyle;
use kurbo::Point;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

/// Unique identifier for committed artifacts.
pub type ArtifactId = Uuid;

/// A building footprint extruded into a 3D volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extrusion {
    pub id: ArtifactId,
    /// Open footprint ring, exactly as drawn.
    pub ring: Vec<Point>,
    pub spatial_reference: SpatialReference,
    pub style: ExtrusionStyle,
}

/// Artifacts handed over to the scene. Ownership moves to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Artifact {
    Extrusion(Extrusion),
}

impl Artifact {
    pub fn id(&self) -> ArtifactId {
        match self {
            Artifact::Extrusion(e) => e.id,
        }
    }
}

/// Result of handing a final geometry to a committer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed(ArtifactId),
    /// The geometry was not something this committer turns into an artifact.
    NotApplicable,
}

impl CommitOutcome {
    pub fn artifact(&self) -> Option<ArtifactId> {
        match self {
            CommitOutcome::Committed(id) => Some(*id),
            CommitOutcome::NotApplicable => None,
        }
    }
}

/// Capability that turns a completed interaction into an artifact.
pub trait ArtifactCommitter {
    /// Short name for log output.
    fn name(&self) -> &'static str;

    /// Geometry kind accepted at completion. `None` for committers whose
    /// interaction is handled entirely by the engine.
    fn accepted_kind(&self) -> Option<GeometryKind>;

    /// Engine setup awaited by `start` before the session is usable.
    /// Must stop producing effects once `token` trips.
    fn prepare<'a>(&'a self, _token: &'a CancellationToken) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Commit the final geometry of a completed session.
    fn commit(&self, geometry: PreviewGeometry) -> CommitOutcome;

    /// Release whatever `prepare` left live for a session being cancelled.
    fn abort(&self) {}
}

/// Commits closed footprints as extruded buildings on a scene layer.
pub struct ExtrusionCommitter {
    layer: Rc<dyn SceneLayer>,
    style: ExtrusionStyle,
}

impl ExtrusionCommitter {
    pub fn new(layer: Rc<dyn SceneLayer>, style: ExtrusionStyle) -> Self {
        Self { layer, style }
    }

    pub fn style(&self) -> &ExtrusionStyle {
        &self.style
    }
}

impl ArtifactCommitter for ExtrusionCommitter {
    fn name(&self) -> &'static str {
        "extrusion"
    }

    fn accepted_kind(&self) -> Option<GeometryKind> {
        Some(GeometryKind::Polygon)
    }

    fn commit(&self, geometry: PreviewGeometry) -> CommitOutcome {
        if !geometry.is_polygon() {
            debug!("Extrusion needs a polygon, got {} vertices", geometry.len());
            return CommitOutcome::NotApplicable;
        }

        let extrusion = Extrusion {
            id: Uuid::new_v4(),
            ring: geometry.points,
            spatial_reference: geometry.spatial_reference,
            style: self.style.clone(),
        };
        let id = extrusion.id;
        info!(
            "Adding building {} ({} vertices, {} m)",
            id,
            extrusion.ring.len(),
            extrusion.style.height
        );
        self.layer.add(Artifact::Extrusion(extrusion));
        CommitOutcome::Committed(id)
    }
}

/// Registers an engine-driven analysis; drawn geometry is never consumed.
pub struct AnalysisRegistrationCommitter {
    engine: Rc<dyn AnalysisEngine>,
    kind: AnalysisKind,
    /// Handle made interactive by the live session, if any.
    live: RefCell<Option<Box<dyn InteractiveHandle>>>,
}

impl AnalysisRegistrationCommitter {
    pub fn new(engine: Rc<dyn AnalysisEngine>, kind: AnalysisKind) -> Self {
        Self {
            engine,
            kind,
            live: RefCell::new(None),
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }

    /// Whether a session currently owns an interactive analysis.
    pub fn is_live(&self) -> bool {
        self.live.borrow().is_some()
    }
}

impl ArtifactCommitter for AnalysisRegistrationCommitter {
    fn name(&self) -> &'static str {
        "analysis"
    }

    fn accepted_kind(&self) -> Option<GeometryKind> {
        None
    }

    fn prepare<'a>(&'a self, token: &'a CancellationToken) -> BoxFuture<'a, EngineResult<()>> {
        Box::pin(async move {
            let registration = self.engine.register(self.kind, token);
            let Some(handle) = token.run_until_cancelled(registration).await else {
                debug!("{:?} registration abandoned", self.kind);
                return Ok(());
            };
            let handle = handle?;

            handle.set_interactive(true);
            handle.begin_creation(token.clone());
            info!("{:?} analysis {} is interactive", self.kind, handle.id());

            if let Some(previous) = self.live.replace(Some(handle)) {
                previous.set_interactive(false);
            }
            Ok(())
        })
    }

    fn commit(&self, _geometry: PreviewGeometry) -> CommitOutcome {
        CommitOutcome::NotApplicable
    }

    fn abort(&self) {
        if let Some(handle) = self.live.borrow_mut().take() {
            debug!("{:?} analysis {} no longer interactive", self.kind, handle.id());
            handle.set_interactive(false);
        }
    }
}
