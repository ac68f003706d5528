//! Boundary contracts with the external map engine.
//!
//! The engine owns rendering, picking and analysis computation. Sessions
//! only reach it through these traits:
//! - [`VertexSource`] streams pointer-driven vertex edits,
//! - [`TransientGraphics`] shows the single live preview,
//! - [`SceneLayer`] receives committed artifacts,
//! - [`AnalysisEngine`] registers interactive analyses.
//!
//! All of them are single-threaded and take `&self`; implementations use
//! interior mutability.

mod memory;

pub use memory::{AnalysisRecord, MemoryEngine};

use crate::cancel::CancellationToken;
use crate::committer::Artifact;
use crate::geometry::PreviewGeometry;
use crate::style::LineStyle;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use uuid::Uuid;

/// Errors reported by the map engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine refused request: {0}")]
    Refused(String),
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
    /// The request's cancellation token tripped before it finished.
    #[error("Request aborted")]
    Aborted,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Boxed future for engine handshakes (single-threaded, not `Send`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// What happened to the vertex sequence of a draw action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexEventKind {
    VertexAdd,
    VertexRemove,
    CursorUpdate,
    Undo,
    Redo,
    /// The user finalized the shape. Always the last event of an action.
    DrawComplete,
}

/// A vertex-stream notification carrying the full current vertex sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexEvent {
    pub kind: VertexEventKind,
    pub vertices: Vec<Point>,
}

impl VertexEvent {
    pub fn new(kind: VertexEventKind, vertices: Vec<Point>) -> Self {
        Self { kind, vertices }
    }

    pub fn complete(vertices: Vec<Point>) -> Self {
        Self::new(VertexEventKind::DrawComplete, vertices)
    }

    pub fn is_complete(&self) -> bool {
        self.kind == VertexEventKind::DrawComplete
    }
}

/// Subscriber callback for one draw action.
pub type VertexSink = Box<dyn FnMut(VertexEvent)>;

/// Pointer-interaction collaborator that turns clicks into vertices.
pub trait VertexSource {
    /// Abort the active draw action, if any, and drop its subscriber.
    fn reset(&self);

    /// Begin a click-mode polygon draw action delivering events to `sink`
    /// in order, ending with a [`VertexEventKind::DrawComplete`] event.
    fn create_polygon(&self, sink: VertexSink);

    /// Move input focus to the view so the first click lands.
    fn focus(&self) {}
}

/// Surface holding the transient preview graphic (at most one).
pub trait TransientGraphics {
    /// Show `geometry`, replacing any previous preview.
    fn replace(&self, geometry: &PreviewGeometry, style: &LineStyle);

    /// Remove the preview.
    fn clear(&self);
}

/// Permanent drawing layer of the scene.
pub trait SceneLayer {
    fn add(&self, artifact: Artifact);
}

/// Kinds of interactive analysis the engine can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Viewshed,
}

/// Engine-assigned identifier of a registered analysis.
pub type AnalysisId = Uuid;

/// Live handle to a registered analysis view.
pub trait InteractiveHandle {
    fn id(&self) -> AnalysisId;

    /// Let the user manipulate the analysis in the view.
    fn set_interactive(&self, interactive: bool);

    /// Start the engine's own interactive placement. The engine aborts it
    /// when `token` trips.
    fn begin_creation(&self, token: CancellationToken);
}

/// Registration of long-lived analysis objects.
pub trait AnalysisEngine {
    /// Register an analysis and wait until its view can report
    /// interactivity. Implementations should give up with
    /// [`EngineError::Aborted`] once `token` trips.
    fn register(
        &self,
        kind: AnalysisKind,
        token: &CancellationToken,
    ) -> BoxFuture<'_, EngineResult<Box<dyn InteractiveHandle>>>;
}
