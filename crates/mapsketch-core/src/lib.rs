//! MapSketch Core Library
//!
//! Interactive creation sessions for the MapSketch scene viewer: drawing
//! building footprints and placing viewshed analyses on top of an external
//! map engine.

pub mod cancel;
pub mod committer;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod session;
pub mod style;
pub mod tools;

pub use cancel::CancellationToken;
pub use committer::{
    AnalysisRegistrationCommitter, Artifact, ArtifactCommitter, ArtifactId, CommitOutcome,
    Extrusion, ExtrusionCommitter,
};
pub use config::{ConfigError, ToolConfig};
pub use engine::{EngineError, MemoryEngine, VertexEvent, VertexEventKind};
pub use geometry::{GeometryKind, PreviewGeometry, SpatialReference, accumulate, accumulate_in};
pub use session::{
    InteractionSession, SessionController, SessionError, SessionResult, SessionStatus,
};
pub use style::{ExtrusionStyle, LineStyle, SerializableColor};
pub use tools::{BuildingTool, ToolKind, ToolManager, ViewshedTool};
