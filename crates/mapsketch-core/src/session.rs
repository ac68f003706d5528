//! Interactive creation sessions.
//!
//! A [`SessionController`] is the single authority over "is an interactive
//! creation in progress" for one tool surface. Every `start` preempts the
//! previous session before the new one becomes active, and every callback
//! scoped to a session checks that session's [`CancellationToken`] before it
//! touches the engine. A preempted session therefore never publishes a
//! preview or commits an artifact, even if its callbacks are still in
//! flight.

use crate::cancel::CancellationToken;
use crate::committer::{ArtifactCommitter, CommitOutcome};
use crate::engine::{EngineError, TransientGraphics, VertexEvent, VertexSource};
use crate::geometry::{SpatialReference, accumulate_in};
use crate::style::LineStyle;
use kurbo::Point;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a session.
pub type SessionId = Uuid;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Not started, or engine setup failed.
    #[default]
    Idle,
    /// Receiving vertex events (or waiting on engine setup).
    Active,
    /// Handling the final geometry.
    Completing,
    /// Preempted or cancelled.
    Cancelled,
    Completed,
}

impl SessionStatus {
    /// Active or completing: the session may still produce effects.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Active | Self::Completing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

/// Session errors surfaced to the caller of `start`.
///
/// Preemption is not an error; a superseded session simply ends
/// [`SessionStatus::Cancelled`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session setup failed: {0}")]
    SetupFailed(#[from] EngineError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Where a drawing session gets vertices and shows its preview.
#[derive(Clone)]
pub struct DrawingSurface {
    pub source: Rc<dyn VertexSource>,
    pub graphics: Rc<dyn TransientGraphics>,
    pub style: LineStyle,
}

struct SessionInner {
    id: SessionId,
    token: CancellationToken,
    status: Cell<SessionStatus>,
    committer: Rc<dyn ArtifactCommitter>,
    drawing: Option<DrawingSurface>,
    spatial_reference: SpatialReference,
    outcome: Cell<Option<CommitOutcome>>,
}

/// Handle to one interactive operation.
///
/// Clones refer to the same session. A session is never restarted: each
/// `start` creates a fresh one with its own token.
#[derive(Clone)]
pub struct InteractionSession {
    inner: Rc<SessionInner>,
}

impl fmt::Debug for InteractionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionSession")
            .field("id", &self.inner.id)
            .field("status", &self.status())
            .field("committer", &self.inner.committer.name())
            .finish()
    }
}

impl InteractionSession {
    fn new(
        committer: Rc<dyn ArtifactCommitter>,
        drawing: Option<DrawingSurface>,
        spatial_reference: SpatialReference,
    ) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                id: Uuid::new_v4(),
                token: CancellationToken::new(),
                status: Cell::new(SessionStatus::Idle),
                committer,
                drawing,
                spatial_reference,
                outcome: Cell::new(None),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.status.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// The session's cancellation signal.
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// What completion produced, once the session is completed.
    pub fn outcome(&self) -> Option<CommitOutcome> {
        self.inner.outcome.get()
    }

    /// Whether both handles refer to the same session.
    pub fn same_as(&self, other: &InteractionSession) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn transition(&self, to: SessionStatus) {
        let from = self.inner.status.replace(to);
        debug!(
            "{} session {}: {:?} -> {:?}",
            self.inner.committer.name(),
            self.inner.id,
            from,
            to
        );
    }

    /// Callbacks may only produce effects while active and not cancelled.
    fn accepts_events(&self) -> bool {
        self.status() == SessionStatus::Active && !self.is_cancelled()
    }

    /// Route one vertex-source notification.
    pub fn on_vertex_event(&self, event: &VertexEvent) {
        trace!("session {} got {:?}", self.inner.id, event.kind);
        if event.is_complete() {
            self.on_complete(&event.vertices);
        } else {
            self.on_update(&event.vertices);
        }
    }

    /// Republish the preview for the current vertices, replacing the last
    /// one. Returns `false` if the session ignored the update.
    pub fn on_update(&self, vertices: &[Point]) -> bool {
        if !self.accepts_events() {
            return false;
        }
        let Some(drawing) = &self.inner.drawing else {
            return false;
        };

        let geometry = accumulate_in(vertices, self.inner.spatial_reference);
        trace!("preview {:?} with {} vertices", geometry.kind, geometry.len());
        drawing.graphics.replace(&geometry, &drawing.style);
        true
    }

    /// Finish the session with the final vertices.
    ///
    /// Geometry that does not match the committer's accepted kind is
    /// discarded without error. Returns `None` if the session ignored the
    /// call (not active, or cancelled).
    pub fn on_complete(&self, vertices: &[Point]) -> Option<CommitOutcome> {
        if !self.accepts_events() {
            return None;
        }
        self.transition(SessionStatus::Completing);
        if let Some(drawing) = &self.inner.drawing {
            drawing.graphics.clear();
        }

        let geometry = accumulate_in(vertices, self.inner.spatial_reference);
        let committer = &self.inner.committer;
        let outcome = match committer.accepted_kind() {
            Some(kind) if kind == geometry.kind && !self.is_cancelled() => {
                committer.commit(geometry)
            }
            _ => {
                warn!(
                    "Discarding {:?} with {} vertices: not accepted by {}",
                    geometry.kind,
                    geometry.len(),
                    committer.name()
                );
                CommitOutcome::NotApplicable
            }
        };

        self.inner.outcome.set(Some(outcome));
        self.transition(SessionStatus::Completed);
        Some(outcome)
    }

    /// Cancel the session. Idempotent: returns `false` and does nothing if
    /// the session is not live.
    ///
    /// A drawing session also ends the engine's draw action, which drops
    /// its subscription to the vertex stream.
    pub fn cancel(&self) -> bool {
        if !self.status().is_live() {
            return false;
        }
        self.inner.token.cancel();
        self.inner.committer.abort();
        if let Some(drawing) = &self.inner.drawing {
            drawing.source.reset();
            drawing.graphics.clear();
        }
        self.transition(SessionStatus::Cancelled);
        true
    }

    /// Engine setup failed: silence the session and leave it idle.
    fn fail_setup(&self) {
        self.inner.token.cancel();
        self.transition(SessionStatus::Idle);
    }
}

/// Owns the "current session" slot of one tool surface.
pub struct SessionController {
    committer: Rc<dyn ArtifactCommitter>,
    drawing: Option<DrawingSurface>,
    spatial_reference: SpatialReference,
    current: RefCell<Option<InteractionSession>>,
}

impl SessionController {
    /// Controller for a committer that needs no vertex stream.
    pub fn new(committer: Rc<dyn ArtifactCommitter>) -> Self {
        Self {
            committer,
            drawing: None,
            spatial_reference: SpatialReference::default(),
            current: RefCell::new(None),
        }
    }

    /// Feed sessions from `drawing`'s vertex source and preview surface.
    pub fn with_drawing(mut self, drawing: DrawingSurface) -> Self {
        self.drawing = Some(drawing);
        self
    }

    pub fn with_spatial_reference(mut self, spatial_reference: SpatialReference) -> Self {
        self.spatial_reference = spatial_reference;
        self
    }

    pub fn committer(&self) -> &Rc<dyn ArtifactCommitter> {
        &self.committer
    }

    /// The live session, if any.
    pub fn current(&self) -> Option<InteractionSession> {
        self.current
            .borrow()
            .as_ref()
            .filter(|s| s.status().is_live())
            .cloned()
    }

    /// Status of the tool surface: the live session's, or `Idle`.
    pub fn status(&self) -> SessionStatus {
        self.current()
            .map(|s| s.status())
            .unwrap_or(SessionStatus::Idle)
    }

    /// Cancel the live session. Returns `false` if there was none.
    pub fn cancel(&self) -> bool {
        let session = self.current.borrow_mut().take();
        session.is_some_and(|s| s.cancel())
    }

    /// Start a new session, preempting the current one.
    ///
    /// Resolves once engine setup is done. If another `start` preempts this
    /// one while setup is pending, this resolves with the (cancelled)
    /// session and no further effects. Only a genuine setup failure is an
    /// error, after which the tool is idle.
    pub async fn start(&self) -> SessionResult<InteractionSession> {
        let previous = self.current.borrow_mut().take();
        if let Some(previous) = previous {
            if previous.cancel() {
                debug!("Preempted {} session {}", self.committer.name(), previous.id());
            }
        }
        if let Some(drawing) = &self.drawing {
            drawing.source.reset();
            drawing.graphics.clear();
        }

        let session = InteractionSession::new(
            Rc::clone(&self.committer),
            self.drawing.clone(),
            self.spatial_reference,
        );
        session.transition(SessionStatus::Active);
        *self.current.borrow_mut() = Some(session.clone());

        let setup = self.committer.prepare(session.token()).await;
        if session.is_cancelled() {
            debug!("{} session {} superseded during setup", self.committer.name(), session.id());
            return Ok(session);
        }
        if let Err(err) = setup {
            warn!("{} session setup failed: {}", self.committer.name(), err);
            session.fail_setup();
            self.release(&session);
            return Err(SessionError::SetupFailed(err));
        }

        if let Some(drawing) = &self.drawing {
            let subscriber = session.clone();
            drawing
                .source
                .create_polygon(Box::new(move |event| subscriber.on_vertex_event(&event)));
            drawing.source.focus();
        }
        Ok(session)
    }

    /// Empty the slot if it still holds `session`.
    fn release(&self, session: &InteractionSession) {
        let mut current = self.current.borrow_mut();
        if current.as_ref().is_some_and(|s| s.same_as(session)) {
            *current = None;
        }
    }
}
