//! In-memory map engine.
//!
//! Stands in for the real scene view in tests and headless runs. Draw
//! actions are driven explicitly (`add_vertex`, `undo`, `complete`, ...),
//! analysis handshakes stay pending until `resolve_next`/`fail_next`, and
//! every externally visible effect is recorded for inspection.

use super::{
    AnalysisEngine, AnalysisId, AnalysisKind, BoxFuture, EngineError, EngineResult,
    InteractiveHandle, SceneLayer, TransientGraphics, VertexEvent, VertexEventKind, VertexSink,
    VertexSource,
};
use crate::cancel::CancellationToken;
use crate::committer::Artifact;
use crate::geometry::PreviewGeometry;
use crate::style::LineStyle;
use futures::channel::oneshot;
use kurbo::Point;
use log::trace;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use uuid::Uuid;

/// A registered analysis as seen by the engine.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub id: AnalysisId,
    pub kind: AnalysisKind,
    pub interactive: bool,
    /// Token scoping the engine's interactive placement, once begun.
    pub creation: Option<CancellationToken>,
}

impl AnalysisRecord {
    /// Whether interactive placement is running and not aborted.
    pub fn is_creating(&self) -> bool {
        self.creation.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

struct PendingRegistration {
    kind: AnalysisKind,
    token: CancellationToken,
    reply: oneshot::Sender<EngineResult<()>>,
}

#[derive(Default)]
struct AnalysisState {
    pending: VecDeque<PendingRegistration>,
    registered: Vec<AnalysisRecord>,
    interactive_calls: Vec<(AnalysisId, bool)>,
}

/// The active click-mode draw action.
#[derive(Default)]
struct DrawAction {
    vertices: Vec<Point>,
    redo: Vec<Point>,
}

#[derive(Default)]
struct DrawState {
    sink: Option<VertexSink>,
    action: Option<DrawAction>,
    /// Bumped whenever the action is replaced or reset.
    generation: u64,
    actions_created: usize,
    focus_requests: usize,
}

#[derive(Default)]
struct GraphicsState {
    preview: Option<(PreviewGeometry, LineStyle)>,
    updates: Vec<PreviewGeometry>,
}

/// Single-threaded engine keeping everything in memory.
#[derive(Default)]
pub struct MemoryEngine {
    draw: RefCell<DrawState>,
    graphics: RefCell<GraphicsState>,
    layer: RefCell<Vec<Artifact>>,
    analyses: Rc<RefCell<AnalysisState>>,
}

impl MemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    // --- draw actions ---

    /// Whether a draw action is accepting input.
    pub fn is_drawing(&self) -> bool {
        self.draw.borrow().action.is_some()
    }

    /// Number of draw actions created so far.
    pub fn draw_actions_created(&self) -> usize {
        self.draw.borrow().actions_created
    }

    pub fn focus_requests(&self) -> usize {
        self.draw.borrow().focus_requests
    }

    /// Vertices of the active draw action.
    pub fn vertices(&self) -> Vec<Point> {
        self.draw
            .borrow()
            .action
            .as_ref()
            .map(|a| a.vertices.clone())
            .unwrap_or_default()
    }

    /// Click at `point`. Returns `false` if no draw action is active.
    pub fn add_vertex(&self, point: Point) -> bool {
        self.edit(VertexEventKind::VertexAdd, |action| {
            action.vertices.push(point);
            action.redo.clear();
            true
        })
    }

    /// Remove the last vertex.
    pub fn remove_vertex(&self) -> bool {
        self.edit(VertexEventKind::VertexRemove, |action| {
            action.vertices.pop().is_some()
        })
    }

    /// Hover at `point`; the event carries the cursor as a trailing vertex.
    pub fn move_cursor(&self, point: Point) -> bool {
        let Some(mut vertices) = self.draw.borrow().action.as_ref().map(|a| a.vertices.clone())
        else {
            return false;
        };
        vertices.push(point);
        self.emit(VertexEvent::new(VertexEventKind::CursorUpdate, vertices))
    }

    pub fn undo(&self) -> bool {
        self.edit(VertexEventKind::Undo, |action| match action.vertices.pop() {
            Some(p) => {
                action.redo.push(p);
                true
            }
            None => false,
        })
    }

    pub fn redo(&self) -> bool {
        self.edit(VertexEventKind::Redo, |action| match action.redo.pop() {
            Some(p) => {
                action.vertices.push(p);
                true
            }
            None => false,
        })
    }

    /// Finalize the shape. Ends the draw action.
    pub fn complete(&self) -> bool {
        let (vertices, sink) = {
            let mut draw = self.draw.borrow_mut();
            let Some(action) = draw.action.take() else {
                return false;
            };
            draw.generation += 1;
            (action.vertices, draw.sink.take())
        };
        trace!("draw-complete with {} vertices", vertices.len());
        if let Some(mut sink) = sink {
            sink(VertexEvent::complete(vertices));
        }
        true
    }

    fn edit(&self, kind: VertexEventKind, apply: impl FnOnce(&mut DrawAction) -> bool) -> bool {
        let vertices = {
            let mut draw = self.draw.borrow_mut();
            let Some(action) = draw.action.as_mut() else {
                return false;
            };
            if !apply(action) {
                return false;
            }
            action.vertices.clone()
        };
        self.emit(VertexEvent::new(kind, vertices))
    }

    /// Deliver `event` to the subscriber without holding any borrow, so the
    /// subscriber may start or reset draw actions itself.
    fn emit(&self, event: VertexEvent) -> bool {
        let (sink, generation) = {
            let mut draw = self.draw.borrow_mut();
            (draw.sink.take(), draw.generation)
        };
        let Some(mut sink) = sink else {
            return false;
        };
        trace!("{:?} with {} vertices", event.kind, event.vertices.len());
        sink(event);

        let mut draw = self.draw.borrow_mut();
        if draw.generation == generation && draw.sink.is_none() {
            draw.sink = Some(sink);
        }
        true
    }

    // --- graphics and layer ---

    /// The preview currently shown, if any.
    pub fn preview(&self) -> Option<PreviewGeometry> {
        self.graphics.borrow().preview.as_ref().map(|(g, _)| g.clone())
    }

    pub fn preview_style(&self) -> Option<LineStyle> {
        self.graphics.borrow().preview.as_ref().map(|(_, s)| s.clone())
    }

    /// Every preview published so far, oldest first.
    pub fn preview_updates(&self) -> Vec<PreviewGeometry> {
        self.graphics.borrow().updates.clone()
    }

    /// Artifacts on the drawing layer.
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.layer.borrow().clone()
    }

    // --- analyses ---

    /// Registrations still waiting for the engine, including aborted ones
    /// not yet swept.
    pub fn pending_registrations(&self) -> usize {
        self.analyses.borrow().pending.len()
    }

    /// Complete the oldest live registration. Registrations whose token
    /// tripped are dropped along the way. Returns `false` if none was live.
    pub fn resolve_next(&self) -> bool {
        self.reply_next(Ok(()))
    }

    /// Fail the oldest live registration with `error`.
    pub fn fail_next(&self, error: EngineError) -> bool {
        self.reply_next(Err(error))
    }

    /// Complete every live registration. Returns how many were delivered.
    pub fn resolve_all(&self) -> usize {
        let mut count = 0;
        while self.resolve_next() {
            count += 1;
        }
        count
    }

    fn reply_next(&self, reply: EngineResult<()>) -> bool {
        let mut analyses = self.analyses.borrow_mut();
        while let Some(pending) = analyses.pending.pop_front() {
            if pending.token.is_cancelled() || pending.reply.is_canceled() {
                trace!("dropping aborted {:?} registration", pending.kind);
                continue;
            }
            return pending.reply.send(reply).is_ok();
        }
        false
    }

    /// Analyses whose registration completed.
    pub fn analyses(&self) -> Vec<AnalysisRecord> {
        self.analyses.borrow().registered.clone()
    }

    /// Every `set_interactive` call, in order.
    pub fn interactive_calls(&self) -> Vec<(AnalysisId, bool)> {
        self.analyses.borrow().interactive_calls.clone()
    }
}

impl VertexSource for MemoryEngine {
    fn reset(&self) {
        let mut draw = self.draw.borrow_mut();
        draw.sink = None;
        draw.action = None;
        draw.generation += 1;
    }

    fn create_polygon(&self, sink: VertexSink) {
        let mut draw = self.draw.borrow_mut();
        draw.sink = Some(sink);
        draw.action = Some(DrawAction::default());
        draw.generation += 1;
        draw.actions_created += 1;
    }

    fn focus(&self) {
        self.draw.borrow_mut().focus_requests += 1;
    }
}

impl TransientGraphics for MemoryEngine {
    fn replace(&self, geometry: &PreviewGeometry, style: &LineStyle) {
        let mut graphics = self.graphics.borrow_mut();
        graphics.preview = Some((geometry.clone(), style.clone()));
        graphics.updates.push(geometry.clone());
    }

    fn clear(&self) {
        self.graphics.borrow_mut().preview = None;
    }
}

impl SceneLayer for MemoryEngine {
    fn add(&self, artifact: Artifact) {
        self.layer.borrow_mut().push(artifact);
    }
}

impl AnalysisEngine for MemoryEngine {
    fn register(
        &self,
        kind: AnalysisKind,
        token: &CancellationToken,
    ) -> BoxFuture<'_, EngineResult<Box<dyn InteractiveHandle>>> {
        let (reply, receiver) = oneshot::channel();
        let token = token.clone();
        self.analyses.borrow_mut().pending.push_back(PendingRegistration {
            kind,
            token: token.clone(),
            reply,
        });

        let state = Rc::clone(&self.analyses);
        Box::pin(async move {
            receiver
                .await
                .map_err(|_| EngineError::Unavailable("registration dropped".to_string()))??;
            if token.is_cancelled() {
                return Err(EngineError::Aborted);
            }

            let id = Uuid::new_v4();
            state.borrow_mut().registered.push(AnalysisRecord {
                id,
                kind,
                interactive: false,
                creation: None,
            });
            Ok(Box::new(MemoryAnalysisHandle { id, state }) as Box<dyn InteractiveHandle>)
        })
    }
}

struct MemoryAnalysisHandle {
    id: AnalysisId,
    state: Rc<RefCell<AnalysisState>>,
}

impl MemoryAnalysisHandle {
    fn with_record(&self, f: impl FnOnce(&mut AnalysisRecord)) {
        if let Some(record) = self
            .state
            .borrow_mut()
            .registered
            .iter_mut()
            .find(|r| r.id == self.id)
        {
            f(record);
        }
    }
}

impl InteractiveHandle for MemoryAnalysisHandle {
    fn id(&self) -> AnalysisId {
        self.id
    }

    fn set_interactive(&self, interactive: bool) {
        self.state
            .borrow_mut()
            .interactive_calls
            .push((self.id, interactive));
        self.with_record(|r| r.interactive = interactive);
    }

    fn begin_creation(&self, token: CancellationToken) {
        self.with_record(|r| r.creation = Some(token));
    }
}
