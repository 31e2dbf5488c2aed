//! Dragging nodes.
//!
//! Pointer moves are applied to the scene immediately (write-through) for
//! every highlighted node. The entity store only sees the result: one
//! flush per quiet debounce window, carrying the accumulated positions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use super::RenderStateStore;
use crate::dispatcher::{EventKind, Gesture, InteractionDispatcher, InteractionEvent};
use crate::entities::EntityStore;
use crate::model::Position;
use crate::reactive::{Debouncer, SubscriberId};

struct DragInner {
    render: RenderStateStore,
    entities: EntityStore,
    debouncer: Debouncer,
    /// Graph position of the pointer at the previous move.
    last: Mutex<Option<Position>>,
    flushes: AtomicUsize,
}

impl DragInner {
    fn start(&self, event: &InteractionEvent) {
        let InteractionEvent::NodeDrag { node, origin, .. } = event else {
            return;
        };
        if !self.render.is_node_highlighted(node) {
            self.render.highlight_node(node.clone());
        }
        *self.last.lock() = Some(self.render.viewport_to_graph(*origin));
    }

    fn move_to(self: &Arc<Self>, event: &InteractionEvent) {
        let InteractionEvent::NodeDrag { pointer, .. } = event else {
            return;
        };
        let current = self.render.viewport_to_graph(*pointer);
        let previous = self.last.lock().replace(current).unwrap_or(current);
        let (dx, dy) = (current.x - previous.x, current.y - previous.y);
        if dx == 0.0 && dy == 0.0 {
            return;
        }

        self.render.translate_highlighted(dx, dy);
        let weak = Arc::downgrade(self);
        self.debouncer.call(move || {
            if let Some(inner) = weak.upgrade() {
                inner.flush();
            }
        });
    }

    fn flush(&self) -> usize {
        let positions = self.render.take_unflushed_positions();
        if positions.is_empty() {
            return 0;
        }
        let written = self.entities.set_node_positions(positions, false);
        self.flushes.fetch_add(1, Ordering::SeqCst);
        debug!(nodes = written, "drag positions flushed");
        written
    }
}

/// Moves highlighted nodes while a node is dragged.
pub struct DragController {
    inner: Arc<DragInner>,
    registration: Mutex<Option<(Weak<InteractionDispatcher>, SubscriberId)>>,
}

impl DragController {
    pub fn new(render: RenderStateStore, entities: EntityStore) -> Self {
        let window = render.config().drag.flush_debounce();
        Self {
            inner: Arc::new(DragInner {
                render,
                entities,
                debouncer: Debouncer::new(window),
                last: Mutex::new(None),
                flushes: AtomicUsize::new(0),
            }),
            registration: Mutex::new(None),
        }
    }

    /// Register the drag gesture with `dispatcher`, replacing any earlier
    /// registration.
    pub fn attach(&self, dispatcher: &Arc<InteractionDispatcher>) -> SubscriberId {
        self.detach();

        let start = Arc::downgrade(&self.inner);
        let moves = Arc::downgrade(&self.inner);
        let end = Arc::downgrade(&self.inner);
        let gesture = Gesture::new()
            .on_start(move |event| {
                if let Some(inner) = start.upgrade() {
                    inner.start(event);
                }
                Ok(())
            })
            .on_move(move |event| {
                if let Some(inner) = moves.upgrade() {
                    inner.move_to(event);
                }
                Ok(())
            })
            .on_end(move || {
                if let Some(inner) = end.upgrade() {
                    inner.last.lock().take();
                }
                Ok(())
            });

        let id = dispatcher.on_gesture(EventKind::NodeDrag, gesture);
        *self.registration.lock() = Some((Arc::downgrade(dispatcher), id));
        id
    }

    pub fn detach(&self) {
        if let Some((dispatcher, id)) = self.registration.lock().take() {
            if let Some(dispatcher) = dispatcher.upgrade() {
                dispatcher.off(id);
            }
        }
    }

    /// Flush pending positions now instead of waiting for the window.
    pub fn flush_now(&self) -> usize {
        self.inner.debouncer.cancel();
        self.inner.flush()
    }

    /// Flushes performed so far.
    pub fn flush_count(&self) -> usize {
        self.inner.flushes.load(Ordering::SeqCst)
    }

    pub fn is_flush_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }
}

impl Drop for DragController {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for DragController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragController")
            .field("flushes", &self.flush_count())
            .field("debouncer", &self.inner.debouncer)
            .finish()
    }
}
