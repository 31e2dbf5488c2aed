//! Interaction Dispatcher
//!
//! Turns raw pointer, wheel and camera input from the drawing surface into
//! named semantic events and delivers them to registered handlers.
//!
//! # How It Works
//!
//! 1. The surface calls [`InteractionDispatcher::handle_input`] with a
//!    [`RawInput`].
//!
//! 2. The dispatcher moves its [`InteractionState`] machine. Transitions not
//!    in the allowed table are ignored with a warning; they never panic.
//!
//! 3. Handlers of an [`EventKind`] run only while the machine is in the
//!    state that kind belongs to. Camera updates and pointer release run
//!    unconditionally.
//!
//! 4. Handler errors are returned from `handle_input` as they are. The
//!    dispatcher does not translate or swallow them.
//!
//! # Gestures
//!
//! A [`Gesture`] registration carries optional `start`, `move` and `end`
//! callbacks. `start` runs once before the first `move` of a gesture, `end`
//! runs once when the machine leaves the gesture's state. Both are re-armed
//! by [`InteractionDispatcher::reset_state`].
//!
//! # Lifetime
//!
//! There is one application-wide instance, created by
//! [`InteractionDispatcher::init`] and destroyed by
//! [`InteractionDispatcher::teardown`]. Nothing initializes it implicitly.
//! Components that do not need the global can own a dispatcher built with
//! [`InteractionDispatcher::new`].

pub mod event;
pub mod input;
pub mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::model::NodeId;
use crate::reactive::SubscriberId;
use crate::{Error, Result};

pub use event::{EventKind, InteractionEvent};
pub use input::{CameraState, Modifiers, Point, PointerButton, RawInput};
pub use state::InteractionState;

/// Callback receiving a semantic event.
pub type Callback = Arc<dyn Fn(&InteractionEvent) -> Result<()> + Send + Sync>;

/// Callback run when a gesture's state is left.
pub type EndCallback = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// What the surface should do with an input after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDisposition {
    /// Handled here; the renderer must not act on it.
    Consumed,
    /// Not ours; forward to the camera.
    PassThrough,
}

// ============================================================================
// Registrations
// ============================================================================

/// Start / move / end callbacks for one event kind.
#[derive(Clone, Default)]
pub struct Gesture {
    start: Option<Callback>,
    on_move: Option<Callback>,
    end: Option<EndCallback>,
}

impl Gesture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: Fn(&InteractionEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.start = Some(Arc::new(f));
        self
    }

    pub fn on_move<F>(mut self, f: F) -> Self
    where
        F: Fn(&InteractionEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.on_move = Some(Arc::new(f));
        self
    }

    pub fn on_end<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.end = Some(Arc::new(f));
        self
    }
}

struct Registration {
    id: SubscriberId,
    gesture: Gesture,
    started: AtomicBool,
    ended: AtomicBool,
}

impl Registration {
    fn new(gesture: Gesture) -> Arc<Self> {
        Arc::new(Self {
            id: SubscriberId::new(),
            gesture,
            started: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        })
    }

    fn run(&self, event: &InteractionEvent) -> Result<()> {
        if let Some(start) = &self.gesture.start {
            if !self.started.swap(true, Ordering::SeqCst) {
                start(event)?;
            }
        }
        if let Some(on_move) = &self.gesture.on_move {
            on_move(event)?;
        }
        Ok(())
    }

    /// The end callback, if it has not run for this gesture yet.
    fn take_end(&self) -> Option<EndCallback> {
        let end = self.gesture.end.as_ref()?;
        if self.ended.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Arc::clone(end))
        }
    }

    fn rearm(&self) {
        self.started.store(false, Ordering::SeqCst);
        self.ended.store(false, Ordering::SeqCst);
    }
}

type Registrations = SmallVec<[Arc<Registration>; 2]>;

#[derive(Debug, Default)]
struct Pointer {
    state: InteractionState,
    /// Viewport point of the current press.
    origin: Option<Point>,
    /// Node under the current press.
    pressed: Option<NodeId>,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Semantic pub/sub hub over raw input.
pub struct InteractionDispatcher {
    handlers: DashMap<EventKind, Registrations>,
    pointer: Mutex<Pointer>,
}

static INSTANCE: OnceLock<RwLock<Option<Arc<InteractionDispatcher>>>> = OnceLock::new();

fn instance_slot() -> &'static RwLock<Option<Arc<InteractionDispatcher>>> {
    INSTANCE.get_or_init(|| RwLock::new(None))
}

#[cfg(test)]
pub(crate) static SINGLETON_TEST_LOCK: Mutex<()> = parking_lot::const_mutex(());

impl InteractionDispatcher {
    /// A standalone dispatcher, independent of the global instance.
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            pointer: Mutex::new(Pointer::default()),
        }
    }

    // ========================================================================
    // Global instance
    // ========================================================================

    /// Create the global instance. Calling it again returns the existing one.
    pub fn init() -> Arc<Self> {
        let mut slot = instance_slot().write();
        if let Some(existing) = slot.as_ref() {
            warn!("interaction dispatcher already initialized");
            return Arc::clone(existing);
        }
        let dispatcher = Arc::new(Self::new());
        *slot = Some(Arc::clone(&dispatcher));
        info!("interaction dispatcher initialized");
        dispatcher
    }

    pub fn get_instance() -> Result<Arc<Self>> {
        instance_slot()
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(Error::DispatcherNotInitialized)
    }

    pub fn is_initialized() -> bool {
        instance_slot().read().is_some()
    }

    /// Drop the global instance and all of its handlers.
    ///
    /// Returns whether there was an instance to tear down.
    pub fn teardown() -> bool {
        let taken = instance_slot().write().take();
        match taken {
            Some(dispatcher) => {
                dispatcher.clear();
                info!("interaction dispatcher torn down");
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Run `handler` for every event of `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriberId
    where
        F: Fn(&InteractionEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.on_gesture(kind, Gesture::new().on_move(handler))
    }

    pub fn on_gesture(&self, kind: EventKind, gesture: Gesture) -> SubscriberId {
        let registration = Registration::new(gesture);
        let id = registration.id;
        self.handlers.entry(kind).or_default().push(registration);
        debug!(?kind, %id, "handler registered");
        id
    }

    /// Register a node drag: `start` runs once per drag, `on_move` for every
    /// pointer move until release.
    pub fn register_drag<S, M>(&self, start: Option<S>, on_move: M) -> SubscriberId
    where
        S: Fn(&InteractionEvent) -> Result<()> + Send + Sync + 'static,
        M: Fn(&InteractionEvent) -> Result<()> + Send + Sync + 'static,
    {
        let mut gesture = Gesture::new().on_move(on_move);
        if let Some(start) = start {
            gesture = gesture.on_start(start);
        }
        self.on_gesture(EventKind::NodeDrag, gesture)
    }

    /// Remove a registration. Unknown ids are ignored.
    pub fn off(&self, id: SubscriberId) -> bool {
        let mut removed = false;
        for mut entry in self.handlers.iter_mut() {
            let before = entry.len();
            entry.retain(|registration| registration.id != id);
            removed |= entry.len() != before;
        }
        removed
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, |entry| entry.len())
    }

    pub fn clear(&self) {
        self.handlers.clear();
        *self.pointer.lock() = Pointer::default();
    }

    // ========================================================================
    // State machine
    // ========================================================================

    pub fn current_state(&self) -> InteractionState {
        self.pointer.lock().state
    }

    /// Move to `next` if the table allows it.
    ///
    /// Returns whether the state changed. Leaving a state runs the pending
    /// `end` callbacks registered for it.
    pub fn transition_to(&self, next: InteractionState) -> Result<bool> {
        let current = self.current_state();
        if current == next {
            return Ok(false);
        }
        if current.is_exclusive_gesture() && next.is_exclusive_gesture() {
            warn!(active = %current, requested = %next, "exclusive gesture already active, ignoring");
            return Ok(false);
        }
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "illegal interaction transition ignored");
            return Ok(false);
        }

        let ends = self.pending_ends(current);
        self.pointer.lock().state = next;
        debug!(from = %current, to = %next, "interaction transition");
        run_ends(ends)?;
        Ok(true)
    }

    /// Return to `Idle`, finish the current gesture and re-arm all
    /// once-per-gesture callbacks.
    pub fn reset_state(&self) -> Result<()> {
        let current = {
            let mut pointer = self.pointer.lock();
            let current = pointer.state;
            *pointer = Pointer::default();
            current
        };
        let ends = self.pending_ends(current);
        for entry in self.handlers.iter() {
            for registration in entry.iter() {
                registration.rearm();
            }
        }
        run_ends(ends)
    }

    fn pending_ends(&self, state: InteractionState) -> Vec<EndCallback> {
        EventKind::gated_by(state)
            .flat_map(|kind| self.snapshot(kind))
            .filter_map(|registration| registration.take_end())
            .collect()
    }

    fn snapshot(&self, kind: EventKind) -> Registrations {
        self.handlers
            .get(&kind)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Deliver `event` to its handlers if the current state admits it.
    pub fn dispatch(&self, event: &InteractionEvent) -> Result<()> {
        let kind = event.kind();
        if let Some(gate) = kind.gate() {
            if self.current_state() != gate {
                return Ok(());
            }
        }
        for registration in self.snapshot(kind) {
            registration.run(event)?;
        }
        Ok(())
    }

    // ========================================================================
    // Raw input
    // ========================================================================

    pub fn handle_input(&self, input: RawInput) -> Result<InputDisposition> {
        use InteractionState as S;

        match input {
            RawInput::NodeDown {
                node,
                pointer,
                modifiers,
                button,
            } => {
                if button == PointerButton::Secondary {
                    return Ok(InputDisposition::Consumed);
                }
                self.press(pointer, Some(node.clone()));
                self.transition_to(S::NodeDown)?;
                self.dispatch(&InteractionEvent::NodeDown { node, pointer })?;
                if modifiers.ctrl {
                    self.transition_to(S::NodeAutoConnect)?;
                }
            }
            RawInput::NodeClick { node, pointer } => {
                self.transition_to(S::NodeClick)?;
                self.dispatch(&InteractionEvent::NodeClick { node, pointer })?;
                self.settle(S::NodeClick)?;
            }
            RawInput::NodeRightClick { node, pointer } => {
                self.transition_to(S::NodeContextMenu)?;
                self.dispatch(&InteractionEvent::NodeContextMenu { node, pointer })?;
            }
            RawInput::RelationClick { relation, pointer } => {
                self.transition_to(S::RelationClick)?;
                self.dispatch(&InteractionEvent::RelationClick { relation, pointer })?;
                self.settle(S::RelationClick)?;
            }
            RawInput::RelationRightClick { relation, pointer } => {
                self.transition_to(S::RelationContextMenu)?;
                self.dispatch(&InteractionEvent::RelationContextMenu { relation, pointer })?;
            }
            RawInput::StageDown {
                pointer,
                modifiers,
                button,
            } => {
                if button == PointerButton::Secondary {
                    return Ok(InputDisposition::Consumed);
                }
                self.press(pointer, None);
                self.transition_to(S::StageDown)?;
                if modifiers.shift {
                    self.transition_to(S::NodeSelection)?;
                } else if modifiers.ctrl {
                    self.transition_to(S::NodeQuick)?;
                } else {
                    return Ok(InputDisposition::PassThrough);
                }
            }
            RawInput::StageUp { pointer } => {
                self.dispatch(&InteractionEvent::NodeQuick { pointer })?;
            }
            RawInput::StageRightClick { pointer } => {
                self.transition_to(S::StageContextMenu)?;
                self.dispatch(&InteractionEvent::StageContextMenu { pointer })?;
            }
            RawInput::PointerMove { pointer } => return self.pointer_move(pointer),
            RawInput::PointerUp { pointer } => {
                self.dispatch(&InteractionEvent::PointerUp { pointer })?;
                if self.current_state().resets_on_pointer_up() {
                    self.reset_state()?;
                }
            }
            RawInput::Wheel {
                pointer,
                delta,
                modifiers,
            } => {
                if !modifiers.any() {
                    return Ok(InputDisposition::PassThrough);
                }
                if delta != 0.0 {
                    if modifiers.ctrl {
                        self.transition_to(S::ZoomFactor)?;
                        self.dispatch(&InteractionEvent::ZoomFactor { pointer, delta })?;
                    } else {
                        self.transition_to(S::Scale)?;
                        self.dispatch(&InteractionEvent::Scale {
                            pointer,
                            delta,
                            modifiers,
                        })?;
                    }
                }
            }
            RawInput::CameraUpdated(camera) => {
                self.dispatch(&InteractionEvent::CameraUpdate(camera))?;
                return Ok(InputDisposition::PassThrough);
            }
        }
        Ok(InputDisposition::Consumed)
    }

    fn pointer_move(&self, pointer: Point) -> Result<InputDisposition> {
        use InteractionState as S;

        if self.current_state() == S::NodeDown {
            self.transition_to(S::NodeDrag)?;
        }
        let (state, origin, pressed) = {
            let p = self.pointer.lock();
            (p.state, p.origin.unwrap_or(pointer), p.pressed.clone())
        };

        match (state, pressed) {
            (S::NodeSelection, _) => {
                self.dispatch(&InteractionEvent::NodeSelection { origin, pointer })?;
            }
            (S::NodeAutoConnect, Some(node)) => {
                self.dispatch(&InteractionEvent::NodeAutoConnect { node, origin, pointer })?;
            }
            (S::NodeDrag, Some(node)) => {
                self.dispatch(&InteractionEvent::NodeDrag { node, origin, pointer })?;
            }
            _ => return Ok(InputDisposition::PassThrough),
        }
        Ok(InputDisposition::Consumed)
    }

    fn press(&self, origin: Point, node: Option<NodeId>) {
        let mut pointer = self.pointer.lock();
        pointer.origin = Some(origin);
        pointer.pressed = node;
    }

    /// Click states last for their handlers only.
    fn settle(&self, state: InteractionState) -> Result<()> {
        if self.current_state() == state {
            self.reset_state()?;
        }
        Ok(())
    }
}

fn run_ends(ends: Vec<EndCallback>) -> Result<()> {
    ends.iter().try_for_each(|end| end())
}

impl Default for InteractionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InteractionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionDispatcher")
            .field("state", &self.current_state())
            .field("kinds", &self.handlers.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
