//! Render State Store
//!
//! Bridges the entity store to an external renderer. The core never paints;
//! it keeps a [`Scene`] of renderer-native attributes and a [`Camera`] model,
//! and the renderer reads them on its own paint cycle.
//!
//! # How It Works
//!
//! 1. [`RenderStateStore::attach_entities`] subscribes to the entity store's
//!    revisions. Every notifying change re-syncs the scene: new nodes get
//!    attributes, removed ones disappear, and relation endpoints that are not
//!    loaded are drawn as "not available" placeholders.
//!
//! 2. [`RenderStateStore::attach`] registers zoom, scale, camera, click and
//!    selection handlers with an [`InteractionDispatcher`].
//!
//! 3. Modifier + wheel input disables the camera for one frame and queues
//!    the re-enable (plus a dispatcher reset) for [`RenderStateStore::after_render`],
//!    so a single wheel event is never read both as zoom and as scaling.
//!
//! # Highlights
//!
//! Highlighting a node clears relation highlights and vice versa. While a
//! selection box is being dragged the two sets are kept side by side.

pub mod camera;
pub mod drag;
pub mod label_fit;
pub mod scene;

use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::ExplorerConfig;
use crate::dispatcher::{
    CameraState, EventKind, Gesture, InteractionDispatcher, InteractionEvent, Modifiers, Point,
};
use crate::entities::{EntityEvent, EntityEventKind, EntityStore};
use crate::model::{Node, NodeId, Position, RelationId};
use crate::reactive::{Store, SubscriberId};
use crate::Result;

pub use camera::{Camera, CameraAnimation};
pub use drag::DragController;
pub use label_fit::{fit_label, LabelFit, MonospaceMeasure, TextMeasure};
pub use scene::{seeded_position, EdgeAttributes, NodeAttributes, Scene};

/// Observable rendering parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    /// Ratio applied per plain wheel notch.
    pub zoom_factor: f64,
    pub label_scale: f64,
    pub node_size_factor: f64,
    pub highlighted_nodes: IndexSet<NodeId>,
    pub highlighted_relations: IndexSet<RelationId>,
    /// A selection box gesture is in progress.
    pub multi_select: bool,
    pub labels_visible: bool,
    pub node_label_size: f64,
    pub relation_label_size: f64,
    /// Bumped whenever scene attributes change.
    pub scene_revision: u64,
}

impl RenderState {
    fn new(config: &ExplorerConfig) -> Self {
        Self {
            zoom_factor: config.zoom.default,
            label_scale: config.scale.label.default,
            node_size_factor: config.scale.node_size.default,
            highlighted_nodes: IndexSet::new(),
            highlighted_relations: IndexSet::new(),
            multi_select: false,
            labels_visible: true,
            node_label_size: config.labels.node_label_size,
            relation_label_size: config.labels.relation_label_size,
            scene_revision: 0,
        }
    }
}

type FrameAction = Box<dyn FnOnce() -> Result<()> + Send>;

#[derive(Default)]
struct Attachments {
    entity_state: Option<SubscriberId>,
    entity_events: Vec<SubscriberId>,
    dispatcher: Option<Weak<InteractionDispatcher>>,
    handlers: Vec<SubscriberId>,
}

struct RenderInner {
    config: ExplorerConfig,
    entities: EntityStore,
    store: Store<RenderState>,
    scene: Mutex<Scene>,
    camera: Mutex<Camera>,
    after_render: Mutex<Vec<FrameAction>>,
    attachments: Mutex<Attachments>,
}

/// Owns the scene and camera of one drawing surface. Cloning shares them.
#[derive(Clone)]
pub struct RenderStateStore {
    inner: Arc<RenderInner>,
}

impl RenderStateStore {
    pub fn new(config: ExplorerConfig, entities: EntityStore) -> Self {
        Self {
            inner: Arc::new(RenderInner {
                store: Store::new(RenderState::new(&config)),
                camera: Mutex::new(Camera::new(&config.camera)),
                config,
                entities,
                scene: Mutex::new(Scene::new()),
                after_render: Mutex::new(Vec::new()),
                attachments: Mutex::new(Attachments::default()),
            }),
        }
    }

    pub fn store(&self) -> &Store<RenderState> {
        &self.inner.store
    }

    pub fn state(&self) -> RenderState {
        self.inner.store.get_state()
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.inner.config
    }

    /// Read the scene. Do not call back into the store from `f`.
    pub fn with_scene<R>(&self, f: impl FnOnce(&Scene) -> R) -> R {
        f(&self.inner.scene.lock())
    }

    pub fn camera(&self) -> Camera {
        self.inner.camera.lock().clone()
    }

    pub fn with_camera<R>(&self, f: impl FnOnce(&mut Camera) -> R) -> R {
        f(&mut self.inner.camera.lock())
    }

    pub fn viewport_to_graph(&self, point: Point) -> Position {
        self.inner.camera.lock().viewport_to_graph(point)
    }

    fn weak(&self) -> Weak<RenderInner> {
        Arc::downgrade(&self.inner)
    }

    fn from_weak(weak: &Weak<RenderInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    // ========================================================================
    // Entity mirroring
    // ========================================================================

    /// Follow the entity store. Syncs once immediately.
    pub fn attach_entities(&self) {
        let mut attachments = self.inner.attachments.lock();
        if attachments.entity_state.is_some() {
            return;
        }

        let weak = self.weak();
        attachments.entity_state = Some(self.inner.entities.store().subscribe(
            |state| (state.nodes_revision, state.relations_revision),
            move |_, _| {
                if let Some(render) = Self::from_weak(&weak) {
                    render.sync_from_entities();
                }
            },
        ));

        // Write-through positions do not notify state subscribers.
        let weak = self.weak();
        attachments.entity_events.push(self.inner.entities.on(
            EntityEventKind::NodesUpdated,
            move |event| {
                if let (Some(render), EntityEvent::NodesUpdated(nodes)) = (Self::from_weak(&weak), event) {
                    render.place_nodes(nodes);
                }
            },
        ));
        drop(attachments);

        self.sync_from_entities();
    }

    /// Rebuild scene attributes from the entity store.
    pub fn sync_from_entities(&self) {
        let (nodes, relations) = self
            .inner
            .entities
            .store()
            .read(|state| (Arc::clone(&state.nodes), Arc::clone(&state.relations)));
        let size_factor = self.inner.store.read(|state| state.node_size_factor);
        let config = &self.inner.config;

        let mut missing = IndexSet::new();
        for relation in relations.values() {
            for endpoint in [&relation.source_id, &relation.target_id] {
                if !nodes.contains_key(endpoint) {
                    missing.insert(endpoint.clone());
                }
            }
        }

        {
            let mut scene = self.inner.scene.lock();
            scene.retain_nodes(|id| nodes.contains_key(id) || missing.contains(id));
            scene.retain_edges(|id| relations.contains_key(id));

            for node in nodes.values() {
                let position = resolve_position(node, scene.node_position(&node.id));
                let attributes = NodeAttributes::from_node(node, position, &config.nodes, size_factor);
                scene.upsert_node(node.id.clone(), attributes);
            }
            for id in &missing {
                let placeholder = Node::placeholder(id.clone());
                let position = scene.node_position(id).unwrap_or_else(|| seeded_position(id));
                let attributes = NodeAttributes::from_node(&placeholder, position, &config.nodes, size_factor);
                scene.upsert_node(id.clone(), attributes);
            }
            for relation in relations.values() {
                scene.upsert_edge(
                    relation.id.clone(),
                    EdgeAttributes::from_relation(relation, &config.relations),
                );
            }
        }
        debug!(nodes = nodes.len(), placeholders = missing.len(), relations = relations.len(), "scene synced");

        self.inner.store.set_state(|state| {
            state.highlighted_nodes.retain(|id| nodes.contains_key(id) || missing.contains(id));
            state.highlighted_relations.retain(|id| relations.contains_key(id));
            state.scene_revision += 1;
        });
        self.apply_highlights();
        self.refresh_label_visibility();
    }

    fn place_nodes(&self, nodes: &[Node]) {
        let mut moved = false;
        {
            let mut scene = self.inner.scene.lock();
            for node in nodes {
                if let Some(position) = node.position {
                    moved |= scene.place_node(&node.id, position);
                }
            }
        }
        if moved {
            self.bump_scene();
        }
    }

    fn bump_scene(&self) {
        self.inner.store.set_state(|state| state.scene_revision += 1);
    }

    // ========================================================================
    // Highlights
    // ========================================================================

    /// Highlight only `id`. Relation highlights are cleared unless a
    /// selection box is active.
    pub fn highlight_node(&self, id: NodeId) {
        self.inner.store.set_state(|state| {
            if !state.multi_select {
                state.highlighted_relations.clear();
            }
            state.highlighted_nodes.clear();
            state.highlighted_nodes.insert(id);
        });
        self.apply_highlights();
    }

    /// Add `id` to the node highlights.
    pub fn add_node_highlight(&self, id: NodeId) {
        self.inner.store.set_state(|state| {
            if !state.multi_select {
                state.highlighted_relations.clear();
            }
            state.highlighted_nodes.insert(id);
        });
        self.apply_highlights();
    }

    pub fn highlight_relation(&self, id: RelationId) {
        self.inner.store.set_state(|state| {
            if !state.multi_select {
                state.highlighted_nodes.clear();
            }
            state.highlighted_relations.clear();
            state.highlighted_relations.insert(id);
        });
        self.apply_highlights();
    }

    pub fn clear_highlights(&self) {
        self.inner.store.set_state(|state| {
            state.highlighted_nodes.clear();
            state.highlighted_relations.clear();
        });
        self.apply_highlights();
    }

    pub fn is_node_highlighted(&self, id: &NodeId) -> bool {
        self.inner.store.read(|state| state.highlighted_nodes.contains(id))
    }

    pub fn highlighted_nodes(&self) -> IndexSet<NodeId> {
        self.inner.store.read(|state| state.highlighted_nodes.clone())
    }

    fn apply_highlights(&self) {
        let (nodes, relations) = self
            .inner
            .store
            .read(|state| (state.highlighted_nodes.clone(), state.highlighted_relations.clone()));
        self.inner.scene.lock().apply_highlights(&nodes, &relations);
    }

    // ========================================================================
    // Selection box
    // ========================================================================

    pub fn begin_multi_select(&self) {
        self.inner.store.set_state(|state| {
            state.multi_select = true;
            state.highlighted_nodes.clear();
            state.highlighted_relations.clear();
        });
        self.apply_highlights();
    }

    /// Highlight every node inside the box spanned by two viewport points.
    pub fn update_selection_box(&self, origin: Point, pointer: Point) {
        let (a, b) = {
            let camera = self.inner.camera.lock();
            (camera.viewport_to_graph(origin), camera.viewport_to_graph(pointer))
        };
        let inside = self.inner.scene.lock().nodes_in_box(a, b);
        self.inner.store.set_state(|state| state.highlighted_nodes = inside);
        self.apply_highlights();
    }

    pub fn end_multi_select(&self) {
        self.inner.store.set_state(|state| state.multi_select = false);
    }

    // ========================================================================
    // Drag support
    // ========================================================================

    /// Move every highlighted node in the scene only. Returns how many moved.
    pub fn translate_highlighted(&self, dx: f64, dy: f64) -> usize {
        let ids = self.highlighted_nodes();
        let moved = {
            let mut scene = self.inner.scene.lock();
            ids.iter().filter(|id| scene.translate_node(id, dx, dy)).count()
        };
        if moved > 0 {
            self.bump_scene();
        }
        moved
    }

    /// Scene positions written by drags since the last call.
    pub fn take_unflushed_positions(&self) -> Vec<(NodeId, Position)> {
        self.inner.scene.lock().take_unflushed()
    }

    // ========================================================================
    // Zoom, scale, camera
    // ========================================================================

    /// One zoom-factor step in the direction of `delta`, clamped.
    pub fn adjust_zoom_factor(&self, delta: f64) -> f64 {
        let range = self.inner.config.zoom;
        let mut next = range.default;
        self.inner.store.set_state(|state| {
            state.zoom_factor = range.step_towards(state.zoom_factor, delta);
            next = state.zoom_factor;
        });
        next
    }

    /// One scaling step: `shift` scales labels, `alt` scales nodes.
    pub fn adjust_scale(&self, delta: f64, modifiers: Modifiers) {
        if delta == 0.0 {
            return;
        }
        let scale = self.inner.config.scale;
        if modifiers.shift {
            self.inner
                .store
                .set_state(|state| state.label_scale = scale.label.step_towards(state.label_scale, delta));
            self.resize_labels();
        }
        if modifiers.alt {
            self.inner.store.set_state(|state| {
                state.node_size_factor = scale.node_size.step_towards(state.node_size_factor, delta)
            });
            self.sync_from_entities();
        }
    }

    /// Plain wheel input forwarded by the dispatcher.
    pub fn wheel_zoom(&self, delta: f64) -> bool {
        let zoom_factor = self.inner.store.read(|state| state.zoom_factor);
        let (changed, camera) = {
            let mut camera = self.inner.camera.lock();
            (camera.wheel_zoom(delta, zoom_factor), camera.state)
        };
        if changed {
            self.resize_labels();
            self.refresh_label_visibility();
        }
        debug!(changed, ratio = camera.ratio, "wheel zoom");
        changed
    }

    /// Adopt a camera state reported by the renderer.
    pub fn on_camera_update(&self, state: CameraState) {
        let ratio_changed = self.inner.camera.lock().update(state);
        if ratio_changed {
            self.resize_labels();
        }
        self.refresh_label_visibility();
    }

    fn resize_labels(&self) {
        let ratio = self.inner.camera.lock().ratio();
        let labels = &self.inner.config.labels;
        self.inner.store.set_state(|state| {
            state.node_label_size = labels.node_label_size / ratio * state.label_scale;
            state.relation_label_size = labels.relation_label_size / ratio * state.label_scale;
        });
    }

    fn refresh_label_visibility(&self) {
        let (min, max) = self.inner.camera.lock().visible_bounds();
        let in_view = self.inner.scene.lock().nodes_in_box(min, max).len();
        let visible = in_view <= self.inner.config.labels.hide_all_threshold;
        self.inner.store.set_state(|state| state.labels_visible = visible);
    }

    /// Center the camera on `node` if it is drawn.
    pub fn animate_to(&self, node: &NodeId) -> bool {
        let Some(target) = self.inner.scene.lock().node_position(node) else {
            return false;
        };
        self.inner.camera.lock().animate_to(node.clone(), target);
        true
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Queue `action` for the end of the current frame.
    pub fn queue_after_render(&self, action: impl FnOnce() -> Result<()> + Send + 'static) {
        self.inner.after_render.lock().push(Box::new(action));
    }

    /// Run the actions queued for this frame. All actions run; the first
    /// error is returned.
    pub fn after_render(&self) -> Result<()> {
        let actions = std::mem::take(&mut *self.inner.after_render.lock());
        let mut first_error = None;
        for action in actions {
            if let Err(err) = action() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn pending_frame_actions(&self) -> usize {
        self.inner.after_render.lock().len()
    }

    /// Disable the camera until the end of the frame, then re-enable it and
    /// reset the dispatcher's transient state.
    fn hold_camera_for_frame(&self, dispatcher: Option<Weak<InteractionDispatcher>>) {
        self.inner.camera.lock().disable();
        let weak = self.weak();
        self.queue_after_render(move || {
            if let Some(render) = Self::from_weak(&weak) {
                render.inner.camera.lock().enable();
            }
            match dispatcher.and_then(|d| d.upgrade()) {
                Some(dispatcher) => dispatcher.reset_state(),
                None => Ok(()),
            }
        });
    }

    // ========================================================================
    // Dispatcher wiring
    // ========================================================================

    fn bind<F>(&self, f: F) -> impl Fn(&InteractionEvent) -> Result<()> + Send + Sync + 'static
    where
        F: Fn(&RenderStateStore, &InteractionEvent) -> Result<()> + Send + Sync + 'static,
    {
        let weak = self.weak();
        move |event| match Self::from_weak(&weak) {
            Some(render) => f(&render, event),
            None => Ok(()),
        }
    }

    /// Register this store's handlers with `dispatcher`.
    pub fn attach(&self, dispatcher: &Arc<InteractionDispatcher>) {
        self.detach_dispatcher();
        let weak_dispatcher = Arc::downgrade(dispatcher);
        let mut ids = Vec::new();

        let zoom_dispatcher = weak_dispatcher.clone();
        ids.push(dispatcher.on(
            EventKind::ZoomFactor,
            self.bind(move |render, event| {
                if let InteractionEvent::ZoomFactor { delta, .. } = event {
                    render.adjust_zoom_factor(*delta);
                    render.hold_camera_for_frame(Some(zoom_dispatcher.clone()));
                }
                Ok(())
            }),
        ));

        let scale_dispatcher = weak_dispatcher.clone();
        ids.push(dispatcher.on(
            EventKind::Scale,
            self.bind(move |render, event| {
                if let InteractionEvent::Scale { delta, modifiers, .. } = event {
                    if *delta != 0.0 && (modifiers.shift || modifiers.alt) {
                        render.adjust_scale(*delta, *modifiers);
                        render.hold_camera_for_frame(Some(scale_dispatcher.clone()));
                    }
                }
                Ok(())
            }),
        ));

        ids.push(dispatcher.on(
            EventKind::CameraUpdate,
            self.bind(|render, event| {
                if let InteractionEvent::CameraUpdate(state) = event {
                    render.on_camera_update(*state);
                }
                Ok(())
            }),
        ));

        ids.push(dispatcher.on(
            EventKind::NodeClick,
            self.bind(|render, event| {
                if let Some(node) = event.node() {
                    render.highlight_node(node.clone());
                }
                Ok(())
            }),
        ));

        ids.push(dispatcher.on(
            EventKind::RelationClick,
            self.bind(|render, event| {
                if let InteractionEvent::RelationClick { relation, .. } = event {
                    render.highlight_relation(relation.clone());
                }
                Ok(())
            }),
        ));

        let weak = self.weak();
        ids.push(dispatcher.on_gesture(
            EventKind::NodeSelection,
            Gesture::new()
                .on_start(self.bind(|render, _| {
                    render.begin_multi_select();
                    Ok(())
                }))
                .on_move(self.bind(|render, event| {
                    if let InteractionEvent::NodeSelection { origin, pointer } = event {
                        render.update_selection_box(*origin, *pointer);
                    }
                    Ok(())
                }))
                .on_end(move || {
                    if let Some(render) = Self::from_weak(&weak) {
                        render.end_multi_select();
                    }
                    Ok(())
                }),
        ));

        let mut attachments = self.inner.attachments.lock();
        attachments.dispatcher = Some(weak_dispatcher);
        attachments.handlers = ids;
    }

    fn detach_dispatcher(&self) {
        let (dispatcher, handlers) = {
            let mut attachments = self.inner.attachments.lock();
            (attachments.dispatcher.take(), std::mem::take(&mut attachments.handlers))
        };
        if let Some(dispatcher) = dispatcher.and_then(|d| d.upgrade()) {
            for id in handlers {
                dispatcher.off(id);
            }
        }
    }

    /// Remove every subscription made by `attach` and `attach_entities`.
    pub fn detach(&self) {
        self.detach_dispatcher();
        let (state, events) = {
            let mut attachments = self.inner.attachments.lock();
            (attachments.entity_state.take(), std::mem::take(&mut attachments.entity_events))
        };
        if let Some(id) = state {
            self.inner.entities.store().unsubscribe(id);
        }
        for id in events {
            self.inner.entities.off(id);
        }
    }
}

/// Canonical position, then style coordinates, then the current scene
/// position, then a seeded one.
fn resolve_position(node: &Node, drawn: Option<Position>) -> Position {
    let styled = || {
        let x = node.style.get("x")?.parse::<f64>().ok()?;
        let y = node.style.get("y")?.parse::<f64>().ok()?;
        Some(Position::new(x, y))
    };
    node.position
        .or_else(styled)
        .or(drawn)
        .unwrap_or_else(|| seeded_position(&node.id))
}

impl std::fmt::Debug for RenderStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderStateStore")
            .field("state", &self.inner.store.get_state())
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::RawInput;
    use crate::model::Relation;
    use pretty_assertions::assert_eq;

    fn setup() -> (EntityStore, RenderStateStore) {
        let entities = EntityStore::new();
        let render = RenderStateStore::new(ExplorerConfig::default(), entities.clone());
        render.attach_entities();
        (entities, render)
    }

    #[test]
    fn missing_endpoints_render_as_placeholders() {
        let (entities, render) = setup();
        entities.set_nodes(vec![Node::new("a")]);
        entities.set_relations(vec![Relation::new("r", "knows", "a", "ghost")]);

        render.with_scene(|scene| {
            assert_eq!(scene.node_count(), 2);
            let ghost = scene.node(&"ghost".into()).unwrap();
            assert!(ghost.placeholder);
            assert_eq!(ghost.label, crate::model::NOT_AVAILABLE_SIGN);
            assert_eq!(scene.edge_count(), 1);
        });
    }

    #[test]
    fn removed_entities_leave_the_scene() {
        let (entities, render) = setup();
        entities.set_nodes(vec![Node::new("a"), Node::new("b")]);
        entities.remove_node(&"a".into());
        render.with_scene(|scene| {
            assert!(scene.node(&"a".into()).is_none());
            assert!(scene.node(&"b".into()).is_some());
        });
    }

    #[test]
    fn canonical_position_wins() {
        let (entities, render) = setup();
        entities.set_nodes(vec![Node::new("a").with_position(Position::new(7.0, 8.0))]);
        assert_eq!(
            render.with_scene(|s| s.node_position(&"a".into())),
            Some(Position::new(7.0, 8.0))
        );

        entities.set_node_position(&"a".into(), Position::new(1.0, 1.0), true);
        assert_eq!(
            render.with_scene(|s| s.node_position(&"a".into())),
            Some(Position::new(1.0, 1.0))
        );
    }

    #[test]
    fn node_and_relation_highlights_exclude_each_other() {
        let (entities, render) = setup();
        entities.set_nodes(vec![Node::new("a"), Node::new("b")]);
        entities.set_relations(vec![Relation::new("r", "knows", "a", "b")]);

        render.highlight_relation("r".into());
        render.highlight_node("a".into());
        let state = render.state();
        assert!(state.highlighted_relations.is_empty());
        assert_eq!(state.highlighted_nodes.len(), 1);

        render.highlight_relation("r".into());
        assert!(render.state().highlighted_nodes.is_empty());
        assert!(render.with_scene(|s| s.edge(&"r".into()).unwrap().highlighted));
    }

    #[test]
    fn multi_select_suspends_exclusivity() {
        let (entities, render) = setup();
        entities.set_nodes(vec![Node::new("a")]);
        entities.set_relations(vec![Relation::new("r", "knows", "a", "a")]);

        render.begin_multi_select();
        render.add_node_highlight("a".into());
        render.highlight_relation("r".into());
        let state = render.state();
        assert!(state.highlighted_nodes.contains(&NodeId::from("a")));
        assert!(state.highlighted_relations.contains(&RelationId::from("r")));
        render.end_multi_select();
    }

    #[test]
    fn zoom_factor_never_leaves_range() {
        let (_, render) = setup();
        for _ in 0..50 {
            render.adjust_zoom_factor(1.0);
        }
        assert_eq!(render.state().zoom_factor, 3.0);
        for _ in 0..50 {
            render.adjust_zoom_factor(-1.0);
        }
        assert_eq!(render.state().zoom_factor, 1.1);
    }

    #[test]
    fn modifier_wheel_holds_camera_for_one_frame() {
        let (_, render) = setup();
        let dispatcher = Arc::new(InteractionDispatcher::new());
        render.attach(&dispatcher);

        dispatcher
            .handle_input(RawInput::wheel(Point::new(0.0, 0.0), 1.0, Modifiers::CTRL))
            .unwrap();
        assert!(!render.camera().enabled);
        assert_eq!(render.state().zoom_factor, 2.1);

        // A plain wheel in the same frame must not zoom the camera.
        assert!(!render.wheel_zoom(1.0));

        render.after_render().unwrap();
        assert!(render.camera().enabled);
        assert_eq!(dispatcher.current_state(), crate::dispatcher::InteractionState::Idle);
        assert!(render.wheel_zoom(1.0));
    }

    #[test]
    fn shift_wheel_scales_labels() {
        let (_, render) = setup();
        let dispatcher = Arc::new(InteractionDispatcher::new());
        render.attach(&dispatcher);

        dispatcher
            .handle_input(RawInput::wheel(Point::new(0.0, 0.0), 1.0, Modifiers::SHIFT))
            .unwrap();
        let state = render.state();
        assert_eq!(state.label_scale, 1.1);
        assert!((state.node_label_size - 6.6).abs() < 1e-9);
        render.after_render().unwrap();
    }

    #[test]
    fn labels_hide_above_threshold() {
        let config = ExplorerConfig {
            labels: crate::config::LabelConfig {
                hide_all_threshold: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        let entities = EntityStore::new();
        let render = RenderStateStore::new(config, entities.clone());
        render.attach_entities();

        entities.set_nodes(vec![
            Node::new("a").with_position(Position::new(0.0, 0.0)),
            Node::new("b").with_position(Position::new(1.0, 0.0)),
        ]);
        assert!(render.state().labels_visible);

        entities.set_node(Node::new("c").with_position(Position::new(2.0, 0.0)));
        assert!(!render.state().labels_visible);
    }

    #[test]
    fn camera_ratio_resizes_labels() {
        let (_, render) = setup();
        render.on_camera_update(CameraState {
            ratio: 2.0,
            ..CameraState::default()
        });
        assert_eq!(render.state().node_label_size, 3.0);
    }

    #[test]
    fn detach_stops_mirroring() {
        let (entities, render) = setup();
        render.detach();
        entities.set_nodes(vec![Node::new("a")]);
        assert_eq!(render.with_scene(Scene::node_count), 0);
    }
}
