//! Entity Store
//!
//! The canonical map of loaded nodes and relations. Everything else (the
//! renderer scene, the search pipeline, the exploration engine) derives from
//! or writes back into this store.
//!
//! # How It Works
//!
//! The maps live in a [`Store<EntityState>`] behind `Arc`s, together with a
//! revision counter per map. Subscribers select a revision instead of the
//! map itself, so change detection is a single integer comparison.
//!
//! Writes merge by id, last writer wins, and callers always hand over full
//! entities. Operations naming unknown ids do nothing; callers that need to
//! know must check with [`EntityStore::get_store_item`] first.
//!
//! Besides state subscriptions the store keeps a small callback registry
//! ([`EntityStore::on`]) reporting which entities were added, updated or
//! removed. Those callbacks also fire for write-through position updates,
//! which skip state notifications.

mod service;

pub(crate) use service::failure_notification;
pub use service::EntityService;

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use tracing::debug;

use crate::model::{Entity, EntityKey, Node, NodeId, Position, Relation, RelationId};
use crate::reactive::{Store, SubscriberId, UpdateBatch};

/// Snapshot of the entity maps.
#[derive(Debug, Clone, Default)]
pub struct EntityState {
    pub nodes: Arc<IndexMap<NodeId, Node>>,
    pub relations: Arc<IndexMap<RelationId, Relation>>,
    /// Bumped on every notifying node mutation.
    pub nodes_revision: u64,
    /// Bumped on every notifying relation mutation.
    pub relations_revision: u64,
    /// Nodes whose position changed since the last persistence flush.
    pub dirty_positions: IndexSet<NodeId>,
}

impl EntityState {
    fn nodes_mut(&mut self) -> &mut IndexMap<NodeId, Node> {
        self.nodes_revision += 1;
        Arc::make_mut(&mut self.nodes)
    }

    fn relations_mut(&mut self) -> &mut IndexMap<RelationId, Relation> {
        self.relations_revision += 1;
        Arc::make_mut(&mut self.relations)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityEventKind {
    NodesAdded,
    NodesUpdated,
    NodesRemoved,
    RelationsAdded,
    RelationsUpdated,
    RelationsRemoved,
}

/// Payload handed to [`EntityStore::on`] callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityEvent {
    NodesAdded(Vec<Node>),
    NodesUpdated(Vec<Node>),
    NodesRemoved(Vec<Node>),
    RelationsAdded(Vec<Relation>),
    RelationsUpdated(Vec<Relation>),
    RelationsRemoved(Vec<Relation>),
}

impl EntityEvent {
    pub fn kind(&self) -> EntityEventKind {
        match self {
            Self::NodesAdded(_) => EntityEventKind::NodesAdded,
            Self::NodesUpdated(_) => EntityEventKind::NodesUpdated,
            Self::NodesRemoved(_) => EntityEventKind::NodesRemoved,
            Self::RelationsAdded(_) => EntityEventKind::RelationsAdded,
            Self::RelationsUpdated(_) => EntityEventKind::RelationsUpdated,
            Self::RelationsRemoved(_) => EntityEventKind::RelationsRemoved,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::NodesAdded(v) | Self::NodesUpdated(v) | Self::NodesRemoved(v) => v.is_empty(),
            Self::RelationsAdded(v) | Self::RelationsUpdated(v) | Self::RelationsRemoved(v) => {
                v.is_empty()
            }
        }
    }
}

type EntityCallback = Arc<dyn Fn(&EntityEvent) + Send + Sync>;

/// The canonical node/relation store. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct EntityStore {
    store: Store<EntityState>,
    callbacks: Arc<RwLock<Vec<(SubscriberId, EntityEventKind, EntityCallback)>>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying state container, for `subscribe`.
    pub fn store(&self) -> &Store<EntityState> {
        &self.store
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Look up a loaded entity. Never fetches.
    pub fn get_store_item(&self, key: &EntityKey) -> Option<Entity> {
        self.store.read(|state| match key {
            EntityKey::Node(id) => state.nodes.get(id).cloned().map(Entity::Node),
            EntityKey::Relation(id) => state.relations.get(id).cloned().map(Entity::Relation),
        })
    }

    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.store.read(|state| state.nodes.get(id).cloned())
    }

    pub fn get_relation(&self, id: &RelationId) -> Option<Relation> {
        self.store.read(|state| state.relations.get(id).cloned())
    }

    pub fn nodes(&self) -> Arc<IndexMap<NodeId, Node>> {
        self.store.read(|state| Arc::clone(&state.nodes))
    }

    pub fn relations(&self) -> Arc<IndexMap<RelationId, Relation>> {
        self.store.read(|state| Arc::clone(&state.relations))
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.store.read(|state| state.nodes.contains_key(id))
    }

    /// Ids of every loaded node that is not a "not available" stand-in.
    pub fn non_placeholder_node_ids(&self) -> Vec<NodeId> {
        self.store.read(|state| {
            state
                .nodes
                .values()
                .filter(|node| !node.placeholder)
                .map(|node| node.id.clone())
                .collect()
        })
    }

    // ========================================================================
    // Node writes
    // ========================================================================

    pub fn set_node(&self, node: Node) {
        self.set_nodes(vec![node]);
    }

    /// Merge `nodes` by id, replacing existing entries wholesale.
    pub fn set_nodes(&self, nodes: Vec<Node>) {
        if nodes.is_empty() {
            return;
        }

        let mut added = Vec::new();
        let mut updated = Vec::new();
        self.store.set_state(|state| {
            let map = state.nodes_mut();
            for node in nodes {
                if map.contains_key(&node.id) {
                    updated.push(node.clone());
                } else {
                    added.push(node.clone());
                }
                map.insert(node.id.clone(), node);
            }
        });

        self.emit(EntityEvent::NodesAdded(added));
        self.emit(EntityEvent::NodesUpdated(updated));
    }

    /// Remove a node and every relation attached to it.
    ///
    /// Returns `false` if the node was not loaded.
    pub fn remove_node(&self, id: &NodeId) -> bool {
        self.remove_nodes(std::slice::from_ref(id)) > 0
    }

    /// Remove nodes (and their relations); returns how many nodes were removed.
    pub fn remove_nodes(&self, ids: &[NodeId]) -> usize {
        let present = self
            .store
            .read(|state| ids.iter().any(|id| state.nodes.contains_key(id)));
        if !present {
            return 0;
        }

        let mut removed_nodes = Vec::new();
        let mut removed_relations = Vec::new();
        self.store.set_state(|state| {
            let nodes = state.nodes_mut();
            for id in ids {
                if let Some(node) = nodes.shift_remove(id) {
                    removed_nodes.push(node);
                }
            }
            for node in &removed_nodes {
                state.dirty_positions.shift_remove(&node.id);
            }

            let attached = state
                .relations
                .values()
                .any(|relation| removed_nodes.iter().any(|node| relation.touches(&node.id)));
            if attached {
                state.relations_mut().retain(|_, relation| {
                    let keep = !removed_nodes.iter().any(|node| relation.touches(&node.id));
                    if !keep {
                        removed_relations.push(relation.clone());
                    }
                    keep
                });
            }
        });

        debug!(
            nodes = removed_nodes.len(),
            relations = removed_relations.len(),
            "removed nodes"
        );
        let count = removed_nodes.len();
        self.emit(EntityEvent::RelationsRemoved(removed_relations));
        self.emit(EntityEvent::NodesRemoved(removed_nodes));
        count
    }

    pub fn clear_nodes(&self) {
        self.store.set_state(|state| {
            state.nodes_mut().clear();
            state.dirty_positions.clear();
        });
    }

    // ========================================================================
    // Relation writes
    // ========================================================================

    pub fn set_relation(&self, relation: Relation) {
        self.set_relations(vec![relation]);
    }

    /// Merge `relations` by id, replacing existing entries wholesale.
    pub fn set_relations(&self, relations: Vec<Relation>) {
        if relations.is_empty() {
            return;
        }

        let mut added = Vec::new();
        let mut updated = Vec::new();
        self.store.set_state(|state| {
            let map = state.relations_mut();
            for relation in relations {
                if map.contains_key(&relation.id) {
                    updated.push(relation.clone());
                } else {
                    added.push(relation.clone());
                }
                map.insert(relation.id.clone(), relation);
            }
        });

        self.emit(EntityEvent::RelationsAdded(added));
        self.emit(EntityEvent::RelationsUpdated(updated));
    }

    pub fn remove_relation(&self, id: &RelationId) -> bool {
        self.remove_relations(std::slice::from_ref(id)) > 0
    }

    pub fn remove_relations(&self, ids: &[RelationId]) -> usize {
        let present = self
            .store
            .read(|state| ids.iter().any(|id| state.relations.contains_key(id)));
        if !present {
            return 0;
        }

        let mut removed = Vec::new();
        self.store.set_state(|state| {
            let relations = state.relations_mut();
            for id in ids {
                if let Some(relation) = relations.shift_remove(id) {
                    removed.push(relation);
                }
            }
        });

        let count = removed.len();
        self.emit(EntityEvent::RelationsRemoved(removed));
        count
    }

    pub fn clear_relations(&self) {
        self.store.set_state(|state| state.relations_mut().clear());
    }

    /// Clear both maps and load `nodes` and `relations` as one observable
    /// change.
    pub fn replace_all(&self, nodes: Vec<Node>, relations: Vec<Relation>) {
        let _batch = UpdateBatch::enter();
        self.clear_nodes();
        self.clear_relations();
        self.set_nodes(nodes);
        self.set_relations(relations);
    }

    // ========================================================================
    // Positions
    // ========================================================================

    /// Update one node's canonical position.
    ///
    /// With `write_through_only` the change is stored silently: no state
    /// notification and no dirty marking, only [`EntityEventKind::NodesUpdated`]
    /// callbacks. Otherwise subscribers are notified and the node is marked
    /// for the next persistence flush. Unknown ids are ignored.
    pub fn set_node_position(&self, id: &NodeId, position: Position, write_through_only: bool) -> bool {
        self.set_node_positions(vec![(id.clone(), position)], write_through_only) > 0
    }

    /// Bulk form of [`set_node_position`](Self::set_node_position); one state
    /// notification and one event for the whole batch.
    pub fn set_node_positions(
        &self,
        positions: impl IntoIterator<Item = (NodeId, Position)>,
        write_through_only: bool,
    ) -> usize {
        let positions: Vec<_> = positions
            .into_iter()
            .filter(|(id, _)| self.contains_node(id))
            .collect();
        if positions.is_empty() {
            return 0;
        }

        let mut updated = Vec::with_capacity(positions.len());
        let apply = |state: &mut EntityState, updated: &mut Vec<Node>| {
            let nodes = Arc::make_mut(&mut state.nodes);
            for (id, position) in &positions {
                if let Some(node) = nodes.get_mut(id) {
                    node.position = Some(*position);
                    updated.push(node.clone());
                }
            }
        };

        if write_through_only {
            self.store.set_state_silently(|state| apply(state, &mut updated));
        } else {
            self.store.set_state(|state| {
                state.nodes_revision += 1;
                apply(state, &mut updated);
                for node in &updated {
                    state.dirty_positions.insert(node.id.clone());
                }
            });
        }

        let count = updated.len();
        self.emit(EntityEvent::NodesUpdated(updated));
        count
    }

    pub fn dirty_positions(&self) -> IndexSet<NodeId> {
        self.store.read(|state| state.dirty_positions.clone())
    }

    /// Hand the dirty set to the persistence layer and start a new one.
    pub fn take_dirty_positions(&self) -> IndexSet<NodeId> {
        let mut taken = IndexSet::new();
        self.store
            .set_state_silently(|state| taken = std::mem::take(&mut state.dirty_positions));
        taken
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    /// Register a callback for one kind of entity event.
    pub fn on<F>(&self, kind: EntityEventKind, callback: F) -> SubscriberId
    where
        F: Fn(&EntityEvent) + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        self.callbacks.write().push((id, kind, Arc::new(callback)));
        id
    }

    /// Remove a callback. Unknown ids are ignored.
    pub fn off(&self, id: SubscriberId) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(sub, _, _)| *sub != id);
        callbacks.len() != before
    }

    fn emit(&self, event: EntityEvent) {
        if event.is_empty() {
            return;
        }
        let kind = event.kind();
        let callbacks: Vec<EntityCallback> = self
            .callbacks
            .read()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(&event);
        }
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (nodes, relations) = self
            .store
            .read(|state| (state.nodes.len(), state.relations.len()));
        f.debug_struct("EntityStore")
            .field("nodes", &nodes)
            .field("relations", &relations)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn node(id: &str) -> Node {
        Node::new(id).with_title(id.to_uppercase())
    }

    fn relation(id: &str, source: &str, target: &str) -> Relation {
        Relation::new(id, "knows", source, target)
    }

    #[test]
    fn get_store_item_returns_what_was_set() {
        let store = EntityStore::new();
        let ada = node("ada").with_labels(["Person"]).with_property("born", 1815);
        store.set_nodes(vec![node("bob"), ada.clone()]);

        assert_eq!(store.get_store_item(&EntityKey::node("ada")), Some(Entity::Node(ada)));
        assert_eq!(store.get_store_item(&EntityKey::node("nobody")), None);
    }

    #[test]
    fn overlapping_ids_resolve_by_kind() {
        let store = EntityStore::new();
        store.set_node(node("7"));
        store.set_relation(relation("7", "7", "7"));

        assert!(matches!(store.get_store_item(&EntityKey::node("7")), Some(Entity::Node(_))));
        assert!(matches!(
            store.get_store_item(&EntityKey::relation("7")),
            Some(Entity::Relation(_))
        ));
    }

    #[test]
    fn set_nodes_is_last_writer_wins() {
        let store = EntityStore::new();
        store.set_nodes(vec![node("a").with_title("first")]);
        store.set_nodes(vec![node("a").with_title("second"), node("b")]);

        assert_eq!(store.nodes().len(), 2);
        assert_eq!(store.get_node(&"a".into()).unwrap().title, "second");
    }

    #[test]
    fn removing_node_cascades_to_relations() {
        let store = EntityStore::new();
        store.set_nodes(vec![node("a"), node("b"), node("c")]);
        store.set_relations(vec![relation("r1", "a", "b"), relation("r2", "b", "c")]);

        let removed = Arc::new(Mutex::new(Vec::new()));
        let removed_clone = removed.clone();
        store.on(EntityEventKind::RelationsRemoved, move |event| {
            if let EntityEvent::RelationsRemoved(relations) = event {
                removed_clone
                    .lock()
                    .extend(relations.iter().map(|r| r.id.as_str().to_owned()));
            }
        });

        assert!(store.remove_node(&"a".into()));
        assert_eq!(store.relations().len(), 1);
        assert_eq!(*removed.lock(), vec!["r1".to_owned()]);
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let store = EntityStore::new();
        let notifications = Arc::new(AtomicI32::new(0));
        let notifications_clone = notifications.clone();
        store.store().subscribe(
            |s: &EntityState| (s.nodes_revision, s.relations_revision),
            move |_, _| {
                notifications_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert!(!store.remove_node(&"ghost".into()));
        assert!(!store.remove_relation(&"ghost".into()));
        assert!(!store.set_node_position(&"ghost".into(), Position::new(1.0, 1.0), false));
        assert_eq!(notifications.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn events_split_added_and_updated() {
        let store = EntityStore::new();
        store.set_node(node("a"));

        let added = Arc::new(AtomicI32::new(0));
        let updated = Arc::new(AtomicI32::new(0));
        let added_clone = added.clone();
        let updated_clone = updated.clone();
        store.on(EntityEventKind::NodesAdded, move |event| {
            if let EntityEvent::NodesAdded(nodes) = event {
                added_clone.fetch_add(nodes.len() as i32, Ordering::SeqCst);
            }
        });
        let updated_id = store.on(EntityEventKind::NodesUpdated, move |event| {
            if let EntityEvent::NodesUpdated(nodes) = event {
                updated_clone.fetch_add(nodes.len() as i32, Ordering::SeqCst);
            }
        });

        store.set_nodes(vec![node("a"), node("b"), node("c")]);
        assert_eq!(added.load(Ordering::SeqCst), 2);
        assert_eq!(updated.load(Ordering::SeqCst), 1);

        assert!(store.off(updated_id));
        assert!(!store.off(updated_id));
        store.set_node(node("a"));
        assert_eq!(updated.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn write_through_position_is_silent_and_not_dirty() {
        let store = EntityStore::new();
        store.set_node(node("a"));

        let notifications = Arc::new(AtomicI32::new(0));
        let notifications_clone = notifications.clone();
        store.store().subscribe(
            |s: &EntityState| s.nodes_revision,
            move |_, _| {
                notifications_clone.fetch_add(1, Ordering::SeqCst);
            },
        );
        let events = Arc::new(AtomicI32::new(0));
        let events_clone = events.clone();
        store.on(EntityEventKind::NodesUpdated, move |_| {
            events_clone.fetch_add(1, Ordering::SeqCst);
        });

        let a: NodeId = "a".into();
        store.set_node_position(&a, Position::new(3.0, 4.0), true);
        assert_eq!(store.get_node(&a).unwrap().position, Some(Position::new(3.0, 4.0)));
        assert_eq!(notifications.load(Ordering::SeqCst), 0);
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert!(store.dirty_positions().is_empty());

        store.set_node_position(&a, Position::new(5.0, 6.0), false);
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
        assert_eq!(events.load(Ordering::SeqCst), 2);
        assert!(store.dirty_positions().contains(&a));

        let taken = store.take_dirty_positions();
        assert_eq!(taken.len(), 1);
        assert!(store.dirty_positions().is_empty());
    }

    #[test]
    fn replace_all_notifies_once_with_final_state() {
        let store = EntityStore::new();
        store.set_nodes(vec![node("old")]);
        store.set_relations(vec![relation("r-old", "old", "old")]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let handle = store.clone();
        store.store().subscribe(
            |s: &EntityState| (s.nodes_revision, s.relations_revision),
            move |_, _| {
                // Observers never see the cleared intermediate state.
                seen_clone
                    .lock()
                    .push((handle.nodes().len(), handle.relations().len()));
            },
        );

        store.replace_all(
            vec![node("a"), node("b")],
            vec![relation("r1", "a", "b")],
        );

        assert_eq!(*seen.lock(), vec![(2, 1)]);
        assert!(store.get_node(&"old".into()).is_none());
    }

    #[test]
    fn non_placeholder_ids_skip_sentinels() {
        let store = EntityStore::new();
        store.set_nodes(vec![node("a"), Node::placeholder("ghost"), node("b")]);
        assert_eq!(
            store.non_placeholder_node_ids(),
            vec![NodeId::from("a"), NodeId::from("b")]
        );
    }
}
