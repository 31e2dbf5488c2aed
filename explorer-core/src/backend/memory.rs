//! In-memory graph backend.
//!
//! This is the reference implementation of `GraphBackend`. It keeps the
//! whole graph in `IndexMap`s protected by `RwLock`s and answers every
//! request synchronously.
//!
//! ## Exploration semantics
//!
//! - The seed set is the requested node ids that exist and pass the seed
//!   filters.
//! - Each step replaces the current set with its neighbors along the step's
//!   relation types: `outgoing` follows relations leaving the set, `incoming`
//!   follows relations pointing into it. Neighbors must pass the step filters.
//! - A step without any relation type is rejected.
//! - Returned relations are those with both endpoints in the result set.
//!
//! ## Test hooks
//!
//! Latency can be queued per request kind so tests can make responses
//! arrive out of order, and a one-shot failure can be armed to exercise
//! error paths.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};

use super::{GraphBackend, NodePatch, RelationPatch};
use crate::model::{
    Node, NodeId, ParallaxData, ParallaxRequest, Perspective, PerspectiveDraft, PerspectiveId,
    Relation, RelationId,
};
use crate::{Error, Result};

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory graph server.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    nodes: RwLock<IndexMap<NodeId, Node>>,
    relations: RwLock<IndexMap<RelationId, Relation>>,
    perspectives: RwLock<IndexMap<PerspectiveId, PerspectiveDraft>>,
    next_perspective_id: AtomicU64,
    explore_calls: AtomicUsize,
    relation_calls: AtomicUsize,
    explore_latency: Mutex<VecDeque<Duration>>,
    relation_latency: Mutex<VecDeque<Duration>>,
    fail_next: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_nodes(&self, nodes: impl IntoIterator<Item = Node>) {
        let mut map = self.inner.nodes.write();
        for node in nodes {
            map.insert(node.id.clone(), node);
        }
    }

    pub fn insert_relations(&self, relations: impl IntoIterator<Item = Relation>) {
        let mut map = self.inner.relations.write();
        for relation in relations {
            map.insert(relation.id.clone(), relation);
        }
    }

    pub fn with_nodes(self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.insert_nodes(nodes);
        self
    }

    pub fn with_relations(self, relations: impl IntoIterator<Item = Relation>) -> Self {
        self.insert_relations(relations);
        self
    }

    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.inner.nodes.read().get(id).cloned()
    }

    pub fn perspective_draft(&self, id: &PerspectiveId) -> Option<PerspectiveDraft> {
        self.inner.perspectives.read().get(id).cloned()
    }

    /// Delay the next `explore` response by `latency`. Queued delays are
    /// consumed in call order.
    pub fn queue_explore_latency(&self, latency: Duration) {
        self.inner.explore_latency.lock().push_back(latency);
    }

    /// Delay the next `relations_by_node_ids` response by `latency`.
    pub fn queue_relation_latency(&self, latency: Duration) {
        self.inner.relation_latency.lock().push_back(latency);
    }

    /// Make the next request of any kind fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.inner.fail_next.lock() = Some(message.into());
    }

    pub fn explore_calls(&self) -> usize {
        self.inner.explore_calls.load(Ordering::SeqCst)
    }

    pub fn relation_calls(&self) -> usize {
        self.inner.relation_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<()> {
        match self.inner.fail_next.lock().take() {
            Some(message) => Err(Error::backend(message)),
            None => Ok(()),
        }
    }

    async fn delay(queue: &Mutex<VecDeque<Duration>>) {
        let latency = queue.lock().pop_front();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn run_exploration(&self, request: &ParallaxRequest) -> Result<ParallaxData> {
        let nodes = self.inner.nodes.read();
        let relations = self.inner.relations.read();

        let mut current: IndexSet<NodeId> = request
            .node_ids
            .iter()
            .filter(|id| nodes.get(*id).is_some_and(|node| request.filters.matches(node)))
            .cloned()
            .collect();

        for step in &request.steps {
            if !step.has_relation_types() {
                return Err(Error::backend(
                    "a parallax step must include at least one relation type",
                ));
            }

            let mut next = IndexSet::new();
            for relation in relations.values() {
                let mut neighbors = Vec::with_capacity(2);
                if step.outgoing_relation_types.contains(&relation.relation_type)
                    && current.contains(&relation.source_id)
                {
                    neighbors.push(&relation.target_id);
                }
                if step.incoming_relation_types.contains(&relation.relation_type)
                    && current.contains(&relation.target_id)
                {
                    neighbors.push(&relation.source_id);
                }
                for neighbor in neighbors {
                    if nodes.get(neighbor).is_some_and(|node| step.filters.matches(node)) {
                        next.insert(neighbor.clone());
                    }
                }
            }
            current = next;
        }

        let mut data = ParallaxData::default();
        let mut labels = IndexSet::new();
        let mut properties = IndexSet::new();
        for id in &current {
            if let Some(node) = nodes.get(id) {
                labels.extend(node.labels.iter().cloned());
                properties.extend(node.properties.keys().cloned());
                data.nodes.insert(id.clone(), node.clone());
            }
        }
        data.labels = labels.into_iter().collect();
        data.properties = properties.into_iter().collect();

        for relation in relations.values() {
            let from_set = current.contains(&relation.source_id);
            let into_set = current.contains(&relation.target_id);
            if from_set && into_set {
                data.relations.insert(relation.id.clone(), relation.clone());
            }
            if into_set {
                data.incoming_relation_types
                    .entry(relation.relation_type.clone())
                    .or_default()
                    .count += 1;
            }
            if from_set {
                data.outgoing_relation_types
                    .entry(relation.relation_type.clone())
                    .or_default()
                    .count += 1;
            }
        }

        Ok(data)
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("nodes", &self.inner.nodes.read().len())
            .field("relations", &self.inner.relations.read().len())
            .field("perspectives", &self.inner.perspectives.read().len())
            .finish()
    }
}

// ============================================================================
// GraphBackend impl
// ============================================================================

#[async_trait]
impl GraphBackend for MemoryBackend {
    async fn fetch_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        self.check_failure()?;
        let nodes = self.inner.nodes.read();
        Ok(ids.iter().filter_map(|id| nodes.get(id).cloned()).collect())
    }

    async fn fetch_relations(&self, ids: &[RelationId]) -> Result<Vec<Relation>> {
        self.check_failure()?;
        let relations = self.inner.relations.read();
        Ok(ids.iter().filter_map(|id| relations.get(id).cloned()).collect())
    }

    async fn patch_node(&self, patch: &NodePatch) -> Result<Node> {
        self.check_failure()?;
        let mut nodes = self.inner.nodes.write();
        let node = nodes
            .get_mut(&patch.id)
            .ok_or_else(|| Error::NotFound(format!("node {}", patch.id)))?;
        patch.apply(node);
        Ok(node.clone())
    }

    async fn patch_relation(&self, patch: &RelationPatch) -> Result<Relation> {
        self.check_failure()?;
        let mut relations = self.inner.relations.write();
        let relation = relations
            .get_mut(&patch.id)
            .ok_or_else(|| Error::NotFound(format!("relation {}", patch.id)))?;
        patch.apply(relation);
        Ok(relation.clone())
    }

    async fn delete_nodes(&self, ids: &[NodeId]) -> Result<()> {
        self.check_failure()?;
        self.inner.nodes.write().retain(|id, _| !ids.contains(id));
        self.inner
            .relations
            .write()
            .retain(|_, relation| !ids.iter().any(|id| relation.touches(id)));
        Ok(())
    }

    async fn delete_relations(&self, ids: &[RelationId]) -> Result<()> {
        self.check_failure()?;
        self.inner.relations.write().retain(|id, _| !ids.contains(id));
        Ok(())
    }

    async fn relations_by_node_ids(
        &self,
        node_ids: &[NodeId],
        exclude_types: &[String],
    ) -> Result<Vec<Relation>> {
        self.inner.relation_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(&self.inner.relation_latency).await;
        self.check_failure()?;

        let wanted: IndexSet<&NodeId> = node_ids.iter().collect();
        Ok(self
            .inner
            .relations
            .read()
            .values()
            .filter(|relation| {
                wanted.contains(&relation.source_id)
                    && wanted.contains(&relation.target_id)
                    && !exclude_types.contains(&relation.relation_type)
            })
            .cloned()
            .collect())
    }

    async fn explore(&self, request: &ParallaxRequest) -> Result<ParallaxData> {
        self.inner.explore_calls.fetch_add(1, Ordering::SeqCst);
        Self::delay(&self.inner.explore_latency).await;
        self.check_failure()?;
        self.run_exploration(request)
    }

    async fn create_perspective(&self, draft: &PerspectiveDraft) -> Result<PerspectiveId> {
        self.check_failure()?;
        let n = self.inner.next_perspective_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = PerspectiveId::new(format!("perspective-{n}"));
        self.inner.perspectives.write().insert(id.clone(), draft.clone());
        Ok(id)
    }

    async fn update_perspective(&self, id: &PerspectiveId, draft: &PerspectiveDraft) -> Result<()> {
        self.check_failure()?;
        let mut perspectives = self.inner.perspectives.write();
        let stored = perspectives
            .get_mut(id)
            .ok_or_else(|| Error::PerspectiveNotFound(id.to_string()))?;
        *stored = draft.clone();
        Ok(())
    }

    async fn get_perspective(&self, id: &PerspectiveId) -> Result<Perspective> {
        self.check_failure()?;
        let draft = self
            .perspective_draft(id)
            .ok_or_else(|| Error::PerspectiveNotFound(id.to_string()))?;

        let nodes = self.inner.nodes.read();
        let relations = self.inner.relations.read();
        Ok(Perspective {
            id: id.clone(),
            name: draft.name.clone(),
            nodes: draft
                .node_positions
                .iter()
                .filter_map(|(node_id, position)| {
                    nodes
                        .get(node_id)
                        .map(|node| (node_id.clone(), node.clone().with_position(*position)))
                })
                .collect(),
            relations: draft
                .relation_ids
                .iter()
                .filter_map(|rid| relations.get(rid).map(|r| (rid.clone(), r.clone())))
                .collect(),
        })
    }

    async fn delete_perspective(&self, id: &PerspectiveId) -> Result<()> {
        self.check_failure()?;
        self.inner
            .perspectives
            .write()
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::PerspectiveNotFound(id.to_string()))
    }
}
