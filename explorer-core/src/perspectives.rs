//! Saved perspectives: the current node set with its layout.
//!
//! Saving snapshots what the renderer shows (drawn positions of the real
//! nodes and every drawn relation), writes those positions through to the
//! entity store and clears its dirty set. Loading publishes the stored
//! entities as a `Perspective` search result, so they reach the entity store
//! through the reconciliation pipeline like any other result.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::backend::GraphBackend;
use crate::entities::{failure_notification, EntityStore};
use crate::model::{
    LayoutAlgorithm, NodeId, Perspective, PerspectiveDraft, PerspectiveId, Position, RelationId,
    SearchResult, SearchResultKind,
};
use crate::notify::{Notification, Notifier};
use crate::reactive::Store;
use crate::reconcile::SearchStore;
use crate::render::RenderStateStore;
use crate::Result;

/// The perspective the graph was loaded from or last saved as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerspectiveState {
    pub id: Option<PerspectiveId>,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct PerspectiveService {
    backend: Arc<dyn GraphBackend>,
    entities: EntityStore,
    render: RenderStateStore,
    search: SearchStore,
    notifier: Arc<dyn Notifier>,
    store: Store<PerspectiveState>,
}

impl PerspectiveService {
    pub fn new(
        backend: Arc<dyn GraphBackend>,
        entities: EntityStore,
        render: RenderStateStore,
        search: SearchStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            backend,
            entities,
            render,
            search,
            notifier,
            store: Store::default(),
        }
    }

    pub fn store(&self) -> &Store<PerspectiveState> {
        &self.store
    }

    pub fn current(&self) -> PerspectiveState {
        self.store.get_state()
    }

    /// Forget the current perspective without touching the backend.
    pub fn clear(&self) {
        self.store.set_state(|state| *state = PerspectiveState::default());
    }

    fn snapshot(&self, name: &str) -> PerspectiveDraft {
        let (node_positions, relation_ids) = self.render.with_scene(|scene| {
            let positions: IndexMap<NodeId, Position> = scene
                .nodes()
                .filter(|(_, attributes)| !attributes.placeholder)
                .map(|(id, attributes)| (id.clone(), attributes.position()))
                .collect();
            let relations: Vec<RelationId> = scene.edges().map(|(id, _)| id.clone()).collect();
            (positions, relations)
        });
        PerspectiveDraft {
            name: name.to_owned(),
            node_positions,
            relation_ids,
        }
    }

    fn commit_layout(&self, draft: &PerspectiveDraft) {
        let positions = draft
            .node_positions
            .iter()
            .map(|(id, position)| (id.clone(), *position));
        self.entities.set_node_positions(positions, true);
        self.entities.take_dirty_positions();
    }

    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!(error = %err, "perspective request failed");
            self.notifier.notify(failure_notification(err));
        }
        result
    }

    /// Store the current view as a new perspective and make it current.
    pub async fn save_as(&self, name: impl Into<String>) -> Result<PerspectiveId> {
        let name = name.into();
        let draft = self.snapshot(&name);
        let id = self.report(self.backend.create_perspective(&draft).await)?;

        self.commit_layout(&draft);
        info!(%id, nodes = draft.node_positions.len(), "perspective created");
        self.store.set_state(|state| {
            state.id = Some(id.clone());
            state.name = Some(name);
        });
        self.notifier.notify(Notification::successful("Perspective saved"));
        Ok(id)
    }

    /// Overwrite the current perspective with the current view.
    ///
    /// Returns `false` when there is no current perspective.
    pub async fn save(&self) -> Result<bool> {
        let PerspectiveState { id: Some(id), name } = self.current() else {
            warn!("save without a current perspective ignored");
            return Ok(false);
        };
        let draft = self.snapshot(name.as_deref().unwrap_or_default());
        self.report(self.backend.update_perspective(&id, &draft).await)?;

        self.commit_layout(&draft);
        info!(%id, nodes = draft.node_positions.len(), "perspective updated");
        self.notifier.notify(Notification::successful("Perspective updated"));
        Ok(true)
    }

    /// Fetch a perspective and publish its entities as the current result.
    pub async fn load(&self, id: &PerspectiveId) -> Result<Perspective> {
        let perspective = self.report(self.backend.get_perspective(id).await)?;

        self.store.set_state(|state| {
            state.id = Some(perspective.id.clone());
            state.name = Some(perspective.name.clone());
        });
        self.search.set_layout(LayoutAlgorithm::Perspective);
        self.search.set_result(SearchResult::from_entities(
            SearchResultKind::Perspective,
            perspective.nodes.values().cloned().collect(),
            perspective.relations.values().cloned().collect(),
        ));
        info!(%id, nodes = perspective.nodes.len(), "perspective loaded");
        Ok(perspective)
    }

    pub async fn delete(&self, id: &PerspectiveId) -> Result<()> {
        self.report(self.backend.delete_perspective(id).await)?;
        self.store.set_state(|state| {
            if state.id.as_ref() == Some(id) {
                *state = PerspectiveState::default();
            }
        });
        self.notifier.notify(Notification::successful("Perspective deleted"));
        Ok(())
    }
}

impl std::fmt::Debug for PerspectiveService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerspectiveService")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}
