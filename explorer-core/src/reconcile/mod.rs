//! Reconciliation Pipeline
//!
//! Turns each published search result into the contents of the entity
//! store, and keeps the exploration engine and the search presentation in
//! line with it.
//!
//! # How It Works
//!
//! For every result, in order:
//!
//! 1. A result not produced by the exploration engine resets it. Once the
//!    entity store holds the new nodes, a fresh zero-step exploration is
//!    seeded with the nodes found in the result itself (not the endpoints
//!    filled in later).
//!
//! 2. Nodes and relations are extracted from the result rows.
//!
//! 3. With autoconnect enabled, relations among the discovered and the
//!    already loaded nodes are fetched and merged, never overwriting a
//!    relation the result already contains.
//!
//! 4. Relation endpoints missing from the node map are filled in, as
//!    placeholders when nothing is known about them.
//!
//! 5. A graph presentation without nodes but with rows switches to the
//!    result table, with one informational notice. Nodes without any
//!    relation switch the layout to noverlap.
//!
//! 6. The entity maps are replaced in one batch, and only then is the
//!    result marked processed.
//!
//! A run that is overtaken by a newer result while waiting for the backend
//! is dropped without touching any store.

mod extract;
mod search;

pub use extract::ExtractedGraph;
pub use search::{SearchState, SearchStore};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::GraphBackend;
use crate::entities::{failure_notification, EntityStore};
use crate::model::{LayoutAlgorithm, NodeId, Presentation, SearchResult, Seed};
use crate::notify::{Notification, Notifier};
use crate::parallax::ExplorationEngine;
use crate::reactive::SubscriberId;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Applied { nodes: usize, relations: usize },
    /// A newer result arrived while this one was being processed.
    Superseded,
}

struct PipelineInner {
    autoconnect: bool,
    backend: Arc<dyn GraphBackend>,
    entities: EntityStore,
    search: SearchStore,
    exploration: ExplorationEngine,
    notifier: Arc<dyn Notifier>,
    token: AtomicU64,
    subscription: Mutex<Option<SubscriberId>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct ReconciliationPipeline {
    inner: Arc<PipelineInner>,
}

impl ReconciliationPipeline {
    pub fn new(
        autoconnect: bool,
        backend: Arc<dyn GraphBackend>,
        entities: EntityStore,
        search: SearchStore,
        exploration: ExplorationEngine,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                autoconnect,
                backend,
                entities,
                search,
                exploration,
                notifier,
                token: AtomicU64::new(0),
                subscription: Mutex::new(None),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Process every result published to the search store from now on.
    ///
    /// Runs are spawned on the current tokio runtime.
    pub fn attach(&self) {
        self.detach();

        let weak = Arc::downgrade(&self.inner);
        let id = self.inner.search.on_result(move |result| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!("search result published outside a tokio runtime, not processed");
                return;
            };
            let pipeline = ReconciliationPipeline { inner };
            let task = pipeline.clone();
            let handle = runtime.spawn(async move {
                if let Err(err) = task.process(result).await {
                    debug!(error = %err, "search result processing failed");
                }
            });
            *pipeline.inner.pending.lock() = Some(handle);
        });
        *self.inner.subscription.lock() = Some(id);
    }

    /// Stop processing. A run still in flight is dropped on completion.
    pub fn detach(&self) {
        if let Some(id) = self.inner.subscription.lock().take() {
            self.inner.search.unsubscribe(id);
            self.inner.token.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.subscription.lock().is_some()
    }

    /// Wait for the run spawned by the latest published result.
    pub async fn settle(&self) {
        let handle = self.inner.pending.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "search result task did not complete");
            }
        }
    }

    fn is_current(&self, token: u64) -> bool {
        self.inner.token.load(Ordering::SeqCst) == token
    }

    /// Reconcile the stores with `result`.
    pub async fn process(&self, result: Arc<SearchResult>) -> Result<ProcessOutcome> {
        let inner = &self.inner;
        let token = inner.token.fetch_add(1, Ordering::SeqCst) + 1;

        let restart = result.kind.restarts_exploration();
        if restart {
            inner.exploration.reset();
        }

        let mut graph = ExtractedGraph::from_result(&result);
        let found: Vec<NodeId> = graph.node_ids().cloned().collect();

        if inner.autoconnect && !graph.nodes.is_empty() {
            let mut ids: IndexSet<NodeId> = graph.node_ids().cloned().collect();
            ids.extend(inner.entities.non_placeholder_node_ids());
            let ids: Vec<NodeId> = ids.into_iter().collect();

            let fetched = inner.backend.relations_by_node_ids(&ids, &[]).await;
            if !self.is_current(token) {
                debug!(token, "search result superseded during autoconnect");
                return Ok(ProcessOutcome::Superseded);
            }
            match fetched {
                Ok(relations) => {
                    let added = graph.merge_relations(relations);
                    debug!(added, "autoconnect relations merged");
                }
                Err(err) => {
                    warn!(error = %err, "autoconnect failed");
                    inner.notifier.notify(failure_notification(&err));
                }
            }
        }

        let entities = &inner.entities;
        let placeholders = graph.resolve_endpoints(|id| entities.get_node(id));
        if placeholders > 0 {
            debug!(placeholders, "relation endpoints added");
        }

        if inner.search.presentation() == Presentation::Graph
            && graph.nodes.is_empty()
            && !result.rows.is_empty()
        {
            inner.search.set_presentation(Presentation::ResultTable);
            inner.notifier.notify(Notification::informational(
                "The result contains no nodes, showing it as a table",
            ));
        }
        if !graph.nodes.is_empty() && graph.relations.is_empty() {
            inner.search.set_layout(LayoutAlgorithm::Noverlap);
        }

        let (nodes, relations) = graph.into_parts();
        let outcome = ProcessOutcome::Applied {
            nodes: nodes.len(),
            relations: relations.len(),
        };
        entities.replace_all(nodes, relations);
        inner.search.mark_processed();
        debug!(?outcome, kind = ?result.kind, "search result processed");

        if restart && !found.is_empty() {
            if let Err(err) = inner.exploration.set_initial_query(Seed::new(found)).await {
                debug!(error = %err, "exploration seeding failed");
            }
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for ReconciliationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationPipeline")
            .field("autoconnect", &self.inner.autoconnect)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

// ---- Tests
