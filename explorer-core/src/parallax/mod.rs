//! Exploration Engine ("Parallax")
//!
//! An exploration starts from a seed (node ids plus filters) and grows one
//! step at a time along relation types. Every change replays the whole
//! chain against the backend; nothing is computed incrementally.
//!
//! # Phases
//!
//! ```text
//! Idle --set_initial_query--> Seeded --commit_step--> Stepped(1) --commit_step--> Stepped(2) ...
//!   ^                                  <--jump(-1)---            <----jump(0)----
//!   +---------------------------- reset (from any phase) ---------------------------+
//! ```
//!
//! The phase is derived from the state: no seed is `Idle`, a seed without
//! history is `Seeded`, and `n` history entries is `Stepped(n)`. Jumping to
//! a breadcrumb truncates the history, so the last entry is always the
//! current one.
//!
//! # Concurrency
//!
//! Every replay takes a token from a monotonically increasing counter.
//! When a response arrives and a newer request has been issued since, the
//! response is dropped and the call reports [`ReplayOutcome::Superseded`].
//! `is_loading` is only cleared by the newest request.

mod history;

pub use history::{Breadcrumb, HistoryEntry, ReplayChain};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::backend::GraphBackend;
use crate::entities::failure_notification;
use crate::model::{
    ParallaxData, ParallaxFilters, ParallaxStep, RelationTypeCount, SearchResult, SearchResultKind, Seed,
};
use crate::notify::Notifier;
use crate::reactive::{Store, SubscriberId};
use crate::reconcile::SearchStore;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationPhase {
    Idle,
    Seeded,
    Stepped(usize),
}

/// What happened to a replay request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// The response was the newest and has been applied.
    Applied,
    /// A newer request was issued while this one was in flight.
    Superseded,
    /// The request was not sent (no seed, bad index, empty step).
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplorationState {
    pub seed: Option<Seed>,
    pub history: Vec<HistoryEntry>,
    /// Result of the newest applied replay.
    pub data: Option<Arc<ParallaxData>>,
    pub data_revision: u64,
    pub is_loading: bool,
}

impl ExplorationState {
    pub fn phase(&self) -> ExplorationPhase {
        match (&self.seed, self.history.len()) {
            (None, _) => ExplorationPhase::Idle,
            (Some(_), 0) => ExplorationPhase::Seeded,
            (Some(_), n) => ExplorationPhase::Stepped(n),
        }
    }

    /// -1 while only the seed is in force.
    pub fn current_history_index(&self) -> isize {
        self.history.len() as isize - 1
    }

    pub fn steps(&self) -> Vec<ParallaxStep> {
        self.history.iter().map(|entry| entry.step.clone()).collect()
    }
}

/// Relation types, labels and property keys available for the next step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NextStepOptions {
    pub incoming: IndexMap<String, RelationTypeCount>,
    pub outgoing: IndexMap<String, RelationTypeCount>,
    pub labels: Vec<String>,
    pub properties: Vec<String>,
}

struct EngineInner {
    backend: Arc<dyn GraphBackend>,
    search: SearchStore,
    notifier: Arc<dyn Notifier>,
    store: Store<ExplorationState>,
    token: AtomicU64,
}

/// Handle on the exploration session. Cloning shares the session.
#[derive(Clone)]
pub struct ExplorationEngine {
    inner: Arc<EngineInner>,
}

impl ExplorationEngine {
    pub fn new(backend: Arc<dyn GraphBackend>, search: SearchStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                backend,
                search,
                notifier,
                store: Store::default(),
                token: AtomicU64::new(0),
            }),
        }
    }

    pub fn store(&self) -> &Store<ExplorationState> {
        &self.inner.store
    }

    pub fn state(&self) -> ExplorationState {
        self.inner.store.get_state()
    }

    pub fn phase(&self) -> ExplorationPhase {
        self.inner.store.read(ExplorationState::phase)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.store.read(|state| state.is_loading)
    }

    pub fn history_len(&self) -> usize {
        self.inner.store.read(|state| state.history.len())
    }

    pub fn data(&self) -> Option<Arc<ParallaxData>> {
        self.inner.store.read(|state| state.data.clone())
    }

    /// Seed first, then one crumb per history entry.
    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.inner.store.read(|state| {
            let Some(seed) = &state.seed else {
                return Vec::new();
            };
            std::iter::once(Breadcrumb::Seed(seed.clone()))
                .chain(state.history.iter().enumerate().map(|(index, entry)| Breadcrumb::Step {
                    index,
                    step: entry.step.clone(),
                }))
                .collect()
        })
    }

    pub fn next_step_options(&self) -> Option<NextStepOptions> {
        self.inner.store.read(|state| {
            state.data.as_ref().map(|data| NextStepOptions {
                incoming: data.incoming_relation_types.clone(),
                outgoing: data.outgoing_relation_types.clone(),
                labels: data.labels.clone(),
                properties: data.properties.clone(),
            })
        })
    }

    /// The seed and steps currently in force.
    pub fn replay_chain(&self) -> Option<ReplayChain> {
        self.inner.store.read(|state| {
            state
                .seed
                .clone()
                .map(|seed| ReplayChain::new(seed, state.steps()))
        })
    }

    /// Subscribe to phase changes.
    pub fn on_phase_change<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(ExplorationPhase, ExplorationPhase) + Send + Sync + 'static,
    {
        self.inner
            .store
            .subscribe(ExplorationState::phase, move |next, previous| callback(*next, *previous))
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start over from `seed`, dropping all history.
    ///
    /// The zero-step replay refreshes the exploration data only; it does not
    /// publish a search result.
    pub async fn set_initial_query(&self, seed: Seed) -> Result<ReplayOutcome> {
        debug!(nodes = seed.node_ids.len(), "exploration seeded");
        self.inner.store.set_state(|state| {
            state.seed = Some(seed);
            state.history.clear();
        });
        self.replay(false).await
    }

    /// Append `step` to the history and replay the whole chain.
    pub async fn commit_step(&self, step: ParallaxStep) -> Result<ReplayOutcome> {
        let Some(seed) = self.inner.store.read(|state| state.seed.clone()) else {
            warn!("commit_step without a seed ignored");
            return Ok(ReplayOutcome::Ignored);
        };
        if !step.has_relation_types() {
            warn!("commit_step without relation types ignored");
            return Ok(ReplayOutcome::Ignored);
        }

        self.inner
            .store
            .set_state(|state| state.history.push(HistoryEntry { step, seed }));
        self.replay(true).await
    }

    /// Go back to breadcrumb `index`, discarding every later entry.
    ///
    /// `-1` returns to the seed. Indices outside `-1..history.len()` are
    /// ignored.
    pub async fn jump_to_history_index(&self, index: isize) -> Result<ReplayOutcome> {
        let (has_seed, len) = self
            .inner
            .store
            .read(|state| (state.seed.is_some(), state.history.len()));
        if !has_seed || index < -1 || index >= len as isize {
            warn!(index, history = len, "breadcrumb jump out of range ignored");
            return Ok(ReplayOutcome::Ignored);
        }

        let keep = (index + 1) as usize;
        if keep < len {
            info!(dropped = len - keep, "history truncated");
        }
        self.inner.store.set_state(|state| state.history.truncate(keep));
        self.replay(true).await
    }

    /// Replace the filters of the current breadcrumb (the seed when there is
    /// no history) and replay.
    pub async fn apply_filters(&self, filters: ParallaxFilters) -> Result<ReplayOutcome> {
        if self.inner.store.read(|state| state.seed.is_none()) {
            warn!("apply_filters without a seed ignored");
            return Ok(ReplayOutcome::Ignored);
        }

        self.inner.store.set_state(|state| match state.history.last_mut() {
            Some(entry) => entry.step.filters = filters,
            None => {
                if let Some(seed) = state.seed.as_mut() {
                    seed.filters = filters;
                }
            }
        });
        self.replay(true).await
    }

    /// Load an exported chain as the current exploration and replay it.
    pub async fn restore(&self, chain: ReplayChain) -> Result<ReplayOutcome> {
        let history = chain.entries();
        self.inner.store.set_state(|state| {
            state.seed = Some(chain.seed);
            state.history = history;
        });
        self.replay(true).await
    }

    /// Replay the current chain again.
    pub async fn refresh(&self) -> Result<ReplayOutcome> {
        if self.inner.store.read(|state| state.seed.is_none()) {
            return Ok(ReplayOutcome::Ignored);
        }
        self.replay(true).await
    }

    /// Back to `Idle`. Responses still in flight are dropped on arrival.
    pub fn reset(&self) {
        self.inner.token.fetch_add(1, Ordering::SeqCst);
        self.inner.store.set_state(|state| *state = ExplorationState::default());
    }

    // ========================================================================
    // Replay
    // ========================================================================

    async fn replay(&self, publish: bool) -> Result<ReplayOutcome> {
        let Some(chain) = self.replay_chain() else {
            return Ok(ReplayOutcome::Ignored);
        };
        let token = self.inner.token.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.store.set_state(|state| state.is_loading = true);

        let response = self.inner.backend.explore(&chain.request()).await;

        if self.inner.token.load(Ordering::SeqCst) != token {
            debug!(token, "stale exploration response dropped");
            return Ok(ReplayOutcome::Superseded);
        }

        let data = match response {
            Ok(data) => data,
            Err(err) => {
                warn!(error = %err, "exploration request failed");
                self.inner.store.set_state(|state| state.is_loading = false);
                self.inner.notifier.notify(failure_notification(&err));
                return Err(err);
            }
        };

        debug!(
            token,
            steps = chain.steps.len(),
            nodes = data.nodes.len(),
            relations = data.relations.len(),
            "exploration replayed"
        );

        let published = publish.then(|| {
            SearchResult::from_entities(
                SearchResultKind::Parallax,
                data.nodes.values().cloned().collect(),
                data.relations.values().cloned().collect(),
            )
        });
        self.inner.store.set_state(|state| {
            state.data = Some(Arc::new(data));
            state.data_revision += 1;
            state.is_loading = false;
        });
        if let Some(result) = published {
            self.inner.search.set_result(result);
        }
        Ok(ReplayOutcome::Applied)
    }
}

impl std::fmt::Debug for ExplorationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorationEngine")
            .field("phase", &self.phase())
            .field("token", &self.inner.token.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// ---- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::model::{Node, NodeId, Relation};
    use crate::notify::{NotificationKind, NotificationLog};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn backend() -> MemoryBackend {
        MemoryBackend::new()
            .with_nodes([
                Node::new("n1").with_labels(["Person"]),
                Node::new("n2").with_labels(["Person"]),
                Node::new("n3").with_labels(["Company"]),
            ])
            .with_relations([
                Relation::new("r1", "knows", "n2", "n1"),
                Relation::new("r2", "works_at", "n2", "n3"),
            ])
    }

    fn engine(backend: &MemoryBackend) -> (ExplorationEngine, SearchStore, Arc<NotificationLog>) {
        let search = SearchStore::new();
        let log = Arc::new(NotificationLog::new());
        let engine = ExplorationEngine::new(Arc::new(backend.clone()), search.clone(), log.clone());
        (engine, search, log)
    }

    fn ids(data: &ParallaxData) -> Vec<NodeId> {
        data.nodes.keys().cloned().collect()
    }

    #[tokio::test]
    async fn seeding_replays_without_publishing() {
        let backend = backend();
        let (engine, search, _) = engine(&backend);
        assert_eq!(engine.phase(), ExplorationPhase::Idle);

        let outcome = engine.set_initial_query(Seed::new(["n1"])).await.unwrap();
        assert_eq!(outcome, ReplayOutcome::Applied);
        assert_eq!(engine.phase(), ExplorationPhase::Seeded);
        assert!(search.result().is_none());
        assert!(!engine.is_loading());

        let options = engine.next_step_options().unwrap();
        assert!(options.incoming.contains_key("knows"));
    }

    #[tokio::test]
    async fn commit_appends_and_publishes_parallax_result() {
        let backend = backend();
        let (engine, search, _) = engine(&backend);
        engine.set_initial_query(Seed::new(["n1"])).await.unwrap();

        engine.commit_step(ParallaxStep::incoming(["knows"])).await.unwrap();

        assert_eq!(engine.phase(), ExplorationPhase::Stepped(1));
        assert_eq!(engine.breadcrumbs().len(), 2);
        assert_eq!(ids(&engine.data().unwrap()), vec![NodeId::from("n2")]);
        let result = search.result().unwrap();
        assert_eq!(result.kind, SearchResultKind::Parallax);
        assert_eq!(result.rows.len(), 1);
    }

    #[tokio::test]
    async fn commit_without_seed_is_ignored() {
        let backend = backend();
        let (engine, _, _) = engine(&backend);
        let outcome = engine.commit_step(ParallaxStep::incoming(["knows"])).await.unwrap();
        assert_eq!(outcome, ReplayOutcome::Ignored);
        assert_eq!(engine.phase(), ExplorationPhase::Idle);
        assert_eq!(backend.explore_calls(), 0);
    }

    #[tokio::test]
    async fn jump_truncates_and_rejects_bad_indices() {
        let backend = backend();
        let (engine, _, _) = engine(&backend);
        engine.set_initial_query(Seed::new(["n1"])).await.unwrap();
        engine.commit_step(ParallaxStep::incoming(["knows"])).await.unwrap();
        engine.commit_step(ParallaxStep::outgoing(["works_at"])).await.unwrap();
        assert_eq!(engine.phase(), ExplorationPhase::Stepped(2));

        assert_eq!(engine.jump_to_history_index(5).await.unwrap(), ReplayOutcome::Ignored);
        assert_eq!(engine.jump_to_history_index(-2).await.unwrap(), ReplayOutcome::Ignored);

        engine.jump_to_history_index(-1).await.unwrap();
        assert_eq!(engine.phase(), ExplorationPhase::Seeded);
        assert!(engine.state().history.is_empty());
        assert_eq!(ids(&engine.data().unwrap()), vec![NodeId::from("n1")]);
    }

    #[tokio::test]
    async fn filters_apply_to_the_current_crumb() {
        let backend = backend();
        let (engine, _, _) = engine(&backend);
        engine.set_initial_query(Seed::new(["n1", "n3"])).await.unwrap();

        engine
            .apply_filters(ParallaxFilters::default().with_label("Company"))
            .await
            .unwrap();
        let state = engine.state();
        assert_eq!(state.seed.unwrap().filters.labels, vec!["Company".to_owned()]);
        assert_eq!(ids(&state.data.unwrap()), vec![NodeId::from("n3")]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_dropped() {
        let backend = backend();
        let (engine, _, _) = engine(&backend);
        engine.set_initial_query(Seed::new(["n1"])).await.unwrap();

        backend.queue_explore_latency(Duration::from_millis(500));
        backend.queue_explore_latency(Duration::from_millis(10));

        let slow = engine.commit_step(ParallaxStep::incoming(["knows"]));
        let fast = async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            engine.jump_to_history_index(-1).await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(slow.unwrap(), ReplayOutcome::Superseded);
        assert_eq!(fast.unwrap(), ReplayOutcome::Applied);
        assert_eq!(ids(&engine.data().unwrap()), vec![NodeId::from("n1")]);
        assert!(!engine.is_loading());
    }

    #[tokio::test]
    async fn failure_notifies_and_clears_loading() {
        let backend = backend();
        let (engine, _, log) = engine(&backend);
        backend.fail_next("gateway timeout");

        assert!(engine.set_initial_query(Seed::new(["n1"])).await.is_err());
        assert!(!engine.is_loading());
        assert_eq!(log.notifications()[0].kind, NotificationKind::Critical);
    }

    #[tokio::test]
    async fn restore_replays_an_exported_chain() {
        let backend = backend();
        let (first, _, _) = engine(&backend);
        first.set_initial_query(Seed::new(["n1"])).await.unwrap();
        first.commit_step(ParallaxStep::incoming(["knows"])).await.unwrap();
        let bytes = first.replay_chain().unwrap().to_msgpack().unwrap();

        let (second, _, _) = engine(&backend);
        second.restore(ReplayChain::from_msgpack(&bytes).unwrap()).await.unwrap();
        assert_eq!(second.phase(), ExplorationPhase::Stepped(1));
        assert_eq!(second.data(), first.data());
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let backend = backend();
        let (engine, _, _) = engine(&backend);
        engine.set_initial_query(Seed::new(["n1"])).await.unwrap();
        engine.reset();
        assert_eq!(engine.phase(), ExplorationPhase::Idle);
        assert!(engine.breadcrumbs().is_empty());
        assert!(engine.next_step_options().is_none());
    }
}
