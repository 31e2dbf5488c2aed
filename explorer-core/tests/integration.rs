//! Integration Tests
//!
//! End-to-end behavior across the entity store, renderer bridge, dispatcher,
//! exploration engine and reconciliation pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use explorer_core::backend::{GraphBackend, MemoryBackend, NodePatch, RelationPatch};
use explorer_core::dispatcher::{InteractionDispatcher, Modifiers, Point, RawInput};
use explorer_core::entities::EntityStore;
use explorer_core::model::{
    Cell, Entity, EntityKey, LayoutAlgorithm, Node, NodeId, ParallaxData, ParallaxRequest,
    ParallaxStep, Perspective, PerspectiveDraft, PerspectiveId, Position, Relation, RelationId,
    ResultRow, SearchResult, SearchResultKind, Seed,
};
use explorer_core::notify::NotificationLog;
use explorer_core::parallax::{ExplorationEngine, ExplorationPhase, ReplayChain, ReplayOutcome};
use explorer_core::reconcile::{ProcessOutcome, ReconciliationPipeline, SearchStore};
use explorer_core::render::{DragController, RenderStateStore};
use explorer_core::{Error, ExplorerConfig, ExplorerSession, Result};

// ---- Fixtures

fn people() -> MemoryBackend {
    MemoryBackend::new()
        .with_nodes([
            Node::new("ada").with_labels(["Person"]),
            Node::new("bob").with_labels(["Person"]),
            Node::new("cyd").with_labels(["Person"]),
            Node::new("acme").with_labels(["Company"]),
        ])
        .with_relations([
            Relation::new("r1", "knows", "bob", "ada"),
            Relation::new("r2", "knows", "cyd", "bob"),
            Relation::new("r3", "works_at", "bob", "acme"),
        ])
}

fn engine(backend: &MemoryBackend) -> (ExplorationEngine, SearchStore) {
    let search = SearchStore::new();
    let engine = ExplorationEngine::new(
        Arc::new(backend.clone()),
        search.clone(),
        Arc::new(NotificationLog::new()),
    );
    (engine, search)
}

fn pipeline(autoconnect: bool, backend: &MemoryBackend) -> (ReconciliationPipeline, EntityStore, SearchStore) {
    let entities = EntityStore::new();
    let (exploration, search) = engine(backend);
    let pipeline = ReconciliationPipeline::new(
        autoconnect,
        Arc::new(backend.clone()),
        entities.clone(),
        search.clone(),
        exploration,
        Arc::new(NotificationLog::new()),
    );
    (pipeline, entities, search)
}

/// Answers every exploration request with the same canned data.
struct CannedExplore(ParallaxData);

#[async_trait]
impl GraphBackend for CannedExplore {
    async fn fetch_nodes(&self, _ids: &[NodeId]) -> Result<Vec<Node>> {
        Ok(Vec::new())
    }

    async fn fetch_relations(&self, _ids: &[RelationId]) -> Result<Vec<Relation>> {
        Ok(Vec::new())
    }

    async fn patch_node(&self, patch: &NodePatch) -> Result<Node> {
        Err(Error::NotFound(patch.id.to_string()))
    }

    async fn patch_relation(&self, patch: &RelationPatch) -> Result<Relation> {
        Err(Error::NotFound(patch.id.to_string()))
    }

    async fn delete_nodes(&self, _ids: &[NodeId]) -> Result<()> {
        Ok(())
    }

    async fn delete_relations(&self, _ids: &[RelationId]) -> Result<()> {
        Ok(())
    }

    async fn relations_by_node_ids(&self, _ids: &[NodeId], _exclude: &[String]) -> Result<Vec<Relation>> {
        Ok(Vec::new())
    }

    async fn explore(&self, _request: &ParallaxRequest) -> Result<ParallaxData> {
        Ok(self.0.clone())
    }

    async fn create_perspective(&self, _draft: &PerspectiveDraft) -> Result<PerspectiveId> {
        Err(Error::backend("perspectives unsupported"))
    }

    async fn update_perspective(&self, id: &PerspectiveId, _draft: &PerspectiveDraft) -> Result<()> {
        Err(Error::PerspectiveNotFound(id.to_string()))
    }

    async fn get_perspective(&self, id: &PerspectiveId) -> Result<Perspective> {
        Err(Error::PerspectiveNotFound(id.to_string()))
    }

    async fn delete_perspective(&self, id: &PerspectiveId) -> Result<()> {
        Err(Error::PerspectiveNotFound(id.to_string()))
    }
}

// ---- Exploration

#[tokio::test]
async fn replay_is_idempotent() {
    let backend = people();
    let (engine, _) = engine(&backend);
    engine.set_initial_query(Seed::new(["ada"])).await.unwrap();
    engine.commit_step(ParallaxStep::incoming(["knows"])).await.unwrap();
    engine.commit_step(ParallaxStep::incoming(["knows"])).await.unwrap();
    let first = engine.data().unwrap();

    assert_eq!(engine.refresh().await.unwrap(), ReplayOutcome::Applied);
    let second = engine.data().unwrap();
    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.relations, second.relations);

    let (other, _) = self::engine(&backend);
    other.restore(engine.replay_chain().unwrap()).await.unwrap();
    assert_eq!(other.data().unwrap().nodes, first.nodes);
}

#[tokio::test]
async fn jump_truncates_history_for_good() {
    let backend = people();
    let (engine, _) = engine(&backend);
    engine.set_initial_query(Seed::new(["ada"])).await.unwrap();

    let first = ParallaxStep::incoming(["knows"]);
    let second = ParallaxStep::outgoing(["works_at"]);
    let third = ParallaxStep::incoming(["works_at"]);
    for step in [&first, &second, &third] {
        engine.commit_step(step.clone()).await.unwrap();
    }
    assert_eq!(engine.history_len(), 3);

    engine.jump_to_history_index(0).await.unwrap();

    let history = engine.state().history;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].step, first);
    assert!(!history.iter().any(|entry| entry.step == second));
    assert!(!history.iter().any(|entry| entry.step == third));
    assert_eq!(engine.breadcrumbs().len(), 2);

    // The discarded steps are not reachable any more.
    assert_eq!(engine.jump_to_history_index(2).await.unwrap(), ReplayOutcome::Ignored);
    let chain = engine.replay_chain().unwrap();
    assert_eq!(chain.steps, vec![first]);
}

#[tokio::test]
async fn commit_step_scenario() {
    let mut nodes = IndexMap::new();
    nodes.insert(NodeId::from("n1"), Node::new("n1"));
    nodes.insert(NodeId::from("n2"), Node::new("n2"));
    let backend = CannedExplore(ParallaxData {
        nodes,
        ..ParallaxData::default()
    });
    let search = SearchStore::new();
    let engine = ExplorationEngine::new(Arc::new(backend), search.clone(), Arc::new(NotificationLog::new()));

    engine.set_initial_query(Seed::new(["n1"])).await.unwrap();
    engine.commit_step(ParallaxStep::incoming(["knows"])).await.unwrap();

    assert_eq!(engine.history_len(), 1);
    assert_eq!(engine.breadcrumbs().len(), 2);
    assert_eq!(engine.phase(), ExplorationPhase::Stepped(1));
    assert!(engine.data().unwrap().relations.is_empty());
    assert_eq!(search.result().unwrap().kind, SearchResultKind::Parallax);
}

#[tokio::test(start_paused = true)]
async fn stale_replay_is_discarded() {
    let backend = people();
    let (engine, _) = engine(&backend);
    engine.set_initial_query(Seed::new(["ada"])).await.unwrap();

    backend.queue_explore_latency(Duration::from_millis(400));
    backend.queue_explore_latency(Duration::from_millis(20));

    let (older, newer) = tokio::join!(engine.commit_step(ParallaxStep::incoming(["knows"])), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        engine.commit_step(ParallaxStep::outgoing(["works_at"])).await
    });

    assert_eq!(older.unwrap(), ReplayOutcome::Superseded);
    assert_eq!(newer.unwrap(), ReplayOutcome::Applied);
    // The newer chain is seed + both steps: ada <- bob -> acme.
    let nodes: Vec<NodeId> = engine.data().unwrap().nodes.keys().cloned().collect();
    assert_eq!(nodes, vec![NodeId::from("acme")]);
    assert!(!engine.is_loading());
}

#[test]
fn replay_chain_survives_msgpack() {
    let chain = ReplayChain::new(
        Seed::new(["ada"]),
        vec![ParallaxStep::incoming(["knows"]), ParallaxStep::outgoing(["works_at"])],
    );
    let decoded = ReplayChain::from_msgpack(&chain.to_msgpack().unwrap()).unwrap();
    assert_eq!(decoded, chain);
}

// ---- Entity store

#[test]
fn get_store_item_returns_what_was_stored() {
    let entities = EntityStore::new();
    let mut node = Node::new("x")
        .with_title("Ada")
        .with_labels(["Person", "Author"])
        .with_property("born", 1815)
        .with_position(Position::new(1.5, -2.0));
    node.style.insert("color".into(), "#ff0000".into());

    entities.set_nodes(vec![Node::new("other"), node.clone()]);
    // A relation with the same id lives in its own id space.
    entities.set_relations(vec![Relation::new("x", "knows", "other", "x")]);

    assert_eq!(entities.get_store_item(&EntityKey::node("x")), Some(Entity::Node(node)));
    assert!(matches!(
        entities.get_store_item(&EntityKey::relation("x")),
        Some(Entity::Relation(_))
    ));
    assert_eq!(entities.get_store_item(&EntityKey::node("missing")), None);
}

// ---- Dragging

#[tokio::test(start_paused = true)]
async fn drag_flushes_once_with_the_sum_of_deltas() {
    let entities = EntityStore::new();
    let render = RenderStateStore::new(ExplorerConfig::default(), entities.clone());
    render.attach_entities();
    let dispatcher = Arc::new(InteractionDispatcher::new());
    let drag = DragController::new(render.clone(), entities.clone());
    drag.attach(&dispatcher);

    let start = Position::new(10.0, 20.0);
    entities.set_nodes(vec![Node::new("n").with_position(start)]);

    let deltas = [(3.0, 4.0), (-1.0, 2.0), (5.0, -3.0), (0.0, 7.0)];
    let mut pointer = Point::new(400.0, 300.0);
    dispatcher.handle_input(RawInput::node_down("n", pointer)).unwrap();
    for (dx, dy) in deltas {
        pointer = Point::new(pointer.x + dx, pointer.y + dy);
        dispatcher.handle_input(RawInput::PointerMove { pointer }).unwrap();
    }
    dispatcher.handle_input(RawInput::PointerUp { pointer }).unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(drag.flush_count(), 0);
    assert_eq!(entities.get_node(&"n".into()).unwrap().position, Some(start));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(drag.flush_count(), 1);

    let (sum_x, sum_y) = deltas.iter().fold((0.0, 0.0), |(x, y), (dx, dy)| (x + dx, y + dy));
    assert_eq!(
        entities.get_node(&"n".into()).unwrap().position,
        Some(Position::new(start.x + sum_x, start.y + sum_y))
    );
}

// ---- Reconciliation

#[tokio::test]
async fn relation_endpoints_become_nodes() {
    let backend = people();
    let (pipeline, entities, _) = pipeline(false, &backend);

    let rows = vec![
        ResultRow::new().with_cell("r", Cell::Relation(Relation::new("r", "knows", "a", "b"))),
        ResultRow::new().with_cell("n", Cell::Node(Node::new("c"))),
    ];
    let result = SearchResult::new(SearchResultKind::CypherQuery, rows);
    let outcome = pipeline.process(Arc::new(result)).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::Applied { nodes: 3, relations: 1 });
    assert_eq!(entities.nodes().len(), 3);
    for id in ["a", "b"] {
        assert!(entities.get_node(&id.into()).unwrap().placeholder);
    }
    assert!(!entities.get_node(&"c".into()).unwrap().placeholder);
}

#[tokio::test]
async fn disconnected_nodes_without_autoconnect_use_noverlap() {
    let backend = people();
    let (pipeline, entities, search) = pipeline(false, &backend);

    let result = SearchResult::from_entities(
        SearchResultKind::FullText,
        vec![Node::new("ada"), Node::new("acme")],
        Vec::new(),
    );
    pipeline.process(Arc::new(result)).await.unwrap();

    assert!(entities.relations().is_empty());
    assert_eq!(search.layout(), LayoutAlgorithm::Noverlap);
    assert_eq!(backend.relation_calls(), 0);
    assert!(search.is_result_processed());
}

// ---- Zoom

#[test]
fn zoom_factor_never_passes_its_maximum() {
    let config = ExplorerConfig::default();
    let max = config.zoom.max;
    let render = RenderStateStore::new(config, EntityStore::new());
    let dispatcher = Arc::new(InteractionDispatcher::new());
    render.attach(&dispatcher);

    // All within one frame: no after_render in between.
    for _ in 0..50 {
        dispatcher
            .handle_input(RawInput::wheel(Point::new(0.0, 0.0), 1.0, Modifiers::CTRL))
            .unwrap();
        assert!(render.state().zoom_factor <= max);
    }
    assert_eq!(render.state().zoom_factor, max);

    render.after_render().unwrap();
    assert!(render.camera().enabled);
}

// ---- Session

#[tokio::test]
async fn session_round_trip() {
    let session = ExplorerSession::new(ExplorerConfig::default(), Arc::new(people()));
    session.mount();
    assert!(InteractionDispatcher::get_instance().is_ok());

    session.publish_result(SearchResult::from_entities(
        SearchResultKind::FullText,
        vec![Node::new("ada"), Node::new("bob")],
        Vec::new(),
    ));
    session.settle().await;

    // Autoconnect found ada <- bob.
    assert!(session.entities().get_relation(&"r1".into()).is_some());
    assert_eq!(session.exploration().phase(), ExplorationPhase::Seeded);

    let pointer = Point::new(0.0, 0.0);
    session.handle_input(RawInput::node_down("ada", pointer)).unwrap();
    session.handle_input(RawInput::PointerUp { pointer }).unwrap();
    session
        .handle_input(RawInput::NodeClick {
            node: "ada".into(),
            pointer,
        })
        .unwrap();
    assert!(session.render().is_node_highlighted(&"ada".into()));

    let id = session.perspectives().save_as("pair").await.unwrap();
    assert_eq!(session.perspectives().current().id, Some(id));

    assert!(session.unmount());
    assert!(matches!(
        InteractionDispatcher::get_instance(),
        Err(Error::DispatcherNotInitialized)
    ));
}
