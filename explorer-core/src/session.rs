//! One explorer view with all of its components wired together.
//!
//! `mount` creates the global interaction dispatcher and attaches every
//! observer; `unmount` detaches them again and tears the dispatcher down, so
//! a session can be mounted and unmounted repeatedly (between tests, for
//! instance).

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::backend::GraphBackend;
use crate::config::ExplorerConfig;
use crate::dispatcher::{InputDisposition, InteractionDispatcher, RawInput};
use crate::entities::{EntityService, EntityStore};
use crate::model::SearchResult;
use crate::notify::{NotificationLog, Notifier};
use crate::parallax::ExplorationEngine;
use crate::perspectives::PerspectiveService;
use crate::reconcile::{ReconciliationPipeline, SearchStore};
use crate::render::{DragController, RenderStateStore};
use crate::{Error, Result};

pub struct ExplorerSession {
    config: ExplorerConfig,
    notifications: Arc<NotificationLog>,
    entities: EntityStore,
    entity_service: EntityService,
    render: RenderStateStore,
    drag: DragController,
    search: SearchStore,
    exploration: ExplorationEngine,
    pipeline: ReconciliationPipeline,
    perspectives: PerspectiveService,
    dispatcher: Mutex<Option<Arc<InteractionDispatcher>>>,
}

impl ExplorerSession {
    pub fn new(config: ExplorerConfig, backend: Arc<dyn GraphBackend>) -> Self {
        let notifications = Arc::new(NotificationLog::new());
        let notifier: Arc<dyn Notifier> = notifications.clone();

        let entities = EntityStore::new();
        let entity_service = EntityService::new(backend.clone(), entities.clone(), notifier.clone());
        let render = RenderStateStore::new(config.clone(), entities.clone());
        let drag = DragController::new(render.clone(), entities.clone());
        let search = SearchStore::new();
        let exploration = ExplorationEngine::new(backend.clone(), search.clone(), notifier.clone());
        let pipeline = ReconciliationPipeline::new(
            config.autoconnect,
            backend.clone(),
            entities.clone(),
            search.clone(),
            exploration.clone(),
            notifier.clone(),
        );
        let perspectives = PerspectiveService::new(
            backend,
            entities.clone(),
            render.clone(),
            search.clone(),
            notifier,
        );

        Self {
            config,
            notifications,
            entities,
            entity_service,
            render,
            drag,
            search,
            exploration,
            pipeline,
            perspectives,
            dispatcher: Mutex::new(None),
        }
    }

    /// Initialize the dispatcher and attach every observer.
    pub fn mount(&self) -> Arc<InteractionDispatcher> {
        let mut slot = self.dispatcher.lock();
        if let Some(dispatcher) = slot.as_ref() {
            warn!("explorer session already mounted");
            return Arc::clone(dispatcher);
        }

        let dispatcher = InteractionDispatcher::init();
        self.render.attach_entities();
        self.render.attach(&dispatcher);
        self.drag.attach(&dispatcher);
        self.pipeline.attach();
        *slot = Some(Arc::clone(&dispatcher));
        info!(autoconnect = self.config.autoconnect, "explorer session mounted");
        dispatcher
    }

    /// Detach every observer and tear the dispatcher down.
    ///
    /// Returns whether the session was mounted.
    pub fn unmount(&self) -> bool {
        let Some(_dispatcher) = self.dispatcher.lock().take() else {
            return false;
        };
        self.pipeline.detach();
        self.drag.detach();
        self.render.detach();
        InteractionDispatcher::teardown();
        info!("explorer session unmounted");
        true
    }

    pub fn is_mounted(&self) -> bool {
        self.dispatcher.lock().is_some()
    }

    /// Route raw input from the drawing surface. Plain wheel input passes
    /// through the dispatcher and zooms the camera.
    pub fn handle_input(&self, input: RawInput) -> Result<InputDisposition> {
        let dispatcher = self
            .dispatcher
            .lock()
            .clone()
            .ok_or(Error::DispatcherNotInitialized)?;

        let wheel_delta = match &input {
            RawInput::Wheel { delta, .. } => Some(*delta),
            _ => None,
        };
        let disposition = dispatcher.handle_input(input)?;
        if let (InputDisposition::PassThrough, Some(delta)) = (disposition, wheel_delta) {
            self.render.wheel_zoom(delta);
        }
        Ok(disposition)
    }

    /// Called by the renderer once a frame has been drawn.
    pub fn after_render(&self) -> Result<()> {
        self.render.after_render()
    }

    /// Publish a search result; the attached pipeline takes it from there.
    pub fn publish_result(&self, result: SearchResult) {
        self.search.set_result(result);
    }

    /// Wait until the latest published result has been processed.
    pub async fn settle(&self) {
        self.pipeline.settle().await;
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.notifications
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn entity_service(&self) -> &EntityService {
        &self.entity_service
    }

    pub fn render(&self) -> &RenderStateStore {
        &self.render
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn search(&self) -> &SearchStore {
        &self.search
    }

    pub fn exploration(&self) -> &ExplorationEngine {
        &self.exploration
    }

    pub fn pipeline(&self) -> &ReconciliationPipeline {
        &self.pipeline
    }

    pub fn perspectives(&self) -> &PerspectiveService {
        &self.perspectives
    }
}

impl Drop for ExplorerSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for ExplorerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorerSession")
            .field("mounted", &self.is_mounted())
            .field("exploration", &self.exploration)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

// ---- Tests
