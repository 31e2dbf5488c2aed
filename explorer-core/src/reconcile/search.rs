//! The current search result and how it is presented.

use std::sync::Arc;

use crate::model::{LayoutAlgorithm, Presentation, SearchResult};
use crate::reactive::{Store, SubscriberId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub result: Option<Arc<SearchResult>>,
    /// Bumped by every `set_result`, even for an equal result.
    pub result_revision: u64,
    pub presentation: Presentation,
    pub layout: LayoutAlgorithm,
    /// False from `set_result` until the entity store holds the result.
    pub is_result_processed: bool,
}

/// A result compared by revision only.
struct Published(u64, Option<Arc<SearchResult>>);

impl PartialEq for Published {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// Shared handle on the search state.
#[derive(Debug, Clone, Default)]
pub struct SearchStore {
    store: Store<SearchState>,
}

impl SearchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &Store<SearchState> {
        &self.store
    }

    /// Publish a new result. Processing starts over.
    pub fn set_result(&self, result: SearchResult) {
        self.store.set_state(|state| {
            state.result = Some(Arc::new(result));
            state.result_revision += 1;
            state.is_result_processed = false;
        });
    }

    pub fn result(&self) -> Option<Arc<SearchResult>> {
        self.store.read(|state| state.result.clone())
    }

    pub fn result_revision(&self) -> u64 {
        self.store.read(|state| state.result_revision)
    }

    pub fn presentation(&self) -> Presentation {
        self.store.read(|state| state.presentation)
    }

    pub fn set_presentation(&self, presentation: Presentation) {
        self.store.set_state(|state| state.presentation = presentation);
    }

    pub fn layout(&self) -> LayoutAlgorithm {
        self.store.read(|state| state.layout)
    }

    pub fn set_layout(&self, layout: LayoutAlgorithm) {
        self.store.set_state(|state| state.layout = layout);
    }

    pub fn is_result_processed(&self) -> bool {
        self.store.read(|state| state.is_result_processed)
    }

    pub(crate) fn mark_processed(&self) {
        self.store.set_state(|state| state.is_result_processed = true);
    }

    /// Call `callback` with each newly published result.
    pub fn on_result<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(Arc<SearchResult>) + Send + Sync + 'static,
    {
        self.store.subscribe(
            |state| Published(state.result_revision, state.result.clone()),
            move |next, _| {
                if let Some(result) = &next.1 {
                    callback(Arc::clone(result));
                }
            },
        )
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.store.unsubscribe(id)
    }
}
