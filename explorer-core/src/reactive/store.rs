//! State Container
//!
//! A [`Store`] holds one state value and notifies subscribers when the part
//! of the state they selected changes. It replaces ambient global stores:
//! components share a `Store` handle (cheap `Arc` clone) and read it without
//! threading the state through every call.
//!
//! # How Stores Work
//!
//! 1. `subscribe(selector, callback)` registers a listener. The selector maps
//!    the whole state to the slice the listener cares about.
//!
//! 2. `set_state(update)` snapshots the previous state, applies `update` in
//!    place, and then (immediately, or when the enclosing
//!    [`UpdateBatch`] closes) runs every listener with `(next, previous)`.
//!
//! 3. A listener's callback only fires when `selector(next) != selector(previous)`.
//!    Large collections should expose a revision counter to selectors so
//!    this comparison stays shallow.
//!
//! # Reentrancy
//!
//! Listeners are snapshotted before they run and no lock is held while a
//! callback executes, so callbacks may read or mutate any store, including
//! the one that notified them.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::batch::UpdateBatch;
use super::SubscriberId;

static STORE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

type Listener<S> = Arc<dyn Fn(&S, &S) + Send + Sync>;

struct StoreInner<S> {
    id: u64,
    state: RwLock<S>,
    listeners: RwLock<Vec<(SubscriberId, Listener<S>)>>,
}

impl<S: Clone> StoreInner<S> {
    fn notify(&self, previous: &S) {
        let next = self.state.read().clone();
        let listeners: Vec<Listener<S>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&next, previous);
        }
    }
}

/// A shareable, observable state container.
///
/// # Example
///
/// ```rust
/// use explorer_core::reactive::Store;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Clone, Default)]
/// struct Counter { value: i32, label: String }
///
/// let store = Store::new(Counter::default());
/// let calls = Arc::new(AtomicUsize::new(0));
/// let seen = calls.clone();
/// store.subscribe(|s: &Counter| s.value, move |_, _| {
///     seen.fetch_add(1, Ordering::SeqCst);
/// });
///
/// store.set_state(|s| s.label = "ignored".into());
/// store.set_state(|s| s.value = 3);
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Store<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                id: STORE_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
                state: RwLock::new(initial),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Get the store's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Clone of the current state.
    pub fn get_state(&self) -> S {
        self.inner.state.read().clone()
    }

    /// Read the state through a closure without cloning it.
    ///
    /// The read lock is held for the duration of `f`; do not mutate the
    /// store from inside it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.state.read())
    }

    /// Apply `update` and notify subscribers whose selection changed.
    pub fn set_state<F>(&self, update: F)
    where
        F: FnOnce(&mut S),
    {
        let previous = {
            let mut state = self.inner.state.write();
            let previous = state.clone();
            update(&mut state);
            previous
        };

        let inner = Arc::clone(&self.inner);
        UpdateBatch::defer(self.inner.id, move || inner.notify(&previous));
    }

    /// Apply `update` without notifying anyone.
    pub fn set_state_silently<F>(&self, update: F)
    where
        F: FnOnce(&mut S),
    {
        update(&mut self.inner.state.write());
    }

    /// Register `callback` for changes of `selector(state)`.
    ///
    /// The callback receives `(next, previous)` selections.
    pub fn subscribe<T, Sel, F>(&self, selector: Sel, callback: F) -> SubscriberId
    where
        T: PartialEq + 'static,
        Sel: Fn(&S) -> T + Send + Sync + 'static,
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let id = SubscriberId::new();
        let listener: Listener<S> = Arc::new(move |next: &S, previous: &S| {
            let next = selector(next);
            let previous = selector(previous);
            if next != previous {
                callback(&next, &previous);
            }
        });

        self.inner.listeners.write().push((id, listener));
        id
    }

    /// Remove a subscription. Unknown or already removed ids are ignored.
    ///
    /// Returns whether a subscription was removed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> Default for Store<S>
where
    S: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Debug> Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.read())
            .field("subscriber_count", &self.inner.listeners.read().len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
