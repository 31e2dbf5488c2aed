//! Update Batches
//!
//! An update batch groups several store mutations into one observable step.
//! While a batch is open, stores do not notify their subscribers right away:
//! each store registers one pending notification the first time it is
//! touched, and all pending notifications are flushed when the outermost
//! batch closes.
//!
//! # How It Works
//!
//! We keep a thread-local stack depth and a queue of pending flushes. The
//! queue is keyed by store id, so a store mutated ten times inside a batch
//! notifies once, comparing the state it had *before the first* mutation
//! against the final state. Flushes run in the order stores were first
//! touched.
//!
//! Batches nest; only the outermost guard flushes. The guard is `!Send`
//! and must not be held across an `.await`.

use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static BATCH: RefCell<BatchState> = RefCell::new(BatchState::default());
}

type Flush = Box<dyn FnOnce()>;

#[derive(Default)]
struct BatchState {
    depth: usize,
    pending: Vec<(u64, Flush)>,
}

/// Guard that closes the batch when dropped.
pub struct UpdateBatch {
    // Keeps the guard on the thread whose stack it pushed.
    _not_send: PhantomData<*const ()>,
}

impl UpdateBatch {
    /// Open a batch. Notifications are deferred until the guard (and every
    /// enclosing guard) is dropped.
    pub fn enter() -> Self {
        BATCH.with(|batch| batch.borrow_mut().depth += 1);
        Self {
            _not_send: PhantomData,
        }
    }

    /// Check if a batch is open on this thread.
    pub fn is_active() -> bool {
        BATCH.with(|batch| batch.borrow().depth > 0)
    }

    /// Queue `flush` for `store_id` unless that store already has a pending
    /// flush. Without an open batch the flush runs immediately.
    pub(crate) fn defer(store_id: u64, flush: impl FnOnce() + 'static) {
        let flush: Flush = Box::new(flush);
        let immediate = BATCH.with(move |batch| {
            let mut batch = batch.borrow_mut();
            if batch.depth == 0 {
                return Some(flush);
            }
            if !batch.pending.iter().any(|(id, _)| *id == store_id) {
                batch.pending.push((store_id, flush));
            }
            None
        });

        if let Some(flush) = immediate {
            flush();
        }
    }
}

impl Drop for UpdateBatch {
    fn drop(&mut self) {
        let pending = BATCH.with(|batch| {
            let mut batch = batch.borrow_mut();
            debug_assert!(batch.depth > 0, "UpdateBatch dropped without enter");
            batch.depth = batch.depth.saturating_sub(1);
            if batch.depth == 0 {
                std::mem::take(&mut batch.pending)
            } else {
                Vec::new()
            }
        });

        // The thread-local borrow is released here; flushes may mutate
        // stores and open batches of their own.
        for (_, flush) in pending {
            flush();
        }
    }
}
