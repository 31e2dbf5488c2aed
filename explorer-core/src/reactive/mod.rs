//! Reactive Primitives
//!
//! This module implements the state plumbing every other component sits on:
//! observable stores, update batches, and a trailing debounce.
//!
//! # Concepts
//!
//! ## Stores
//!
//! A [`Store`] is a container for one piece of application state. Readers
//! call `get_state()` (or `read`) directly; writers call `set_state(update)`.
//! Subscribers register a selector and are called only when their selected
//! slice changes.
//!
//! ## Update Batches
//!
//! An [`UpdateBatch`] defers store notifications until the outermost batch
//! closes, so multi-store mutations (clear-then-set of the entity maps, for
//! instance) are never observed half-done.
//!
//! ## Debouncing
//!
//! A [`Debouncer`] bounds the frequency of expensive follow-up work such as
//! flushing dragged node positions into the entity store.
//!
//! # Implementation Notes
//!
//! Notifications are synchronous and run in subscription order. Nothing
//! holds a lock while user callbacks run, so callbacks are free to mutate
//! stores again; those nested mutations notify on their own.

mod batch;
mod debounce;
mod store;
mod subscriber;

pub use batch::UpdateBatch;
pub use debounce::Debouncer;
pub use store::Store;
pub use subscriber::SubscriberId;
