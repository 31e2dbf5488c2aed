//! Subscriber identities.
//!
//! Every registration handed out by the core (store subscriptions, entity
//! event handlers, dispatcher handlers) is identified by a [`SubscriberId`].
//! The id is the only thing a caller needs to keep in order to unsubscribe.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a registered callback.
///
/// Ids come from a process-wide atomic counter, so ids from different stores
/// never collide and unsubscribing with a foreign id is a harmless no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}
