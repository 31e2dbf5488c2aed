//! User-facing notifications.
//!
//! The core raises notifications through the [`Notifier`] trait and never
//! manages how long they stay on screen. [`NotificationLog`] is the bundled
//! implementation: an observable list the UI layer renders and prunes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reactive::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Successful,
    Informational,
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
        }
    }

    pub fn successful(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Successful, title)
    }

    pub fn informational(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Informational, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, title)
    }

    pub fn critical(title: impl Into<String>) -> Self {
        Self::new(NotificationKind::Critical, title)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Sink for notifications raised by the core.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedNotification {
    pub id: NotificationId,
    #[serde(flatten)]
    pub notification: Notification,
}

/// In-memory notification list backed by a [`Store`].
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    store: Store<Vec<LoggedNotification>>,
}

static NOTIFICATION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Underlying store, for subscribing to the list.
    pub fn store(&self) -> &Store<Vec<LoggedNotification>> {
        &self.store
    }

    pub fn add(&self, notification: Notification) -> NotificationId {
        let id = NotificationId(NOTIFICATION_ID_COUNTER.fetch_add(1, Ordering::Relaxed));
        debug!(?id, kind = ?notification.kind, title = %notification.title, "notification added");
        self.store
            .set_state(|list| list.push(LoggedNotification { id, notification }));
        id
    }

    pub fn remove(&self, id: NotificationId) {
        self.store.set_state(|list| list.retain(|entry| entry.id != id));
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.store
            .read(|list| list.iter().map(|entry| entry.notification.clone()).collect())
    }

    pub fn clear(&self) {
        self.store.set_state(Vec::clear);
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        self.add(notification);
    }
}
