//! Backend-facing entity operations.
//!
//! Every response is merged into the [`EntityStore`]; every failure is
//! surfaced as a critical notification carrying the raw backend message and
//! then returned to the caller. Nothing is retried.

use std::sync::Arc;

use tracing::{debug, warn};

use super::EntityStore;
use crate::backend::{GraphBackend, NodePatch, RelationPatch};
use crate::model::{Node, NodeId, Relation, RelationId};
use crate::notify::{Notification, Notifier};
use crate::{Error, Result};

#[derive(Clone)]
pub struct EntityService {
    backend: Arc<dyn GraphBackend>,
    entities: EntityStore,
    notifier: Arc<dyn Notifier>,
}

impl EntityService {
    pub fn new(backend: Arc<dyn GraphBackend>, entities: EntityStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            entities,
            notifier,
        }
    }

    pub async fn fetch_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>> {
        let nodes = self.report(self.backend.fetch_nodes(ids).await)?;
        debug!(requested = ids.len(), received = nodes.len(), "fetched nodes");
        self.entities.set_nodes(nodes.clone());
        Ok(nodes)
    }

    pub async fn fetch_relations(&self, ids: &[RelationId]) -> Result<Vec<Relation>> {
        let relations = self.report(self.backend.fetch_relations(ids).await)?;
        self.entities.set_relations(relations.clone());
        Ok(relations)
    }

    /// Patch a node and store the server's version of it.
    pub async fn patch_node(&self, patch: &NodePatch) -> Result<Node> {
        let mut node = self.report(self.backend.patch_node(patch).await)?;
        // The server does not know about the local layout.
        if let Some(local) = self.entities.get_node(&node.id) {
            node.position = local.position;
        }
        self.entities.set_node(node.clone());
        Ok(node)
    }

    pub async fn patch_relation(&self, patch: &RelationPatch) -> Result<Relation> {
        let relation = self.report(self.backend.patch_relation(patch).await)?;
        self.entities.set_relation(relation.clone());
        Ok(relation)
    }

    pub async fn delete_nodes(&self, ids: &[NodeId]) -> Result<()> {
        self.report(self.backend.delete_nodes(ids).await)?;
        self.entities.remove_nodes(ids);
        Ok(())
    }

    pub async fn delete_relations(&self, ids: &[RelationId]) -> Result<()> {
        self.report(self.backend.delete_relations(ids).await)?;
        self.entities.remove_relations(ids);
        Ok(())
    }

    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            warn!(error = %err, "entity request failed");
            self.notifier.notify(failure_notification(err));
        }
        result
    }
}

/// Critical notification for a failed request, keeping the raw message.
pub(crate) fn failure_notification(err: &Error) -> Notification {
    let raw = match err {
        Error::Backend(message) => message.clone(),
        other => other.to_string(),
    };
    Notification::critical("Request failed").with_description(raw)
}

impl std::fmt::Debug for EntityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityService")
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::model::Position;
    use crate::notify::{NotificationKind, NotificationLog};

    fn setup() -> (MemoryBackend, EntityStore, Arc<NotificationLog>, EntityService) {
        let backend = MemoryBackend::new()
            .with_nodes([Node::new("a").with_title("A"), Node::new("b")])
            .with_relations([Relation::new("r", "knows", "a", "b")]);
        let entities = EntityStore::new();
        let log = Arc::new(NotificationLog::new());
        let service = EntityService::new(Arc::new(backend.clone()), entities.clone(), log.clone());
        (backend, entities, log, service)
    }

    #[tokio::test]
    async fn fetch_merges_into_store() {
        let (_, entities, _, service) = setup();
        service.fetch_nodes(&["a".into(), "missing".into()]).await.unwrap();
        assert!(entities.contains_node(&"a".into()));
        assert_eq!(entities.nodes().len(), 1);
    }

    #[tokio::test]
    async fn patch_keeps_local_position() {
        let (_, entities, _, service) = setup();
        service.fetch_nodes(&["a".into()]).await.unwrap();
        entities.set_node_position(&"a".into(), Position::new(4.0, 2.0), false);

        let patched = service.patch_node(&NodePatch::new("a").title("Renamed")).await.unwrap();
        assert_eq!(patched.title, "Renamed");
        assert_eq!(entities.get_node(&"a".into()).unwrap().position, Some(Position::new(4.0, 2.0)));
    }

    #[tokio::test]
    async fn failures_raise_critical_notification_with_raw_message() {
        let (backend, entities, log, service) = setup();
        backend.fail_next("connection reset by peer");

        let err = service.fetch_nodes(&["a".into()]).await.unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
        assert!(entities.nodes().is_empty());

        let notifications = log.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::Critical);
        assert_eq!(notifications[0].description.as_deref(), Some("connection reset by peer"));
    }

    #[tokio::test]
    async fn delete_removes_from_store() {
        let (_, entities, _, service) = setup();
        service.fetch_nodes(&["a".into(), "b".into()]).await.unwrap();
        service.fetch_relations(&["r".into()]).await.unwrap();

        service.delete_nodes(&["a".into()]).await.unwrap();
        assert!(!entities.contains_node(&"a".into()));
        assert!(entities.relations().is_empty());
    }
}
