//! # Backend Contract
//!
//! Everything the core needs from the graph server. Transport details (REST,
//! headers, auth) live in implementations of [`GraphBackend`]; the core only
//! sees typed requests and responses.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory graph for embedding and tests |
//!
//! Responses may complete in any order. Callers correlate them with request
//! tokens; backends never need to serialize requests.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{
    Node, NodeId, ParallaxData, ParallaxRequest, Perspective, PerspectiveDraft, PerspectiveId,
    PropertyMap, Relation, RelationId,
};
use crate::Result;

pub use memory::MemoryBackend;

// ============================================================================
// Patch payloads
// ============================================================================

/// Fields of a node that can be patched. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
}

impl NodePatch {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn apply(&self, node: &mut Node) {
        if let Some(title) = &self.title {
            node.title = title.clone();
        }
        if let Some(description) = &self.description {
            node.description = description.clone();
        }
        if let Some(labels) = &self.labels {
            node.labels = labels.clone();
        }
        if let Some(properties) = &self.properties {
            node.properties = properties.clone();
        }
    }
}

/// Fields of a relation that can be patched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationPatch {
    pub id: RelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
}

impl RelationPatch {
    pub fn new(id: impl Into<RelationId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn apply(&self, relation: &mut Relation) {
        if let Some(title) = &self.title {
            relation.title = title.clone();
        }
        if let Some(description) = &self.description {
            relation.description = description.clone();
        }
        if let Some(properties) = &self.properties {
            relation.properties = properties.clone();
        }
    }
}

// ============================================================================
// The trait
// ============================================================================

/// The graph server as seen by the core.
///
/// Failures are reported as [`Error::Backend`](crate::Error::Backend) with
/// the raw server message.
#[async_trait]
pub trait GraphBackend: Send + Sync + 'static {
    // ========================================================================
    // Entities
    // ========================================================================

    /// Bulk fetch. Unknown ids are skipped, not errors.
    async fn fetch_nodes(&self, ids: &[NodeId]) -> Result<Vec<Node>>;

    async fn fetch_relations(&self, ids: &[RelationId]) -> Result<Vec<Relation>>;

    async fn patch_node(&self, patch: &NodePatch) -> Result<Node>;

    async fn patch_relation(&self, patch: &RelationPatch) -> Result<Relation>;

    /// Delete nodes and the relations attached to them.
    async fn delete_nodes(&self, ids: &[NodeId]) -> Result<()>;

    async fn delete_relations(&self, ids: &[RelationId]) -> Result<()>;

    /// Relations whose source and target are both in `node_ids`, skipping
    /// `exclude_types`.
    async fn relations_by_node_ids(
        &self,
        node_ids: &[NodeId],
        exclude_types: &[String],
    ) -> Result<Vec<Relation>>;

    // ========================================================================
    // Exploration
    // ========================================================================

    /// Run seed + steps and return the resulting node set together with the
    /// relation types usable for a next step.
    async fn explore(&self, request: &ParallaxRequest) -> Result<ParallaxData>;

    // ========================================================================
    // Perspectives
    // ========================================================================

    async fn create_perspective(&self, draft: &PerspectiveDraft) -> Result<PerspectiveId>;

    async fn update_perspective(&self, id: &PerspectiveId, draft: &PerspectiveDraft) -> Result<()>;

    /// Load a perspective with node positions applied to its nodes.
    async fn get_perspective(&self, id: &PerspectiveId) -> Result<Perspective>;

    async fn delete_perspective(&self, id: &PerspectiveId) -> Result<()>;
}
