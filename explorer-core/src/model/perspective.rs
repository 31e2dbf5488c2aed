//! Saved graph snapshots ("perspectives").

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Node, NodeId, Position, Relation, RelationId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerspectiveId(pub String);

impl PerspectiveId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PerspectiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What gets stored: the node set with positions and the relations shown.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveDraft {
    pub name: String,
    pub node_positions: IndexMap<NodeId, Position>,
    pub relation_ids: Vec<RelationId>,
}

impl PerspectiveDraft {
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.node_positions.keys()
    }
}

/// A loaded perspective with its entities resolved. Node positions are
/// carried on the nodes themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perspective {
    pub id: PerspectiveId,
    pub name: String,
    pub nodes: IndexMap<NodeId, Node>,
    pub relations: IndexMap<RelationId, Relation>,
}
