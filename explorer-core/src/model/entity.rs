//! Nodes, relations and the keys that identify them.
//!
//! Node and relation ids come from different id spaces that may overlap, so
//! anything that can refer to either kind goes through [`EntityKey`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Position;

/// Text shown for entities that are referenced but not loaded.
pub const NOT_AVAILABLE_SIGN: &str = "N/A";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Opaque node identifier as issued by the backend.
    NodeId
);
string_id!(
    /// Opaque relation identifier as issued by the backend.
    RelationId
);

/// Kind-qualified identity of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum EntityKey {
    Node(NodeId),
    Relation(RelationId),
}

impl EntityKey {
    pub fn node(id: impl Into<NodeId>) -> Self {
        Self::Node(id.into())
    }

    pub fn relation(id: impl Into<RelationId>) -> Self {
        Self::Relation(id.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Node(id) => id.as_str(),
            Self::Relation(id) => id.as_str(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "node:{id}"),
            Self::Relation(id) => write!(f, "relation:{id}"),
        }
    }
}

/// A property value with its backend type and edit permission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub value: serde_json::Value,
    #[serde(rename = "type", default = "default_property_type")]
    pub kind: String,
    #[serde(rename = "edit", default)]
    pub editable: bool,
}

fn default_property_type() -> String {
    "string".to_owned()
}

impl Property {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        let value = value.into();
        let kind = match &value {
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(n) if n.is_f64() => "float",
            serde_json::Value::Number(_) => "integer",
            _ => "string",
        };
        Self {
            value,
            kind: kind.to_owned(),
            editable: true,
        }
    }

    /// Text form used by substring filters.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

pub type PropertyMap = IndexMap<String, Property>;
pub type StyleMap = IndexMap<String, String>;

/// A node in the explored graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Absent for pseudo nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub long_description: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub style: StyleMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Sentinel standing in for a referenced node that is not loaded.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

impl Node {
    pub fn new(id: impl Into<NodeId>) -> Self {
        let id = id.into();
        Self {
            db_id: Some(id.0.clone()),
            id,
            semantic_id: None,
            title: String::new(),
            description: String::new(),
            long_description: String::new(),
            labels: Vec::new(),
            properties: PropertyMap::new(),
            style: StyleMap::new(),
            position: None,
            placeholder: false,
        }
    }

    /// A "not available" stand-in for `id`.
    pub fn placeholder(id: impl Into<NodeId>) -> Self {
        Self {
            db_id: None,
            title: NOT_AVAILABLE_SIGN.to_owned(),
            placeholder: true,
            ..Self::new(id)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), Property::new(value));
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::Node(self.id.clone())
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Pseudo nodes are computed by the backend and have no database id.
    pub fn is_pseudo(&self) -> bool {
        self.db_id.is_none() && self.semantic_id.is_none()
    }
}

/// A directed, typed relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    #[serde(rename = "dbId", default, skip_serializing_if = "Option::is_none")]
    pub db_id: Option<String>,
    #[serde(rename = "semanticId", default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    pub source_id: NodeId,
    pub target_id: NodeId,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub style: StyleMap,
}

impl Relation {
    pub fn new(
        id: impl Into<RelationId>,
        relation_type: impl Into<String>,
        source_id: impl Into<NodeId>,
        target_id: impl Into<NodeId>,
    ) -> Self {
        let id = id.into();
        Self {
            db_id: Some(id.0.clone()),
            id,
            semantic_id: None,
            title: String::new(),
            description: String::new(),
            relation_type: relation_type.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            properties: PropertyMap::new(),
            style: StyleMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), Property::new(value));
        self
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::Relation(self.id.clone())
    }

    /// Whether `node` is the source or the target.
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source_id == node || &self.target_id == node
    }
}

/// Either kind of entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_grapheditor_type", rename_all = "lowercase")]
pub enum Entity {
    Node(Node),
    Relation(Relation),
}

impl Entity {
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Node(node) => node.key(),
            Self::Relation(relation) => relation.key(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Node(node) => &node.title,
            Self::Relation(relation) => &relation.title,
        }
    }

    pub fn properties(&self) -> &PropertyMap {
        match self {
            Self::Node(node) => &node.properties,
            Self::Relation(relation) => &relation.properties,
        }
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Relation> for Entity {
    fn from(relation: Relation) -> Self {
        Self::Relation(relation)
    }
}
