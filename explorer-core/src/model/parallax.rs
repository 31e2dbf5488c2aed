//! Exploration ("parallax") request and response types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Node, NodeId, Relation, RelationId};

/// Label and property constraints applied to a node set.
///
/// Labels use OR semantics (any listed label matches), properties use AND
/// semantics (every listed property must match).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallaxFilters {
    pub labels: Vec<String>,
    pub properties: IndexMap<String, String>,
}

impl ParallaxFilters {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.properties.is_empty()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Whether `node` passes the filters.
    ///
    /// A property constraint matches when the node's value contains the
    /// expected text.
    pub fn matches(&self, node: &Node) -> bool {
        let properties_ok = self.properties.iter().all(|(key, expected)| {
            node.properties
                .get(key)
                .is_some_and(|property| property.value_text().contains(expected.as_str()))
        });
        let labels_ok = self.labels.is_empty() || node.labels.iter().any(|l| self.labels.contains(l));
        properties_ok && labels_ok
    }
}

/// One expansion step along relation types.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParallaxStep {
    pub filters: ParallaxFilters,
    pub incoming_relation_types: Vec<String>,
    pub outgoing_relation_types: Vec<String>,
}

impl ParallaxStep {
    pub fn incoming(types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            incoming_relation_types: types.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn outgoing(types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            outgoing_relation_types: types.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_filters(mut self, filters: ParallaxFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn has_relation_types(&self) -> bool {
        !self.incoming_relation_types.is_empty() || !self.outgoing_relation_types.is_empty()
    }
}

/// The node set (and its filters) an exploration starts from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Seed {
    pub node_ids: Vec<NodeId>,
    pub filters: ParallaxFilters,
}

impl Seed {
    pub fn new(node_ids: impl IntoIterator<Item = impl Into<NodeId>>) -> Self {
        Self {
            node_ids: node_ids.into_iter().map(Into::into).collect(),
            filters: ParallaxFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: ParallaxFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Body of an exploration request: a seed followed by ordered steps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallaxRequest {
    pub node_ids: Vec<NodeId>,
    #[serde(default)]
    pub filters: ParallaxFilters,
    #[serde(default)]
    pub steps: Vec<ParallaxStep>,
}

impl ParallaxRequest {
    pub fn new(seed: &Seed, steps: &[ParallaxStep]) -> Self {
        Self {
            node_ids: seed.node_ids.clone(),
            filters: seed.filters.clone(),
            steps: steps.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationTypeCount {
    pub count: usize,
}

/// Result of one exploration replay.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParallaxData {
    pub nodes: IndexMap<NodeId, Node>,
    pub relations: IndexMap<RelationId, Relation>,
    /// Property keys present in the returned node set.
    pub properties: Vec<String>,
    /// Labels present in the returned node set.
    pub labels: Vec<String>,
    /// Relation types that point into the node set, usable as the next step.
    pub incoming_relation_types: IndexMap<String, RelationTypeCount>,
    /// Relation types that leave the node set, usable as the next step.
    pub outgoing_relation_types: IndexMap<String, RelationTypeCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_combine_labels_or_and_properties_and() {
        let node = Node::new("n1")
            .with_labels(["Person", "Author"])
            .with_property("name", "Ada Lovelace")
            .with_property("born", 1815);

        assert!(ParallaxFilters::default().matches(&node));
        assert!(ParallaxFilters::default().with_label("Author").with_label("Robot").matches(&node));
        assert!(!ParallaxFilters::default().with_label("Robot").matches(&node));
        assert!(ParallaxFilters::default()
            .with_property("name", "Ada")
            .with_property("born", "1815")
            .matches(&node));
        assert!(!ParallaxFilters::default()
            .with_property("name", "Ada")
            .with_property("died", "1852")
            .matches(&node));
    }

    #[test]
    fn step_json_is_camel_case() {
        let step: ParallaxStep = serde_json::from_str(
            r#"{ "incomingRelationTypes": ["knows"], "filters": { "labels": ["Person"] } }"#,
        )
        .unwrap();
        assert_eq!(step.incoming_relation_types, vec!["knows".to_owned()]);
        assert!(step.outgoing_relation_types.is_empty());
        assert_eq!(step.filters.labels, vec!["Person".to_owned()]);
        assert!(step.has_relation_types());
    }
}
