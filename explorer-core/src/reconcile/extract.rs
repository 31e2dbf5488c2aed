//! Pulling nodes and relations out of result rows.

use indexmap::IndexMap;

use crate::model::{Cell, Node, NodeId, Relation, RelationId, SearchResult};

/// The entity maps derived from one search result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedGraph {
    pub nodes: IndexMap<NodeId, Node>,
    pub relations: IndexMap<RelationId, Relation>,
}

impl ExtractedGraph {
    /// Walk every cell of every row. Lists and maps are searched
    /// recursively; scalars carry no entities.
    pub fn from_result(result: &SearchResult) -> Self {
        let mut graph = Self::default();
        for row in &result.rows {
            for (_, cell) in &row.cells {
                graph.visit(cell);
            }
        }
        graph
    }

    fn visit(&mut self, cell: &Cell) {
        match cell {
            Cell::Node(node) => {
                self.nodes.insert(node.id.clone(), node.clone());
            }
            Cell::Relation(relation) => {
                self.relations.insert(relation.id.clone(), relation.clone());
            }
            Cell::List(items) => items.iter().for_each(|item| self.visit(item)),
            Cell::Map(entries) => entries.values().for_each(|value| self.visit(value)),
            Cell::Scalar(_) => {}
        }
    }

    /// Ids of the real (non-placeholder) nodes found so far.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes
            .values()
            .filter(|node| !node.placeholder)
            .map(|node| &node.id)
    }

    /// Add `relations` that are not already present. Returns how many were
    /// added.
    pub fn merge_relations(&mut self, relations: impl IntoIterator<Item = Relation>) -> usize {
        let before = self.relations.len();
        for relation in relations {
            self.relations.entry(relation.id.clone()).or_insert(relation);
        }
        self.relations.len() - before
    }

    /// Make every relation endpoint resolvable. An endpoint missing from the
    /// node map is taken from `known` when possible and becomes a
    /// placeholder otherwise. Returns the number of nodes added.
    pub fn resolve_endpoints(&mut self, known: impl Fn(&NodeId) -> Option<Node>) -> usize {
        let missing: Vec<NodeId> = self
            .relations
            .values()
            .flat_map(|relation| [&relation.source_id, &relation.target_id])
            .filter(|id| !self.nodes.contains_key(*id))
            .cloned()
            .collect();

        let before = self.nodes.len();
        for id in missing {
            if self.nodes.contains_key(&id) {
                continue;
            }
            let node = known(&id).unwrap_or_else(|| Node::placeholder(id.clone()));
            self.nodes.insert(id, node);
        }
        self.nodes.len() - before
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Relation>) {
        (
            self.nodes.into_values().collect(),
            self.relations.into_values().collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResultRow, SearchResultKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn finds_entities_nested_in_lists_and_maps() {
        let row = ResultRow::new()
            .with_cell("n", Cell::Node(Node::new("a")))
            .with_cell(
                "path",
                Cell::List(vec![
                    Cell::Scalar(json!(1)),
                    Cell::Map(IndexMap::from([(
                        "inner".to_owned(),
                        Cell::Relation(Relation::new("r", "knows", "a", "b")),
                    )])),
                ]),
            );
        let graph = ExtractedGraph::from_result(&SearchResult::new(SearchResultKind::CypherQuery, vec![row]));

        assert_eq!(graph.nodes.keys().collect::<Vec<_>>(), vec![&NodeId::from("a")]);
        assert_eq!(graph.relations.keys().collect::<Vec<_>>(), vec![&RelationId::from("r")]);
    }

    #[test]
    fn endpoints_become_placeholders_unless_known() {
        let mut graph = ExtractedGraph::default();
        graph.merge_relations([
            Relation::new("r1", "knows", "a", "b"),
            Relation::new("r2", "knows", "b", "c"),
        ]);

        let added = graph.resolve_endpoints(|id| (id.as_str() == "c").then(|| Node::new("c").with_title("Known")));

        assert_eq!(added, 3);
        assert!(graph.nodes[&NodeId::from("a")].placeholder);
        assert!(graph.nodes[&NodeId::from("b")].placeholder);
        assert_eq!(graph.nodes[&NodeId::from("c")].title, "Known");
        assert_eq!(graph.node_ids().collect::<Vec<_>>(), vec![&NodeId::from("c")]);
    }

    #[test]
    fn merge_never_overwrites() {
        let mut graph = ExtractedGraph::default();
        graph.merge_relations([Relation::new("r", "knows", "a", "b")]);
        let added = graph.merge_relations([
            Relation::new("r", "likes", "a", "b"),
            Relation::new("s", "likes", "b", "a"),
        ]);

        assert_eq!(added, 1);
        assert_eq!(graph.relations[&RelationId::from("r")].relation_type, "knows");
    }
}
