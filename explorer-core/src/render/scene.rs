//! The renderer's attribute arena.
//!
//! The scene holds renderer-native attributes for every drawn node and edge,
//! addressed by entity id. It is a derived copy of the entity store with one
//! exception: positions written by a drag land here first and are tracked
//! as unflushed until the drag controller hands them to the entity store.

use indexmap::{IndexMap, IndexSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::{NodeStyleConfig, RelationStyleConfig};
use crate::model::{Node, NodeId, Position, Relation, RelationId};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttributes {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: String,
    pub border_color: String,
    /// Border width relative to `size`.
    pub border_size: f64,
    pub label: String,
    pub label_color: String,
    pub hidden: bool,
    pub highlighted: bool,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeAttributes {
    pub source: NodeId,
    pub target: NodeId,
    pub color: String,
    pub size: f64,
    pub label: String,
    pub hidden: bool,
    pub highlighted: bool,
}

/// Style rules encode line breaks as four or more spaces.
fn format_caption(caption: &str) -> String {
    let bytes = caption.as_bytes();
    let mut start = None;
    let mut run = 0;
    for (i, b) in bytes.iter().enumerate() {
        if *b == b' ' {
            run += 1;
            if run == 4 {
                start = Some(i + 1 - run);
            }
        } else if let Some(from) = start {
            return format!("{}\n{}", &caption[..from], &caption[i..]);
        } else {
            run = 0;
        }
    }
    match start {
        Some(from) => format!("{}\n", &caption[..from]),
        None => caption.to_owned(),
    }
}

fn style_f64(style: &IndexMap<String, String>, key: &str) -> Option<f64> {
    style.get(key).and_then(|v| v.trim().parse::<f64>().ok()).filter(|v| v.is_finite() && *v != 0.0)
}

/// Stable 64-bit FNV-1a, used to seed placement.
fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Deterministic placement in `[0, 1)` for a node without a position.
pub fn seeded_position(id: &NodeId) -> Position {
    let mut x = StdRng::seed_from_u64(fnv1a(&format!("{id}x")));
    let mut y = StdRng::seed_from_u64(fnv1a(&format!("{id}y")));
    Position::new(x.gen::<f64>(), y.gen::<f64>())
}

impl NodeAttributes {
    /// Attributes for `node` at `position`, scaled by `size_factor`.
    pub fn from_node(node: &Node, position: Position, style: &NodeStyleConfig, size_factor: f64) -> Self {
        let size = style_f64(&node.style, "diameter").unwrap_or(style.size) * style.scale_factor * size_factor;
        let border_width = style_f64(&node.style, "border-width").unwrap_or(style.border_width);
        let caption = node.style.get("caption").filter(|c| !c.is_empty()).unwrap_or(&node.title);

        Self {
            x: position.x,
            y: position.y,
            size,
            color: node.style.get("color").cloned().unwrap_or_else(|| style.color.clone()),
            border_color: node
                .style
                .get("border-color")
                .cloned()
                .unwrap_or_else(|| style.border_color.clone()),
            border_size: if size > 0.0 { border_width / size } else { 0.0 },
            label: format_caption(caption),
            label_color: node
                .style
                .get("text-color-internal")
                .cloned()
                .unwrap_or_else(|| style.label_color.clone()),
            hidden: false,
            highlighted: false,
            placeholder: node.placeholder,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

impl EdgeAttributes {
    pub fn from_relation(relation: &Relation, style: &RelationStyleConfig) -> Self {
        let caption = relation
            .style
            .get("caption")
            .filter(|c| !c.is_empty())
            .unwrap_or(&relation.title);
        Self {
            source: relation.source_id.clone(),
            target: relation.target_id.clone(),
            color: relation.style.get("color").cloned().unwrap_or_else(|| style.color.clone()),
            size: style_f64(&relation.style, "shaft-width").unwrap_or(style.size) * style.scale_factor,
            label: format_caption(caption),
            hidden: false,
            highlighted: false,
        }
    }
}

/// Node and edge attributes keyed by entity id.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: IndexMap<NodeId, NodeAttributes>,
    edges: IndexMap<RelationId, EdgeAttributes>,
    unflushed: IndexSet<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeAttributes> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &RelationId) -> Option<&EdgeAttributes> {
        self.edges.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeAttributes)> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&RelationId, &EdgeAttributes)> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Where `id` is drawn, if it is in the scene.
    pub fn node_position(&self, id: &NodeId) -> Option<Position> {
        self.nodes.get(id).map(NodeAttributes::position)
    }

    /// Insert or replace a node. A node with an unflushed drag position
    /// keeps that position.
    pub fn upsert_node(&mut self, id: NodeId, mut attributes: NodeAttributes) {
        if let Some(existing) = self.nodes.get(&id) {
            if self.unflushed.contains(&id) {
                attributes.x = existing.x;
                attributes.y = existing.y;
            }
            attributes.highlighted = existing.highlighted;
            attributes.hidden = existing.hidden;
        }
        self.nodes.insert(id, attributes);
    }

    pub fn upsert_edge(&mut self, id: RelationId, mut attributes: EdgeAttributes) {
        if let Some(existing) = self.edges.get(&id) {
            attributes.highlighted = existing.highlighted;
            attributes.hidden = existing.hidden;
        }
        self.edges.insert(id, attributes);
    }

    pub fn retain_nodes(&mut self, mut keep: impl FnMut(&NodeId) -> bool) {
        self.nodes.retain(|id, _| keep(id));
        let nodes = &self.nodes;
        self.unflushed.retain(|id| nodes.contains_key(id));
    }

    pub fn retain_edges(&mut self, mut keep: impl FnMut(&RelationId) -> bool) {
        self.edges.retain(|id, _| keep(id));
    }

    /// Write-through move: the entity store is not touched.
    pub fn translate_node(&mut self, id: &NodeId, dx: f64, dy: f64) -> bool {
        match self.nodes.get_mut(id) {
            Some(attributes) => {
                attributes.x += dx;
                attributes.y += dy;
                self.unflushed.insert(id.clone());
                true
            }
            None => false,
        }
    }

    /// Move a node to a canonical position. Nodes with an unflushed drag
    /// position are left alone.
    pub fn place_node(&mut self, id: &NodeId, position: Position) -> bool {
        if self.unflushed.contains(id) {
            return false;
        }
        match self.nodes.get_mut(id) {
            Some(attributes) => {
                attributes.x = position.x;
                attributes.y = position.y;
                true
            }
            None => false,
        }
    }

    /// Positions moved since the last call, ready to be flushed.
    pub fn take_unflushed(&mut self) -> Vec<(NodeId, Position)> {
        let ids = std::mem::take(&mut self.unflushed);
        ids.into_iter()
            .filter_map(|id| {
                let position = self.node_position(&id)?;
                Some((id, position))
            })
            .collect()
    }

    pub fn has_unflushed(&self) -> bool {
        !self.unflushed.is_empty()
    }

    pub fn set_node_size(&mut self, id: &NodeId, size: f64) {
        if let Some(attributes) = self.nodes.get_mut(id) {
            attributes.size = size;
        }
    }

    /// Mark exactly the given nodes and edges as highlighted.
    pub fn apply_highlights(&mut self, nodes: &IndexSet<NodeId>, edges: &IndexSet<RelationId>) {
        for (id, attributes) in self.nodes.iter_mut() {
            attributes.highlighted = nodes.contains(id);
        }
        for (id, attributes) in self.edges.iter_mut() {
            attributes.highlighted = edges.contains(id);
        }
    }

    /// Nodes whose position lies in the axis-aligned box spanned by `a` and `b`.
    pub fn nodes_in_box(&self, a: Position, b: Position) -> IndexSet<NodeId> {
        let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
        let (min_y, max_y) = (a.y.min(b.y), a.y.max(b.y));
        self.nodes
            .iter()
            .filter(|(_, n)| n.x >= min_x && n.x <= max_x && n.y >= min_y && n.y <= max_y)
            .map(|(id, _)| id.clone())
            .collect()
    }
}
