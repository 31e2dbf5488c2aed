//! Search results as typed rows.
//!
//! Backends return rows of heterogeneous JSON. Entities inside them are
//! recognised here, once, by their `_grapheditor_type` tag; everything past
//! this module works with [`Cell`] values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{Node, Relation};
use crate::error::{Error, Result};

const TYPE_TAG: &str = "_grapheditor_type";

/// Where a search result came from. Decides whether exploration restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchResultKind {
    CypherQuery,
    ParaQuery,
    FullText,
    Perspective,
    /// Produced by the exploration engine itself.
    Parallax,
}

impl SearchResultKind {
    /// Results of this kind start a fresh exploration.
    pub fn restarts_exploration(self) -> bool {
        self != Self::Parallax
    }
}

/// One value inside a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Node(Node),
    Relation(Relation),
    List(Vec<Cell>),
    Map(IndexMap<String, Cell>),
    Scalar(serde_json::Value),
}

impl Cell {
    /// Classify a raw JSON value. Objects tagged as node or relation must
    /// deserialize as such; other objects become maps.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(object) => {
                match object.get(TYPE_TAG).and_then(|tag| tag.as_str()) {
                    Some("node") => {
                        Ok(Self::Node(serde_json::from_value(serde_json::Value::Object(object))?))
                    }
                    Some("relation") => Ok(Self::Relation(serde_json::from_value(
                        serde_json::Value::Object(object),
                    )?)),
                    _ => object
                        .into_iter()
                        .map(|(key, value)| Ok((key, Self::from_json(value)?)))
                        .collect::<Result<IndexMap<_, _>>>()
                        .map(Self::Map),
                }
            }
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>>>()
                .map(Self::List),
            scalar => Ok(Self::Scalar(scalar)),
        }
    }
}

/// An ordered list of named cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultRow {
    pub cells: Vec<(String, Cell)>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell(mut self, name: impl Into<String>, cell: Cell) -> Self {
        self.cells.push((name.into(), cell));
        self
    }

    /// Parse a row given either as an object or as a list of `[name, value]`
    /// pairs (the cypher endpoint's format).
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let cells = match value {
            serde_json::Value::Object(object) => object
                .into_iter()
                .map(|(name, value)| Ok((name, Cell::from_json(value)?)))
                .collect::<Result<Vec<_>>>()?,
            serde_json::Value::Array(pairs) => pairs
                .into_iter()
                .map(|pair| match pair {
                    serde_json::Value::Array(mut pair) if pair.len() == 2 => {
                        let value = pair.pop().unwrap_or_default();
                        let name = match pair.pop() {
                            Some(serde_json::Value::String(name)) => name,
                            Some(other) => other.to_string(),
                            None => String::new(),
                        };
                        Ok((name, Cell::from_json(value)?))
                    }
                    other => Err(Error::MalformedResult(format!("expected [name, value], got {other}"))),
                })
                .collect::<Result<Vec<_>>>()?,
            other => vec![(String::new(), Cell::from_json(other)?)],
        };
        Ok(Self { cells })
    }
}

/// A tagged search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub kind: SearchResultKind,
    pub rows: Vec<ResultRow>,
}

impl SearchResult {
    pub fn new(kind: SearchResultKind, rows: Vec<ResultRow>) -> Self {
        Self { kind, rows }
    }

    /// Parse a JSON array of rows.
    pub fn from_json(kind: SearchResultKind, value: serde_json::Value) -> Result<Self> {
        let rows = match value {
            serde_json::Value::Array(rows) => rows
                .into_iter()
                .map(ResultRow::from_json)
                .collect::<Result<Vec<_>>>()?,
            serde_json::Value::Null => Vec::new(),
            other => vec![ResultRow::from_json(other)?],
        };
        Ok(Self { kind, rows })
    }

    /// One row per entity: a node cell, a relation cell, or both.
    pub fn from_entities(kind: SearchResultKind, nodes: Vec<Node>, relations: Vec<Relation>) -> Self {
        let len = nodes.len().max(relations.len());
        let mut nodes = nodes.into_iter();
        let mut relations = relations.into_iter();
        let rows = (0..len)
            .map(|_| {
                let mut row = ResultRow::new();
                if let Some(node) = nodes.next() {
                    row = row.with_cell("node", Cell::Node(node));
                }
                if let Some(relation) = relations.next() {
                    row = row.with_cell("relation", Cell::Relation(relation));
                }
                row
            })
            .collect();
        Self { kind, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Presentation of the current result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Presentation {
    #[default]
    Graph,
    ResultTable,
}

/// Layout algorithm the renderer runs over the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutAlgorithm {
    #[default]
    ForceAtlas2,
    Force,
    /// Cheap non-overlap layout for graphs without relations.
    Noverlap,
    Random,
    /// Positions come from a saved perspective.
    Perspective,
}
