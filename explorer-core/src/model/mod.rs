//! Domain model shared by every component.
//!
//! These are plain serde data types mirroring the backend's JSON. They carry
//! no behavior beyond builders and small queries.

mod entity;
mod parallax;
mod perspective;
mod position;
mod search;

pub use entity::{
    Entity, EntityKey, Node, NodeId, Property, PropertyMap, Relation, RelationId, StyleMap,
    NOT_AVAILABLE_SIGN,
};
pub use parallax::{ParallaxData, ParallaxFilters, ParallaxRequest, ParallaxStep, RelationTypeCount, Seed};
pub use perspective::{Perspective, PerspectiveDraft, PerspectiveId};
pub use position::Position;
pub use search::{Cell, LayoutAlgorithm, Presentation, ResultRow, SearchResult, SearchResultKind};
