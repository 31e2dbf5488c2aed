//! The semantic event vocabulary handlers subscribe to.

use super::input::{CameraState, Modifiers, Point};
use super::state::InteractionState;
use crate::model::{NodeId, RelationId};

/// Names of the events a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    NodeDown,
    NodeClick,
    NodeDrag,
    NodeContextMenu,
    NodeSelection,
    NodeQuick,
    NodeAutoConnect,
    RelationClick,
    RelationContextMenu,
    StageContextMenu,
    ZoomFactor,
    Scale,
    CameraUpdate,
    PointerUp,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        Self::NodeDown,
        Self::NodeClick,
        Self::NodeDrag,
        Self::NodeContextMenu,
        Self::NodeSelection,
        Self::NodeQuick,
        Self::NodeAutoConnect,
        Self::RelationClick,
        Self::RelationContextMenu,
        Self::StageContextMenu,
        Self::ZoomFactor,
        Self::Scale,
        Self::CameraUpdate,
        Self::PointerUp,
    ];

    /// The state the dispatcher must be in for handlers of this kind to run.
    ///
    /// `None` means the handlers run regardless of state.
    pub fn gate(self) -> Option<InteractionState> {
        use InteractionState as S;
        Some(match self {
            Self::NodeDown => S::NodeDown,
            Self::NodeClick => S::NodeClick,
            Self::NodeDrag => S::NodeDrag,
            Self::NodeContextMenu => S::NodeContextMenu,
            Self::NodeSelection => S::NodeSelection,
            Self::NodeQuick => S::NodeQuick,
            Self::NodeAutoConnect => S::NodeAutoConnect,
            Self::RelationClick => S::RelationClick,
            Self::RelationContextMenu => S::RelationContextMenu,
            Self::StageContextMenu => S::StageContextMenu,
            Self::ZoomFactor => S::ZoomFactor,
            Self::Scale => S::Scale,
            Self::CameraUpdate | Self::PointerUp => return None,
        })
    }

    /// Kinds whose handlers belong to `state`.
    pub fn gated_by(state: InteractionState) -> impl Iterator<Item = EventKind> {
        Self::ALL.into_iter().filter(move |kind| kind.gate() == Some(state))
    }
}

/// A semantic event delivered to handlers.
///
/// `origin` is the viewport point where the current press started.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    NodeDown { node: NodeId, pointer: Point },
    NodeClick { node: NodeId, pointer: Point },
    NodeDrag { node: NodeId, origin: Point, pointer: Point },
    NodeContextMenu { node: NodeId, pointer: Point },
    NodeSelection { origin: Point, pointer: Point },
    NodeQuick { pointer: Point },
    NodeAutoConnect { node: NodeId, origin: Point, pointer: Point },
    RelationClick { relation: RelationId, pointer: Point },
    RelationContextMenu { relation: RelationId, pointer: Point },
    StageContextMenu { pointer: Point },
    ZoomFactor { pointer: Point, delta: f64 },
    /// `shift` scales labels, `alt` scales nodes.
    Scale { pointer: Point, delta: f64, modifiers: Modifiers },
    CameraUpdate(CameraState),
    PointerUp { pointer: Point },
}

impl InteractionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NodeDown { .. } => EventKind::NodeDown,
            Self::NodeClick { .. } => EventKind::NodeClick,
            Self::NodeDrag { .. } => EventKind::NodeDrag,
            Self::NodeContextMenu { .. } => EventKind::NodeContextMenu,
            Self::NodeSelection { .. } => EventKind::NodeSelection,
            Self::NodeQuick { .. } => EventKind::NodeQuick,
            Self::NodeAutoConnect { .. } => EventKind::NodeAutoConnect,
            Self::RelationClick { .. } => EventKind::RelationClick,
            Self::RelationContextMenu { .. } => EventKind::RelationContextMenu,
            Self::StageContextMenu { .. } => EventKind::StageContextMenu,
            Self::ZoomFactor { .. } => EventKind::ZoomFactor,
            Self::Scale { .. } => EventKind::Scale,
            Self::CameraUpdate(_) => EventKind::CameraUpdate,
            Self::PointerUp { .. } => EventKind::PointerUp,
        }
    }

    pub fn pointer(&self) -> Option<Point> {
        match self {
            Self::NodeDown { pointer, .. }
            | Self::NodeClick { pointer, .. }
            | Self::NodeDrag { pointer, .. }
            | Self::NodeContextMenu { pointer, .. }
            | Self::NodeSelection { pointer, .. }
            | Self::NodeQuick { pointer }
            | Self::NodeAutoConnect { pointer, .. }
            | Self::RelationClick { pointer, .. }
            | Self::RelationContextMenu { pointer, .. }
            | Self::StageContextMenu { pointer }
            | Self::ZoomFactor { pointer, .. }
            | Self::Scale { pointer, .. }
            | Self::PointerUp { pointer } => Some(*pointer),
            Self::CameraUpdate(_) => None,
        }
    }

    pub fn node(&self) -> Option<&NodeId> {
        match self {
            Self::NodeDown { node, .. }
            | Self::NodeClick { node, .. }
            | Self::NodeDrag { node, .. }
            | Self::NodeContextMenu { node, .. }
            | Self::NodeAutoConnect { node, .. } => Some(node),
            _ => None,
        }
    }
}
